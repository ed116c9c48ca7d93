use serde::{Deserialize, Serialize};
use std::fmt;

// NewType pattern for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link(pub String);

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Link {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

impl From<String> for Link {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// A link found on the listing page together with its anchor text.
///
/// Only `link` takes part in deduplication; `title` is for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLink {
    pub link: Link,
    pub title: String,
}

impl UpdateLink {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            link: Link::new(url),
            title: title.into(),
        }
    }

    pub fn url(&self) -> &str {
        self.link.as_str()
    }
}
