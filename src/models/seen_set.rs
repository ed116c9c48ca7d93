use std::collections::HashSet;

use super::{Link, UpdateLink};

/// Links that have already been delivered to the notifier.
///
/// The set only ever grows during normal operation; `union` is the
/// only mutation the watcher performs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    links: HashSet<Link>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, link: &Link) -> bool {
        self.links.contains(link)
    }

    /// Returns `true` if the link was not present before.
    pub fn insert(&mut self, link: Link) -> bool {
        self.links.insert(link)
    }

    pub fn union<'a, I>(&mut self, links: I)
    where
        I: IntoIterator<Item = &'a UpdateLink>,
    {
        for update in links {
            self.insert(update.link.clone());
        }
    }

    /// Extracted links that are not in the set, in extraction order.
    pub fn unseen(&self, extracted: &[UpdateLink]) -> Vec<UpdateLink> {
        extracted
            .iter()
            .filter(|update| !self.contains(&update.link))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Links in lexicographic order, for stable on-disk output.
    pub fn sorted(&self) -> Vec<&Link> {
        let mut links: Vec<&Link> = self.links.iter().collect();
        links.sort();
        links
    }
}

impl FromIterator<Link> for SeenSet {
    fn from_iter<T: IntoIterator<Item = Link>>(iter: T) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}
