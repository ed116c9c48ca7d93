use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::discord::redact_webhook;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_PAGE_URL: &str = "https://www.maplesea.com/updates";
pub const DEFAULT_LINK_PATTERN: &str = r"(?i)/updates(/|$)";
pub const DEFAULT_STATE_PATH: &str = "seen_links.db";
pub const DEFAULT_USER_AGENT: &str = "updates-watcher/0.1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_NOTIFY_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub page_url: String,
    pub link_pattern: String,
    pub state_path: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub notify_delay_ms: u64,
    pub check_interval_seconds: Option<u64>,
    pub webhooks: Vec<WebhookTarget>,
}

/// A Discord webhook plus the text prepended to every message sent to it
/// (e.g. `<@USER_ID> ` or `@everyone `).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTarget {
    pub url: String,
    #[serde(default)]
    pub prefix: String,
}

impl WebhookTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: String::new(),
        }
    }

    #[cfg(test)]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

// Keep the webhook token out of debug logs
impl fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookTarget")
            .field("url", &redact_webhook(&self.url))
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WebhookEntry {
    Plain(String),
    Target(WebhookTarget),
}

/// Keys as they arrive from the file and the environment, both lowercased:
/// `DISCORD_WEBHOOK_URL` lands in `discord_webhook_url`.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    page_url: Option<String>,
    link_pattern: Option<String>,
    state_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    user_agent: Option<String>,
    request_timeout_secs: Option<u64>,
    notify_delay_ms: Option<u64>,
    check_interval_seconds: Option<u64>,
    discord_webhook_url: Option<String>,
    discord_webhook_urls: Option<Vec<WebhookEntry>>,
    discord_webhook_urls_csv: Option<String>,
}

impl Config {
    /// Reads `$CONFIG_PATH` (default `config.json`) over the process
    /// environment. Values from the file win.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        Self::from_sources(
            Path::new(&path),
            config::Environment::default().ignore_empty(true),
        )
    }

    pub fn from_sources(path: &Path, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(environment);

        match read_file_source(path) {
            Ok(Some(json)) => {
                builder = builder.add_source(config::File::from_str(&json, config::FileFormat::Json));
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read {}: {:#}", path.display(), e),
        }

        let raw: RawConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .context("Invalid configuration")?;

        Ok(raw.resolve())
    }
}

/// The JSON file with every object key lowercased, so `DISCORD_WEBHOOK_URL`
/// in the file meets the same field as the variable from the environment.
/// `None` when the file does not exist.
fn read_file_source(path: &Path) -> Result<Option<String>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context("Failed to read config file"),
    };

    let value: Value = serde_json::from_str(&contents).context("Config file is not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Config file must hold a JSON object");
    }

    Ok(Some(lowercase_keys(value).to_string()))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

impl RawConfig {
    fn resolve(self) -> Config {
        let mut webhooks = Vec::new();

        for entry in self.discord_webhook_urls.unwrap_or_default() {
            let target = match entry {
                WebhookEntry::Plain(url) => WebhookTarget::new(url),
                WebhookEntry::Target(target) => target,
            };
            push_webhook(&mut webhooks, target);
        }

        if let Some(url) = self.discord_webhook_url {
            push_webhook(&mut webhooks, WebhookTarget::new(url));
        }

        if let Some(csv) = self.discord_webhook_urls_csv {
            for url in csv.split(',') {
                push_webhook(&mut webhooks, WebhookTarget::new(url));
            }
        }

        Config {
            page_url: non_empty(self.page_url).unwrap_or_else(|| DEFAULT_PAGE_URL.to_string()),
            link_pattern: non_empty(self.link_pattern)
                .unwrap_or_else(|| DEFAULT_LINK_PATTERN.to_string()),
            state_path: self
                .state_path
                .or(self.db_path)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            user_agent: non_empty(self.user_agent)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            request_timeout_secs: self
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            notify_delay_ms: self.notify_delay_ms.unwrap_or(DEFAULT_NOTIFY_DELAY_MS),
            check_interval_seconds: self.check_interval_seconds.filter(|secs| *secs > 0),
            webhooks,
        }
    }
}

fn push_webhook(webhooks: &mut Vec<WebhookTarget>, mut target: WebhookTarget) {
    target.url = target.url.trim().to_string();
    if target.url.is_empty() || webhooks.iter().any(|w| w.url == target.url) {
        return;
    }
    webhooks.push(target);
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
