use reqwest::StatusCode;
use thiserror::Error;

/// The listing page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: StatusCode },
}

/// A notification did not reach every configured webhook.
///
/// Webhook URLs embed a secret token, so variants only carry the
/// redacted form produced by `discord::redact_webhook`.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no Discord webhook configured")]
    NotConfigured,

    #[error("invalid webhook URL {webhook}: {source}")]
    InvalidUrl {
        webhook: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {webhook} failed: {source}")]
    Request {
        webhook: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{webhook} responded with HTTP {status}: {body}")]
    Status {
        webhook: String,
        status: StatusCode,
        body: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store connection lock poisoned")]
    Poisoned,
}

/// A run that ended in the `Error` stage.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("notify failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("seen-link store failed: {0}")]
    Store(#[from] StoreError),
}
