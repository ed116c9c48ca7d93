use anyhow::Result;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::FetchError;

/// Shared client for the page fetch and the webhook calls. Every request
/// made through it is bounded by `request_timeout_secs`.
pub fn create_client(config: &Config) -> Result<Client> {
    let client = ClientBuilder::new()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    Ok(client)
}

/// GET `url` and return the body text. Network failures and non-2xx
/// statuses are both `FetchError`s; there is no retry.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!("HTTP error {}: {}", status, url);
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;
    debug!("Fetched {} bytes from {}", body.len(), url);

    Ok(body)
}
