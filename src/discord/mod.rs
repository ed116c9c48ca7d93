pub mod message;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::WebhookTarget;
use crate::error::NotifyError;
use crate::models::UpdateLink;
use message::build_messages;

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Delivers a run's new links somewhere a human will see them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Succeeds only when every link reached every destination.
    async fn notify(&self, links: &[UpdateLink]) -> Result<(), NotifyError>;
}

pub struct DiscordNotifier {
    client: Client,
    webhooks: Vec<WebhookTarget>,
    delay: Duration,
}

impl DiscordNotifier {
    pub fn new(client: Client, webhooks: Vec<WebhookTarget>) -> Self {
        Self {
            client,
            webhooks,
            delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive webhook calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn send_message(&self, webhook: &WebhookTarget, content: &str) -> Result<(), NotifyError> {
        let redacted = redact_webhook(&webhook.url);
        let url = Url::parse(&webhook.url).map_err(|source| NotifyError::InvalidUrl {
            webhook: redacted.clone(),
            source,
        })?;

        let payload = json!({
            "content": content
        });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Request {
                webhook: redacted.clone(),
                source: e.without_url(),
            })?;

        if response.status().is_success() {
            debug!("Discord webhook {} accepted message", redacted);
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let body: String = error_text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            error!("Discord webhook {} failed with status {}: {}", redacted, status, body);
            Err(NotifyError::Status {
                webhook: redacted,
                status,
                body,
            })
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, links: &[UpdateLink]) -> Result<(), NotifyError> {
        if links.is_empty() {
            return Ok(());
        }
        if self.webhooks.is_empty() {
            warn!(
                "No Discord webhook configured; message not sent:\n{}",
                build_messages(links, "").join("\n")
            );
            return Err(NotifyError::NotConfigured);
        }

        let mut first = true;
        for webhook in &self.webhooks {
            for content in build_messages(links, &webhook.prefix) {
                if !first && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                first = false;

                self.send_message(webhook, &content).await?;
            }
        }

        info!(
            "Sent {} link(s) to {} Discord webhook(s)",
            links.len(),
            self.webhooks.len()
        );
        Ok(())
    }
}

/// Webhook URL safe for logs: the trailing token segment is masked.
pub fn redact_webhook(webhook_url: &str) -> String {
    let Ok(url) = Url::parse(webhook_url.trim()) else {
        return "<unparseable webhook URL>".to_string();
    };

    let mut segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    if segments.pop().is_some() {
        segments.push("***");
    }

    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
    format!(
        "{}://{}{}/{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        port,
        segments.join("/")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn links() -> Vec<UpdateLink> {
        vec![
            UpdateLink::new("https://a.test/updates/3", "Third"),
            UpdateLink::new("https://a.test/updates/4", "Fourth"),
        ]
    }

    #[tokio::test]
    async fn posts_one_batched_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = DiscordNotifier::new(
            Client::new(),
            vec![WebhookTarget::new(format!("{}/api/webhooks/1/token", server.uri()))],
        );
        notifier.notify(&links()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = requests[0].body_json().unwrap();
        assert_eq!(
            body["content"],
            "🆕 2 new updates:\n**Third**\nhttps://a.test/updates/3\n**Fourth**\nhttps://a.test/updates/4"
        );
    }

    #[tokio::test]
    async fn every_webhook_gets_its_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let notifier = DiscordNotifier::new(
            Client::new(),
            vec![
                WebhookTarget::new(format!("{}/hooks/a", server.uri())).with_prefix("<@7> "),
                WebhookTarget::new(format!("{}/hooks/b", server.uri())),
            ],
        );
        notifier.notify(&links()[..1]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let contents: Vec<String> = requests
            .iter()
            .map(|r| r.body_json::<Value>().unwrap()["content"].as_str().unwrap().to_string())
            .collect();
        assert!(contents[0].starts_with("<@7> 🆕 New update:"));
        assert!(contents[1].starts_with("🆕 New update:"));
    }

    #[tokio::test]
    async fn server_error_is_a_notify_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let notifier = DiscordNotifier::new(
            Client::new(),
            vec![WebhookTarget::new(format!("{}/api/webhooks/1/token", server.uri()))],
        );
        let err = notifier.notify(&links()).await.unwrap_err();

        match err {
            NotifyError::Status { status, body, webhook } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
                assert!(!webhook.contains("token"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_webhook_url_is_a_notify_failure() {
        let notifier = DiscordNotifier::new(Client::new(), vec![WebhookTarget::new("not a url")]);

        let err = notifier.notify(&links()).await.unwrap_err();

        assert!(matches!(err, NotifyError::InvalidUrl { .. }));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_webhook_is_a_notify_failure() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let notifier = DiscordNotifier::new(Client::new(), Vec::new());
        let err = notifier.notify(&links()).await.unwrap_err();

        assert!(matches!(err, NotifyError::NotConfigured));
        let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("No Discord webhook configured"));
        assert!(logged.contains("**Third**\nhttps://a.test/updates/3"));
        assert!(logged.contains("https://a.test/updates/4"));
    }

    #[tokio::test]
    async fn nothing_to_send_makes_no_calls() {
        let notifier = DiscordNotifier::new(Client::new(), Vec::new());

        notifier.notify(&[]).await.unwrap();
    }

    #[test]
    fn redaction_masks_the_token() {
        assert_eq!(
            redact_webhook("https://discord.com/api/webhooks/123/abcDEF"),
            "https://discord.com/api/webhooks/123/***"
        );
        assert_eq!(redact_webhook("nonsense"), "<unparseable webhook URL>");
    }
}
