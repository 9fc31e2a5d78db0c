//! Discord webhook notification channel.
//!
//! Posts `{"content", "username"}` and classifies the response:
//! - 204 is a delivery
//! - 429 is a rate limit, with `retry_after` taken from the JSON body
//! - anything else, or no response at all, is a failure
//!
//! Rate limits are reported to the caller, never slept on here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DeliveryError, DeliveryOutcome, Notifier};
use crate::Result;
use crate::utils::{http_client, text};

/// Discord rejects message content longer than this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Appended to content that had to be cut down to [`MAX_CONTENT_CHARS`].
const TRUNCATION_MARKER: &str = "...";

/// Upper bound for a single webhook request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Display name used when none is configured.
pub const DEFAULT_USERNAME: &str = "simple-logs-to-discord";

/// Assumed back-off when a 429 response does not say how long to wait.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Discord channel configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Discord webhook URL. The URL itself is the credential.
    pub webhook_url: String,
    /// Display name the message is posted under.
    pub username: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Honor proxy settings from the environment.
    pub use_system_proxy: bool,
}

impl DiscordConfig {
    pub fn new(webhook_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            username: username.into(),
            timeout: REQUEST_TIMEOUT,
            use_system_proxy: true,
        }
    }
}

/// JSON body of a webhook execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub content: String,
    pub username: String,
}

impl WebhookPayload {
    /// Build a payload, truncating `message` to Discord's content limit.
    pub fn new(message: &str, username: &str) -> Self {
        Self {
            content: text::truncate_chars(message, MAX_CONTENT_CHARS, TRUNCATION_MARKER),
            username: username.to_string(),
        }
    }
}

/// Body Discord sends along with a 429.
#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

/// Discord notification channel.
pub struct DiscordNotifier {
    config: DiscordConfig,
    client: Client,
}

impl DiscordNotifier {
    /// Create a new Discord channel.
    pub fn new(config: DiscordConfig) -> Result<Self> {
        let client = http_client::build_webhook_client(config.timeout, config.use_system_proxy)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }

    /// Parse the back-off from a 429 body, falling back to one second.
    fn parse_retry_after(body: &str) -> Duration {
        serde_json::from_str::<RateLimitBody>(body)
            .ok()
            .and_then(|b| b.retry_after)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_RETRY_AFTER)
    }

    async fn send(&self, payload: &WebhookPayload) -> DeliveryOutcome {
        let response = match self
            .client
            .post(&self.config.webhook_url)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let reason = describe_reqwest_error(&e);
                warn!(error = %reason, "Discord request failed");
                return DeliveryOutcome::Failed(DeliveryError::Transport(reason));
            }
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!("Discord notification sent");
            return DeliveryOutcome::Delivered;
        }

        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = Self::parse_retry_after(&body);
            warn!(
                retry_after_secs = retry_after.as_secs_f64(),
                "Discord rate limited, notification dropped"
            );
            return DeliveryOutcome::RateLimited(retry_after);
        }

        warn!("Discord webhook failed: {} - {}", status, body);
        DeliveryOutcome::Failed(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn channel_type(&self) -> &'static str {
        "discord"
    }

    async fn notify(&self, message: &str) -> DeliveryOutcome {
        let payload = WebhookPayload::new(message, &self.config.username);
        self.send(&payload).await
    }
}

/// Flatten a reqwest error and its causes into one line; the top-level
/// message alone rarely says what actually went wrong.
fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
