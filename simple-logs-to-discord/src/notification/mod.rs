//! Delivery of expanded messages to the chat webhook.
//!
//! A notifier makes exactly one attempt per message and reports what happened
//! as a [`DeliveryOutcome`]. It never returns an error and never retries; the
//! caller decides what to do with a rate-limited or failed delivery.

mod discord;

pub use discord::{
    DEFAULT_USERNAME, DiscordConfig, DiscordNotifier, MAX_CONTENT_CHARS, REQUEST_TIMEOUT,
    WebhookPayload,
};

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

/// Why a delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The endpoint answered with a status other than 204 or 429.
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never got a response (DNS, connect, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The endpoint asked us to back off for the given duration.
    RateLimited(Duration),
    Failed(DeliveryError),
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => f.write_str("delivered"),
            Self::RateLimited(retry_after) => {
                write!(f, "rate limited, retry after {}s", retry_after.as_secs_f64())
            }
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// A destination for notification messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Make a single delivery attempt.
    async fn notify(&self, message: &str) -> DeliveryOutcome;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn channel_type(&self) -> &'static str {
        (**self).channel_type()
    }

    async fn notify(&self, message: &str) -> DeliveryOutcome {
        (**self).notify(message).await
    }
}
