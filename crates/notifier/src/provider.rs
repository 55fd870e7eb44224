//! Notification provider abstraction.
//!
//! One adapter per channel; the dispatcher only sees this trait. Adapters
//! report a missing credential set through `is_configured`, which start/retry
//! check synchronously before any work is queued.

use async_trait::async_trait;
use uuid::Uuid;

use placement_common::types::Channel;

/// Recipient snapshot resolved by the dispatcher before a send.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub delivery_log_id: Uuid,
    pub student_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A message after template substitution. `subject` is email-only.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub subject: Option<String>,
    pub body: String,
}

/// A failed delivery attempt. `rate_limited` marks the one provider error
/// class that earns a single immediate retry.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{detail}")]
pub struct ProviderError {
    pub detail: String,
    pub rate_limited: bool,
}

impl ProviderError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            rate_limited: false,
        }
    }

    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            rate_limited: true,
        }
    }
}

/// A channel adapter that can deliver one rendered message per call.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    fn channel(&self) -> Channel;

    /// Whether the adapter has the credentials it needs. Checked at
    /// start/retry time; an unconfigured provider rejects the whole start.
    fn is_configured(&self) -> bool;

    /// Deliver one message. Returns the provider's message/call identifier.
    async fn send(
        &self,
        recipient: &Recipient,
        message: &RenderedMessage,
    ) -> Result<String, ProviderError>;

    /// Fetch the provider-side status string for a prior send. Only voice
    /// implements this; other channels resolve at send time.
    async fn fetch_status(&self, provider_sid: &str) -> Result<String, ProviderError> {
        let _ = provider_sid;
        Err(ProviderError::new(format!(
            "status fetch not supported for {} channel",
            self.channel()
        )))
    }
}

/// HTTP connect timeout for adapter clients.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for provider calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the timeout-configured HTTP client shared by the adapters.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build HTTP client with timeouts, using default");
            reqwest::Client::default()
        })
}
