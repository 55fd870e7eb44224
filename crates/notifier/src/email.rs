//! Email adapter over the Resend HTTP API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use placement_common::config::AppConfig;
use placement_common::types::Channel;

use crate::provider::{NotificationProvider, ProviderError, Recipient, RenderedMessage, http_client};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Email delivery adapter.
pub struct ResendEmailProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    from_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailResource {
    id: String,
}

impl ResendEmailProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: http_client(),
            api_key: config.resend_api_key.clone(),
            from_address: config.email_from.clone(),
        }
    }
}

#[async_trait]
impl NotificationProvider for ResendEmailProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.from_address.is_some()
    }

    async fn send(
        &self,
        recipient: &Recipient,
        message: &RenderedMessage,
    ) -> Result<String, ProviderError> {
        let (api_key, from) = match (&self.api_key, &self.from_address) {
            (Some(key), Some(from)) => (key, from),
            _ => return Err(ProviderError::new("Email delivery is not configured")),
        };

        let body = json!({
            "from": from,
            "to": [recipient.email],
            "subject": message.subject.as_deref().unwrap_or_default(),
            "text": message.body,
        });

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Resend request failed: {}", e)))?;

        let http_status = response.status();
        if !http_status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(format!(
                "Resend error {}: {}",
                http_status, detail
            )));
        }

        let resource: EmailResource = response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("Resend response decode failed: {}", e)))?;

        tracing::debug!(email_id = %resource.id, to = %recipient.email, "Email submitted");

        Ok(resource.id)
    }
}
