//! Twilio WhatsApp adapter.

use async_trait::async_trait;
use serde::Deserialize;

use placement_common::config::AppConfig;
use placement_common::types::Channel;

use crate::provider::{NotificationProvider, ProviderError, Recipient, RenderedMessage, http_client};
use crate::twilio::{self, TWILIO_API_BASE};

/// WhatsApp message adapter over the Twilio Messages REST API.
pub struct TwilioWhatsAppProvider {
    client: reqwest::Client,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

impl TwilioWhatsAppProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: http_client(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_whatsapp_number.clone(),
        }
    }
}

#[async_trait]
impl NotificationProvider for TwilioWhatsAppProvider {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }

    async fn send(
        &self,
        recipient: &Recipient,
        message: &RenderedMessage,
    ) -> Result<String, ProviderError> {
        let (account_sid, auth_token, from) =
            match (&self.account_sid, &self.auth_token, &self.from_number) {
                (Some(sid), Some(token), Some(from)) => (sid, token, from),
                _ => return Err(ProviderError::new("Twilio whatsapp is not configured")),
            };
        let phone = recipient
            .phone
            .as_deref()
            .ok_or_else(|| ProviderError::new("Student phone not found"))?;

        let to = format!("whatsapp:{}", phone);
        let from = format!("whatsapp:{}", from);

        let url = format!("{}/Accounts/{}/Messages.json", TWILIO_API_BASE, account_sid);
        let params = [
            ("To", to.as_str()),
            ("From", from.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(account_sid, Some(auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Twilio request failed: {}", e)))?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(twilio::classify_error(http_status, &body));
        }

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("Twilio response decode failed: {}", e)))?;

        tracing::debug!(message_sid = %resource.sid, to, "WhatsApp message submitted");

        Ok(resource.sid)
    }
}
