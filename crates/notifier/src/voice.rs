//! Twilio Voice adapter and call-state reconciliation.

use async_trait::async_trait;
use serde::Deserialize;

use placement_common::config::AppConfig;
use placement_common::types::{Channel, DeliveryStatus};

use crate::provider::{NotificationProvider, ProviderError, Recipient, RenderedMessage, http_client};
use crate::twilio::{self, TWILIO_API_BASE};

/// Outbound call adapter over the Twilio Voice REST API.
///
/// The call's TwiML and status callbacks point back at this service's
/// webhook routes; the call resolves asynchronously via those callbacks,
/// so a successful send leaves the delivery log IN_PROGRESS.
pub struct TwilioVoiceProvider {
    client: reqwest::Client,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
    webhook_base_url: String,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct CallStatusResource {
    status: String,
}

impl TwilioVoiceProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: http_client(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_phone_number.clone(),
            webhook_base_url: config.webhook_base_url.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str, &str), ProviderError> {
        match (&self.account_sid, &self.auth_token, &self.from_number) {
            (Some(sid), Some(token), Some(from)) => Ok((sid, token, from)),
            _ => Err(ProviderError::new("Twilio voice is not configured")),
        }
    }
}

#[async_trait]
impl NotificationProvider for TwilioVoiceProvider {
    fn channel(&self) -> Channel {
        Channel::Voice
    }

    fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }

    async fn send(
        &self,
        recipient: &Recipient,
        _message: &RenderedMessage,
    ) -> Result<String, ProviderError> {
        let (account_sid, auth_token, from) = self.credentials()?;
        let to = recipient
            .phone
            .as_deref()
            .ok_or_else(|| ProviderError::new("Student phone not found"))?;

        // The spoken script is served by the voice webhook when Twilio
        // connects the call, so only the callback URLs are sent here.
        let voice_url = format!(
            "{}/api/webhooks/twilio/voice?delivery_log_id={}",
            self.webhook_base_url, recipient.delivery_log_id
        );
        let status_callback = format!(
            "{}/api/webhooks/twilio/status?delivery_log_id={}",
            self.webhook_base_url, recipient.delivery_log_id
        );

        let url = format!("{}/Accounts/{}/Calls.json", TWILIO_API_BASE, account_sid);
        let params = [
            ("To", to),
            ("From", from),
            ("Url", voice_url.as_str()),
            ("StatusCallback", status_callback.as_str()),
            ("StatusCallbackEvent", "initiated"),
            ("StatusCallbackEvent", "ringing"),
            ("StatusCallbackEvent", "answered"),
            ("StatusCallbackEvent", "completed"),
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

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("Twilio response decode failed: {}", e)))?;

        tracing::debug!(call_sid = %call.sid, to, "Call initiated");

        Ok(call.sid)
    }

    async fn fetch_status(&self, provider_sid: &str) -> Result<String, ProviderError> {
        let (account_sid, auth_token, _) = self.credentials()?;

        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            TWILIO_API_BASE, account_sid, provider_sid
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(account_sid, Some(auth_token))
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Twilio request failed: {}", e)))?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(twilio::classify_error(http_status, &body));
        }

        let call: CallStatusResource = response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("Twilio response decode failed: {}", e)))?;

        Ok(call.status)
    }
}

/// Map a Twilio call state to the internal delivery status. Unknown states
/// return `None` and leave the stored status untouched.
pub fn map_call_status(call_status: &str) -> Option<DeliveryStatus> {
    match call_status {
        "initiated" | "ringing" | "in-progress" | "answered" => Some(DeliveryStatus::InProgress),
        "completed" => Some(DeliveryStatus::Completed),
        "busy" => Some(DeliveryStatus::Busy),
        "no-answer" => Some(DeliveryStatus::NoAnswer),
        "failed" | "canceled" => Some(DeliveryStatus::Failed),
        _ => None,
    }
}

/// Apply an incoming call status on top of the stored one.
///
/// Monotonic with respect to completion: a COMPLETED log is never demoted by
/// a late or out-of-order callback, though re-affirming COMPLETED is fine.
pub fn reconcile_delivery_status(
    current: DeliveryStatus,
    incoming: DeliveryStatus,
) -> DeliveryStatus {
    if current == DeliveryStatus::Completed && incoming != DeliveryStatus::Completed {
        current
    } else {
        incoming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_call_status_lookup() {
        assert_eq!(map_call_status("initiated"), Some(DeliveryStatus::InProgress));
        assert_eq!(map_call_status("ringing"), Some(DeliveryStatus::InProgress));
        assert_eq!(map_call_status("in-progress"), Some(DeliveryStatus::InProgress));
        assert_eq!(map_call_status("answered"), Some(DeliveryStatus::InProgress));
        assert_eq!(map_call_status("completed"), Some(DeliveryStatus::Completed));
        assert_eq!(map_call_status("busy"), Some(DeliveryStatus::Busy));
        assert_eq!(map_call_status("no-answer"), Some(DeliveryStatus::NoAnswer));
        assert_eq!(map_call_status("failed"), Some(DeliveryStatus::Failed));
        assert_eq!(map_call_status("canceled"), Some(DeliveryStatus::Failed));
        assert_eq!(map_call_status("queued"), None);
    }

    #[test]
    fn test_completed_never_demoted() {
        for incoming in [
            DeliveryStatus::InProgress,
            DeliveryStatus::Busy,
            DeliveryStatus::NoAnswer,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(
                reconcile_delivery_status(DeliveryStatus::Completed, incoming),
                DeliveryStatus::Completed
            );
        }
    }

    #[test]
    fn test_completed_reaffirmation_allowed() {
        assert_eq!(
            reconcile_delivery_status(DeliveryStatus::Completed, DeliveryStatus::Completed),
            DeliveryStatus::Completed
        );
    }

    #[test]
    fn test_non_completed_follows_incoming() {
        assert_eq!(
            reconcile_delivery_status(DeliveryStatus::InProgress, DeliveryStatus::Busy),
            DeliveryStatus::Busy
        );
        assert_eq!(
            reconcile_delivery_status(DeliveryStatus::Failed, DeliveryStatus::Completed),
            DeliveryStatus::Completed
        );
    }
}
