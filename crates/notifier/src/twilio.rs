//! Shared plumbing for the Twilio REST adapters (voice + whatsapp).

use serde::Deserialize;

use crate::provider::ProviderError;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Twilio error code for per-sender message rate limiting. The only error
/// class that triggers the dispatcher's single immediate retry.
pub const RATE_LIMIT_ERROR_CODE: i64 = 63038;

/// Error envelope returned by the Twilio REST API.
#[derive(Debug, Deserialize)]
pub struct TwilioErrorBody {
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// Turn a non-success Twilio response body into a `ProviderError`,
/// classifying the rate-limit code.
pub fn classify_error(http_status: reqwest::StatusCode, body: &str) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<TwilioErrorBody>(body) {
        let detail = format!(
            "Twilio error {}: {}",
            parsed.code.map(|c| c.to_string()).unwrap_or_else(|| http_status.to_string()),
            parsed.message.unwrap_or_else(|| body.to_string())
        );
        if parsed.code == Some(RATE_LIMIT_ERROR_CODE) {
            return ProviderError::rate_limited(detail);
        }
        return ProviderError::new(detail);
    }
    ProviderError::new(format!("Twilio error {}: {}", http_status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_code_classified() {
        let err = classify_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"code": 63038, "message": "Account exceeded the daily messages limit"}"#,
        );
        assert!(err.rate_limited);
        assert!(err.detail.contains("63038"));
    }

    #[test]
    fn test_other_codes_not_rate_limited() {
        let err = classify_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"code": 21211, "message": "Invalid 'To' phone number"}"#,
        );
        assert!(!err.rate_limited);
        assert!(err.detail.contains("21211"));
    }

    #[test]
    fn test_unparseable_body_falls_back_to_status() {
        let err = classify_error(reqwest::StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(!err.rate_limited);
        assert!(err.detail.contains("502"));
    }
}
