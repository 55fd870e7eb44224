//! Twilio webhook routes for voice campaigns.
//!
//! Twilio fetches TwiML from the voice webhook when the call connects, then
//! reports progress through the status/recording/transcription callbacks.
//! These endpoints are unauthenticated by necessity; they only touch
//! delivery-log rows addressed by the `delivery_log_id` query parameter.

use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::{DeliveryLog, DeliveryStatus};
use placement_engine::template;
use placement_notifier::voice::{map_call_status, reconcile_delivery_status};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/webhooks/twilio/voice", post(voice_webhook))
        .route("/api/webhooks/twilio/recording", post(recording_webhook))
        .route("/api/webhooks/twilio/transcription", post(transcription_webhook))
        .route("/api/webhooks/twilio/status", post(status_webhook))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    delivery_log_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct RecordingForm {
    #[serde(rename = "RecordingUrl")]
    recording_url: Option<String>,
    #[serde(rename = "RecordingDuration")]
    recording_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionForm {
    #[serde(rename = "TranscriptionText")]
    transcription_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    #[serde(rename = "CallStatus")]
    call_status: Option<String>,
    #[serde(rename = "CallDuration")]
    call_duration: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct VoiceScriptRow {
    body_template: String,
    email: String,
    full_name: Option<String>,
    branch: Option<String>,
    cgpa: Option<f64>,
}

fn twiml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

/// Minimal XML escaping for text nodes and attribute values.
fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// POST /api/webhooks/twilio/voice — Twilio connected the call; return TwiML
/// that speaks the rendered script and records the response.
async fn voice_webhook(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Response, AppError> {
    let row: Option<VoiceScriptRow> = sqlx::query_as(
        r#"
        SELECT c.body_template, u.email, p.full_name, p.branch, p.cgpa
        FROM delivery_logs l
        JOIN campaigns c ON c.id = l.campaign_id
        JOIN users u ON u.id = l.student_id
        LEFT JOIN profiles p ON p.user_id = l.student_id
        WHERE l.id = $1
        "#,
    )
    .bind(query.delivery_log_id)
    .fetch_optional(&state.pool)
    .await?;

    let Some(row) = row else {
        return Ok(twiml(
            "<Response><Say>Sorry, an error occurred.</Say><Hangup/></Response>".to_string(),
        ));
    };

    let vars = template::recipient_vars(
        row.full_name.as_deref().unwrap_or("Student"),
        &row.email,
        row.branch.as_deref().unwrap_or_default(),
        row.cgpa,
    );
    let script = template::render(&row.body_template, &vars);

    let recording_action = format!(
        "{}/api/webhooks/twilio/recording?delivery_log_id={}",
        state.config.webhook_base_url, query.delivery_log_id
    );
    let transcribe_callback = format!(
        "{}/api/webhooks/twilio/transcription?delivery_log_id={}",
        state.config.webhook_base_url, query.delivery_log_id
    );

    let body = format!(
        concat!(
            "<Response>",
            "<Say voice=\"alice\" language=\"en-IN\">{}</Say>",
            "<Record action=\"{}\" transcribe=\"true\" transcribeCallback=\"{}\" ",
            "maxLength=\"60\" playBeep=\"true\" timeout=\"5\"/>",
            "<Say voice=\"alice\" language=\"en-IN\">Thank you for your response. Goodbye.</Say>",
            "<Hangup/>",
            "</Response>"
        ),
        escape_xml(&script),
        escape_xml(&recording_action),
        escape_xml(&transcribe_callback),
    );

    Ok(twiml(body))
}

/// POST /api/webhooks/twilio/recording — Recording finished; store its URL.
async fn recording_webhook(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
    Form(form): Form<RecordingForm>,
) -> Result<Response, AppError> {
    if let Some(url) = form.recording_url {
        let duration = form.recording_duration.and_then(|d| d.parse::<f64>().ok());
        sqlx::query(
            r#"
            UPDATE delivery_logs
            SET recording_url = $2,
                duration_secs = COALESCE($3, duration_secs),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(query.delivery_log_id)
        .bind(url)
        .bind(duration)
        .execute(&state.pool)
        .await?;
    }

    Ok(twiml(
        concat!(
            "<Response>",
            "<Say voice=\"alice\" language=\"en-IN\">Thank you. Your response has been recorded.</Say>",
            "<Hangup/>",
            "</Response>"
        )
        .to_string(),
    ))
}

/// POST /api/webhooks/twilio/transcription — Async transcription result;
/// store the text and mark the call COMPLETED.
async fn transcription_webhook(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
    Form(form): Form<TranscriptionForm>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    if let Some(text) = form.transcription_text {
        sqlx::query(
            r#"
            UPDATE delivery_logs
            SET transcript = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(query.delivery_log_id)
        .bind(text)
        .bind(DeliveryStatus::Completed)
        .execute(&state.pool)
        .await?;

        tracing::debug!(delivery_log_id = %query.delivery_log_id, "Transcription stored");
    }

    Ok(axum::Json(json!({"status": "ok"})))
}

/// POST /api/webhooks/twilio/status — Call state change. Maps the provider
/// state through the fixed lookup and applies it monotonically: a COMPLETED
/// log is never demoted by an out-of-order callback.
async fn status_webhook(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
    Form(form): Form<StatusForm>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    let log: Option<DeliveryLog> = sqlx::query_as("SELECT * FROM delivery_logs WHERE id = $1")
        .bind(query.delivery_log_id)
        .fetch_optional(&state.pool)
        .await?;

    let Some(log) = log else {
        return Ok(axum::Json(json!({"status": "not_found"})));
    };

    let incoming = form
        .call_status
        .as_deref()
        .and_then(|s| map_call_status(&s.to_lowercase()));
    let next = match incoming {
        Some(incoming) => reconcile_delivery_status(log.status, incoming),
        None => log.status,
    };
    let duration = form.call_duration.and_then(|d| d.parse::<f64>().ok());

    sqlx::query(
        r#"
        UPDATE delivery_logs
        SET status = $2,
            duration_secs = COALESCE($3, duration_secs),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(log.id)
    .bind(next)
    .bind(duration)
    .execute(&state.pool)
    .await?;

    if next != log.status {
        tracing::debug!(
            delivery_log_id = %log.id,
            from = %log.status,
            to = %next,
            "Call status reconciled"
        );
    }

    Ok(axum::Json(json!({"status": "ok"})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"a & b < c > "d" 'e'"#),
            "a &amp; b &lt; c &gt; &quot;d&quot; &apos;e&apos;"
        );
    }
}
