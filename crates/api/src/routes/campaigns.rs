//! Campaign routes — one surface for all three channels, with the channel
//! as a path segment (`/api/campaigns/{voice|email|whatsapp}/...`).

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::{Campaign, Channel};
use placement_engine::campaign::{
    CampaignService, CampaignSummary, CreateCampaignParams, DeliveryLogView,
};
use placement_notifier::dispatcher::{self, DispatchJob};

use crate::middleware::auth::AdminUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/campaigns/{channel}", post(create_campaign))
        .route("/api/campaigns/{channel}", get(list_campaigns))
        .route(
            "/api/campaigns/{channel}/{id}",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route("/api/campaigns/{channel}/{id}/start", post(start_campaign))
        .route("/api/campaigns/{channel}/{id}/retry", post(retry_campaign))
        .route("/api/campaigns/{channel}/{id}/cancel", post(cancel_campaign))
        .route("/api/campaigns/{channel}/{id}/sync-status", post(sync_status))
}

#[derive(Debug, Serialize)]
struct CampaignDetailResponse {
    #[serde(flatten)]
    campaign: CampaignSummary,
    delivery_logs: Vec<DeliveryLogView>,
}

/// POST /api/campaigns/:channel — Create a DRAFT campaign with one PENDING
/// log per recipient.
async fn create_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(channel): Path<Channel>,
    Json(params): Json<CreateCampaignParams>,
) -> Result<Json<Campaign>, AppError> {
    let campaign = CampaignService::create(&state.pool, channel, &params).await?;
    Ok(Json(campaign))
}

/// GET /api/campaigns/:channel — All campaigns on a channel with counters.
async fn list_campaigns(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(channel): Path<Channel>,
) -> Result<Json<Vec<CampaignSummary>>, AppError> {
    let campaigns = CampaignService::list(&state.pool, channel).await?;
    Ok(Json(campaigns))
}

/// GET /api/campaigns/:channel/:id — Campaign detail with per-recipient logs.
async fn get_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((channel, id)): Path<(Channel, Uuid)>,
) -> Result<Json<CampaignDetailResponse>, AppError> {
    let campaign = CampaignService::summary(&state.pool, channel, id).await?;
    let delivery_logs = CampaignService::delivery_logs(&state.pool, id).await?;
    Ok(Json(CampaignDetailResponse {
        campaign,
        delivery_logs,
    }))
}

/// PUT /api/campaigns/:channel/:id — Update metadata; while DRAFT the
/// recipient set is reset.
async fn update_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((channel, id)): Path<(Channel, Uuid)>,
    Json(params): Json<CreateCampaignParams>,
) -> Result<Json<Campaign>, AppError> {
    let campaign = CampaignService::update(&state.pool, channel, id, &params).await?;
    Ok(Json(campaign))
}

/// DELETE /api/campaigns/:channel/:id — Delete a non-completed campaign.
async fn delete_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((channel, id)): Path<(Channel, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    CampaignService::delete(&state.pool, channel, id).await?;
    Ok(Json(json!({"deleted": true})))
}

/// POST /api/campaigns/:channel/:id/start — Flip to RUNNING and enqueue the
/// dispatch job. Rejected when already RUNNING or the provider is not
/// configured; the HTTP request returns before any sends happen.
async fn start_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((channel, id)): Path<(Channel, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let campaign = CampaignService::get(&state.pool, channel, id).await?;

    if !state.providers.get(channel).is_configured() {
        return Err(AppError::Provider(format!(
            "The {} provider is not configured",
            channel
        )));
    }

    if !CampaignService::mark_running(&state.pool, campaign.id).await? {
        return Err(AppError::Validation("Campaign is already running".to_string()));
    }

    state
        .dispatcher
        .enqueue(DispatchJob {
            campaign_id: campaign.id,
            channel,
        })
        .await?;

    tracing::info!(campaign_id = %campaign.id, channel = %channel, "Campaign started");

    Ok(Json(json!({"message": "Campaign started", "campaign_id": campaign.id})))
}

/// POST /api/campaigns/:channel/:id/retry — Reset this channel's retryable
/// logs to PENDING and re-enqueue. With nothing to retry the campaign status
/// is left untouched.
async fn retry_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((channel, id)): Path<(Channel, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let campaign = CampaignService::get(&state.pool, channel, id).await?;

    if !state.providers.get(channel).is_configured() {
        return Err(AppError::Provider(format!(
            "The {} provider is not configured",
            channel
        )));
    }

    let retried = CampaignService::reset_retryable(&state.pool, channel, campaign.id).await?;
    if retried == 0 {
        return Ok(Json(json!({
            "message": "No failed deliveries to retry",
            "retried_count": 0
        })));
    }

    CampaignService::mark_running(&state.pool, campaign.id).await?;

    state
        .dispatcher
        .enqueue(DispatchJob {
            campaign_id: campaign.id,
            channel,
        })
        .await?;

    tracing::info!(campaign_id = %campaign.id, retried, "Campaign retry queued");

    Ok(Json(json!({
        "message": format!("Retrying {} deliveries", retried),
        "retried_count": retried
    })))
}

/// POST /api/campaigns/:channel/:id/cancel — Mark CANCELLED and fail any
/// still-PENDING logs. Does not interrupt a worker already mid-flight.
async fn cancel_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((channel, id)): Path<(Channel, Uuid)>,
) -> Result<Json<Campaign>, AppError> {
    let campaign = CampaignService::cancel(&state.pool, channel, id).await?;
    Ok(Json(campaign))
}

/// POST /api/campaigns/voice/:id/sync-status — Pull call state from the
/// provider for unresolved voice logs.
async fn sync_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((channel, id)): Path<(Channel, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    if channel != Channel::Voice {
        return Err(AppError::Validation(
            "Status sync is only available for voice campaigns".to_string(),
        ));
    }

    let campaign = CampaignService::get(&state.pool, channel, id).await?;
    let provider = state.providers.get(Channel::Voice);
    let updated =
        dispatcher::sync_voice_statuses(&state.pool, provider.as_ref(), campaign.id).await?;

    Ok(Json(json!({
        "message": format!("Synced status for {} calls", updated),
        "updated_count": updated
    })))
}
