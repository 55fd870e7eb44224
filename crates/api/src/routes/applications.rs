//! Application routes — apply/list plus the action-based status transitions.
//!
//! Actions are verbs (what users do); status is the state the application is
//! in. Each action endpoint maps to exactly one target status and defers
//! validation to the engine's state machine.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::{Application, ApplicationStatus, Role};
use placement_engine::application::{ApplicationService, ApplicationWithStudent};
use placement_engine::status;

use crate::middleware::auth::{AdminUser, AuthUser, StudentUser};
use crate::routes::Pagination;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/applications", post(apply))
        .route("/api/applications", get(list_my_applications))
        .route("/api/applications/status-flow", get(status_flow))
        .route("/api/applications/{id}", get(get_my_application))
        .route("/api/applications/job/{job_id}", get(list_for_job))
        .route("/api/applications/{id}/actions/select", post(action_select))
        .route("/api/applications/{id}/actions/start-process", post(action_start_process))
        .route(
            "/api/applications/{id}/actions/schedule-interview",
            post(action_schedule_interview),
        )
        .route("/api/applications/{id}/actions/shortlist", post(action_shortlist))
        .route("/api/applications/{id}/actions/release-offer", post(action_release_offer))
        .route("/api/applications/{id}/actions/reject", post(action_reject))
        .route("/api/applications/{id}/actions/withdraw", post(action_withdraw))
        .route("/api/applications/{id}/actions/accept-offer", post(action_accept_offer))
        .route("/api/applications/{id}/actions/decline-offer", post(action_decline_offer))
}

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    job_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ApplicationListResponse<T> {
    applications: Vec<T>,
    total: i64,
    page: i64,
}

#[derive(Debug, Deserialize)]
struct JobApplicationsQuery {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<ApplicationStatus>,
}

/// Request body for releasing an offer. `deadline_days` falls back to the
/// configured default (7).
#[derive(Debug, Default, Deserialize)]
struct OfferReleaseRequest {
    deadline_days: Option<i64>,
}

/// POST /api/applications — Student applies to a job.
async fn apply(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<Application>, AppError> {
    let app = ApplicationService::apply(&state.pool, auth.user_id, req.job_id).await?;
    Ok(Json(app))
}

/// GET /api/applications — The student's own applications.
async fn list_my_applications(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<ApplicationListResponse<Application>>, AppError> {
    let (limit, offset) = page.limit_offset();
    let (applications, total) =
        ApplicationService::list_by_student(&state.pool, auth.user_id, limit, offset).await?;
    Ok(Json(ApplicationListResponse {
        applications,
        total,
        page: page.page(),
    }))
}

/// GET /api/applications/:id — One of the student's own applications.
async fn get_my_application(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app = ApplicationService::get_owned(&state.pool, id, auth.user_id).await?;
    Ok(Json(app))
}

/// GET /api/applications/job/:job_id — Admin view of a job's applicants.
async fn list_for_job(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(job_id): Path<Uuid>,
    Query(query): Query<JobApplicationsQuery>,
) -> Result<Json<ApplicationListResponse<ApplicationWithStudent>>, AppError> {
    let page = Pagination {
        page: query.page,
        limit: query.limit,
    };
    let (limit, offset) = page.limit_offset();
    let (applications, total) =
        ApplicationService::list_by_job(&state.pool, job_id, query.status, limit, offset).await?;
    Ok(Json(ApplicationListResponse {
        applications,
        total,
        page: page.page(),
    }))
}

/// GET /api/applications/status-flow — The transition tables, for clients
/// that render available actions per status.
async fn status_flow(_auth: AuthUser) -> Json<serde_json::Value> {
    let table = |role| -> serde_json::Map<String, serde_json::Value> {
        status::transition_table(role)
            .iter()
            .map(|(from, targets)| (from.to_string(), json!(targets)))
            .collect()
    };

    Json(json!({
        "admin_transitions": table(Role::Admin),
        "student_transitions": table(Role::Student),
        "terminal_states": status::TERMINAL_STATES,
    }))
}

/// POST .../actions/select — ADMIN: APPLIED → SELECTED.
async fn action_select(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app =
        ApplicationService::admin_transition(&state.pool, id, ApplicationStatus::Selected).await?;
    Ok(Json(app))
}

/// POST .../actions/start-process — ADMIN: SELECTED → IN_PROCESS.
async fn action_start_process(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app =
        ApplicationService::admin_transition(&state.pool, id, ApplicationStatus::InProcess).await?;
    Ok(Json(app))
}

/// POST .../actions/schedule-interview — ADMIN: IN_PROCESS → INTERVIEW_SCHEDULED.
async fn action_schedule_interview(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app = ApplicationService::admin_transition(
        &state.pool,
        id,
        ApplicationStatus::InterviewScheduled,
    )
    .await?;
    Ok(Json(app))
}

/// POST .../actions/shortlist — ADMIN: INTERVIEW_SCHEDULED → SHORTLISTED.
async fn action_shortlist(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app =
        ApplicationService::admin_transition(&state.pool, id, ApplicationStatus::Shortlisted)
            .await?;
    Ok(Json(app))
}

/// POST .../actions/release-offer — ADMIN: SHORTLISTED → OFFER_RELEASED,
/// stamping release time and response deadline.
async fn action_release_offer(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<OfferReleaseRequest>,
) -> Result<Json<Application>, AppError> {
    let deadline_days = req.deadline_days.unwrap_or(state.config.offer_deadline_days);
    let app = ApplicationService::release_offer(&state.pool, id, deadline_days).await?;
    Ok(Json(app))
}

/// POST .../actions/reject — ADMIN: any non-terminal state → REJECTED.
async fn action_reject(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app = ApplicationService::reject(&state.pool, id).await?;
    Ok(Json(app))
}

/// POST .../actions/withdraw — STUDENT: APPLIED → WITHDRAWN.
async fn action_withdraw(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app = ApplicationService::withdraw(&state.pool, id, auth.user_id).await?;
    Ok(Json(app))
}

/// POST .../actions/accept-offer — STUDENT: OFFER_RELEASED → PLACED.
/// Refused after the offer deadline.
async fn action_accept_offer(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app = ApplicationService::accept_offer(&state.pool, id, auth.user_id).await?;
    Ok(Json(app))
}

/// POST .../actions/decline-offer — STUDENT: OFFER_RELEASED → OFFER_DECLINED.
async fn action_decline_offer(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let app = ApplicationService::decline_offer(&state.pool, id, auth.user_id).await?;
    Ok(Json(app))
}
