//! Student profile routes.

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::Profile;
use placement_engine::student::{StudentFilter, StudentService, StudentSummary, UpdateProfileParams};

use crate::middleware::auth::{AdminUser, StudentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/me/profile", get(get_my_profile))
        .route("/api/users/me/profile", patch(update_my_profile))
        .route("/api/users/students", get(list_students))
        .route("/api/users/{id}/mark-placed", patch(mark_placed))
}

/// GET /api/users/me/profile — The student's own profile.
async fn get_my_profile(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
) -> Result<Json<Profile>, AppError> {
    let profile = StudentService::get_profile(&state.pool, auth.user_id).await?;
    Ok(Json(profile))
}

/// PATCH /api/users/me/profile — Update the student's own profile.
/// `is_placed` is not student-writable.
async fn update_my_profile(
    State(state): State<AppState>,
    StudentUser(auth): StudentUser,
    Json(params): Json<UpdateProfileParams>,
) -> Result<Json<Profile>, AppError> {
    let profile = StudentService::update_profile(&state.pool, auth.user_id, &params).await?;
    Ok(Json(profile))
}

/// GET /api/users/students — Admin listing with filters and application
/// counts.
async fn list_students(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<StudentFilter>,
) -> Result<Json<Vec<StudentSummary>>, AppError> {
    let students = StudentService::list(&state.pool, &filter).await?;
    Ok(Json(students))
}

/// PATCH /api/users/:id/mark-placed — Admin override of the placement flag.
async fn mark_placed(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    let profile = StudentService::mark_placed(&state.pool, id).await?;
    Ok(Json(profile))
}
