//! Job posting routes — admin CRUD and the student-facing listing.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::{Job, Role};
use placement_engine::job::{CreateJobParams, JobService, UpdateJobParams};
use placement_engine::student::StudentService;

use crate::middleware::auth::{AdminUser, AuthUser};
use crate::routes::Pagination;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/jobs", post(create_job))
        .route("/api/jobs", get(list_jobs))
        .route("/api/jobs/{id}", get(get_job))
        .route("/api/jobs/{id}", put(update_job))
        .route("/api/jobs/{id}", delete(delete_job))
}

/// Listing row for students: the posting plus a CGPA eligibility flag.
#[derive(Debug, Serialize)]
struct JobWithEligibility {
    #[serde(flatten)]
    job: Job,
    eligible: bool,
}

#[derive(Debug, Serialize)]
struct JobListResponse<T> {
    jobs: Vec<T>,
    total: i64,
    page: i64,
}

/// POST /api/jobs — Create a job posting.
async fn create_job(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(params): Json<CreateJobParams>,
) -> Result<Json<Job>, AppError> {
    let job = JobService::create(&state.pool, &params).await?;
    Ok(Json(job))
}

/// GET /api/jobs — List postings. Students see only active jobs, each with
/// an eligibility flag computed against their CGPA.
async fn list_jobs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<Pagination>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (limit, offset) = page.limit_offset();

    match auth.role {
        Role::Admin => {
            let (jobs, total) = JobService::list(&state.pool, false, limit, offset).await?;
            Ok(Json(serde_json::to_value(JobListResponse {
                jobs,
                total,
                page: page.page(),
            })
            .map_err(|e| AppError::Internal(e.to_string()))?))
        }
        Role::Student => {
            let cgpa = StudentService::get_profile(&state.pool, auth.user_id)
                .await
                .map(|p| p.cgpa)
                .unwrap_or(None);

            let (jobs, total) = JobService::list(&state.pool, true, limit, offset).await?;
            let jobs = jobs
                .into_iter()
                .map(|job| JobWithEligibility {
                    eligible: cgpa.unwrap_or(0.0) >= job.min_cgpa,
                    job,
                })
                .collect();

            Ok(Json(serde_json::to_value(JobListResponse {
                jobs,
                total,
                page: page.page(),
            })
            .map_err(|e| AppError::Internal(e.to_string()))?))
        }
    }
}

/// GET /api/jobs/:id — Fetch one posting.
async fn get_job(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = JobService::get(&state.pool, id).await?;
    Ok(Json(job))
}

/// PUT /api/jobs/:id — Update a posting.
async fn update_job(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateJobParams>,
) -> Result<Json<Job>, AppError> {
    let job = JobService::update(&state.pool, id, &params).await?;
    Ok(Json(job))
}

/// DELETE /api/jobs/:id — Delete a posting (applications cascade).
async fn delete_job(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = JobService::delete(&state.pool, id).await?;
    if deleted {
        Ok(Json(serde_json::json!({"deleted": true})))
    } else {
        Err(AppError::NotFound(format!("Job {} not found", id)))
    }
}
