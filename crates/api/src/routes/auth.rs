//! Authentication routes — registration and email/password login.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::Role;

use crate::middleware::auth::{encode_jwt, hash_password, verify_password};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Request body for registration. Students must also provide `full_name`
/// and `branch`; the remaining profile fields are optional.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub branch: Option<String>,
    pub department: Option<String>,
    pub cgpa: Option<f64>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_id: Uuid,
    pub role: Role,
}

/// POST /api/auth/register — create a user, plus a profile for students.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("email and password are required".to_string()));
    }

    let (full_name, branch) = if req.role == Role::Student {
        match (&req.full_name, &req.branch) {
            (Some(name), Some(branch)) if !name.is_empty() && !branch.is_empty() => {
                (name.clone(), branch.clone())
            }
            _ => {
                return Err(AppError::Validation(
                    "Students must provide full_name and branch".to_string(),
                ));
            }
        }
    } else {
        (String::new(), String::new())
    };

    let user_id = Uuid::new_v4();
    let password_hash = hash_password(&req.password);

    let mut tx = state.pool.begin().await?;

    let inserted: Result<(DateTime<Utc>,), sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING created_at
        "#,
    )
    .bind(user_id)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(req.role)
    .fetch_one(&mut *tx)
    .await;

    let (created_at,) = inserted.map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Validation("Email already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    if req.role == Role::Student {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, full_name, branch, department, cgpa, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(&full_name)
        .bind(&branch)
        .bind(&req.department)
        .bind(req.cgpa)
        .bind(&req.phone)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(user_id = %user_id, role = %req.role, "User registered");

    Ok(Json(RegisterResponse {
        id: user_id,
        email: req.email,
        role: req.role,
        created_at,
    }))
}

/// POST /api/auth/login — verify credentials and return a role-bearing JWT.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let row: Option<(Uuid, String, Role)> =
        sqlx::query_as("SELECT id, password_hash, role FROM users WHERE email = $1")
            .bind(&req.email)
            .fetch_optional(&state.pool)
            .await?;

    let Some((user_id, password_hash, role)) = row else {
        return Err(AppError::Auth("Invalid email or password".to_string()));
    };

    if !verify_password(&req.password, &password_hash) {
        return Err(AppError::Auth("Invalid email or password".to_string()));
    }

    let token = encode_jwt(
        user_id,
        role,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(user_id = %user_id, "User authenticated");

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer",
        user_id,
        role,
    }))
}
