//! Student profile service.

use sqlx::PgPool;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::Profile;

/// Service layer for student profiles.
pub struct StudentService;

/// Student-editable profile fields. `is_placed` is deliberately absent —
/// it is driven by offer acceptance or the admin override.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpdateProfileParams {
    pub full_name: Option<String>,
    pub cgpa: Option<f64>,
    pub branch: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
}

/// Admin listing row with the per-student application count.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct StudentSummary {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub branch: String,
    pub department: Option<String>,
    pub cgpa: Option<f64>,
    pub phone: Option<String>,
    pub is_placed: bool,
    pub applications_count: i64,
}

/// Filters for the admin student listing.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StudentFilter {
    pub branch: Option<String>,
    pub department: Option<String>,
    pub is_placed: Option<bool>,
}

impl StudentService {
    pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Profile, AppError> {
        let profile: Profile = sqlx::query_as("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        Ok(profile)
    }

    pub async fn update_profile(
        pool: &PgPool,
        user_id: Uuid,
        params: &UpdateProfileParams,
    ) -> Result<Profile, AppError> {
        let existing = Self::get_profile(pool, user_id).await?;

        if let Some(cgpa) = params.cgpa
            && !(0.0..=10.0).contains(&cgpa)
        {
            return Err(AppError::Validation("cgpa must be between 0 and 10".to_string()));
        }

        let profile: Profile = sqlx::query_as(
            r#"
            UPDATE profiles
            SET full_name = $2, cgpa = $3, branch = $4, department = $5,
                phone = $6, resume_url = $7
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(params.full_name.as_ref().unwrap_or(&existing.full_name))
        .bind(params.cgpa.or(existing.cgpa))
        .bind(params.branch.as_ref().unwrap_or(&existing.branch))
        .bind(params.department.as_ref().or(existing.department.as_ref()))
        .bind(params.phone.as_ref().or(existing.phone.as_ref()))
        .bind(params.resume_url.as_ref().or(existing.resume_url.as_ref()))
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = %user_id, "Profile updated");

        Ok(profile)
    }

    /// Admin listing with filters and per-student application counts.
    pub async fn list(
        pool: &PgPool,
        filter: &StudentFilter,
    ) -> Result<Vec<StudentSummary>, AppError> {
        let students: Vec<StudentSummary> = sqlx::query_as(
            r#"
            SELECT p.user_id, p.full_name, u.email, p.branch, p.department,
                   p.cgpa, p.phone, p.is_placed,
                   COUNT(a.id) AS applications_count
            FROM profiles p
            JOIN users u ON u.id = p.user_id
            LEFT JOIN applications a ON a.student_id = p.user_id
            WHERE ($1::text IS NULL OR p.branch = $1)
              AND ($2::text IS NULL OR p.department = $2)
              AND ($3::boolean IS NULL OR p.is_placed = $3)
            GROUP BY p.user_id, p.full_name, u.email, p.branch, p.department,
                     p.cgpa, p.phone, p.is_placed
            ORDER BY p.full_name
            "#,
        )
        .bind(&filter.branch)
        .bind(&filter.department)
        .bind(filter.is_placed)
        .fetch_all(pool)
        .await?;

        Ok(students)
    }

    /// Admin override of the placement flag.
    pub async fn mark_placed(pool: &PgPool, user_id: Uuid) -> Result<Profile, AppError> {
        let existing = Self::get_profile(pool, user_id).await?;
        if existing.is_placed {
            return Err(AppError::Validation("Student is already marked as placed".to_string()));
        }

        let profile: Profile =
            sqlx::query_as("UPDATE profiles SET is_placed = TRUE WHERE user_id = $1 RETURNING *")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        tracing::info!(user_id = %user_id, "Student marked placed");

        Ok(profile)
    }
}
