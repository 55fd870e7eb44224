//! Job posting service — admin CRUD plus the student-facing listing.

use sqlx::PgPool;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::Job;

/// Service layer for job posting CRUD.
pub struct JobService;

/// Parameters for creating a job posting.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateJobParams {
    pub company_name: String,
    pub role: String,
    pub ctc: Option<String>,
    pub min_cgpa: Option<f64>,
    pub jd_link: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Parameters for updating a job posting. Omitted fields are unchanged.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpdateJobParams {
    pub company_name: Option<String>,
    pub role: Option<String>,
    pub ctc: Option<String>,
    pub min_cgpa: Option<f64>,
    pub jd_link: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl JobService {
    pub async fn create(pool: &PgPool, params: &CreateJobParams) -> Result<Job, AppError> {
        let job: Job = sqlx::query_as(
            r#"
            INSERT INTO jobs (id, company_name, role, ctc, min_cgpa, jd_link, description, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&params.company_name)
        .bind(&params.role)
        .bind(&params.ctc)
        .bind(params.min_cgpa.unwrap_or(0.0))
        .bind(&params.jd_link)
        .bind(&params.description)
        .bind(params.is_active)
        .fetch_one(pool)
        .await?;

        tracing::info!(job_id = %job.id, company = %job.company_name, "Job created");

        Ok(job)
    }

    pub async fn get(pool: &PgPool, job_id: Uuid) -> Result<Job, AppError> {
        let job: Job = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;
        Ok(job)
    }

    /// List jobs, newest first. Students see only active postings.
    pub async fn list(
        pool: &PgPool,
        only_active: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Job>, i64), AppError> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE ($1 = FALSE OR is_active)")
                .bind(only_active)
                .fetch_one(pool)
                .await?;

        let jobs: Vec<Job> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE ($1 = FALSE OR is_active)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(only_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok((jobs, total))
    }

    pub async fn update(
        pool: &PgPool,
        job_id: Uuid,
        params: &UpdateJobParams,
    ) -> Result<Job, AppError> {
        let existing = Self::get(pool, job_id).await?;

        let job: Job = sqlx::query_as(
            r#"
            UPDATE jobs
            SET company_name = $2, role = $3, ctc = $4, min_cgpa = $5,
                jd_link = $6, description = $7, is_active = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(params.company_name.as_ref().unwrap_or(&existing.company_name))
        .bind(params.role.as_ref().unwrap_or(&existing.role))
        .bind(params.ctc.as_ref().or(existing.ctc.as_ref()))
        .bind(params.min_cgpa.unwrap_or(existing.min_cgpa))
        .bind(params.jd_link.as_ref().or(existing.jd_link.as_ref()))
        .bind(params.description.as_ref().or(existing.description.as_ref()))
        .bind(params.is_active.unwrap_or(existing.is_active))
        .fetch_one(pool)
        .await?;

        tracing::info!(job_id = %job_id, "Job updated");

        Ok(job)
    }

    /// Delete a job posting. Returns true if it was deleted. Applications
    /// cascade with the row.
    pub async fn delete(pool: &PgPool, job_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(job_id = %job_id, "Job deleted");
        }

        Ok(deleted)
    }
}
