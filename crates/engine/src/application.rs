//! Application service — persistence and side effects around the status
//! state machine.
//!
//! Every mutating operation validates against [`crate::status`] first and
//! only then updates the row, so a rejected attempt never partially mutates
//! state. Student-initiated operations verify ownership before touching the
//! state machine and surface a `Forbidden` error distinct from the
//! invalid-transition error.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::{Application, ApplicationStatus, Role};

use crate::status;

/// Service layer for application lifecycle operations.
pub struct ApplicationService;

/// Admin listing row: application plus a snapshot of the applicant.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ApplicationWithStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub student_email: String,
    pub student_name: Option<String>,
}

impl ApplicationService {
    /// Student applies to an active job. Unique per (job, student).
    pub async fn apply(pool: &PgPool, student_id: Uuid, job_id: Uuid) -> Result<Application, AppError> {
        let is_active: Option<(bool,)> = sqlx::query_as("SELECT is_active FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await?;

        match is_active {
            None => return Err(AppError::NotFound(format!("Job {} not found", job_id))),
            Some((false,)) => {
                return Err(AppError::Validation("Cannot apply to inactive job".to_string()));
            }
            Some((true,)) => {}
        }

        let result: Result<Application, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO applications (id, job_id, student_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(student_id)
        .bind(ApplicationStatus::Applied)
        .fetch_one(pool)
        .await;

        let app = result.map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::Validation("You have already applied to this job".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        tracing::info!(
            application_id = %app.id,
            job_id = %job_id,
            student_id = %student_id,
            "Application created"
        );

        Ok(app)
    }

    /// Fetch an application or fail with NotFound.
    pub async fn get(pool: &PgPool, application_id: Uuid) -> Result<Application, AppError> {
        let app: Application = sqlx::query_as("SELECT * FROM applications WHERE id = $1")
            .bind(application_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", application_id)))?;

        Ok(app)
    }

    /// Fetch an application, enforcing that `student_id` owns it.
    pub async fn get_owned(
        pool: &PgPool,
        application_id: Uuid,
        student_id: Uuid,
    ) -> Result<Application, AppError> {
        let app = Self::get(pool, application_id).await?;
        if app.student_id != student_id {
            return Err(AppError::Forbidden(
                "You can only act on your own applications".to_string(),
            ));
        }
        Ok(app)
    }

    /// A student's own applications, newest first.
    pub async fn list_by_student(
        pool: &PgPool,
        student_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Application>, i64), AppError> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM applications WHERE student_id = $1")
                .bind(student_id)
                .fetch_one(pool)
                .await?;

        let apps: Vec<Application> = sqlx::query_as(
            r#"
            SELECT * FROM applications
            WHERE student_id = $1
            ORDER BY applied_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(student_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok((apps, total))
    }

    /// Admin view of a job's applications, with optional status filter.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: Uuid,
        status_filter: Option<ApplicationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ApplicationWithStudent>, i64), AppError> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Job {} not found", job_id)));
        }

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM applications
            WHERE job_id = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(job_id)
        .bind(status_filter.map(|s| s.to_string()))
        .fetch_one(pool)
        .await?;

        let apps: Vec<ApplicationWithStudent> = sqlx::query_as(
            r#"
            SELECT a.*, u.email AS student_email, p.full_name AS student_name
            FROM applications a
            JOIN users u ON u.id = a.student_id
            LEFT JOIN profiles p ON p.user_id = a.student_id
            WHERE a.job_id = $1 AND ($2::text IS NULL OR a.status = $2)
            ORDER BY a.applied_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(job_id)
        .bind(status_filter.map(|s| s.to_string()))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok((apps, total))
    }

    /// Admin table-driven transition (select, start-process, schedule-interview,
    /// shortlist). Offer release and reject have their own entry points.
    pub async fn admin_transition(
        pool: &PgPool,
        application_id: Uuid,
        target: ApplicationStatus,
    ) -> Result<Application, AppError> {
        let app = Self::get(pool, application_id).await?;
        status::validate_transition(Role::Admin, app.status, target)?;

        let updated = Self::set_status(pool, application_id, target).await?;

        tracing::info!(
            application_id = %application_id,
            from = %app.status,
            to = %target,
            "Application status updated"
        );

        Ok(updated)
    }

    /// Release an offer: SHORTLISTED → OFFER_RELEASED, stamping the release
    /// time and response deadline.
    pub async fn release_offer(
        pool: &PgPool,
        application_id: Uuid,
        deadline_days: i64,
    ) -> Result<Application, AppError> {
        let app = Self::get(pool, application_id).await?;
        status::validate_transition(Role::Admin, app.status, ApplicationStatus::OfferReleased)?;

        let now = Utc::now();
        let deadline = now + Duration::days(deadline_days);

        let updated: Application = sqlx::query_as(
            r#"
            UPDATE applications
            SET status = $2, offer_released_at = $3, offer_deadline = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(ApplicationStatus::OfferReleased)
        .bind(now)
        .bind(deadline)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            application_id = %application_id,
            deadline_days,
            offer_deadline = %deadline,
            "Offer released"
        );

        Ok(updated)
    }

    /// Admin reject override, allowed from any non-terminal state.
    pub async fn reject(pool: &PgPool, application_id: Uuid) -> Result<Application, AppError> {
        let app = Self::get(pool, application_id).await?;
        status::validate_reject(app.status)?;

        let updated = Self::set_status(pool, application_id, ApplicationStatus::Rejected).await?;

        tracing::info!(
            application_id = %application_id,
            from = %app.status,
            "Application rejected"
        );

        Ok(updated)
    }

    /// Student withdraws an APPLIED application.
    pub async fn withdraw(
        pool: &PgPool,
        application_id: Uuid,
        student_id: Uuid,
    ) -> Result<Application, AppError> {
        let app = Self::get_owned(pool, application_id, student_id).await?;
        status::validate_transition(Role::Student, app.status, ApplicationStatus::Withdrawn)?;

        let updated = Self::set_status(pool, application_id, ApplicationStatus::Withdrawn).await?;

        tracing::info!(application_id = %application_id, "Application withdrawn");

        Ok(updated)
    }

    /// Student accepts a released offer.
    ///
    /// The deadline is enforced strictly at accept time. The status update
    /// and the denormalized `profiles.is_placed` flag are committed in one
    /// transaction so the projection cannot drift from the status.
    pub async fn accept_offer(
        pool: &PgPool,
        application_id: Uuid,
        student_id: Uuid,
    ) -> Result<Application, AppError> {
        let app = Self::get_owned(pool, application_id, student_id).await?;
        status::validate_transition(Role::Student, app.status, ApplicationStatus::Placed)?;

        let now = Utc::now();
        if let Some(deadline) = app.offer_deadline
            && now > deadline
        {
            return Err(AppError::DeadlinePassed(
                "Offer deadline has passed. Please contact the placement office.".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let updated: Application = sqlx::query_as(
            r#"
            UPDATE applications
            SET status = $2, offer_responded_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(ApplicationStatus::Placed)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE profiles SET is_placed = TRUE WHERE user_id = $1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            application_id = %application_id,
            student_id = %student_id,
            "Offer accepted, student placed"
        );

        Ok(updated)
    }

    /// Student declines a released offer.
    pub async fn decline_offer(
        pool: &PgPool,
        application_id: Uuid,
        student_id: Uuid,
    ) -> Result<Application, AppError> {
        let app = Self::get_owned(pool, application_id, student_id).await?;
        status::validate_transition(Role::Student, app.status, ApplicationStatus::OfferDeclined)?;

        let updated: Application = sqlx::query_as(
            r#"
            UPDATE applications
            SET status = $2, offer_responded_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(ApplicationStatus::OfferDeclined)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        tracing::info!(application_id = %application_id, "Offer declined");

        Ok(updated)
    }

    async fn set_status(
        pool: &PgPool,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application, AppError> {
        let updated: Application =
            sqlx::query_as("UPDATE applications SET status = $2 WHERE id = $1 RETURNING *")
                .bind(application_id)
                .bind(status)
                .fetch_one(pool)
                .await?;
        Ok(updated)
    }
}
