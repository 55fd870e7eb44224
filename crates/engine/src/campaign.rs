//! Campaign service — CRUD for campaigns and their delivery logs.
//!
//! One service covers all three channels; the rows are structurally
//! identical and differ only in the retryable-status set and the
//! channel-specific delivery semantics owned by the notifier crate.
//!
//! Status flips that guard against concurrent writers (`mark_running`,
//! completion) are conditional updates checked via rows-affected, not
//! read-then-write.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use placement_common::error::AppError;
use placement_common::types::{Campaign, CampaignStatus, Channel, DeliveryStatus};

/// Service layer for campaign operations.
pub struct CampaignService;

/// Parameters for creating (or fully updating) a campaign.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateCampaignParams {
    pub title: String,
    /// Email-only subject line; ignored for other channels.
    pub subject: Option<String>,
    pub body_template: String,
    pub student_ids: Vec<Uuid>,
}

/// Campaign row plus delivery counters.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct CampaignSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub campaign: Campaign,
    pub total_recipients: i64,
    pub delivered: i64,
    pub failed: i64,
}

/// Delivery log row joined with a recipient snapshot for the detail view.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct DeliveryLogView {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: Option<String>,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub status: DeliveryStatus,
    pub provider_sid: Option<String>,
    pub error_detail: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub duration_secs: Option<f64>,
}

/// Statuses the retry operation resets to PENDING. Voice additionally
/// recovers calls stuck in transient provider states.
pub fn retryable_statuses(channel: Channel) -> &'static [DeliveryStatus] {
    match channel {
        Channel::Voice => &[
            DeliveryStatus::Failed,
            DeliveryStatus::InProgress,
            DeliveryStatus::Busy,
            DeliveryStatus::NoAnswer,
        ],
        Channel::Email | Channel::Whatsapp => &[DeliveryStatus::Failed],
    }
}

const SUMMARY_QUERY: &str = r#"
    SELECT c.*,
           COUNT(l.id) AS total_recipients,
           COUNT(l.id) FILTER (WHERE l.status IN ('SENT', 'COMPLETED')) AS delivered,
           COUNT(l.id) FILTER (WHERE l.status = 'FAILED') AS failed
    FROM campaigns c
    LEFT JOIN delivery_logs l ON l.campaign_id = c.id
"#;

impl CampaignService {
    /// Create a DRAFT campaign with one PENDING delivery log per recipient.
    pub async fn create(
        pool: &PgPool,
        channel: Channel,
        params: &CreateCampaignParams,
    ) -> Result<Campaign, AppError> {
        if channel == Channel::Email && params.subject.as_deref().unwrap_or("").is_empty() {
            return Err(AppError::Validation(
                "Email campaigns require a subject".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let campaign: Campaign = sqlx::query_as(
            r#"
            INSERT INTO campaigns (id, channel, title, subject, body_template, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(channel)
        .bind(&params.title)
        .bind(&params.subject)
        .bind(&params.body_template)
        .bind(CampaignStatus::Draft)
        .fetch_one(&mut *tx)
        .await?;

        for student_id in &params.student_ids {
            sqlx::query(
                r#"
                INSERT INTO delivery_logs (id, campaign_id, student_id, status)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(campaign.id)
            .bind(student_id)
            .bind(DeliveryStatus::Pending)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            campaign_id = %campaign.id,
            channel = %channel,
            recipients = params.student_ids.len(),
            "Campaign created"
        );

        Ok(campaign)
    }

    /// Fetch a campaign, scoped to its channel.
    pub async fn get(pool: &PgPool, channel: Channel, campaign_id: Uuid) -> Result<Campaign, AppError> {
        let campaign: Campaign =
            sqlx::query_as("SELECT * FROM campaigns WHERE id = $1 AND channel = $2")
                .bind(campaign_id)
                .bind(channel)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found", campaign_id)))?;
        Ok(campaign)
    }

    /// All campaigns on a channel with delivery counters, newest first.
    pub async fn list(pool: &PgPool, channel: Channel) -> Result<Vec<CampaignSummary>, AppError> {
        let query = format!(
            "{SUMMARY_QUERY} WHERE c.channel = $1 GROUP BY c.id ORDER BY c.created_at DESC"
        );
        let campaigns: Vec<CampaignSummary> = sqlx::query_as(&query)
            .bind(channel)
            .fetch_all(pool)
            .await?;
        Ok(campaigns)
    }

    /// One campaign with counters, or NotFound.
    pub async fn summary(
        pool: &PgPool,
        channel: Channel,
        campaign_id: Uuid,
    ) -> Result<CampaignSummary, AppError> {
        let query = format!("{SUMMARY_QUERY} WHERE c.id = $1 AND c.channel = $2 GROUP BY c.id");
        let summary: CampaignSummary = sqlx::query_as(&query)
            .bind(campaign_id)
            .bind(channel)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found", campaign_id)))?;
        Ok(summary)
    }

    /// Delivery logs with recipient snapshots for the detail view.
    pub async fn delivery_logs(
        pool: &PgPool,
        campaign_id: Uuid,
    ) -> Result<Vec<DeliveryLogView>, AppError> {
        let logs: Vec<DeliveryLogView> = sqlx::query_as(
            r#"
            SELECT l.id, l.student_id, p.full_name AS student_name,
                   u.email AS student_email, p.phone AS student_phone,
                   l.status, l.provider_sid, l.error_detail, l.sent_at,
                   l.recording_url, l.transcript, l.duration_secs
            FROM delivery_logs l
            JOIN users u ON u.id = l.student_id
            LEFT JOIN profiles p ON p.user_id = l.student_id
            WHERE l.campaign_id = $1
            ORDER BY l.created_at
            "#,
        )
        .bind(campaign_id)
        .fetch_all(pool)
        .await?;
        Ok(logs)
    }

    /// Update campaign metadata; while DRAFT the recipient set is reset to
    /// the given list (logs deleted and recreated PENDING).
    pub async fn update(
        pool: &PgPool,
        channel: Channel,
        campaign_id: Uuid,
        params: &CreateCampaignParams,
    ) -> Result<Campaign, AppError> {
        let existing = Self::get(pool, channel, campaign_id).await?;

        let mut tx = pool.begin().await?;

        let campaign: Campaign = sqlx::query_as(
            r#"
            UPDATE campaigns
            SET title = $2, subject = $3, body_template = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .bind(&params.title)
        .bind(&params.subject)
        .bind(&params.body_template)
        .fetch_one(&mut *tx)
        .await?;

        if existing.status == CampaignStatus::Draft {
            sqlx::query("DELETE FROM delivery_logs WHERE campaign_id = $1")
                .bind(campaign_id)
                .execute(&mut *tx)
                .await?;

            for student_id in &params.student_ids {
                sqlx::query(
                    r#"
                    INSERT INTO delivery_logs (id, campaign_id, student_id, status)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(campaign_id)
                .bind(student_id)
                .bind(DeliveryStatus::Pending)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(campaign_id = %campaign_id, "Campaign updated");

        Ok(campaign)
    }

    /// Delete a campaign and (by cascade) its logs. Completed campaigns are
    /// kept for the record.
    pub async fn delete(pool: &PgPool, channel: Channel, campaign_id: Uuid) -> Result<(), AppError> {
        let campaign = Self::get(pool, channel, campaign_id).await?;
        if campaign.status == CampaignStatus::Completed {
            return Err(AppError::Validation(
                "Cannot delete a completed campaign".to_string(),
            ));
        }

        sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(campaign_id)
            .execute(pool)
            .await?;

        tracing::info!(campaign_id = %campaign_id, "Campaign deleted");

        Ok(())
    }

    /// Compare-and-swap the campaign into RUNNING. Returns false when it was
    /// already RUNNING, which callers surface as a start rejection.
    pub async fn mark_running(pool: &PgPool, campaign_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE campaigns SET status = $2 WHERE id = $1 AND status <> $2",
        )
        .bind(campaign_id)
        .bind(CampaignStatus::Running)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset this channel's retryable logs to PENDING, clearing prior
    /// provider artifacts. Returns how many logs were reset.
    pub async fn reset_retryable(
        pool: &PgPool,
        channel: Channel,
        campaign_id: Uuid,
    ) -> Result<u64, AppError> {
        let statuses: Vec<String> = retryable_statuses(channel)
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE delivery_logs
            SET status = 'PENDING', provider_sid = NULL, error_detail = NULL,
                sent_at = NULL, recording_url = NULL, transcript = NULL,
                duration_secs = NULL, updated_at = NOW()
            WHERE campaign_id = $1 AND status = ANY($2)
            "#,
        )
        .bind(campaign_id)
        .bind(&statuses)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Cancel a campaign: flip it to CANCELLED and fail all still-PENDING
    /// logs. A worker already mid-flight is not interrupted; rows it has
    /// moved past PENDING keep their outcome.
    pub async fn cancel(
        pool: &PgPool,
        channel: Channel,
        campaign_id: Uuid,
    ) -> Result<Campaign, AppError> {
        let _ = Self::get(pool, channel, campaign_id).await?;

        let mut tx = pool.begin().await?;

        let campaign: Campaign =
            sqlx::query_as("UPDATE campaigns SET status = $2 WHERE id = $1 RETURNING *")
                .bind(campaign_id)
                .bind(CampaignStatus::Cancelled)
                .fetch_one(&mut *tx)
                .await?;

        let failed = sqlx::query(
            r#"
            UPDATE delivery_logs
            SET status = 'FAILED', error_detail = 'Campaign cancelled', updated_at = NOW()
            WHERE campaign_id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(campaign_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            campaign_id = %campaign_id,
            cancelled_pending = failed.rows_affected(),
            "Campaign cancelled"
        );

        Ok(campaign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_retryable_includes_stuck_states() {
        let set = retryable_statuses(Channel::Voice);
        assert!(set.contains(&DeliveryStatus::Failed));
        assert!(set.contains(&DeliveryStatus::InProgress));
        assert!(set.contains(&DeliveryStatus::Busy));
        assert!(set.contains(&DeliveryStatus::NoAnswer));
        assert!(!set.contains(&DeliveryStatus::Completed));
    }

    #[test]
    fn test_message_channels_only_retry_failed() {
        for channel in [Channel::Email, Channel::Whatsapp] {
            assert_eq!(retryable_statuses(channel), &[DeliveryStatus::Failed]);
        }
    }
}
