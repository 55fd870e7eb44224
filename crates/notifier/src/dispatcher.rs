//! Campaign dispatch queues and execution workers.
//!
//! `start`/`retry` enqueue a [`DispatchJob`]; a dedicated worker task per
//! channel drains its queue one campaign at a time, so the triggering
//! request returns immediately and pacing sleeps never block request
//! handling. Same-channel campaigns serialize behind one provider, while
//! channels run independently of each other. Workers reach the database
//! through their own pool handle, independent of any request-scoped work.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;

use placement_common::config::AppConfig;
use placement_common::error::AppError;
use placement_common::types::{Campaign, CampaignStatus, Channel, DeliveryLog, DeliveryStatus};
use placement_engine::template;

use crate::email::ResendEmailProvider;
use crate::provider::{NotificationProvider, Recipient, RenderedMessage};
use crate::voice::{self, TwilioVoiceProvider};
use crate::whatsapp::TwilioWhatsAppProvider;

/// A unit of background work: drive one campaign's pending logs.
#[derive(Debug, Clone, Copy)]
pub struct DispatchJob {
    pub campaign_id: Uuid,
    pub channel: Channel,
}

/// One adapter per channel, built once at startup.
pub struct ProviderSet {
    voice: Arc<dyn NotificationProvider>,
    email: Arc<dyn NotificationProvider>,
    whatsapp: Arc<dyn NotificationProvider>,
}

impl ProviderSet {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            voice: Arc::new(TwilioVoiceProvider::new(config)),
            email: Arc::new(ResendEmailProvider::new(config)),
            whatsapp: Arc::new(TwilioWhatsAppProvider::new(config)),
        }
    }

    /// Assemble a set from explicit adapters. Tests use this to substitute
    /// in-memory providers.
    pub fn new(
        voice: Arc<dyn NotificationProvider>,
        email: Arc<dyn NotificationProvider>,
        whatsapp: Arc<dyn NotificationProvider>,
    ) -> Self {
        Self {
            voice,
            email,
            whatsapp,
        }
    }

    pub fn get(&self, channel: Channel) -> &Arc<dyn NotificationProvider> {
        match channel {
            Channel::Voice => &self.voice,
            Channel::Email => &self.email,
            Channel::Whatsapp => &self.whatsapp,
        }
    }
}

/// Fixed inter-send delays and the rate-limit backoff.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub voice: Duration,
    pub email: Duration,
    pub whatsapp: Duration,
    pub rate_limit_backoff: Duration,
}

impl Pacing {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            voice: Duration::from_millis(config.voice_send_delay_ms),
            email: Duration::from_millis(config.email_send_delay_ms),
            whatsapp: Duration::from_millis(config.whatsapp_send_delay_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
        }
    }

    pub fn delay_for(&self, channel: Channel) -> Duration {
        match channel {
            Channel::Voice => self.voice,
            Channel::Email => self.email,
            Channel::Whatsapp => self.whatsapp,
        }
    }
}

/// Handle for enqueuing dispatch jobs. Cheap to clone; lives in the API
/// state.
#[derive(Clone)]
pub struct Dispatcher {
    voice_tx: mpsc::Sender<DispatchJob>,
    email_tx: mpsc::Sender<DispatchJob>,
    whatsapp_tx: mpsc::Sender<DispatchJob>,
}

impl Dispatcher {
    /// Spawn one worker task per channel and return the enqueue handle.
    pub fn spawn(pool: PgPool, providers: Arc<ProviderSet>, config: &AppConfig) -> Self {
        let pacing = Pacing::from_config(config);

        let spawn_worker = |channel: Channel| {
            let (tx, mut rx) = mpsc::channel::<DispatchJob>(config.dispatch_queue_depth);
            let pool = pool.clone();
            let provider = providers.get(channel).clone();
            let pacing = pacing.clone();

            tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    if let Err(e) = run_campaign(&pool, provider.as_ref(), &pacing, job).await {
                        tracing::error!(
                            campaign_id = %job.campaign_id,
                            channel = %job.channel,
                            error = %e,
                            "Campaign dispatch failed"
                        );
                    }
                }
                tracing::info!(channel = %channel, "Dispatch worker stopped");
            });

            tx
        };

        Self {
            voice_tx: spawn_worker(Channel::Voice),
            email_tx: spawn_worker(Channel::Email),
            whatsapp_tx: spawn_worker(Channel::Whatsapp),
        }
    }

    pub async fn enqueue(&self, job: DispatchJob) -> Result<(), AppError> {
        let tx = match job.channel {
            Channel::Voice => &self.voice_tx,
            Channel::Email => &self.email_tx,
            Channel::Whatsapp => &self.whatsapp_tx,
        };
        tx.send(job)
            .await
            .map_err(|_| AppError::Internal("Dispatch queue is closed".to_string()))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecipientRow {
    id: Uuid,
    email: String,
    full_name: Option<String>,
    phone: Option<String>,
    branch: Option<String>,
    cgpa: Option<f64>,
}

/// Drive one campaign's pending logs to a resolved state.
///
/// Individual recipient failures are recorded on their log and never abort
/// the batch; only database errors bubble out.
pub async fn run_campaign(
    pool: &PgPool,
    provider: &dyn NotificationProvider,
    pacing: &Pacing,
    job: DispatchJob,
) -> Result<(), AppError> {
    let campaign: Option<Campaign> =
        sqlx::query_as("SELECT * FROM campaigns WHERE id = $1 AND channel = $2")
            .bind(job.campaign_id)
            .bind(job.channel)
            .fetch_optional(pool)
            .await?;

    let Some(campaign) = campaign else {
        tracing::warn!(campaign_id = %job.campaign_id, "Dispatch job for missing campaign, skipping");
        return Ok(());
    };
    if campaign.status != CampaignStatus::Running {
        tracing::warn!(
            campaign_id = %campaign.id,
            status = %campaign.status,
            "Dispatch job for non-running campaign, skipping"
        );
        return Ok(());
    }

    let logs: Vec<DeliveryLog> = sqlx::query_as(
        r#"
        SELECT * FROM delivery_logs
        WHERE campaign_id = $1 AND status = 'PENDING'
        ORDER BY created_at
        "#,
    )
    .bind(campaign.id)
    .fetch_all(pool)
    .await?;

    tracing::info!(
        campaign_id = %campaign.id,
        channel = %campaign.channel,
        pending = logs.len(),
        "Campaign dispatch started"
    );

    for log in &logs {
        let attempted = process_log(pool, provider, pacing, &campaign, log).await?;
        if attempted {
            tokio::time::sleep(pacing.delay_for(campaign.channel)).await;
        }
    }

    // Mixed SENT/FAILED outcomes still complete the campaign; only
    // unresolved logs hold it open.
    let (remaining,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM delivery_logs WHERE campaign_id = $1 AND status IN ('PENDING', 'SENDING')",
    )
    .bind(campaign.id)
    .fetch_one(pool)
    .await?;

    if remaining == 0 {
        let completed = sqlx::query(
            "UPDATE campaigns SET status = 'COMPLETED' WHERE id = $1 AND status = 'RUNNING'",
        )
        .bind(campaign.id)
        .execute(pool)
        .await?;

        if completed.rows_affected() > 0 {
            tracing::info!(campaign_id = %campaign.id, "Campaign completed");
        }
    }

    Ok(())
}

/// Resolve, render and send one delivery log. Returns whether a provider
/// call was made (pacing applies only to actual sends).
async fn process_log(
    pool: &PgPool,
    provider: &dyn NotificationProvider,
    pacing: &Pacing,
    campaign: &Campaign,
    log: &DeliveryLog,
) -> Result<bool, AppError> {
    let row: Option<RecipientRow> = sqlx::query_as(
        r#"
        SELECT u.id, u.email, p.full_name, p.phone, p.branch, p.cgpa
        FROM users u
        LEFT JOIN profiles p ON p.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(log.student_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        fail_log(pool, log.id, "Recipient record not found").await?;
        return Ok(false);
    };

    let needs_phone = matches!(campaign.channel, Channel::Voice | Channel::Whatsapp);
    if needs_phone && row.phone.is_none() {
        fail_log(pool, log.id, "Student phone not found").await?;
        return Ok(false);
    }

    let vars = template::recipient_vars(
        row.full_name.as_deref().unwrap_or("Student"),
        &row.email,
        row.branch.as_deref().unwrap_or_default(),
        row.cgpa,
    );
    let message = RenderedMessage {
        subject: campaign.subject.as_deref().map(|s| template::render(s, &vars)),
        body: template::render(&campaign.body_template, &vars),
    };
    let recipient = Recipient {
        delivery_log_id: log.id,
        student_id: row.id,
        full_name: row.full_name.unwrap_or_else(|| "Student".to_string()),
        email: row.email,
        phone: row.phone,
    };

    if campaign.channel == Channel::Email {
        sqlx::query(
            "UPDATE delivery_logs SET status = 'SENDING', updated_at = NOW() WHERE id = $1",
        )
        .bind(log.id)
        .execute(pool)
        .await?;
    }

    let mut outcome = provider.send(&recipient, &message).await;

    if let Err(ref e) = outcome
        && e.rate_limited
    {
        tracing::info!(
            delivery_log_id = %log.id,
            backoff_ms = pacing.rate_limit_backoff.as_millis() as u64,
            "Provider rate limit hit, retrying once"
        );
        tokio::time::sleep(pacing.rate_limit_backoff).await;
        outcome = provider.send(&recipient, &message).await;
    }

    match outcome {
        Ok(provider_sid) => {
            // Voice resolves later through status callbacks; message
            // channels are terminal at submission.
            let status = match campaign.channel {
                Channel::Voice => DeliveryStatus::InProgress,
                Channel::Email | Channel::Whatsapp => DeliveryStatus::Sent,
            };
            let stamp_sent = status == DeliveryStatus::Sent;

            sqlx::query(
                r#"
                UPDATE delivery_logs
                SET status = $2, provider_sid = $3,
                    sent_at = CASE WHEN $4 THEN NOW() ELSE sent_at END,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(log.id)
            .bind(status)
            .bind(&provider_sid)
            .bind(stamp_sent)
            .execute(pool)
            .await?;

            tracing::debug!(
                delivery_log_id = %log.id,
                provider_sid = %provider_sid,
                status = %status,
                "Delivery recorded"
            );
        }
        Err(e) => {
            fail_log(pool, log.id, &e.detail).await?;
        }
    }

    Ok(true)
}

async fn fail_log(pool: &PgPool, log_id: Uuid, error: &str) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE delivery_logs SET status = 'FAILED', error_detail = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(log_id)
    .bind(error)
    .execute(pool)
    .await?;

    tracing::warn!(delivery_log_id = %log_id, error, "Delivery failed");

    Ok(())
}

/// Pull call state from the provider for a voice campaign's unresolved logs
/// and reconcile it into the delivery logs. Returns how many logs changed.
pub async fn sync_voice_statuses(
    pool: &PgPool,
    provider: &dyn NotificationProvider,
    campaign_id: Uuid,
) -> Result<u32, AppError> {
    let logs: Vec<DeliveryLog> = sqlx::query_as(
        r#"
        SELECT * FROM delivery_logs
        WHERE campaign_id = $1
          AND provider_sid IS NOT NULL
          AND status IN ('IN_PROGRESS', 'BUSY', 'NO_ANSWER')
        "#,
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    let mut updated = 0u32;
    for log in logs {
        let Some(sid) = log.provider_sid.as_deref() else {
            continue;
        };
        match provider.fetch_status(sid).await {
            Ok(raw) => {
                let Some(incoming) = voice::map_call_status(&raw) else {
                    continue;
                };
                let next = voice::reconcile_delivery_status(log.status, incoming);
                if next != log.status {
                    sqlx::query(
                        "UPDATE delivery_logs SET status = $2, updated_at = NOW() WHERE id = $1",
                    )
                    .bind(log.id)
                    .bind(next)
                    .execute(pool)
                    .await?;
                    updated += 1;
                }
            }
            Err(e) => {
                tracing::warn!(
                    delivery_log_id = %log.id,
                    error = %e,
                    "Call status fetch failed"
                );
            }
        }
    }

    Ok(updated)
}
