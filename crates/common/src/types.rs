use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actor role, stored uppercase in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "STUDENT"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Application pipeline status. Transition rules live in the engine crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Applied,
    Selected,
    InProcess,
    InterviewScheduled,
    Shortlisted,
    OfferReleased,
    Placed,
    OfferDeclined,
    Withdrawn,
    Rejected,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Selected => "SELECTED",
            ApplicationStatus::InProcess => "IN_PROCESS",
            ApplicationStatus::InterviewScheduled => "INTERVIEW_SCHEDULED",
            ApplicationStatus::Shortlisted => "SHORTLISTED",
            ApplicationStatus::OfferReleased => "OFFER_RELEASED",
            ApplicationStatus::Placed => "PLACED",
            ApplicationStatus::OfferDeclined => "OFFER_DECLINED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
            ApplicationStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Running,
    Completed,
    Cancelled,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CampaignStatus::Draft => "DRAFT",
            CampaignStatus::Running => "RUNNING",
            CampaignStatus::Completed => "COMPLETED",
            CampaignStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Per-recipient delivery status.
///
/// `Sending` is an email-only intermediate state; `InProgress`, `Busy` and
/// `NoAnswer` come from voice call state callbacks. `Sent` is terminal for
/// email/whatsapp, `Completed` for voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Sending,
    Sent,
    InProgress,
    Completed,
    Busy,
    NoAnswer,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Sending => "SENDING",
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::InProgress => "IN_PROGRESS",
            DeliveryStatus::Completed => "COMPLETED",
            DeliveryStatus::Busy => "BUSY",
            DeliveryStatus::NoAnswer => "NO_ANSWER",
            DeliveryStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Notification channel, stored lowercase in `campaigns.channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Voice,
    Email,
    Whatsapp,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Voice => write!(f, "voice"),
            Channel::Email => write!(f, "email"),
            Channel::Whatsapp => write!(f, "whatsapp"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(Channel::Voice),
            "email" => Ok(Channel::Email),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(format!("unknown channel '{}'", other)),
        }
    }
}

/// A user in the system. `password_hash` never leaves the API layer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Student golden record, 1:1 with a STUDENT user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: String,
    pub cgpa: Option<f64>,
    pub branch: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub is_placed: bool,
}

/// A job posting.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub company_name: String,
    pub role: String,
    pub ctc: Option<String>,
    pub min_cgpa: f64,
    pub is_active: bool,
    pub jd_link: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A student's application to a job. Unique per (job, student).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub student_id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub offer_released_at: Option<DateTime<Utc>>,
    pub offer_deadline: Option<DateTime<Utc>>,
    pub offer_responded_at: Option<DateTime<Utc>>,
}

/// An outbound notification campaign. One row covers all three channels;
/// `subject` is only set for email.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub channel: Channel,
    pub title: String,
    pub subject: Option<String>,
    pub body_template: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
}

/// Per-recipient delivery record within a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryLog {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub student_id: Uuid,
    pub status: DeliveryStatus,
    pub provider_sid: Option<String>,
    pub error_detail: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub duration_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_db_encoding() {
        assert_eq!(ApplicationStatus::InterviewScheduled.to_string(), "INTERVIEW_SCHEDULED");
        assert_eq!(ApplicationStatus::OfferReleased.to_string(), "OFFER_RELEASED");
        assert_eq!(DeliveryStatus::NoAnswer.to_string(), "NO_ANSWER");
        assert_eq!(CampaignStatus::Cancelled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_channel_round_trip() {
        for channel in [Channel::Voice, Channel::Email, Channel::Whatsapp] {
            assert_eq!(channel.to_string().parse::<Channel>().unwrap(), channel);
        }
        assert!("telegram".parse::<Channel>().is_err());
    }
}
