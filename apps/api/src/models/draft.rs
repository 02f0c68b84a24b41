use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A résumé profile: basics, summary, experience, skills (spec §3 "Resume Profile").
/// One designated "primary" profile always exists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeProfileRow {
    pub id: Uuid,
    pub name: String,
    pub profile_json: Value,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The latest tailored application pack for a `(job_key, profile_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeDraftRow {
    pub id: Uuid,
    pub job_key: String,
    pub profile_id: Uuid,
    pub pack_json: Value,
    pub ats_json: Value,
    pub rr_export_json: Value,
    pub status: String,
    pub external_resume_ref: Option<String>,
    pub external_resume_status: Option<String>,
    pub external_resume_error: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_status: Option<String>,
    pub pdf_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Draft status (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    ContentReviewRequired,
    ReadyForExport,
    ReadyToApply,
    NeedsAi,
    Error,
}

impl DraftStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DraftStatus::ContentReviewRequired => "CONTENT_REVIEW_REQUIRED",
            DraftStatus::ReadyForExport => "READY_FOR_EXPORT",
            DraftStatus::ReadyToApply => "READY_TO_APPLY",
            DraftStatus::NeedsAi => "NEEDS_AI",
            DraftStatus::Error => "ERROR",
        }
    }
}

/// An immutable append-only snapshot of a draft's payload (spec §3, §4.7, §8).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeDraftVersionRow {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub version_no: i32,
    pub pack_json: Value,
    pub ats_json: Value,
    pub rr_export_json: Value,
    pub source_action: String,
    pub created_at: DateTime<Utc>,
}
