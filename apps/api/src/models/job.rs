use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A resolved, scored job-opportunity record keyed by `job_key`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub job_key: String,
    pub job_url: String,
    pub source_domain: String,
    pub job_id: Option<String>,

    pub company: Option<String>,
    pub role_title: Option<String>,
    pub location: Option<String>,
    pub work_mode: Option<String>,
    pub seniority: Option<String>,
    pub experience_years_min: Option<i32>,
    pub experience_years_max: Option<i32>,

    pub must_keywords: Vec<String>,
    pub nice_keywords: Vec<String>,
    pub reject_keywords: Vec<String>,
    pub skills: Vec<String>,

    pub jd_text_clean: Option<String>,
    pub jd_source: String,
    pub fetch_status: String,
    pub fetch_debug: Value,

    pub primary_target_id: Option<Uuid>,
    pub score_must: Option<f64>,
    pub score_nice: Option<f64>,
    pub final_score: Option<i32>,
    pub reject_triggered: bool,
    pub reject_reasons: Vec<String>,
    pub reason_top_matches: Option<String>,

    pub status: String,
    pub system_status: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_scored_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Lifecycle status. Mirrors `jobs.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    New,
    LinkOnly,
    Scored,
    Shortlisted,
    ReadyToApply,
    Applied,
    Rejected,
    Archived,
}

impl JobStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            JobStatus::New => "NEW",
            JobStatus::LinkOnly => "LINK_ONLY",
            JobStatus::Scored => "SCORED",
            JobStatus::Shortlisted => "SHORTLISTED",
            JobStatus::ReadyToApply => "READY_TO_APPLY",
            JobStatus::Applied => "APPLIED",
            JobStatus::Rejected => "REJECTED",
            JobStatus::Archived => "ARCHIVED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(JobStatus::New),
            "LINK_ONLY" => Some(JobStatus::LinkOnly),
            "SCORED" => Some(JobStatus::Scored),
            "SHORTLISTED" => Some(JobStatus::Shortlisted),
            "READY_TO_APPLY" => Some(JobStatus::ReadyToApply),
            "APPLIED" => Some(JobStatus::Applied),
            "REJECTED" => Some(JobStatus::Rejected),
            "ARCHIVED" => Some(JobStatus::Archived),
            _ => None,
        }
    }

    /// Terminal statuses are never downgraded by ingestion or rescoring (spec §3, §8).
    pub fn is_terminal(s: &str) -> bool {
        matches!(s, "READY_TO_APPLY" | "APPLIED" | "REJECTED" | "ARCHIVED")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_match_spec_set() {
        assert!(JobStatus::is_terminal("READY_TO_APPLY"));
        assert!(JobStatus::is_terminal("APPLIED"));
        assert!(JobStatus::is_terminal("REJECTED"));
        assert!(JobStatus::is_terminal("ARCHIVED"));
        assert!(!JobStatus::is_terminal("NEW"));
        assert!(!JobStatus::is_terminal("SCORED"));
        assert!(!JobStatus::is_terminal("SHORTLISTED"));
        assert!(!JobStatus::is_terminal("LINK_ONLY"));
    }

    #[test]
    fn round_trips_through_db_str() {
        for s in [
            JobStatus::New,
            JobStatus::LinkOnly,
            JobStatus::Scored,
            JobStatus::Shortlisted,
            JobStatus::ReadyToApply,
            JobStatus::Applied,
            JobStatus::Rejected,
            JobStatus::Archived,
        ] {
            assert_eq!(JobStatus::from_db_str(s.as_db_str()), Some(s));
        }
    }
}
