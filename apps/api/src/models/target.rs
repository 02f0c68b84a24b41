use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user-defined profile of desired roles/seniority/keywords scored against jobs.
/// Immutable except via explicit operator upsert (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TargetRow {
    pub id: Uuid,
    pub name: String,
    pub primary_role: String,
    pub seniority_pref: Option<String>,
    pub location_pref: Option<String>,
    pub must_keywords: Vec<String>,
    pub nice_keywords: Vec<String>,
    pub reject_keywords: Vec<String>,
    pub rubric_profile: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `rubric_profile` values (spec Glossary: "Rubric profile").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricProfile {
    Auto,
    PmV1,
    TargetGenericV1,
}

impl RubricProfile {
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "pm_v1" => RubricProfile::PmV1,
            "target_generic_v1" => RubricProfile::TargetGenericV1,
            _ => RubricProfile::Auto,
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            RubricProfile::Auto => "auto",
            RubricProfile::PmV1 => "pm_v1",
            RubricProfile::TargetGenericV1 => "target_generic_v1",
        }
    }
}

/// Optional `(job_key → profile_id)` override resolved before falling back to the
/// primary resume profile (spec §3 "Job-Profile Preference").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobProfilePreferenceRow {
    pub job_key: String,
    pub profile_id: Uuid,
    pub created_at: DateTime<Utc>,
}
