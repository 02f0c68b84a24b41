use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row per `(job_key, requirement_text, requirement_type)` (spec §3 "Job Evidence").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobEvidenceRow {
    pub id: i64,
    pub job_key: String,
    pub requirement_text: String,
    pub requirement_type: String,
    pub evidence_text: Option<String>,
    pub evidence_source: String,
    pub confidence_score: i32,
    pub matched: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementType {
    Must,
    Nice,
    Reject,
    Constraint,
}

impl RequirementType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RequirementType::Must => "must",
            RequirementType::Nice => "nice",
            RequirementType::Reject => "reject",
            RequirementType::Constraint => "constraint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceSource {
    ResumeSummary,
    ResumeBullets,
    JdText,
    None,
}

impl EvidenceSource {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EvidenceSource::ResumeSummary => "resume_summary",
            EvidenceSource::ResumeBullets => "resume_bullets",
            EvidenceSource::JdText => "jd_text",
            EvidenceSource::None => "none",
        }
    }

    /// Confidence assigned to a deterministic match found via this source (spec §4.5).
    pub fn confidence(&self) -> i32 {
        match self {
            EvidenceSource::ResumeSummary => 95,
            EvidenceSource::ResumeBullets => 88,
            EvidenceSource::JdText => 70,
            EvidenceSource::None => 0,
        }
    }
}

/// Gap classification for read-only reporting across archived jobs (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapClass {
    Matched,
    VocabularyGap,
    TrueGap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReportEntry {
    pub requirement_text: String,
    pub missed_count: i64,
    pub class: GapClass,
    pub synonym_hit: Option<String>,
    pub rewrite_suggestion: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidences_are_monotonic_per_spec_invariant() {
        assert!(
            EvidenceSource::ResumeSummary.confidence()
                >= EvidenceSource::ResumeBullets.confidence()
        );
        assert!(EvidenceSource::ResumeBullets.confidence() >= EvidenceSource::JdText.confidence());
        assert_eq!(EvidenceSource::None.confidence(), 0);
    }
}
