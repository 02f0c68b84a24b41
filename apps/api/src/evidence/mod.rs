//! Evidence Matching Engine (C5, spec §4.5).
//!
//! For each extracted requirement, searches resume summary → resume bullets →
//! JD text (in that order) and classifies the requirement as matched or
//! unmatched. Never calls the LLM — this stage is pure and deterministic so
//! its output is directly testable against the scenarios in spec §8.

pub mod gap_report;

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use sqlx::PgPool;

use crate::db::SchemaCapabilities;
use crate::errors::AppError;
use crate::models::draft::ResumeProfileRow;
use crate::models::evidence::{EvidenceSource, RequirementType};
use crate::models::job::JobRow;
use crate::pack::profile::ProfileData;

/// One deduped requirement fed into the matcher (spec §4.5: "For each
/// requirement from the four groups (must, nice, reject, constraint), dedupe
/// by `(type, lowercase(text))`").
#[derive(Debug, Clone)]
pub struct RequirementInput {
    pub text: String,
    pub req_type: RequirementType,
}

impl RequirementInput {
    pub fn new(text: impl Into<String>, req_type: RequirementType) -> Self {
        Self {
            text: text.into(),
            req_type,
        }
    }
}

/// A single evidence row, ready for the C9 batch upsert.
#[derive(Debug, Clone)]
pub struct EvidenceRow {
    pub requirement_text: String,
    pub requirement_type: RequirementType,
    pub evidence_text: Option<String>,
    pub evidence_source: EvidenceSource,
    pub confidence_score: i32,
    pub matched: bool,
    pub notes: Option<String>,
}

/// `build_evidence(job_key, extracted_jd, resume_profile) → Row[]` (spec §4.5).
/// The `job_key` itself is attached by the caller at persistence time (C9);
/// this function is pure over its text inputs so it stays unit-testable.
pub fn build_evidence(
    requirements: &[RequirementInput],
    resume_summary: &str,
    resume_bullets: &[String],
    jd_text: &str,
) -> Vec<EvidenceRow> {
    let mut seen: HashSet<(RequirementType, String)> = HashSet::new();
    let mut rows = Vec::with_capacity(requirements.len());

    for req in requirements {
        let trimmed = req.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = (req.req_type, trimmed.to_lowercase());
        if !seen.insert(key) {
            continue;
        }

        match search_sources(trimmed, resume_summary, resume_bullets, jd_text) {
            Some((snippet, source)) => rows.push(EvidenceRow {
                requirement_text: trimmed.to_string(),
                requirement_type: req.req_type,
                evidence_text: Some(snippet),
                evidence_source: source,
                confidence_score: source.confidence(),
                matched: true,
                notes: None,
            }),
            None => rows.push(EvidenceRow {
                requirement_text: trimmed.to_string(),
                requirement_type: req.req_type,
                evidence_text: None,
                evidence_source: EvidenceSource::None,
                confidence_score: 0,
                matched: false,
                notes: Some("No deterministic match found in resume or JD.".to_string()),
            }),
        }
    }

    rows
}

fn search_sources(
    requirement: &str,
    resume_summary: &str,
    resume_bullets: &[String],
    jd_text: &str,
) -> Option<(String, EvidenceSource)> {
    if let Some(snippet) = match_requirement(requirement, resume_summary) {
        return Some((snippet, EvidenceSource::ResumeSummary));
    }
    for bullet in resume_bullets {
        if let Some(snippet) = match_requirement(requirement, bullet) {
            return Some((snippet, EvidenceSource::ResumeBullets));
        }
    }
    if let Some(snippet) = match_requirement(requirement, jd_text) {
        return Some((snippet, EvidenceSource::JdText));
    }
    None
}

fn word_shaped_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_ ]*[A-Za-z0-9_]$").unwrap())
}

/// Matching primitive (spec §4.5 steps 1-2): regex with word boundary when the
/// requirement is word-shaped, literal-escape otherwise (case-insensitive);
/// on a miss, retries against a whitespace-normalized lowercase corpus for
/// compound tokens.
fn match_requirement(requirement: &str, corpus: &str) -> Option<String> {
    if requirement.is_empty() || corpus.trim().is_empty() {
        return None;
    }

    if let Some(re) = build_requirement_regex(requirement) {
        if let Some(m) = re.find(corpus) {
            return Some(window_snippet(corpus, m.start(), m.end()));
        }
    }

    let norm_corpus = normalize_whitespace(&corpus.to_lowercase());
    let norm_req = normalize_whitespace(&requirement.to_lowercase());
    if norm_req.is_empty() {
        return None;
    }
    let idx = norm_corpus.find(&norm_req)?;
    Some(window_snippet(&norm_corpus, idx, idx + norm_req.len()))
}

fn build_requirement_regex(requirement: &str) -> Option<Regex> {
    let escaped = regex::escape(requirement);
    let pattern = if word_shaped_re().is_match(requirement) {
        format!(r"(?i)\b{escaped}\b")
    } else {
        format!(r"(?i){escaped}")
    };
    Regex::new(&pattern).ok()
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

const MAX_SNIPPET_CHARS: usize = 220;
const WINDOW_CHARS: usize = 110;

/// Builds a ±110-char window snippet (≤220 chars) with ellipses (spec §4.5).
fn window_snippet(text: &str, start_byte: usize, end_byte: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start_char = text[..start_byte].chars().count();
    let end_char = text[..end_byte].chars().count();

    let win_start = start_char.saturating_sub(WINDOW_CHARS);
    let win_end = (end_char + WINDOW_CHARS).min(chars.len());

    let mut snippet: String = chars[win_start..win_end].iter().collect();
    if win_start > 0 {
        snippet = format!("…{snippet}");
    }
    if win_end < chars.len() {
        snippet = format!("{snippet}…");
    }

    if snippet.chars().count() > MAX_SNIPPET_CHARS {
        let truncated: String = snippet
            .chars()
            .take(MAX_SNIPPET_CHARS.saturating_sub(1))
            .collect();
        snippet = format!("{truncated}…");
    }
    snippet
}

/// Requirement groups pulled off a job row (spec §4.5: "the four groups must,
/// nice, reject, constraint"). `constraint` covers the fields with no keyword
/// list of their own — seniority, work mode, minimum experience — expressed as
/// short natural-language strings so the same matcher handles them uniformly.
fn requirements_for_job(job: &JobRow) -> Vec<RequirementInput> {
    let mut reqs = Vec::new();
    for k in &job.must_keywords {
        reqs.push(RequirementInput::new(k.clone(), RequirementType::Must));
    }
    for k in &job.nice_keywords {
        reqs.push(RequirementInput::new(k.clone(), RequirementType::Nice));
    }
    for k in &job.reject_keywords {
        reqs.push(RequirementInput::new(k.clone(), RequirementType::Reject));
    }
    if let Some(seniority) = &job.seniority {
        reqs.push(RequirementInput::new(seniority.clone(), RequirementType::Constraint));
    }
    if let Some(work_mode) = &job.work_mode {
        reqs.push(RequirementInput::new(work_mode.clone(), RequirementType::Constraint));
    }
    if let Some(min_years) = job.experience_years_min {
        reqs.push(RequirementInput::new(
            format!("{min_years}+ years experience"),
            RequirementType::Constraint,
        ));
    }
    reqs
}

/// Wires C5 into C9 for a single job: builds evidence rows from the job's
/// extracted requirements against a candidate profile and batch-upserts them
/// (spec §4.5 "Batch upsert keyed on (job_key, requirement_text,
/// requirement_type)"). Called after a successful scoring run (spec §2 data
/// flow: `... → C4 → (C5, C9) → Job record`) and by the evidence
/// rebuild-archived endpoint.
pub async fn rebuild_for_job(
    pool: &PgPool,
    job: &JobRow,
    profile: &ResumeProfileRow,
) -> Result<usize, AppError> {
    let caps = SchemaCapabilities::detect(pool).await?;
    caps.require_job_evidence()?;

    let profile_data = ProfileData::parse(&profile.profile_json);
    let bullets: Vec<String> = profile_data
        .experience
        .iter()
        .flat_map(|e| e.bullets.clone())
        .collect();
    let requirements = requirements_for_job(job);
    let jd_text = job.jd_text_clean.as_deref().unwrap_or("");

    let rows = build_evidence(&requirements, &profile_data.summary, &bullets, jd_text);
    let count = rows.len();
    crate::storage::evidence::upsert_many(pool, &job.job_key, &rows).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_requirement_uses_resume_summary_first() {
        let reqs = vec![RequirementInput::new("Rust", RequirementType::Must)];
        let rows = build_evidence(
            &reqs,
            "Seasoned Rust engineer with distributed systems background.",
            &["Shipped services in Go.".to_string()],
            "We need someone who knows Rust well.",
        );
        assert_eq!(rows.len(), 1);
        assert!(rows[0].matched);
        assert_eq!(rows[0].evidence_source, EvidenceSource::ResumeSummary);
        assert_eq!(rows[0].confidence_score, 95);
    }

    #[test]
    fn falls_back_to_bullets_then_jd() {
        let reqs = vec![RequirementInput::new("Kubernetes", RequirementType::Nice)];
        let rows = build_evidence(
            &reqs,
            "Backend engineer who loves clean APIs.",
            &["Operated Kubernetes clusters at scale.".to_string()],
            "Experience with Kubernetes is a plus.",
        );
        assert_eq!(rows[0].evidence_source, EvidenceSource::ResumeBullets);
        assert_eq!(rows[0].confidence_score, 88);
    }

    #[test]
    fn jd_only_match_has_lowest_confidence() {
        let reqs = vec![RequirementInput::new("GraphQL", RequirementType::Nice)];
        let rows = build_evidence(
            &reqs,
            "Backend engineer.",
            &["Built REST APIs.".to_string()],
            "Familiarity with GraphQL is preferred.",
        );
        assert_eq!(rows[0].evidence_source, EvidenceSource::JdText);
        assert_eq!(rows[0].confidence_score, 70);
    }

    #[test]
    fn unmatched_requirement_has_zero_confidence_and_none_source() {
        let reqs = vec![RequirementInput::new("Leadership", RequirementType::Must)];
        let rows = build_evidence(
            &reqs,
            "Led a team of 8 engineers shipping a payments platform.",
            &[],
            "We want a leader.",
        );
        // "Leadership" the literal token is absent from "Led a team..." even
        // though the concept is present — spec §8 scenario 4.
        assert!(!rows[0].matched);
        assert_eq!(rows[0].evidence_source, EvidenceSource::None);
        assert_eq!(rows[0].confidence_score, 0);
        assert!(rows[0].notes.as_deref().unwrap().starts_with("No deterministic match"));
    }

    #[test]
    fn dedupes_by_type_and_lowercase_text() {
        let reqs = vec![
            RequirementInput::new("Rust", RequirementType::Must),
            RequirementInput::new("rust", RequirementType::Must),
            RequirementInput::new("Rust", RequirementType::Nice),
        ];
        let rows = build_evidence(&reqs, "Rust expert.", &[], "");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn non_word_shaped_requirement_uses_literal_escape() {
        let reqs = vec![RequirementInput::new("C++", RequirementType::Must)];
        let rows = build_evidence(&reqs, "Ten years of C++ experience.", &[], "");
        assert!(rows[0].matched);
    }

    #[test]
    fn whitespace_normalized_fallback_matches_compound_token() {
        let reqs = vec![RequirementInput::new(
            "machine  learning",
            RequirementType::Must,
        )];
        let rows = build_evidence(&reqs, "", &[], "Strong background in machine\nlearning systems.");
        assert!(rows[0].matched);
    }

    #[test]
    fn snippet_is_capped_at_220_chars() {
        let reqs = vec![RequirementInput::new("Rust", RequirementType::Must)];
        let long_text = format!("{} Rust {}", "x".repeat(500), "y".repeat(500));
        let rows = build_evidence(&reqs, &long_text, &[], "");
        let snippet = rows[0].evidence_text.as_ref().unwrap();
        assert!(snippet.chars().count() <= 220);
        assert!(snippet.contains("Rust"));
    }
}
