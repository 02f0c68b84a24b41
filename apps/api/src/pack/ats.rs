//! ATS scoring and target rubric (C7, spec §4.7).

use regex::Regex;
use std::sync::OnceLock;

use crate::models::job::JobRow;
use crate::models::target::{RubricProfile, TargetRow};
use crate::pack::content::PackContent;
use crate::pack::profile::ProfileData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtsTargetMode {
    All,
    SelectedOnly,
}

impl Default for AtsTargetMode {
    fn default() -> Self {
        AtsTargetMode::All
    }
}

#[derive(Debug, Clone)]
pub struct AtsResult {
    pub score: i32,
    pub must_coverage_pct: f64,
    pub nice_coverage_pct: f64,
    pub missing_keywords: Vec<String>,
    pub notes: Vec<String>,
    pub rubric: RubricResult,
}

#[derive(Debug, Clone)]
pub struct RubricResult {
    pub profile: &'static str,
    pub dimensions: Vec<(String, i32)>,
    pub overall: i32,
}

/// Which must/nice keywords count toward coverage (spec §4.7 "ATS target mode").
fn universe<'a>(mode: AtsTargetMode, job_keywords: &'a [String], selected: &'a [String]) -> Vec<&'a str> {
    match mode {
        AtsTargetMode::All => job_keywords.iter().map(|s| s.as_str()).collect(),
        AtsTargetMode::SelectedOnly => job_keywords
            .iter()
            .filter(|k| selected.iter().any(|s| s.eq_ignore_ascii_case(k)))
            .map(|s| s.as_str())
            .collect(),
    }
}

/// `score = round(0.7·must_coverage% + 0.3·nice_coverage%)`; nice defaults to
/// 60% when the job has no nice-keywords at all (spec §4.7).
pub fn score(job: &JobRow, content: &PackContent, mode: AtsTargetMode) -> AtsResult {
    let text = format!(
        "{} {} {}",
        content.summary.to_lowercase(),
        content.bullets.join(" ").to_lowercase(),
        content.cover_letter.to_lowercase()
    );

    let must_universe = universe(mode, &job.must_keywords, &content.focus_keywords);
    let nice_universe = universe(mode, &job.nice_keywords, &content.focus_keywords);

    let (must_coverage_pct, must_missing) = coverage(&text, &must_universe);
    let (nice_coverage_pct, nice_missing) = if nice_universe.is_empty() {
        (60.0, Vec::new())
    } else {
        coverage(&text, &nice_universe)
    };

    let raw_score = 0.7 * must_coverage_pct + 0.3 * nice_coverage_pct;
    let score = raw_score.round() as i32;

    let mut missing_keywords = must_missing;
    missing_keywords.extend(nice_missing);

    let mut notes = Vec::new();
    if must_universe.is_empty() {
        notes.push("job has no must-keywords; must_coverage defaulted to 0%".to_string());
    }
    if nice_universe.is_empty() {
        notes.push("job has no nice-keywords; nice_coverage defaulted to 60%".to_string());
    }

    AtsResult {
        score,
        must_coverage_pct,
        nice_coverage_pct,
        missing_keywords,
        notes,
        rubric: rubric_for(job, content, must_coverage_pct, nice_coverage_pct),
    }
}

fn coverage(text_lower: &str, keywords: &[&str]) -> (f64, Vec<String>) {
    if keywords.is_empty() {
        return (0.0, Vec::new());
    }
    let mut hit = 0usize;
    let mut missing = Vec::new();
    for kw in keywords {
        if text_lower.contains(&kw.to_lowercase()) {
            hit += 1;
        } else {
            missing.push(kw.to_string());
        }
    }
    (100.0 * hit as f64 / keywords.len() as f64, missing)
}

fn pm_role_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bproduct\s*manager\b|\bproduct\s*owner\b|\bgroup\s*pm\b").unwrap())
}

/// Picks PM-v1 (5 keyword-bucket dimensions) when the role looks like product
/// management, else the generic 4-dimension rubric (spec §4.7).
fn rubric_for(job: &JobRow, content: &PackContent, must_pct: f64, nice_pct: f64) -> RubricResult {
    let role_title = job.role_title.clone().unwrap_or_default();
    let is_pm = pm_role_re().is_match(&role_title) || pm_role_re().is_match(&job.jd_text_clean.clone().unwrap_or_default());

    if is_pm {
        pm_v1_rubric(content)
    } else {
        generic_rubric(job, content, must_pct, nice_pct)
    }
}

const PM_BUCKETS: &[(&str, &[&str])] = &[
    ("strategy", &["strategy", "roadmap", "vision", "prioritiz"]),
    ("execution", &["launch", "ship", "delivery", "execution"]),
    ("stakeholder", &["stakeholder", "cross-functional", "alignment", "partner"]),
    ("data", &["metric", "data", "analytics", "experiment", "a/b"]),
    ("leadership", &["lead", "mentor", "manage", "leadership"]),
];

fn pm_v1_rubric(content: &PackContent) -> RubricResult {
    let text = format!(
        "{} {}",
        content.summary.to_lowercase(),
        content.bullets.join(" ").to_lowercase()
    );
    let dimensions: Vec<(String, i32)> = PM_BUCKETS
        .iter()
        .map(|(name, terms)| {
            let hit = terms.iter().any(|t| text.contains(t));
            (name.to_string(), if hit { 100 } else { 0 })
        })
        .collect();
    let overall = average(&dimensions);
    RubricResult { profile: "pm_v1", dimensions, overall }
}

fn generic_rubric(job: &JobRow, content: &PackContent, must_pct: f64, nice_pct: f64) -> RubricResult {
    let role_fit = role_language_fit(job, content);
    let seniority_location_fit = seniority_and_location_fit(job, content);
    let dimensions = vec![
        ("must_coverage".to_string(), must_pct.round() as i32),
        ("nice_coverage".to_string(), nice_pct.round() as i32),
        ("role_language_fit".to_string(), role_fit),
        ("seniority_and_location_fit".to_string(), seniority_location_fit),
    ];
    let overall = average(&dimensions);
    RubricResult { profile: "target_generic_v1", dimensions, overall }
}

fn role_language_fit(job: &JobRow, content: &PackContent) -> i32 {
    let role_title = job.role_title.clone().unwrap_or_default().to_lowercase();
    if role_title.is_empty() {
        return 0;
    }
    let text = content.summary.to_lowercase();
    let overlap = role_title
        .split_whitespace()
        .filter(|word| word.len() > 2 && text.contains(word))
        .count();
    let total = role_title.split_whitespace().filter(|w| w.len() > 2).count().max(1);
    (100.0 * overlap as f64 / total as f64).round() as i32
}

fn seniority_and_location_fit(job: &JobRow, content: &PackContent) -> i32 {
    let text = format!("{} {}", content.summary.to_lowercase(), content.bullets.join(" ").to_lowercase());
    let mut hits = 0;
    let mut checks = 0;
    if let Some(seniority) = &job.seniority {
        checks += 1;
        if text.contains(&seniority.to_lowercase()) {
            hits += 1;
        }
    }
    if let Some(location) = &job.location {
        checks += 1;
        if text.contains(&location.to_lowercase()) {
            hits += 1;
        }
    }
    if checks == 0 {
        return 100;
    }
    (100.0 * hits as f64 / checks as f64).round() as i32
}

fn average(dimensions: &[(String, i32)]) -> i32 {
    if dimensions.is_empty() {
        return 0;
    }
    let sum: i32 = dimensions.iter().map(|(_, v)| v).sum();
    (sum as f64 / dimensions.len() as f64).round() as i32
}

/// Legacy duality (SPEC_FULL §9 Open Question #1): clients may read either
/// `target_rubric` (current) or `pm_rubric` (legacy name); expose both.
pub fn rubric_profile_label(target: Option<&TargetRow>) -> &'static str {
    match target.map(|t| RubricProfile::from_db_str(&t.rubric_profile)) {
        Some(RubricProfile::PmV1) => "pm_v1",
        Some(RubricProfile::TargetGenericV1) => "target_generic_v1",
        _ => "auto",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job() -> JobRow {
        JobRow {
            job_key: "k".to_string(),
            job_url: "https://example.com/1".to_string(),
            source_domain: "other".to_string(),
            job_id: None,
            company: Some("Acme".to_string()),
            role_title: Some("Staff Backend Engineer".to_string()),
            location: Some("Remote".to_string()),
            work_mode: None,
            seniority: Some("staff".to_string()),
            experience_years_min: None,
            experience_years_max: None,
            must_keywords: vec!["rust".to_string(), "postgres".to_string()],
            nice_keywords: vec!["kubernetes".to_string()],
            reject_keywords: vec![],
            skills: vec![],
            jd_text_clean: Some("Key Responsibilities: build backend systems.".to_string()),
            jd_source: "fetched".to_string(),
            fetch_status: "ok".to_string(),
            fetch_debug: serde_json::json!({}),
            primary_target_id: None,
            score_must: None,
            score_nice: None,
            final_score: None,
            reject_triggered: false,
            reject_reasons: vec![],
            reason_top_matches: None,
            status: "NEW".to_string(),
            system_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_scored_at: None,
            applied_at: None,
            rejected_at: None,
            archived_at: None,
        }
    }

    fn content() -> PackContent {
        PackContent {
            summary: "Rust and staff-level remote delivery anchor this candidate's background.".to_string(),
            bullets: vec!["Delivered measurable impact by applying rust to outcomes".to_string()],
            cover_letter: "Dear team, rust aligns directly with your need for rust.".to_string(),
            focus_keywords: vec!["rust".to_string()],
        }
    }

    #[test]
    fn full_must_coverage_and_no_nice_keywords_defaults_nice_to_60() {
        let mut j = job();
        j.nice_keywords = vec![];
        let result = score(&j, &content(), AtsTargetMode::All);
        assert_eq!(result.nice_coverage_pct, 60.0);
    }

    #[test]
    fn missing_keywords_reported() {
        let j = job();
        let result = score(&j, &content(), AtsTargetMode::All);
        assert!(result.missing_keywords.iter().any(|k| k == "postgres"));
    }

    #[test]
    fn pm_role_gets_pm_v1_rubric() {
        let mut j = job();
        j.role_title = Some("Senior Product Manager".to_string());
        let result = score(&j, &content(), AtsTargetMode::All);
        assert_eq!(result.rubric.profile, "pm_v1");
        assert_eq!(result.rubric.dimensions.len(), 5);
    }

    #[test]
    fn non_pm_role_gets_generic_rubric() {
        let j = job();
        let result = score(&j, &content(), AtsTargetMode::All);
        assert_eq!(result.rubric.profile, "target_generic_v1");
        assert_eq!(result.rubric.dimensions.len(), 4);
    }

    #[test]
    fn selected_only_mode_narrows_universe() {
        let j = job();
        let mut c = content();
        c.focus_keywords = vec!["rust".to_string()];
        let result = score(&j, &c, AtsTargetMode::SelectedOnly);
        assert_eq!(result.must_coverage_pct, 100.0);
    }
}
