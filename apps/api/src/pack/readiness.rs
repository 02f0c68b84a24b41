//! PDF readiness gate (spec §4.7 "PDF readiness gate"), used on approval and
//! export. In soft one-page mode every check but `rr_import_ready` is a
//! warning; in hard mode all are enforced.

use crate::models::job::JobRow;
use crate::pack::ats::AtsResult;
use crate::pack::content::{OnePageMode, PackContent, BULLETS_MIN, SUMMARY_MIN_CHARS};

pub const MIN_ATS_SCORE: i32 = 50;
pub const MIN_MUST_COVERAGE_PCT: f64 = 40.0;

#[derive(Debug, Clone, Default)]
pub struct ReadinessCheck {
    pub passed: bool,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn check(job: &JobRow, content: &PackContent, ats: &AtsResult, rr_import_ready: bool, mode: OnePageMode) -> ReadinessCheck {
    let mut soft_findings = Vec::new();

    if job.role_title.as_deref().unwrap_or("").is_empty() {
        soft_findings.push("role_title missing".to_string());
    }
    if job.company.as_deref().unwrap_or("").is_empty() {
        soft_findings.push("company missing".to_string());
    }
    if !jd_quality_usable(job) {
        soft_findings.push("jd quality not usable".to_string());
    }
    if content.summary.chars().count() < SUMMARY_MIN_CHARS {
        soft_findings.push("summary_length below minimum".to_string());
    }
    if content.bullets.len() < BULLETS_MIN {
        soft_findings.push("bullet count below minimum".to_string());
    }
    if ats.score < MIN_ATS_SCORE {
        soft_findings.push("ats score below minimum".to_string());
    }
    if ats.must_coverage_pct < MIN_MUST_COVERAGE_PCT {
        soft_findings.push("must coverage below minimum".to_string());
    }

    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    if !rr_import_ready {
        failures.push("rr_import_ready is false".to_string());
    }

    match mode {
        OnePageMode::Hard => failures.extend(soft_findings),
        OnePageMode::Soft => warnings.extend(soft_findings),
    }

    ReadinessCheck {
        passed: failures.is_empty(),
        failures,
        warnings,
    }
}

fn jd_quality_usable(job: &JobRow) -> bool {
    job.jd_text_clean
        .as_deref()
        .map(|t| t.chars().count() >= 180)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::ats::RubricResult;
    use chrono::Utc;

    fn job() -> JobRow {
        JobRow {
            job_key: "k".to_string(),
            job_url: "https://example.com/1".to_string(),
            source_domain: "other".to_string(),
            job_id: None,
            company: Some("Acme".to_string()),
            role_title: Some("Staff Engineer".to_string()),
            location: None,
            work_mode: None,
            seniority: None,
            experience_years_min: None,
            experience_years_max: None,
            must_keywords: vec![],
            nice_keywords: vec![],
            reject_keywords: vec![],
            skills: vec![],
            jd_text_clean: Some("x".repeat(300)),
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

    fn ats(score: i32, must_pct: f64) -> AtsResult {
        AtsResult {
            score,
            must_coverage_pct: must_pct,
            nice_coverage_pct: 60.0,
            missing_keywords: vec![],
            notes: vec![],
            rubric: RubricResult { profile: "target_generic_v1", dimensions: vec![], overall: 0 },
        }
    }

    #[test]
    fn short_summary_fails_hard_mode() {
        let content = PackContent {
            summary: "Too short.".to_string(),
            bullets: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            cover_letter: "letter".to_string(),
            focus_keywords: vec![],
        };
        let result = check(&job(), &content, &ats(80, 80.0), true, OnePageMode::Hard);
        assert!(!result.passed);
        assert!(result.failures.iter().any(|f| f.contains("summary_length")));
    }

    #[test]
    fn soft_mode_demotes_content_failures_to_warnings() {
        let content = PackContent {
            summary: "Too short.".to_string(),
            bullets: vec![],
            cover_letter: "letter".to_string(),
            focus_keywords: vec![],
        };
        let result = check(&job(), &content, &ats(10, 5.0), true, OnePageMode::Soft);
        assert!(result.passed);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn missing_rr_import_ready_always_fails_even_in_soft_mode() {
        let content = PackContent {
            summary: "x".repeat(200),
            bullets: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            cover_letter: "letter".to_string(),
            focus_keywords: vec![],
        };
        let result = check(&job(), &content, &ats(90, 90.0), false, OnePageMode::Soft);
        assert!(!result.passed);
        assert!(result.failures.iter().any(|f| f.contains("rr_import_ready")));
    }
}
