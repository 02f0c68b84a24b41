//! Tailored content generation (C7, spec §4.7 "Generation operation").
//!
//! Produces a summary, bullet list, and cover letter from a résumé profile
//! and a job's keywords, then enforces the deterministic post-conditions the
//! spec pins down instead of trusting an LLM polish pass to hit them.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::job::JobRow;
use crate::pack::profile::ProfileData;

pub const SUMMARY_MIN_CHARS: usize = 180;
pub const SUMMARY_SOFT_MAX_CHARS: usize = 250;
pub const SUMMARY_HARD_CAP_CHARS: usize = 320;
pub const BULLETS_MIN: usize = 3;
pub const BULLETS_SOFT_MAX: usize = 6;
pub const BULLETS_HARD_MAX: usize = 4;

const BANNED_PHRASES: &[&str] = &["perfect fit", "best candidate", "guarantee", "no doubt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnePageMode {
    Soft,
    Hard,
}

impl Default for OnePageMode {
    fn default() -> Self {
        OnePageMode::Soft
    }
}

#[derive(Debug, Clone)]
pub struct PackContent {
    pub summary: String,
    pub bullets: Vec<String>,
    pub cover_letter: String,
    pub focus_keywords: Vec<String>,
}

/// Keyword selection (spec §4.7): caller-selected keywords win; otherwise the
/// job's must-keywords.
pub fn select_focus_keywords(caller_selected: &[String], job_must: &[String]) -> Vec<String> {
    if caller_selected.is_empty() {
        job_must.to_vec()
    } else {
        caller_selected.to_vec()
    }
}

pub fn build(job: &JobRow, profile: &ProfileData, focus_keywords: &[String], mode: OnePageMode) -> PackContent {
    let summary = build_summary(focus_keywords, profile, job.role_title.as_deref().unwrap_or(""));
    let mut bullets = build_bullets(focus_keywords, profile);
    let cover_letter = build_cover_letter(focus_keywords, job, profile);

    if mode == OnePageMode::Hard && bullets.len() > BULLETS_HARD_MAX {
        bullets.truncate(BULLETS_HARD_MAX);
    }

    PackContent {
        summary,
        bullets,
        cover_letter,
        focus_keywords: focus_keywords.to_vec(),
    }
}

fn build_summary(focus: &[String], profile: &ProfileData, role_title: &str) -> String {
    let strongest = strongest_match(focus, profile);
    let role = if role_title.is_empty() { "this role" } else { role_title };

    let mut clauses = vec![format!(
        "{} is the core strength this candidate brings to {}",
        capitalize(&strongest),
        role
    )];
    for kw in focus.iter().filter(|k| *k != &strongest).take(4) {
        clauses.push(format!("with hands-on depth in {kw}"));
    }

    let fillers = [
        "consistently shipping measurable outcomes",
        "translating requirements into working systems",
        "partnering closely with cross-functional teams",
        "maintaining a strong bias for delivery",
    ];
    let mut summary = clauses.join(", ");
    let mut filler_idx = 0;
    while summary.chars().count() < SUMMARY_MIN_CHARS - 1 {
        summary.push_str(", ");
        summary.push_str(fillers[filler_idx % fillers.len()]);
        filler_idx += 1;
    }
    summary.push('.');

    let capped = truncate_at_word_boundary(&summary, SUMMARY_SOFT_MAX_CHARS.min(SUMMARY_HARD_CAP_CHARS));
    if capped.chars().count() < SUMMARY_MIN_CHARS {
        truncate_at_word_boundary(&summary, SUMMARY_HARD_CAP_CHARS)
    } else {
        capped
    }
}

fn strongest_match(focus: &[String], profile: &ProfileData) -> String {
    let text = profile.combined_text_lower();
    focus
        .iter()
        .find(|kw| text.contains(kw.to_lowercase().as_str()))
        .or_else(|| focus.first())
        .cloned()
        .unwrap_or_else(|| "this work".to_string())
}

const BULLET_PHRASES: &[&str] = &[
    "drive outcomes for",
    "improve the reliability of",
    "accelerate delivery for",
    "strengthen",
    "scale",
    "modernize",
];

fn build_bullets(focus: &[String], profile: &ProfileData) -> Vec<String> {
    let mut pool: Vec<String> = focus.to_vec();
    for skill in &profile.skills {
        if pool.len() >= BULLETS_MIN {
            break;
        }
        if !pool.iter().any(|k| k.eq_ignore_ascii_case(skill)) {
            pool.push(skill.clone());
        }
    }
    if pool.is_empty() {
        pool.push("core deliverables".to_string());
    }
    while pool.len() < BULLETS_MIN {
        let filler = pool[pool.len() % pool.len().max(1)].clone();
        pool.push(filler);
    }
    pool.truncate(BULLETS_SOFT_MAX);

    pool.iter()
        .enumerate()
        .map(|(i, kw)| {
            format!(
                "Delivered measurable impact by applying {kw} to {} outcomes for this team",
                BULLET_PHRASES[i % BULLET_PHRASES.len()]
            )
        })
        .collect()
}

fn build_cover_letter(focus: &[String], job: &JobRow, profile: &ProfileData) -> String {
    let primary = focus.first().cloned().unwrap_or_else(|| "this work".to_string());
    let company = job.company.clone().unwrap_or_else(|| "your team".to_string());
    let role = job.role_title.clone().unwrap_or_else(|| "this position".to_string());
    let name = if profile.basics.name.is_empty() {
        "the candidate".to_string()
    } else {
        profile.basics.name.clone()
    };

    let letter = format!(
        "Dear Hiring Team,\n\n\
         I'm writing to apply for the {role} role at {company}. My background aligns directly \
         with your need for {primary}, built over a career of shipping real outcomes in similar \
         environments.\n\n\
         I'd welcome the chance to discuss how I can contribute.\n\n\
         Sincerely,\n{name}"
    );

    strip_banned_phrases(&letter)
}

fn strip_banned_phrases(text: &str) -> String {
    let mut out = text.to_string();
    for phrase in BANNED_PHRASES {
        out = banned_phrase_re(phrase).replace_all(&out, "").to_string();
    }
    collapse_spaces(&out)
}

fn banned_phrase_re(phrase: &str) -> Regex {
    Regex::new(&format!("(?i){}", regex::escape(phrase))).unwrap()
}

fn collapse_spaces(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap());
    re.replace_all(s, " ").to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

fn truncate_at_word_boundary(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars).collect();
    match truncated.rfind(' ') {
        Some(idx) => truncated[..idx].trim_end_matches(',').to_string() + ".",
        None => truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job(role_title: Option<&str>, company: Option<&str>) -> JobRow {
        JobRow {
            job_key: "k".to_string(),
            job_url: "https://example.com/1".to_string(),
            source_domain: "other".to_string(),
            job_id: None,
            company: company.map(|s| s.to_string()),
            role_title: role_title.map(|s| s.to_string()),
            location: None,
            work_mode: None,
            seniority: None,
            experience_years_min: None,
            experience_years_max: None,
            must_keywords: vec![],
            nice_keywords: vec![],
            reject_keywords: vec![],
            skills: vec![],
            jd_text_clean: None,
            jd_source: "none".to_string(),
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

    fn profile() -> ProfileData {
        ProfileData::parse(&serde_json::json!({
            "basics": {"name": "Jo Rivera", "email": "jo@example.com"},
            "summary": "Backend engineer with distributed systems depth.",
            "skills": ["rust", "postgres", "kubernetes"],
        }))
    }

    #[test]
    fn summary_begins_with_strongest_match_and_is_in_range() {
        let j = job(Some("Staff Backend Engineer"), Some("Acme"));
        let focus = vec!["rust".to_string(), "distributed systems".to_string()];
        let summary = build_summary(&focus, &profile(), j.role_title.as_deref().unwrap());
        assert!(summary.starts_with("Rust"));
        let len = summary.chars().count();
        assert!(len >= SUMMARY_MIN_CHARS && len <= SUMMARY_HARD_CAP_CHARS, "len={len}");
    }

    #[test]
    fn bullets_each_contain_a_focus_keyword_and_count_in_range() {
        let focus = vec!["rust".to_string(), "postgres".to_string()];
        let bullets = build_bullets(&focus, &profile());
        assert!(bullets.len() >= BULLETS_MIN && bullets.len() <= BULLETS_SOFT_MAX);
        for b in &bullets {
            assert!(b.starts_with("Delivered measurable impact"));
        }
    }

    #[test]
    fn hard_mode_caps_bullets_at_four() {
        let j = job(Some("Engineer"), Some("Acme"));
        let focus = vec![
            "rust".to_string(),
            "postgres".to_string(),
            "kubernetes".to_string(),
            "kafka".to_string(),
            "grpc".to_string(),
        ];
        let content = build(&j, &profile(), &focus, OnePageMode::Hard);
        assert!(content.bullets.len() <= BULLETS_HARD_MAX);
    }

    #[test]
    fn cover_letter_mentions_alignment_and_strips_banned_phrases() {
        let j = job(Some("Staff Engineer"), Some("Acme"));
        let focus = vec!["rust".to_string()];
        let mut p = profile();
        p.summary = "I am the perfect fit and the best candidate, no doubt.".to_string();
        let letter = build_cover_letter(&focus, &j, &p);
        assert!(letter.contains("aligns directly with your need for rust"));
        let lower = letter.to_lowercase();
        for phrase in BANNED_PHRASES {
            assert!(!lower.contains(phrase));
        }
    }
}
