//! Extractor Client (C3, spec §4.3).
//!
//! Wraps the LLM JD-field extraction call with sanitization and URL-slug
//! fallbacks so downstream stages never see noisy/missing structured fields.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

use crate::errors::AppError;
use crate::llm_client::{prompts, CallOptions, LlmClient};

#[derive(Debug, Clone, Default)]
pub struct Extracted {
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
}

/// Raw shape returned by the model before sanitization. Keyword fields are
/// `Value` because the model (or a manual caller) may hand back a JSON array,
/// a comma-separated string, or a JSON-encoded string (spec §9 Design Note
/// "ad-hoc mixing of string/array/JSON string inputs").
#[derive(Debug, Deserialize, Default)]
struct ExtractedRaw {
    company: Option<String>,
    role_title: Option<String>,
    location: Option<String>,
    work_mode: Option<String>,
    seniority: Option<String>,
    experience_years_min: Option<i32>,
    experience_years_max: Option<i32>,
    #[serde(default)]
    must_keywords: Value,
    #[serde(default)]
    nice_keywords: Value,
    #[serde(default)]
    reject_keywords: Value,
    #[serde(default)]
    skills: Value,
}

/// `extract_jd(text) → Extracted` (spec §4.3). Fails with `ExternalFailure`
/// when no JSON object can be parsed from the model output.
pub async fn extract_jd(
    llm: &LlmClient,
    jd_text: &str,
    job_url: &str,
    max_tokens: u32,
) -> Result<Extracted, AppError> {
    let prompt = format!("Job posting URL: {job_url}\n\nJob description:\n{jd_text}");

    let (raw, _usage): (ExtractedRaw, _) = llm
        .call_json(&prompt, prompts::EXTRACTOR_SYSTEM, &CallOptions::deterministic(max_tokens))
        .await
        .map_err(|e| AppError::external(format!("InvalidModelJSON: {e}")))?;

    Ok(sanitize(raw, jd_text, job_url))
}

fn sanitize(raw: ExtractedRaw, jd_text: &str, job_url: &str) -> Extracted {
    let role_title = raw
        .role_title
        .map(|s| clean_label(&s))
        .filter(|s| !s.is_empty() && !is_noise_role_title(s))
        .or_else(|| derive_role_from_slug(job_url));

    let company = raw
        .company
        .map(|s| clean_label(&s))
        .filter(|s| is_likely_company(s))
        .or_else(|| scan_company_from_jd(jd_text));

    Extracted {
        company,
        role_title,
        location: raw.location.map(|s| clean_label(&s)).filter(|s| !s.is_empty()),
        work_mode: raw.work_mode.map(|s| clean_label(&s)).filter(|s| !s.is_empty()),
        seniority: raw.seniority.map(|s| clean_label(&s)).filter(|s| !s.is_empty()),
        experience_years_min: raw.experience_years_min,
        experience_years_max: raw.experience_years_max,
        must_keywords: coerce_list(&raw.must_keywords),
        nice_keywords: coerce_list(&raw.nice_keywords),
        reject_keywords: coerce_list(&raw.reject_keywords),
        skills: coerce_list(&raw.skills),
    }
}

fn clean_label(s: &str) -> String {
    s.trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Rejects role titles matching noise patterns (spec §4.3): a single token
/// longer than 24 chars, a years-of-experience-only string, or a hostname-like
/// prefix.
fn is_noise_role_title(s: &str) -> bool {
    if s.split_whitespace().count() == 1 && s.chars().count() > 24 {
        return true;
    }
    if years_only_re().is_match(s) {
        return true;
    }
    let lower = s.to_lowercase();
    if lower.starts_with("www.") || lower.contains(".com") || lower.contains(".in") {
        return true;
    }
    false
}

fn years_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\d+\+?\s*(-\s*\d+)?\s*years?\s*(of\s*experience)?$").unwrap())
}

const COMPANY_BOILERPLATE: &[&str] = &["n/a", "unknown", "confidential", "various", "company"];

/// "Likely company" test (spec §4.3): length 2-80, ≤8 words, contains letters,
/// not boilerplate.
fn is_likely_company(s: &str) -> bool {
    let len = s.chars().count();
    if !(2..=80).contains(&len) {
        return false;
    }
    if s.split_whitespace().count() > 8 {
        return false;
    }
    if !s.chars().any(|c| c.is_alphabetic()) {
        return false;
    }
    let lower = s.to_lowercase();
    if COMPANY_BOILERPLATE.contains(&lower.as_str()) {
        return false;
    }
    true
}

fn company_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:about|company)\s*[:\-]?\s*([A-Z][A-Za-z0-9&.,' ]{1,60})|(?:\bat\s+)([A-Z][A-Za-z0-9&.,' ]{1,60})\s*\|"#).unwrap()
    })
}

/// Regex-scans the JD for "About X", "Company: X", "at X |" (spec §4.3).
fn scan_company_from_jd(jd_text: &str) -> Option<String> {
    let caps = company_pattern_re().captures(jd_text)?;
    let candidate = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())?;
    if is_likely_company(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

/// Derives a role title from the URL slug when the model omits it (spec §4.1/§4.3).
fn derive_role_from_slug(job_url: &str) -> Option<String> {
    let path = job_url.rsplit('/').find(|seg| !seg.is_empty())?;
    let path = path.trim_end_matches(".html");
    let path = trailing_id_re().replace(path, "");
    let words: Vec<String> = path
        .split(|c: char| c == '-' || c == '_')
        .filter(|w| !w.is_empty() && !w.chars().all(|c| c.is_ascii_digit()))
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
            }
        })
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn trailing_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\d+$").unwrap())
}

/// Coerces a keyword field into a `Vec<String>` regardless of whether the model
/// handed back a JSON array, a comma-separated string, or a JSON-encoded string
/// (spec §9 Design Note).
fn coerce_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_lowercase()))
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                return items
                    .iter()
                    .filter_map(|v| v.as_str().map(|s| s.trim().to_lowercase()))
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            s.split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_role_title_rejects_years_only() {
        assert!(is_noise_role_title("5+ years"));
        assert!(is_noise_role_title("3-5 years of experience"));
    }

    #[test]
    fn noise_role_title_rejects_hostname_like() {
        assert!(is_noise_role_title("www.acme.com"));
    }

    #[test]
    fn noise_role_title_rejects_long_single_token() {
        assert!(is_noise_role_title("Senior-Backend-Infrastructure-Engineer-II-Platform"));
    }

    #[test]
    fn noise_role_title_accepts_normal_title() {
        assert!(!is_noise_role_title("Senior Backend Engineer"));
    }

    #[test]
    fn likely_company_rejects_boilerplate() {
        assert!(!is_likely_company("Confidential"));
        assert!(!is_likely_company("N/A"));
    }

    #[test]
    fn likely_company_rejects_too_many_words() {
        assert!(!is_likely_company("A Very Long Company Name With Entirely Too Many Words In It"));
    }

    #[test]
    fn likely_company_accepts_reasonable_name() {
        assert!(is_likely_company("Acme Robotics Inc."));
    }

    #[test]
    fn scans_company_from_about_pattern() {
        let jd = "Some intro text.\nAbout Acme Robotics: we build things that matter.";
        assert_eq!(scan_company_from_jd(jd).as_deref(), Some("Acme Robotics"));
    }

    #[test]
    fn derives_role_from_url_slug() {
        let role = derive_role_from_slug("https://www.iimjobs.com/j/senior-backend-engineer-1182734");
        assert_eq!(role.as_deref(), Some("Senior Backend Engineer"));
    }

    #[test]
    fn coerce_list_handles_array_comma_string_and_json_string() {
        assert_eq!(
            coerce_list(&serde_json::json!(["Rust", "Postgres"])),
            vec!["rust".to_string(), "postgres".to_string()]
        );
        assert_eq!(
            coerce_list(&serde_json::json!("Rust, Postgres")),
            vec!["rust".to_string(), "postgres".to_string()]
        );
        assert_eq!(
            coerce_list(&serde_json::json!("[\"Rust\",\"Postgres\"]")),
            vec!["rust".to_string(), "postgres".to_string()]
        );
    }

    #[test]
    fn sanitize_falls_back_to_slug_when_role_missing() {
        let raw = ExtractedRaw {
            role_title: None,
            ..Default::default()
        };
        let extracted = sanitize(raw, "", "https://www.naukri.com/job-listings-staff-engineer-9912");
        assert_eq!(extracted.role_title.as_deref(), Some("Staff Engineer"));
    }
}
