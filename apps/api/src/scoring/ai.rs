//! AI reasoning stage (C4, spec §4.4 `ai_reason` state).
//!
//! Calls the LLM with the candidate's target set and the resolved JD text,
//! then sanitizes the `potential_contacts` the model surfaces before they ever
//! reach storage (spec §4.4, §9 Design Note on contact noise).

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{prompts, CallOptions, LlmClient, Usage};
use crate::models::job::JobRow;
use crate::models::target::TargetRow;

#[derive(Debug, Clone, Default)]
pub struct ScorerOutput {
    pub primary_target_id: Option<Uuid>,
    pub score_must: Option<f64>,
    pub score_nice: Option<f64>,
    pub final_score: Option<i32>,
    pub reject_triggered: bool,
    pub reason_top_matches: Option<String>,
    pub potential_contacts: Vec<SanitizedContact>,
    /// Token usage for the scorer call (spec §3 `ai_tokens_{in,out}`), `None`
    /// when the call itself never ran (not applicable on this path today, but
    /// kept `Option` to mirror the heuristic-reject short-circuit elsewhere).
    pub tokens_in: Option<u32>,
    pub tokens_out: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SanitizedContact {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ScorerRaw {
    primary_target_id: Option<String>,
    score_must: Option<f64>,
    score_nice: Option<f64>,
    final_score: Option<i32>,
    #[serde(default)]
    reject_triggered: bool,
    reason_top_matches: Option<String>,
    #[serde(default)]
    potential_contacts: Value,
}

#[derive(Debug, Deserialize)]
struct RawContact {
    name: Option<String>,
    title: Option<String>,
    company: Option<String>,
}

/// Calls the scorer prompt and sanitizes its response (spec §4.4).
pub async fn call_scorer(
    llm: &LlmClient,
    job: &JobRow,
    targets: &[TargetRow],
    max_tokens: u32,
) -> Result<ScorerOutput, AppError> {
    let prompt = build_prompt(job, targets);

    let (raw, usage): (ScorerRaw, Usage) = llm
        .call_json(&prompt, prompts::SCORER_SYSTEM, &CallOptions::deterministic(max_tokens))
        .await
        .map_err(|e| AppError::external(format!("InvalidModelJSON: {e}")))?;

    Ok(sanitize(raw, usage))
}

fn build_prompt(job: &JobRow, targets: &[TargetRow]) -> String {
    let targets_json: Vec<Value> = targets
        .iter()
        .map(|t| {
            serde_json::json!({
                "id": t.id,
                "name": t.name,
                "primary_role": t.primary_role,
                "seniority_pref": t.seniority_pref,
                "must_keywords": t.must_keywords,
                "nice_keywords": t.nice_keywords,
                "reject_keywords": t.reject_keywords,
            })
        })
        .collect();

    format!(
        "Job posting URL: {}\nRole title: {}\nCompany: {}\n\nJob description:\n{}\n\n\
         Candidate target profiles (JSON array):\n{}",
        job.job_url,
        job.role_title.as_deref().unwrap_or("unknown"),
        job.company.as_deref().unwrap_or("unknown"),
        job.jd_text_clean.as_deref().unwrap_or(""),
        serde_json::to_string(&targets_json).unwrap_or_else(|_| "[]".to_string()),
    )
}

fn sanitize(raw: ScorerRaw, usage: Usage) -> ScorerOutput {
    ScorerOutput {
        primary_target_id: raw
            .primary_target_id
            .and_then(|s| Uuid::parse_str(s.trim()).ok()),
        score_must: raw.score_must,
        score_nice: raw.score_nice,
        final_score: raw.final_score,
        reject_triggered: raw.reject_triggered,
        reason_top_matches: raw
            .reason_top_matches
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        potential_contacts: sanitize_contacts(&raw.potential_contacts),
        tokens_in: Some(usage.input_tokens),
        tokens_out: Some(usage.output_tokens),
    }
}

const CONTACT_BOILERPLATE: &[&str] = &[
    "hiring manager",
    "recruiter",
    "talent acquisition",
    "hr team",
    "human resources",
    "the team",
    "hiring team",
];

const MAX_CONTACTS: usize = 5;

/// Drops implausible names (too short, digit-bearing, single lowercase token,
/// role-boilerplate), dedupes case-insensitively, and caps at 5 (spec §9).
fn sanitize_contacts(value: &Value) -> Vec<SanitizedContact> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for item in items {
        let raw: RawContact = match serde_json::from_value(item.clone()) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let Some(name) = raw.name.map(|n| n.trim().to_string()) else {
            continue;
        };
        if !is_plausible_name(&name) {
            continue;
        }
        let key = name.to_lowercase();
        if !seen.insert(key) {
            continue;
        }
        out.push(SanitizedContact {
            name,
            title: raw.title.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            company: raw.company.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        });
        if out.len() >= MAX_CONTACTS {
            break;
        }
    }

    out
}

fn is_plausible_name(name: &str) -> bool {
    if name.chars().count() < 3 {
        return false;
    }
    if name.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let lower = name.to_lowercase();
    if CONTACT_BOILERPLATE.iter().any(|b| lower == *b) {
        return false;
    }
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() == 1 {
        let first_upper = words[0].chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
        if !first_upper {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_contacts_drops_boilerplate_and_short_names() {
        let value = serde_json::json!([
            {"name": "Hiring Manager"},
            {"name": "Jo"},
            {"name": "Agent007"},
            {"name": "Priya Shah", "title": "Engineering Manager", "company": "Acme"},
        ]);
        let contacts = sanitize_contacts(&value);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Priya Shah");
        assert_eq!(contacts[0].title.as_deref(), Some("Engineering Manager"));
    }

    #[test]
    fn sanitize_contacts_dedupes_case_insensitively() {
        let value = serde_json::json!([
            {"name": "Priya Shah"},
            {"name": "priya shah"},
        ]);
        assert_eq!(sanitize_contacts(&value).len(), 1);
    }

    #[test]
    fn sanitize_contacts_caps_at_five() {
        let items: Vec<Value> = (0..8)
            .map(|i| serde_json::json!({"name": format!("Person Number{i}")}))
            .collect();
        let contacts = sanitize_contacts(&Value::Array(items));
        assert_eq!(contacts.len(), 5);
    }

    #[test]
    fn sanitize_contacts_rejects_single_lowercase_token() {
        let value = serde_json::json!([{"name": "someone"}]);
        assert!(sanitize_contacts(&value).is_empty());
    }

    #[test]
    fn sanitize_parses_primary_target_uuid() {
        let id = Uuid::new_v4();
        let raw = ScorerRaw {
            primary_target_id: Some(id.to_string()),
            final_score: Some(82),
            ..Default::default()
        };
        let out = sanitize(raw, Usage::default());
        assert_eq!(out.primary_target_id, Some(id));
        assert_eq!(out.final_score, Some(82));
    }

    #[test]
    fn sanitize_treats_malformed_uuid_as_absent() {
        let raw = ScorerRaw {
            primary_target_id: Some("not-a-uuid".to_string()),
            ..Default::default()
        };
        assert_eq!(sanitize(raw, Usage::default()).primary_target_id, None);
    }

    #[test]
    fn sanitize_carries_token_usage() {
        let raw = ScorerRaw::default();
        let usage = Usage { input_tokens: 120, output_tokens: 45 };
        let out = sanitize(raw, usage);
        assert_eq!(out.tokens_in, Some(120));
        assert_eq!(out.tokens_out, Some(45));
    }
}
