//! External-résumé export contract (spec §6 `rr_export_json`).
//!
//! Builds the `jobops.rr_export.v1` payload and validates it for contract
//! shape and import-readiness so callers never have to guess whether a
//! downstream renderer will accept it.

use serde_json::{json, Value};

use crate::models::job::JobRow;
use crate::pack::content::PackContent;
use crate::pack::profile::ProfileData;

pub const CONTRACT_ID: &str = "jobops.rr_export.v1";
pub const SCHEMA_VERSION: i32 = 1;

pub struct RrExport {
    pub value: Value,
    pub contract_valid: bool,
    pub import_ready: bool,
}

pub fn build(job: &JobRow, profile: &ProfileData, content: &PackContent, version: i32, renderer: &str, template_id: &str) -> RrExport {
    let basics = json!({
        "name": profile.basics.name,
        "email": profile.basics.email,
        "phone": profile.basics.phone,
        "location": profile.basics.location,
        "summary": content.summary,
    });

    let experience: Vec<Value> = profile
        .experience
        .iter()
        .map(|e| json!({"title": e.title, "company": e.company, "bullets": e.bullets}))
        .collect();

    let skills: Vec<Value> = profile.skills.iter().map(|s| json!(s)).collect();

    let highlights: Vec<Value> = content
        .bullets
        .iter()
        .map(|b| json!({"text": b}))
        .collect();

    let sections = json!({
        "experience": experience,
        "skills": skills,
        "highlights": highlights,
    });

    let job_context = json!({
        "job_key": job.job_key,
        "role_title": job.role_title,
        "company": job.company,
        "job_url": job.job_url,
    });

    let (contract_valid, contract_errors) = validate_contract(&basics, &sections, &job_context);
    let (import_ready, import_errors) = validate_import_readiness(&basics, &sections, &job_context);

    let mut metadata = json!({
        "source": "jobops",
        "contract_id": CONTRACT_ID,
        "schema_version": SCHEMA_VERSION,
        "version": version,
        "template_id": template_id,
        "renderer": renderer,
        "contract_valid": contract_valid,
        "import_ready": import_ready,
    });
    if !contract_errors.is_empty() {
        metadata["contract_errors"] = json!(contract_errors);
    }
    if !import_errors.is_empty() {
        metadata["import_errors"] = json!(import_errors);
    }

    RrExport {
        value: json!({
            "metadata": metadata,
            "basics": basics,
            "sections": sections,
            "job_context": job_context,
        }),
        contract_valid,
        import_ready,
    }
}

fn validate_contract(basics: &Value, sections: &Value, job_context: &Value) -> (bool, Vec<String>) {
    let mut errors = Vec::new();
    if !basics.is_object() {
        errors.push("basics must be an object".to_string());
    }
    if !sections.is_object() {
        errors.push("sections must be an object".to_string());
    }
    if job_context.get("job_key").is_none() {
        errors.push("job_context.job_key is required".to_string());
    }
    (errors.is_empty(), errors)
}

/// Import-readiness (spec §6): every `basics.*` must be a string, every
/// `sections` entry must be an array, highlight items need non-empty `text`,
/// and `job_context.job_key` must be non-empty.
fn validate_import_readiness(basics: &Value, sections: &Value, job_context: &Value) -> (bool, Vec<String>) {
    let mut errors = Vec::new();

    for key in ["name", "email", "phone", "location", "summary"] {
        match basics.get(key) {
            Some(Value::String(_)) => {}
            _ => errors.push(format!("basics.{key} must be a string")),
        }
    }

    for key in ["experience", "skills", "highlights"] {
        match sections.get(key) {
            Some(Value::Array(_)) => {}
            _ => errors.push(format!("sections.{key} must be an array")),
        }
    }

    if let Some(Value::Array(highlights)) = sections.get("highlights") {
        for (i, h) in highlights.iter().enumerate() {
            let text_ok = h.get("text").and_then(|t| t.as_str()).is_some_and(|s| !s.is_empty());
            if !text_ok {
                errors.push(format!("sections.highlights[{i}].text must be non-empty"));
            }
        }
    }

    let job_key_ok = job_context
        .get("job_key")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty());
    if !job_key_ok {
        errors.push("job_context.job_key must be non-empty".to_string());
    }

    (errors.is_empty(), errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::content::PackContent;
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

    fn content() -> PackContent {
        PackContent {
            summary: "A summary.".to_string(),
            bullets: vec!["Delivered measurable impact by applying rust to outcomes".to_string()],
            cover_letter: "letter".to_string(),
            focus_keywords: vec!["rust".to_string()],
        }
    }

    #[test]
    fn valid_export_reports_import_ready() {
        let profile = ProfileData::parse(&serde_json::json!({
            "basics": {"name": "Jo", "email": "jo@example.com", "phone": "555", "location": "Remote"},
        }));
        let export = build(&job(), &profile, &content(), 1, "reactive_resume", "default");
        assert!(export.contract_valid);
        assert!(export.import_ready);
        assert_eq!(export.value["metadata"]["contract_id"], CONTRACT_ID);
        assert_eq!(export.value["metadata"]["schema_version"], SCHEMA_VERSION);
    }

    #[test]
    fn empty_job_key_fails_import_readiness() {
        let mut j = job();
        j.job_key = String::new();
        let profile = ProfileData::parse(&serde_json::json!({"basics": {"name": "Jo"}}));
        let export = build(&j, &profile, &content(), 1, "reactive_resume", "default");
        assert!(!export.import_ready);
    }
}
