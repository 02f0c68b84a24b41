//! Application Pack Manager (C7, spec §4.7).
//!
//! Draft state machine: `absent → CONTENT_REVIEW_REQUIRED (generate) →
//! READY_FOR_EXPORT (manual_edit passes the PDF gate) → READY_TO_APPLY
//! (approve)`. Every write appends a `resume_draft_versions` row.

pub mod ats;
pub mod content;
pub mod profile;
pub mod readiness;
pub mod rr_export;

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::draft::{DraftStatus, ResumeDraftRow, ResumeProfileRow};
use crate::models::job::JobRow;
use crate::models::target::TargetRow;
use crate::pack::ats::{AtsResult, AtsTargetMode};
use crate::pack::content::{OnePageMode, PackContent};
use crate::pack::profile::ProfileData;
use crate::pack::readiness::ReadinessCheck;
use crate::storage;

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub focus_keywords: Vec<String>,
    pub ats_mode: AtsTargetMode,
    pub one_page_mode: OnePageMode,
    pub force: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ManualEdit {
    pub summary: Option<String>,
    pub bullets: Option<Vec<String>>,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PackOutcome {
    pub draft: ResumeDraftRow,
    pub readiness: ReadinessCheck,
}

/// `generate` (spec §4.7): locked once the draft has been approved, unless
/// `force=true`. Always lands the draft in `CONTENT_REVIEW_REQUIRED`; only
/// `review` promotes it past the PDF gate.
pub async fn generate(
    pool: &PgPool,
    job: &JobRow,
    target: Option<&TargetRow>,
    profile_row: &ResumeProfileRow,
    options: &GenerateOptions,
) -> Result<PackOutcome, AppError> {
    let existing = storage::resumes::get_draft(pool, &job.job_key, profile_row.id).await?;
    if let Some(existing) = &existing {
        if existing.status == DraftStatus::ReadyToApply.as_db_str() && !options.force {
            return Err(AppError::Conflict(
                "draft is locked after approval; pass force=true to regenerate".to_string(),
            ));
        }
    }

    let profile = ProfileData::parse(&profile_row.profile_json);
    let focus = content::select_focus_keywords(&options.focus_keywords, &job.must_keywords);
    let pack = content::build(job, &profile, &focus, options.one_page_mode);
    let ats_result = ats::score(job, &pack, options.ats_mode);
    let export = rr_export::build(job, &profile, &pack, 1, "reactive_resume", template_id(target));
    let readiness = readiness::check(job, &pack, &ats_result, export.import_ready, options.one_page_mode);

    let pack_json = pack_to_json(&pack);
    let ats_json = ats_to_json(&ats_result, target);

    let draft = storage::resumes::upsert_draft(
        pool,
        &job.job_key,
        profile_row.id,
        &pack_json,
        &ats_json,
        &export.value,
        DraftStatus::ContentReviewRequired.as_db_str(),
    )
    .await?;

    storage::resumes::append_version(pool, draft.id, &pack_json, &ats_json, &export.value, "generate").await?;

    Ok(PackOutcome { draft, readiness })
}

/// `review` (spec §4.7): applies manual edits, recomputes ATS/export, and
/// promotes to `READY_FOR_EXPORT` when the PDF gate passes.
pub async fn review(
    pool: &PgPool,
    job: &JobRow,
    target: Option<&TargetRow>,
    draft: &ResumeDraftRow,
    edit: &ManualEdit,
    ats_mode: AtsTargetMode,
    one_page_mode: OnePageMode,
) -> Result<PackOutcome, AppError> {
    let mut pack = pack_from_json(&draft.pack_json);
    if let Some(summary) = &edit.summary {
        pack.summary = summary.clone();
    }
    if let Some(bullets) = &edit.bullets {
        pack.bullets = bullets.clone();
    }
    if let Some(cover_letter) = &edit.cover_letter {
        pack.cover_letter = cover_letter.clone();
    }

    let ats_result = ats::score(job, &pack, ats_mode);
    let profile = Value::Null; // review edits content directly; profile basics come from the prior export
    let prior_basics = draft.rr_export_json.get("basics").cloned().unwrap_or(profile);
    let export = rr_export_from_edit(job, &pack, &draft.rr_export_json, prior_basics);
    let readiness = readiness::check(job, &pack, &ats_result, export.import_ready, one_page_mode);

    let status = if readiness.passed {
        DraftStatus::ReadyForExport
    } else {
        DraftStatus::ContentReviewRequired
    };

    let pack_json = pack_to_json(&pack);
    let ats_json = ats_to_json(&ats_result, target);

    let updated = storage::resumes::upsert_draft(
        pool,
        &job.job_key,
        draft.profile_id,
        &pack_json,
        &ats_json,
        &export.value,
        status.as_db_str(),
    )
    .await?;

    storage::resumes::append_version(pool, draft.id, &pack_json, &ats_json, &export.value, "manual_edit").await?;

    Ok(PackOutcome { draft: updated, readiness })
}

/// `approve` (spec §4.7): requires the draft to already be `READY_FOR_EXPORT`;
/// transitions both the draft and the job to `READY_TO_APPLY`.
pub async fn approve(pool: &PgPool, job: &JobRow, draft: &ResumeDraftRow) -> Result<ResumeDraftRow, AppError> {
    if draft.status != DraftStatus::ReadyForExport.as_db_str() {
        return Err(AppError::Conflict(format!(
            "draft must be READY_FOR_EXPORT to approve, currently {}",
            draft.status
        )));
    }

    let updated = storage::resumes::upsert_draft(
        pool,
        &job.job_key,
        draft.profile_id,
        &draft.pack_json,
        &draft.ats_json,
        &draft.rr_export_json,
        DraftStatus::ReadyToApply.as_db_str(),
    )
    .await?;

    storage::resumes::append_version(
        pool,
        draft.id,
        &draft.pack_json,
        &draft.ats_json,
        &draft.rr_export_json,
        "approve",
    )
    .await?;

    storage::jobs::set_status(pool, &job.job_key, "READY_TO_APPLY").await?;

    Ok(updated)
}

/// `revert(version_id)` (spec §4.7, §8): restores that version's payload
/// byte-identical and appends a new `revert`-tagged version.
pub async fn revert(pool: &PgPool, draft: &ResumeDraftRow, version_id: Uuid) -> Result<ResumeDraftRow, AppError> {
    let version = storage::resumes::get_version(pool, version_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("draft version {version_id} not found")))?;

    if version.draft_id != draft.id {
        return Err(AppError::InvalidInput(
            "version does not belong to this draft".to_string(),
        ));
    }

    let updated = storage::resumes::upsert_draft(
        pool,
        &draft.job_key,
        draft.profile_id,
        &version.pack_json,
        &version.ats_json,
        &version.rr_export_json,
        &draft.status,
    )
    .await?;

    storage::resumes::append_version(
        pool,
        draft.id,
        &version.pack_json,
        &version.ats_json,
        &version.rr_export_json,
        "revert",
    )
    .await?;

    Ok(updated)
}

fn template_id(target: Option<&TargetRow>) -> &'static str {
    match target {
        Some(_) => "targeted",
        None => "default",
    }
}

fn pack_to_json(pack: &PackContent) -> Value {
    json!({
        "summary": pack.summary,
        "bullets": pack.bullets,
        "cover_letter": pack.cover_letter,
        "focus_keywords": pack.focus_keywords,
    })
}

fn pack_from_json(value: &Value) -> PackContent {
    PackContent {
        summary: value.get("summary").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        bullets: value
            .get("bullets")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|b| b.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default(),
        cover_letter: value.get("cover_letter").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        focus_keywords: value
            .get("focus_keywords")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|k| k.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default(),
    }
}

/// `target_rubric`/`pm_rubric` duality (SPEC_FULL §10 Open Question #1):
/// `target_rubric` always carries the computed rubric; `pm_rubric` mirrors it
/// only when the rubric actually is PM-v1, matching the legacy field's
/// original meaning instead of aliasing it unconditionally.
fn ats_to_json(ats: &AtsResult, target: Option<&TargetRow>) -> Value {
    let rubric = json!({
        "profile": ats.rubric.profile,
        "dimensions": ats.rubric.dimensions.iter().map(|(k, v)| json!({"name": k, "score": v})).collect::<Vec<_>>(),
        "overall": ats.rubric.overall,
    });
    let pm_rubric = if ats.rubric.profile == "pm_v1" {
        rubric.clone()
    } else {
        Value::Null
    };
    json!({
        "score": ats.score,
        "must_coverage_pct": ats.must_coverage_pct,
        "nice_coverage_pct": ats.nice_coverage_pct,
        "missing_keywords": ats.missing_keywords,
        "notes": ats.notes,
        "target_rubric": rubric,
        "pm_rubric": pm_rubric,
        "rubric_profile_label": ats::rubric_profile_label(target),
    })
}

fn rr_export_from_edit(job: &JobRow, pack: &PackContent, prior_export: &Value, prior_basics: Value) -> rr_export::RrExport {
    let profile = profile::ProfileData {
        basics: profile::ProfileBasics {
            name: prior_basics.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            email: prior_basics.get("email").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            phone: prior_basics.get("phone").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            location: prior_basics.get("location").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        },
        summary: pack.summary.clone(),
        experience: Vec::new(),
        skills: Vec::new(),
    };
    let version = prior_export
        .get("metadata")
        .and_then(|m| m.get("version"))
        .and_then(|v| v.as_i64())
        .unwrap_or(1) as i32
        + 1;
    rr_export::build(job, &profile, pack, version, "reactive_resume", "targeted")
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
            role_title: Some("Staff Engineer".to_string()),
            location: None,
            work_mode: None,
            seniority: None,
            experience_years_min: None,
            experience_years_max: None,
            must_keywords: vec!["rust".to_string(), "postgres".to_string()],
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

    #[test]
    fn pack_json_round_trips() {
        let profile = ProfileData::parse(&serde_json::json!({"skills": ["rust"]}));
        let pack = content::build(&job(), &profile, &["rust".to_string(), "postgres".to_string()], OnePageMode::Soft);
        let value = pack_to_json(&pack);
        let restored = pack_from_json(&value);
        assert_eq!(restored.summary, pack.summary);
        assert_eq!(restored.bullets, pack.bullets);
        assert_eq!(restored.focus_keywords, pack.focus_keywords);
    }

    #[test]
    fn pm_rubric_is_null_for_generic_rubric_but_set_for_pm_v1() {
        let profile = ProfileData::parse(&serde_json::json!({"skills": ["rust"]}));
        let pack = content::build(&job(), &profile, &["rust".to_string()], OnePageMode::Soft);
        let generic = ats::score(&job(), &pack, AtsTargetMode::All);
        let generic_json = ats_to_json(&generic, None);
        assert!(generic_json["pm_rubric"].is_null());

        let mut pm_job = job();
        pm_job.role_title = Some("Senior Product Manager".to_string());
        let pm_ats = ats::score(&pm_job, &pack, AtsTargetMode::All);
        let pm_json = ats_to_json(&pm_ats, None);
        assert_eq!(pm_json["target_rubric"], pm_json["pm_rubric"]);
    }
}
