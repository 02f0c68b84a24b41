//! Application-Pack state machine routes: generate/review/approve/revert
//! (spec §6, C7).

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pack::ats::AtsTargetMode;
use crate::pack::content::OnePageMode;
use crate::pack::{self, GenerateOptions, ManualEdit, PackOutcome, ReadinessCheck};
use crate::state::AppState;
use crate::storage;

fn parse_ats_mode(raw: Option<&str>) -> AtsTargetMode {
    match raw {
        Some(s) if s.eq_ignore_ascii_case("selected_only") => AtsTargetMode::SelectedOnly,
        _ => AtsTargetMode::All,
    }
}

fn parse_one_page_mode(raw: Option<&str>) -> OnePageMode {
    match raw {
        Some(s) if s.eq_ignore_ascii_case("hard") => OnePageMode::Hard,
        _ => OnePageMode::Soft,
    }
}

pub fn readiness_json(readiness: &ReadinessCheck) -> Value {
    json!({
        "passed": readiness.passed,
        "failures": readiness.failures,
        "warnings": readiness.warnings,
    })
}

fn pack_outcome_json(outcome: &PackOutcome) -> Value {
    json!({
        "draft": outcome.draft,
        "readiness": readiness_json(&outcome.readiness),
    })
}

async fn load_job_and_target(
    state: &AppState,
    job_key: &str,
) -> Result<(crate::models::job::JobRow, Option<crate::models::target::TargetRow>), AppError> {
    let job = storage::jobs::get(&state.db, job_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {job_key} not found")))?;
    let target = match job.primary_target_id {
        Some(id) => storage::targets::get(&state.db, id).await?,
        None => None,
    };
    Ok((job, target))
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateRequest {
    #[serde(default)]
    pub focus_keywords: Vec<String>,
    pub ats_mode: Option<String>,
    pub one_page_mode: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/// `POST /jobs/{job_key}/application-pack/generate` (spec §6, §4.7).
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(job_key): Path<String>,
    body: Option<Json<GenerateRequest>>,
) -> Result<Json<Value>, AppError> {
    let (job, target) = load_job_and_target(&state, &job_key).await?;
    let profile = super::resolve_profile(&state, &job_key).await?;

    let body = body.map(|Json(b)| b).unwrap_or_default();
    let options = GenerateOptions {
        focus_keywords: body.focus_keywords,
        ats_mode: parse_ats_mode(body.ats_mode.as_deref()),
        one_page_mode: parse_one_page_mode(body.one_page_mode.as_deref()),
        force: body.force,
    };

    let outcome = pack::generate(&state.db, &job, target.as_ref(), &profile, &options).await?;
    Ok(Json(json!({ "ok": true, "data": pack_outcome_json(&outcome) })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ReviewRequest {
    pub summary: Option<String>,
    pub bullets: Option<Vec<String>>,
    pub cover_letter: Option<String>,
    pub ats_mode: Option<String>,
    pub one_page_mode: Option<String>,
}

/// `POST /jobs/{job_key}/application-pack/review` (spec §6, §4.7).
pub async fn handle_review(
    State(state): State<AppState>,
    Path(job_key): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Value>, AppError> {
    let (job, target) = load_job_and_target(&state, &job_key).await?;
    let profile = super::resolve_profile(&state, &job_key).await?;
    let draft = storage::resumes::get_draft(&state.db, &job_key, profile.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no application pack draft exists for this job".to_string()))?;

    let edit = ManualEdit {
        summary: body.summary,
        bullets: body.bullets,
        cover_letter: body.cover_letter,
    };
    let ats_mode = parse_ats_mode(body.ats_mode.as_deref());
    let one_page_mode = parse_one_page_mode(body.one_page_mode.as_deref());

    let outcome = pack::review(&state.db, &job, target.as_ref(), &draft, &edit, ats_mode, one_page_mode).await?;
    Ok(Json(json!({ "ok": true, "data": pack_outcome_json(&outcome) })))
}

/// `POST /jobs/{job_key}/application-pack/approve` (spec §6, §4.7): requires
/// `READY_FOR_EXPORT`; transitions job to `READY_TO_APPLY`.
pub async fn handle_approve(
    State(state): State<AppState>,
    Path(job_key): Path<String>,
) -> Result<Json<Value>, AppError> {
    let (job, _target) = load_job_and_target(&state, &job_key).await?;
    let profile = super::resolve_profile(&state, &job_key).await?;
    let draft = storage::resumes::get_draft(&state.db, &job_key, profile.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no application pack draft exists for this job".to_string()))?;

    let updated = pack::approve(&state.db, &job, &draft).await?;
    Ok(Json(json!({ "ok": true, "data": { "draft": updated } })))
}

#[derive(Debug, Deserialize)]
pub struct RevertRequest {
    pub version_id: Uuid,
}

/// `POST /jobs/{job_key}/application-pack/revert` (spec §6, §4.7/§8): restores
/// a prior version byte-identical and appends a new `revert`-tagged version.
pub async fn handle_revert(
    State(state): State<AppState>,
    Path(job_key): Path<String>,
    Json(body): Json<RevertRequest>,
) -> Result<Json<Value>, AppError> {
    let profile = super::resolve_profile(&state, &job_key).await?;
    let draft = storage::resumes::get_draft(&state.db, &job_key, profile.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no application pack draft exists for this job".to_string()))?;

    let updated = pack::revert(&state.db, &draft, body.version_id).await?;
    Ok(Json(json!({ "ok": true, "data": { "draft": updated } })))
}
