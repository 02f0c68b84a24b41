//! Per-job rescore/manual-jd/auto-pilot routes and the `/score-pending` batch
//! entry point (spec §6).

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::evidence;
use crate::pack;
use crate::scoring;
use crate::state::AppState;
use crate::storage;
use crate::storage::jobs::ExtractedUpdate;

#[derive(Debug, Deserialize, Default)]
pub struct RescoreRequest {
    pub jd_text_clean: Option<String>,
    pub role_title: Option<String>,
}

/// `POST /jobs/{job_key}/rescore` (spec §6): 404 if unknown; 400 if the job
/// (after any body overrides are applied) has neither `jd_text_clean` nor
/// `role_title` to score against.
pub async fn handle_rescore(
    State(state): State<AppState>,
    Path(job_key): Path<String>,
    body: Option<Json<RescoreRequest>>,
) -> Result<Json<Value>, AppError> {
    let mut job = storage::jobs::get(&state.db, &job_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {job_key} not found")))?;

    if let Some(Json(req)) = body {
        if let Some(jd) = req.jd_text_clean {
            job = storage::jobs::set_manual_jd(&state.db, &job_key, &jd).await?;
        }
        if let Some(role_title) = req.role_title {
            job = storage::jobs::apply_extracted(
                &state.db,
                &job_key,
                &ExtractedUpdate {
                    role_title: Some(role_title),
                    ..Default::default()
                },
            )
            .await?;
        }
    }

    if job.jd_text_clean.as_deref().unwrap_or("").is_empty() && job.role_title.is_none() {
        return Err(AppError::InvalidInput(
            "job has neither jd_text_clean nor role_title to score against".to_string(),
        ));
    }

    let targets = storage::targets::list_all(&state.db).await?;
    let outcome = scoring::run(&state.db, &state.llm, &state.config, &job, &targets, "api_rescore", true).await?;

    if let Ok(profile) = super::resolve_profile(&state, &job_key).await {
        if let Err(e) = evidence::rebuild_for_job(&state.db, &outcome.job, &profile).await {
            tracing::warn!(job_key = %job_key, error = %e, "EVIDENCE_UPSERT_FAILED during rescore");
        }
    }

    Ok(Json(json!({
        "ok": true,
        "data": {
            "job_key": outcome.job.job_key,
            "final_score": outcome.job.final_score,
            "status": outcome.job.status,
            "primary_target_id": outcome.job.primary_target_id,
            "potential_contacts": outcome.potential_contacts.iter().map(|c| json!({
                "name": c.name,
                "title": c.title,
                "company": c.company,
            })).collect::<Vec<_>>(),
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct ManualJdRequest {
    pub jd_text_clean: String,
}

/// `POST /jobs/{job_key}/manual-jd` (spec §6): requires >=200 chars.
pub async fn handle_manual_jd(
    State(state): State<AppState>,
    Path(job_key): Path<String>,
    Json(body): Json<ManualJdRequest>,
) -> Result<Json<Value>, AppError> {
    if body.jd_text_clean.chars().count() < 200 {
        return Err(AppError::InvalidInput(
            "jd_text_clean must be at least 200 characters".to_string(),
        ));
    }

    storage::jobs::get(&state.db, &job_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {job_key} not found")))?;

    let job = storage::jobs::set_manual_jd(&state.db, &job_key, &body.jd_text_clean).await?;

    Ok(Json(json!({
        "ok": true,
        "data": {
            "job_key": job.job_key,
            "jd_source": job.jd_source,
            "fetch_status": job.fetch_status,
        }
    })))
}

/// `POST /jobs/{job_key}/auto-pilot` (spec §6): combined rescore + pack generate.
pub async fn handle_auto_pilot(
    State(state): State<AppState>,
    Path(job_key): Path<String>,
) -> Result<Json<Value>, AppError> {
    let job = storage::jobs::get(&state.db, &job_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {job_key} not found")))?;

    if job.jd_text_clean.as_deref().unwrap_or("").is_empty() && job.role_title.is_none() {
        return Err(AppError::InvalidInput(
            "job has neither jd_text_clean nor role_title to score against".to_string(),
        ));
    }

    let targets = storage::targets::list_all(&state.db).await?;
    let outcome = scoring::run(&state.db, &state.llm, &state.config, &job, &targets, "api_auto_pilot", true).await?;

    let profile = super::resolve_profile(&state, &job_key).await?;
    if let Err(e) = evidence::rebuild_for_job(&state.db, &outcome.job, &profile).await {
        tracing::warn!(job_key = %job_key, error = %e, "EVIDENCE_UPSERT_FAILED during auto-pilot");
    }

    let target = match outcome.job.primary_target_id {
        Some(id) => storage::targets::get(&state.db, id).await?,
        None => None,
    };

    let pack_outcome = pack::generate(
        &state.db,
        &outcome.job,
        target.as_ref(),
        &profile,
        &pack::GenerateOptions::default(),
    )
    .await?;

    Ok(Json(json!({
        "ok": true,
        "data": {
            "job_key": outcome.job.job_key,
            "final_score": outcome.job.final_score,
            "status": outcome.job.status,
            "draft": pack_outcome.draft,
            "readiness": super::readiness_json(&pack_outcome.readiness),
        }
    })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ScorePendingRequest {
    pub limit: Option<i64>,
    pub status: Option<String>,
}

/// `POST /score-pending` (spec §6): batch rescore picking oldest `updated_at`.
pub async fn handle_score_pending(
    State(state): State<AppState>,
    Json(body): Json<ScorePendingRequest>,
) -> Result<Json<Value>, AppError> {
    let limit = body.limit.unwrap_or(25).clamp(1, 200);
    let statuses: Vec<String> = body
        .status
        .as_deref()
        .unwrap_or("NEW,SCORED,LINK_ONLY")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let jobs = storage::jobs::list_by_status(&state.db, &statuses, limit).await?;
    let targets = storage::targets::list_all(&state.db).await?;

    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        let job_key = job.job_key.clone();
        match scoring::run(&state.db, &state.llm, &state.config, &job, &targets, "api_score_pending", true).await {
            Ok(outcome) => {
                results.push(json!({
                    "job_key": outcome.job.job_key,
                    "final_score": outcome.job.final_score,
                    "status": outcome.job.status,
                }));
            }
            Err(e) => {
                tracing::warn!(job_key = %job_key, error = %e, "AI_FAILED during score-pending");
                results.push(json!({ "job_key": job_key, "error": e.to_string() }));
            }
        }
    }

    Ok(Json(json!({ "ok": true, "data": { "results": results } })))
}
