//! Evidence rebuild and gap-report routes (spec §6, C5/C9).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evidence::gap_report;
use crate::pack::profile::ProfileData;
use crate::state::AppState;
use crate::storage;

#[derive(Debug, Deserialize, Default)]
pub struct RebuildArchivedQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// `POST /jobs/evidence/rebuild-archived` (spec §6): rebuilds evidence rows
/// for archived/shortlisted jobs against the primary profile, without
/// re-running scoring.
pub async fn handle_rebuild_archived(
    State(state): State<AppState>,
    Query(query): Query<RebuildArchivedQuery>,
) -> Result<Json<Value>, AppError> {
    state.schema.require_job_evidence()?;

    let profile = storage::resumes::get_primary_profile(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("no primary resume profile configured".to_string()))?;

    let limit = query.limit.unwrap_or(200).clamp(1, 2000);
    let jobs = storage::jobs::list_archived_with_profile(&state.db, query.status.as_deref(), limit).await?;

    let mut rebuilt = 0usize;
    let mut failed = 0usize;
    for job in &jobs {
        match crate::evidence::rebuild_for_job(&state.db, job, &profile).await {
            Ok(_) => rebuilt += 1,
            Err(e) => {
                tracing::warn!(job_key = %job.job_key, error = %e, "EVIDENCE_UPSERT_FAILED during rebuild-archived");
                failed += 1;
            }
        }
    }

    Ok(Json(json!({
        "ok": true,
        "data": {
            "jobs_considered": jobs.len(),
            "rebuilt": rebuilt,
            "failed": failed,
        }
    })))
}

#[derive(Debug, Deserialize, Default)]
pub struct GapReportQuery {
    pub status: Option<String>,
    pub top: Option<i64>,
    pub min_missed: Option<i64>,
    pub profile_id: Option<Uuid>,
}

/// `GET /jobs/evidence/gap-report` (spec §6): aggregates frequently-missed
/// `must` requirements across a job set and classifies each against the
/// chosen profile's corpus.
pub async fn handle_gap_report(
    State(state): State<AppState>,
    Query(query): Query<GapReportQuery>,
) -> Result<Json<Value>, AppError> {
    state.schema.require_job_evidence()?;

    let profile = match query.profile_id {
        Some(id) => storage::resumes::get_profile(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {id} not found")))?,
        None => storage::resumes::get_primary_profile(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("no primary resume profile configured".to_string()))?,
    };

    let jobs = storage::jobs::list_archived_with_profile(&state.db, query.status.as_deref(), 5000).await?;
    let job_keys: Vec<String> = jobs.iter().map(|j| j.job_key.clone()).collect();

    let min_missed = query.min_missed.unwrap_or(2).max(1);
    let missed = storage::evidence::missed_must_counts(&state.db, &job_keys, min_missed).await?;

    let profile_data = ProfileData::parse(&profile.profile_json);
    let mut corpus = profile_data.summary.clone();
    for exp in &profile_data.experience {
        for bullet in &exp.bullets {
            corpus.push(' ');
            corpus.push_str(bullet);
        }
    }

    let top = query.top.unwrap_or(20).clamp(1, 200) as usize;
    let mut report = gap_report::build_report(&missed, &corpus);
    report.truncate(top);

    Ok(Json(json!({ "ok": true, "data": { "entries": report } })))
}
