pub mod evidence;
pub mod health;
pub mod ingest;
pub mod jobs;
pub mod pack;

use axum::{
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::models::draft::ResumeProfileRow;
use crate::state::AppState;
use crate::storage;

pub use self::pack::readiness_json;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // ── Ingestion (C6, spec §6) ─────────────────────────────────────
        .route("/ingest", post(ingest::handle_ingest))
        .route("/ingest/whatsapp/vonage", post(ingest::handle_webhook_whatsapp))
        // ── Per-job scoring lifecycle (C4, spec §6) ─────────────────────
        .route("/jobs/:job_key/rescore", post(jobs::handle_rescore))
        .route("/jobs/:job_key/manual-jd", post(jobs::handle_manual_jd))
        .route("/jobs/:job_key/auto-pilot", post(jobs::handle_auto_pilot))
        .route("/score-pending", post(jobs::handle_score_pending))
        // ── Evidence engine (C5, spec §6) ───────────────────────────────
        .route(
            "/jobs/evidence/rebuild-archived",
            post(evidence::handle_rebuild_archived),
        )
        .route("/jobs/evidence/gap-report", get(evidence::handle_gap_report))
        // ── Application Pack Manager (C7, spec §6) ──────────────────────
        .route(
            "/jobs/:job_key/application-pack/generate",
            post(pack::handle_generate),
        )
        .route(
            "/jobs/:job_key/application-pack/review",
            post(pack::handle_review),
        )
        .route(
            "/jobs/:job_key/application-pack/approve",
            post(pack::handle_approve),
        )
        .route(
            "/jobs/:job_key/application-pack/revert",
            post(pack::handle_revert),
        )
        .with_state(state)
}

/// Resolves the résumé profile to use for a given job: an explicit
/// Job-Profile Preference override (spec §3) if one exists, else the
/// designated primary profile (spec §4.7's `profile_id` resolution).
pub async fn resolve_profile(state: &AppState, job_key: &str) -> Result<ResumeProfileRow, AppError> {
    if state.schema.has_job_profile_preferences {
        if let Some(pref) = storage::targets::get_profile_preference(&state.db, job_key).await? {
            if let Some(profile) = storage::resumes::get_profile(&state.db, pref.profile_id).await? {
                return Ok(profile);
            }
        }
    }

    storage::resumes::get_primary_profile(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("no primary resume profile configured".to_string()))
}
