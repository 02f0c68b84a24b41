//! Scoring Pipeline (C4, spec §4.4).
//!
//! The state machine that takes a resolved job through
//! `heuristic → extract → ai_reason → verdict → transition → telemetry`.
//! Every run writes exactly one append-only `scoring_runs` row and applies at
//! most one idempotent update to `jobs` (spec §5: "no cross-job ordering
//! guarantees... `scoring_runs` rows are append-only").

pub mod ai;
pub mod heuristic;
pub mod transition;
pub mod verdict;

use std::time::Instant;

use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::extractor::{self, Extracted};
use crate::llm_client::LlmClient;
use crate::models::job::JobRow;
use crate::models::target::TargetRow;
use crate::scoring::ai::{self as scoring_ai, ScorerOutput};
use crate::scoring::transition::EntryReason;
use crate::storage;
use crate::storage::jobs::{ExtractedUpdate, ScoreUpdate};
use crate::storage::scoring_runs::NewScoringRun;
use sqlx::PgPool;

/// The outcome of one pipeline run, already persisted to `jobs` and
/// `scoring_runs` by the time this is returned.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub job: JobRow,
    pub extracted: Option<Extracted>,
    pub potential_contacts: Vec<scoring_ai::SanitizedContact>,
}

/// Runs the full scoring pipeline against a single job and its candidate
/// targets, applying the resulting status transition and telemetry row.
///
/// `skip_extract_if_present`: when true (rescore path, spec §4.4 "skipped in
/// rescore if caller supplied extracted fields"), the `extract` stage is
/// skipped whenever the job already has a `role_title`.
pub async fn run(
    pool: &PgPool,
    llm: &LlmClient,
    config: &Config,
    job: &JobRow,
    targets: &[TargetRow],
    source: &str,
    skip_extract_if_present: bool,
) -> Result<PipelineOutcome, AppError> {
    let total_start = Instant::now();
    let jd_text = job.jd_text_clean.clone().unwrap_or_default();

    let heuristic_start = Instant::now();
    let heuristic_result = heuristic::evaluate(
        &jd_text,
        targets,
        config.min_jd_chars,
        config.min_target_signal,
    );
    let heuristic_ms = heuristic_start.elapsed().as_millis() as i32;

    if !heuristic_result.passed {
        let reason_top_matches = format!("Heuristic reject: {}", heuristic_result.reasons.join("; "));
        let transition = transition::resolve(EntryReason::HeuristicRejected);

        let updated = storage::jobs::apply_scoring(
            pool,
            &job.job_key,
            &ScoreUpdate {
                primary_target_id: None,
                score_must: None,
                score_nice: None,
                final_score: Some(0),
                reject_triggered: true,
                reject_reasons: heuristic_result.reasons.clone(),
                reason_top_matches: Some(reason_top_matches),
                status: transition.status.to_string(),
                system_status: transition.system_status.map(|s| s.to_string()),
            },
        )
        .await?;

        storage::scoring_runs::insert(
            pool,
            &NewScoringRun {
                job_key: job.job_key.clone(),
                source: source.to_string(),
                final_status: "heuristic_rejected".to_string(),
                heuristic_passed: false,
                heuristic_reasons: heuristic_result.reasons,
                stage_metrics: json!({ "heuristic_ms": heuristic_ms }),
                ai_model: None,
                ai_tokens_in: None,
                ai_tokens_out: None,
                ai_tokens_total: None,
                ai_latency_ms: None,
                total_latency_ms: total_start.elapsed().as_millis() as i32,
                final_score: Some(0),
                reject_triggered: true,
            },
        )
        .await?;

        return Ok(PipelineOutcome {
            job: updated,
            extracted: None,
            potential_contacts: Vec::new(),
        });
    }

    let extract_start = Instant::now();
    let mut extracted: Option<Extracted> = None;
    let mut working_job = job.clone();

    let needs_extract = !(skip_extract_if_present && job.role_title.is_some());
    if needs_extract {
        match extractor::extract_jd(llm, &jd_text, &job.job_url, config.extractor_max_tokens).await {
            Ok(ext) => {
                let persisted = storage::jobs::apply_extracted(
                    pool,
                    &job.job_key,
                    &ExtractedUpdate {
                        company: ext.company.clone(),
                        role_title: ext.role_title.clone(),
                        location: ext.location.clone(),
                        work_mode: ext.work_mode.clone(),
                        seniority: ext.seniority.clone(),
                        experience_years_min: ext.experience_years_min,
                        experience_years_max: ext.experience_years_max,
                        must_keywords: ext.must_keywords.clone(),
                        nice_keywords: ext.nice_keywords.clone(),
                        reject_keywords: ext.reject_keywords.clone(),
                        skills: ext.skills.clone(),
                    },
                )
                .await?;
                working_job = persisted;
                extracted = Some(ext);
            }
            Err(e) => {
                tracing::warn!(job_key = %job.job_key, error = %e, "AI_FAILED: extraction failed, continuing with existing fields");
            }
        }
    }
    let extract_ms = extract_start.elapsed().as_millis() as i32;

    let ai_start = Instant::now();
    let scorer_output: ScorerOutput = scoring_ai::call_scorer(llm, &working_job, targets, config.extractor_max_tokens)
        .await
        .map_err(|e| {
            tracing::warn!(job_key = %job.job_key, error = %e, "AI_FAILED: scorer call failed");
            e
        })?;
    let ai_ms = ai_start.elapsed().as_millis() as i32;

    let verdict_start = Instant::now();
    let verdict = verdict::merge(
        scorer_output.final_score,
        scorer_output.reject_triggered,
        &jd_text,
        targets,
    );
    let verdict_ms = verdict_start.elapsed().as_millis() as i32;

    let transition = transition::resolve_scored(
        verdict.final_score,
        verdict.reject_triggered,
        config.score_threshold_shortlist,
        config.score_threshold_archive,
    );

    let reason_top_matches = if verdict.reject_triggered {
        Some(format!("Reject: {}", verdict.reject_reasons.join("; ")))
    } else {
        scorer_output.reason_top_matches.clone()
    };

    let updated = storage::jobs::apply_scoring(
        pool,
        &job.job_key,
        &ScoreUpdate {
            primary_target_id: scorer_output.primary_target_id.or(best_target_id(targets)),
            score_must: scorer_output.score_must,
            score_nice: scorer_output.score_nice,
            final_score: Some(verdict.final_score),
            reject_triggered: verdict.reject_triggered,
            reject_reasons: verdict.reject_reasons.clone(),
            reason_top_matches,
            status: transition.status.to_string(),
            system_status: transition.system_status.map(|s| s.to_string()),
        },
    )
    .await?;

    let final_status = if verdict.reject_triggered {
        "scored_rejected"
    } else {
        match transition.status {
            "SHORTLISTED" => "scored_shortlisted",
            "ARCHIVED" => "scored_archived",
            _ => "scored",
        }
    };

    storage::scoring_runs::insert(
        pool,
        &NewScoringRun {
            job_key: job.job_key.clone(),
            source: source.to_string(),
            final_status: final_status.to_string(),
            heuristic_passed: true,
            heuristic_reasons: Vec::new(),
            stage_metrics: json!({
                "heuristic_ms": heuristic_ms,
                "extract_ms": extract_ms,
                "ai_ms": ai_ms,
                "verdict_ms": verdict_ms,
            }),
            ai_model: Some(crate::llm_client::MODEL.to_string()),
            ai_tokens_in: scorer_output.tokens_in.map(|n| n as i32),
            ai_tokens_out: scorer_output.tokens_out.map(|n| n as i32),
            ai_tokens_total: match (scorer_output.tokens_in, scorer_output.tokens_out) {
                (Some(i), Some(o)) => Some((i + o) as i32),
                _ => None,
            },
            ai_latency_ms: Some(ai_ms),
            total_latency_ms: total_start.elapsed().as_millis() as i32,
            final_score: Some(verdict.final_score),
            reject_triggered: verdict.reject_triggered,
        },
    )
    .await?;

    Ok(PipelineOutcome {
        job: updated,
        extracted,
        potential_contacts: scorer_output.potential_contacts,
    })
}

fn best_target_id(targets: &[TargetRow]) -> Option<Uuid> {
    targets.first().map(|t| t.id)
}
