//! Typed accessor over append-only `scoring_runs` telemetry (C9, spec §3, §4.4).

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::scoring_run::ScoringRunRow;

#[derive(Debug, Clone, Default)]
pub struct NewScoringRun {
    pub job_key: String,
    pub source: String,
    pub final_status: String,
    pub heuristic_passed: bool,
    pub heuristic_reasons: Vec<String>,
    pub stage_metrics: Value,
    pub ai_model: Option<String>,
    pub ai_tokens_in: Option<i32>,
    pub ai_tokens_out: Option<i32>,
    pub ai_tokens_total: Option<i32>,
    pub ai_latency_ms: Option<i32>,
    pub total_latency_ms: i32,
    pub final_score: Option<i32>,
    pub reject_triggered: bool,
}

/// Scoring runs are append-only; `created_at` ordering is the only sequencing
/// guarantee across them (spec §5).
pub async fn insert(pool: &PgPool, run: &NewScoringRun) -> Result<ScoringRunRow, sqlx::Error> {
    sqlx::query_as::<_, ScoringRunRow>(
        r#"
        INSERT INTO scoring_runs (
            id, job_key, source, final_status, heuristic_passed, heuristic_reasons,
            stage_metrics, ai_model, ai_tokens_in, ai_tokens_out, ai_tokens_total,
            ai_latency_ms, total_latency_ms, final_score, reject_triggered, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&run.job_key)
    .bind(&run.source)
    .bind(&run.final_status)
    .bind(run.heuristic_passed)
    .bind(&run.heuristic_reasons)
    .bind(&run.stage_metrics)
    .bind(&run.ai_model)
    .bind(run.ai_tokens_in)
    .bind(run.ai_tokens_out)
    .bind(run.ai_tokens_total)
    .bind(run.ai_latency_ms)
    .bind(run.total_latency_ms)
    .bind(run.final_score)
    .bind(run.reject_triggered)
    .fetch_one(pool)
    .await
}

pub async fn list_for_job(pool: &PgPool, job_key: &str) -> Result<Vec<ScoringRunRow>, sqlx::Error> {
    sqlx::query_as::<_, ScoringRunRow>(
        "SELECT * FROM scoring_runs WHERE job_key = $1 ORDER BY created_at ASC",
    )
    .bind(job_key)
    .fetch_all(pool)
    .await
}
