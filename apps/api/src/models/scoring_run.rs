use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only telemetry row written once per scoring pipeline invocation (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoringRunRow {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
}
