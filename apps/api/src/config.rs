use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,

    // ── Pipeline tunables (Design Note "LLM cost controls": injected, never hardcoded) ──
    /// JD fetch timeout, bounded [1500, 15000] (spec §4.2).
    pub jd_fetch_timeout_ms: u64,
    /// Extractor max output tokens, bounded [128, 700] (spec §4.3).
    pub extractor_max_tokens: u32,
    /// Heuristic gate: minimum JD length before scoring (spec §4.4).
    pub min_jd_chars: usize,
    /// Heuristic gate: minimum combined target signal (spec §4.4).
    pub min_target_signal: u32,
    /// Shortlist threshold, default 75 (spec §4.4).
    pub score_threshold_shortlist: i32,
    /// Archive threshold, default 55 (spec §4.4).
    pub score_threshold_archive: i32,
    /// Ingestion worker pool size, bounded [1, 6] (spec §4.6, §5).
    pub recover_concurrency: usize,
    /// Scheduler wall-clock budget in ms, bounded [5000, 840000] (spec §4.8).
    pub schedule_max_ms: u64,
    /// Whether an AI binding is configured; missing ⇒ AI-dependent stages skip (spec §4.8).
    pub ai_available: bool,
    /// HS256 secret for the inbound messaging webhook (spec §6, SPEC_FULL §10).
    pub webhook_hmac_secret: Option<String>,
    /// Sender allow-list for the inbound messaging webhook.
    pub webhook_sender_allowlist: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let anthropic_api_key =
            std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            ai_available: !anthropic_api_key.is_empty(),
            anthropic_api_key,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            jd_fetch_timeout_ms: env_u64("JD_FETCH_TIMEOUT_MS", 7_000)?.clamp(1_500, 15_000),
            extractor_max_tokens: (env_u64("EXTRACTOR_MAX_TOKENS", 400)? as u32).clamp(128, 700),
            min_jd_chars: env_u64("MIN_JD_CHARS", 120)? as usize,
            min_target_signal: env_u64("MIN_TARGET_SIGNAL", 8)? as u32,
            score_threshold_shortlist: env_u64("SCORE_THRESHOLD_SHORTLIST", 75)? as i32,
            score_threshold_archive: env_u64("SCORE_THRESHOLD_ARCHIVE", 55)? as i32,
            recover_concurrency: (env_u64("RECOVER_CONCURRENCY", 3)? as usize).clamp(1, 6),
            schedule_max_ms: env_u64("SCHEDULE_MAX_MS", 45_000)?.clamp(5_000, 840_000),
            webhook_hmac_secret: std::env::var("WEBHOOK_HMAC_SECRET").ok(),
            webhook_sender_allowlist: std::env::var("WEBHOOK_SENDER_ALLOWLIST")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_u64_falls_back_to_default_when_unset() {
        std::env::remove_var("TRIAGE_TEST_UNSET_VAR");
        assert_eq!(env_u64("TRIAGE_TEST_UNSET_VAR", 42).unwrap(), 42);
    }
}
