use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use reqwest::Client as HttpClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::SchemaCapabilities;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Reserved for a future async job queue; no call path depends on it today
    /// (the scheduler uses a fire-and-forget tokio task instead — spec §5).
    #[allow(dead_code)]
    pub redis: RedisClient,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub http: HttpClient,
    pub config: Config,
    pub schema: SchemaCapabilities,
}
