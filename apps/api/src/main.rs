mod config;
mod db;
mod errors;
mod evidence;
mod extractor;
mod ingest;
mod jd_resolver;
mod llm_client;
mod models;
mod pack;
mod routes;
mod scheduler;
mod scoring;
mod state;
mod storage;
mod url_normalizer;

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, SchemaCapabilities};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job-triage API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Detect optional schema features once per process start (spec §4.9);
    // handlers re-check the cheap in-memory struct rather than probing per call.
    let schema = SchemaCapabilities::detect(&db).await?;
    info!(?schema, "Schema capabilities detected");

    // Initialize Redis (reserved for a future async job queue; not on any
    // call path today, see DESIGN.md)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO (application-pack PDF/export artifact storage)
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client (single entry point for all Claude calls)
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!(model = llm_client::MODEL, "LLM client initialized");

    // Initialize outbound HTTP client for JD fetch (C2) and external-résumé calls
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.jd_fetch_timeout_ms.max(15_000)))
        .user_agent("Mozilla/5.0 (compatible; job-triage-bot/1.0)")
        .build()?;

    // Build app state
    let state = AppState {
        db: db.clone(),
        redis,
        s3,
        llm: llm.clone(),
        http: http.clone(),
        config: config.clone(),
        schema,
    };

    // Scheduler (C8): a single cooperative cron loop, fire-and-forget per
    // spec §5's "wait-until" primitive so startup isn't blocked on it.
    {
        let db = db.clone();
        let llm = llm.clone();
        let http = http.clone();
        let config = config.clone();
        let interval_ms = config.schedule_max_ms.max(5_000);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                let report = scheduler::run(&db, &llm, &http, &config).await;
                if report.budget_exceeded {
                    tracing::warn!("SCHEDULE_BUDGET_STOP");
                }
            }
        });
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    use aws_config::Region;
    use aws_sdk_s3::config::Credentials;

    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "job-triage-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
