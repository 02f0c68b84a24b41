use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Schema feature-detection capability struct (spec §4.9, Design Note
/// "Feature-detected schema"). Loaded once per request rather than inferring
/// presence from caught exceptions, so C9 accessors can degrade gracefully on
/// older schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaCapabilities {
    pub has_job_evidence: bool,
    pub has_job_profile_preferences: bool,
    pub has_resume_draft_versions: bool,
    pub has_scoring_runs: bool,
    pub has_contacts: bool,
    pub has_contact_touchpoints: bool,
    pub has_reject_keywords_json: bool,
    pub has_rubric_profile: bool,
    pub has_external_resume_fields: bool,
}

impl SchemaCapabilities {
    /// Probes `information_schema` for the tables/columns this service treats as optional.
    pub async fn detect(pool: &PgPool) -> Result<Self> {
        Ok(Self {
            has_job_evidence: table_exists(pool, "job_evidence").await?,
            has_job_profile_preferences: table_exists(pool, "job_profile_preferences").await?,
            has_resume_draft_versions: table_exists(pool, "resume_draft_versions").await?,
            has_scoring_runs: table_exists(pool, "scoring_runs").await?,
            has_contacts: table_exists(pool, "contacts").await?,
            has_contact_touchpoints: table_exists(pool, "contact_touchpoints").await?,
            has_reject_keywords_json: column_exists(pool, "jobs", "reject_keywords").await?,
            has_rubric_profile: column_exists(pool, "targets", "rubric_profile").await?,
            has_external_resume_fields: column_exists(
                pool,
                "resume_drafts",
                "external_resume_ref",
            )
            .await?,
        })
    }

    pub fn require_job_evidence(&self) -> Result<(), crate::errors::AppError> {
        if self.has_job_evidence {
            Ok(())
        } else {
            Err(crate::errors::AppError::SchemaDisabled(
                "job_evidence table is not present on this schema".to_string(),
            ))
        }
    }

    pub fn require_resume_draft_versions(&self) -> Result<(), crate::errors::AppError> {
        if self.has_resume_draft_versions {
            Ok(())
        } else {
            Err(crate::errors::AppError::SchemaDisabled(
                "resume_draft_versions table is not present on this schema".to_string(),
            ))
        }
    }
}

async fn table_exists(pool: &PgPool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_name = $1)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

async fn column_exists(pool: &PgPool, table: &str, column: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2)",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
