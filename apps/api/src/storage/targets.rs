//! Typed accessors over `targets` and `job_profile_preferences` (C9, spec §3).

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::target::{JobProfilePreferenceRow, TargetRow};

pub async fn list_all(pool: &PgPool) -> Result<Vec<TargetRow>, sqlx::Error> {
    sqlx::query_as::<_, TargetRow>("SELECT * FROM targets ORDER BY created_at ASC")
        .fetch_all(pool)
        .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<TargetRow>, sqlx::Error> {
    sqlx::query_as::<_, TargetRow>("SELECT * FROM targets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Targets are immutable except by explicit operator upsert (spec §3 "Target").
pub async fn upsert(
    pool: &PgPool,
    id: Option<Uuid>,
    name: &str,
    primary_role: &str,
    seniority_pref: Option<&str>,
    location_pref: Option<&str>,
    must_keywords: &[String],
    nice_keywords: &[String],
    reject_keywords: &[String],
    rubric_profile: &str,
) -> Result<TargetRow, sqlx::Error> {
    let id = id.unwrap_or_else(Uuid::new_v4);
    sqlx::query_as::<_, TargetRow>(
        r#"
        INSERT INTO targets (
            id, name, primary_role, seniority_pref, location_pref,
            must_keywords, nice_keywords, reject_keywords, rubric_profile,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            primary_role = EXCLUDED.primary_role,
            seniority_pref = EXCLUDED.seniority_pref,
            location_pref = EXCLUDED.location_pref,
            must_keywords = EXCLUDED.must_keywords,
            nice_keywords = EXCLUDED.nice_keywords,
            reject_keywords = EXCLUDED.reject_keywords,
            rubric_profile = EXCLUDED.rubric_profile,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(primary_role)
    .bind(seniority_pref)
    .bind(location_pref)
    .bind(must_keywords)
    .bind(nice_keywords)
    .bind(reject_keywords)
    .bind(rubric_profile)
    .fetch_one(pool)
    .await
}

/// Resolves the operator-assigned preference override for a job, if any
/// (spec §3 "Job-Profile Preference", consulted before falling back to primary).
pub async fn get_profile_preference(
    pool: &PgPool,
    job_key: &str,
) -> Result<Option<JobProfilePreferenceRow>, sqlx::Error> {
    sqlx::query_as::<_, JobProfilePreferenceRow>(
        "SELECT * FROM job_profile_preferences WHERE job_key = $1",
    )
    .bind(job_key)
    .fetch_optional(pool)
    .await
}

pub async fn set_profile_preference(
    pool: &PgPool,
    job_key: &str,
    profile_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO job_profile_preferences (job_key, profile_id, created_at)
        VALUES ($1, $2, now())
        ON CONFLICT (job_key) DO UPDATE SET profile_id = EXCLUDED.profile_id
        "#,
    )
    .bind(job_key)
    .bind(profile_id)
    .execute(pool)
    .await?;
    Ok(())
}
