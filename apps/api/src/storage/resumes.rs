//! Typed accessors over `resume_profiles`, `resume_drafts`, and
//! `resume_draft_versions` (C9, spec §3, §4.7).

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::draft::{ResumeDraftRow, ResumeDraftVersionRow, ResumeProfileRow};

pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<Option<ResumeProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeProfileRow>("SELECT * FROM resume_profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// One designated "primary" profile always exists (spec §3 "Resume Profile").
pub async fn get_primary_profile(pool: &PgPool) -> Result<Option<ResumeProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeProfileRow>(
        "SELECT * FROM resume_profiles WHERE is_primary = true LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

pub async fn get_draft(
    pool: &PgPool,
    job_key: &str,
    profile_id: Uuid,
) -> Result<Option<ResumeDraftRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeDraftRow>(
        "SELECT * FROM resume_drafts WHERE job_key = $1 AND profile_id = $2",
    )
    .bind(job_key)
    .bind(profile_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_draft_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ResumeDraftRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeDraftRow>("SELECT * FROM resume_drafts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Inserts or fully replaces a draft's current content, unique on
/// `(job_key, profile_id)` (spec §3 "Resume Draft").
#[allow(clippy::too_many_arguments)]
pub async fn upsert_draft(
    pool: &PgPool,
    job_key: &str,
    profile_id: Uuid,
    pack_json: &Value,
    ats_json: &Value,
    rr_export_json: &Value,
    status: &str,
) -> Result<ResumeDraftRow, sqlx::Error> {
    sqlx::query_as::<_, ResumeDraftRow>(
        r#"
        INSERT INTO resume_drafts (
            id, job_key, profile_id, pack_json, ats_json, rr_export_json, status,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
        ON CONFLICT (job_key, profile_id) DO UPDATE SET
            pack_json = EXCLUDED.pack_json,
            ats_json = EXCLUDED.ats_json,
            rr_export_json = EXCLUDED.rr_export_json,
            status = EXCLUDED.status,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_key)
    .bind(profile_id)
    .bind(pack_json)
    .bind(ats_json)
    .bind(rr_export_json)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn set_external_resume_ref(
    pool: &PgPool,
    draft_id: Uuid,
    reference: Option<&str>,
    status: Option<&str>,
    error: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE resume_drafts SET
            external_resume_ref = $2,
            external_resume_status = $3,
            external_resume_error = $4,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(draft_id)
    .bind(reference)
    .bind(status)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_pdf_ref(
    pool: &PgPool,
    draft_id: Uuid,
    pdf_url: Option<&str>,
    pdf_status: Option<&str>,
    pdf_error: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE resume_drafts SET
            pdf_url = $2, pdf_status = $3, pdf_error = $4, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(draft_id)
    .bind(pdf_url)
    .bind(pdf_status)
    .bind(pdf_error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Appends an immutable snapshot and returns its `version_no` (spec §4.7, §8:
/// "`version_no` is strictly increasing per `draft_id`"). Caller holds no lock;
/// the `MAX(version_no)+1` read and the insert race only within one draft and
/// converge because drafts are edited by a single human reviewer at a time.
pub async fn append_version(
    pool: &PgPool,
    draft_id: Uuid,
    pack_json: &Value,
    ats_json: &Value,
    rr_export_json: &Value,
    source_action: &str,
) -> Result<ResumeDraftVersionRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let next_version: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version_no), 0) + 1 FROM resume_draft_versions WHERE draft_id = $1",
    )
    .bind(draft_id)
    .fetch_one(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, ResumeDraftVersionRow>(
        r#"
        INSERT INTO resume_draft_versions (
            id, draft_id, version_no, pack_json, ats_json, rr_export_json,
            source_action, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(draft_id)
    .bind(next_version)
    .bind(pack_json)
    .bind(ats_json)
    .bind(rr_export_json)
    .bind(source_action)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn list_versions(
    pool: &PgPool,
    draft_id: Uuid,
) -> Result<Vec<ResumeDraftVersionRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeDraftVersionRow>(
        "SELECT * FROM resume_draft_versions WHERE draft_id = $1 ORDER BY version_no ASC",
    )
    .bind(draft_id)
    .fetch_all(pool)
    .await
}

pub async fn get_version(
    pool: &PgPool,
    version_id: Uuid,
) -> Result<Option<ResumeDraftVersionRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeDraftVersionRow>(
        "SELECT * FROM resume_draft_versions WHERE id = $1",
    )
    .bind(version_id)
    .fetch_optional(pool)
    .await
}
