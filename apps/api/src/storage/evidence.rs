//! Typed accessors over `job_evidence` (C9, spec §3 "Job Evidence", §4.5).

use sqlx::PgPool;

use crate::models::evidence::JobEvidenceRow;

/// Batch upsert keyed on `(job_key, requirement_text, requirement_type)`
/// (spec §4.5): replaces evidence fields, preserving the row's `id` on conflict.
pub async fn upsert_many(
    pool: &PgPool,
    job_key: &str,
    rows: &[crate::evidence::EvidenceRow],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO job_evidence (
                job_key, requirement_text, requirement_type,
                evidence_text, evidence_source, confidence_score, matched, notes,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (job_key, requirement_text, requirement_type) DO UPDATE SET
                evidence_text = EXCLUDED.evidence_text,
                evidence_source = EXCLUDED.evidence_source,
                confidence_score = EXCLUDED.confidence_score,
                matched = EXCLUDED.matched,
                notes = EXCLUDED.notes,
                updated_at = now()
            "#,
        )
        .bind(job_key)
        .bind(&row.requirement_text)
        .bind(row.requirement_type.as_db_str())
        .bind(&row.evidence_text)
        .bind(row.evidence_source.as_db_str())
        .bind(row.confidence_score)
        .bind(row.matched)
        .bind(&row.notes)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn list_for_job(pool: &PgPool, job_key: &str) -> Result<Vec<JobEvidenceRow>, sqlx::Error> {
    sqlx::query_as::<_, JobEvidenceRow>(
        "SELECT * FROM job_evidence WHERE job_key = $1 ORDER BY requirement_type, requirement_text",
    )
    .bind(job_key)
    .fetch_all(pool)
    .await
}

/// Counts, across the given job keys, how often each `must` requirement went
/// unmatched — input to the gap report (spec §4.5, §6 `/jobs/evidence/gap-report`).
pub async fn missed_must_counts(
    pool: &PgPool,
    job_keys: &[String],
    min_missed: i64,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT requirement_text, COUNT(*) as missed_count
        FROM job_evidence
        WHERE job_key = ANY($1) AND requirement_type = 'must' AND matched = false
        GROUP BY requirement_text
        HAVING COUNT(*) >= $2
        ORDER BY missed_count DESC
        "#,
    )
    .bind(job_keys)
    .bind(min_missed)
    .fetch_all(pool)
    .await
}
