//! Typed accessors over `jobs` (C9, spec §3 "Job", §4.6, §4.9).

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::JobRow;

/// Terminal statuses are never downgraded by ingestion or rescoring (spec §3, §8).
const TERMINAL_STATUSES: &[&str] = &["READY_TO_APPLY", "APPLIED", "REJECTED", "ARCHIVED"];

/// Fields carried by the first ingestion upsert (spec §4.6 step 5). Requirement
/// arrays only overwrite a prior non-empty set when non-empty themselves (spec
/// §9 Design Note, Open Question #2 — "treat as intentional").
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub job_key: String,
    pub job_url: String,
    pub source_domain: String,
    pub job_id: Option<String>,
    pub company: Option<String>,
    pub role_title: Option<String>,
    pub location: Option<String>,
    pub work_mode: Option<String>,
    pub seniority: Option<String>,
    pub experience_years_min: Option<i32>,
    pub experience_years_max: Option<i32>,
    pub must_keywords: Vec<String>,
    pub nice_keywords: Vec<String>,
    pub reject_keywords: Vec<String>,
    pub skills: Vec<String>,
    pub jd_text_clean: Option<String>,
    pub jd_source: String,
    pub fetch_status: String,
    pub fetch_debug: Value,
    pub status: String,
    pub system_status: Option<String>,
}

/// Fields written by the scoring pipeline's `transition` stage (spec §4.4, §4.6 step 6).
#[derive(Debug, Clone, Default)]
pub struct ScoreUpdate {
    pub primary_target_id: Option<Uuid>,
    pub score_must: Option<f64>,
    pub score_nice: Option<f64>,
    pub final_score: Option<i32>,
    pub reject_triggered: bool,
    pub reject_reasons: Vec<String>,
    pub reason_top_matches: Option<String>,
    pub status: String,
    pub system_status: Option<String>,
}

pub async fn get(pool: &PgPool, job_key: &str) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE job_key = $1")
        .bind(job_key)
        .fetch_optional(pool)
        .await
}

/// Upserts a job by `job_key` with status-preservation and JSON-gated keyword
/// replacement (spec §4.6 step 5, §8 invariant on terminal statuses).
pub async fn upsert_ingested(pool: &PgPool, job: &NewJob) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs (
            job_key, job_url, source_domain, job_id,
            company, role_title, location, work_mode, seniority,
            experience_years_min, experience_years_max,
            must_keywords, nice_keywords, reject_keywords, skills,
            jd_text_clean, jd_source, fetch_status, fetch_debug,
            status, system_status, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4,
            $5, $6, $7, $8, $9,
            $10, $11,
            $12, $13, $14, $15,
            $16, $17, $18, $19,
            $20, $21, now(), now()
        )
        ON CONFLICT (job_key) DO UPDATE SET
            job_url = EXCLUDED.job_url,
            company = COALESCE(EXCLUDED.company, jobs.company),
            role_title = COALESCE(EXCLUDED.role_title, jobs.role_title),
            location = COALESCE(EXCLUDED.location, jobs.location),
            work_mode = COALESCE(EXCLUDED.work_mode, jobs.work_mode),
            seniority = COALESCE(EXCLUDED.seniority, jobs.seniority),
            experience_years_min = COALESCE(EXCLUDED.experience_years_min, jobs.experience_years_min),
            experience_years_max = COALESCE(EXCLUDED.experience_years_max, jobs.experience_years_max),
            must_keywords = CASE WHEN cardinality(EXCLUDED.must_keywords) > 0
                THEN EXCLUDED.must_keywords ELSE jobs.must_keywords END,
            nice_keywords = CASE WHEN cardinality(EXCLUDED.nice_keywords) > 0
                THEN EXCLUDED.nice_keywords ELSE jobs.nice_keywords END,
            reject_keywords = CASE WHEN cardinality(EXCLUDED.reject_keywords) > 0
                THEN EXCLUDED.reject_keywords ELSE jobs.reject_keywords END,
            skills = CASE WHEN cardinality(EXCLUDED.skills) > 0
                THEN EXCLUDED.skills ELSE jobs.skills END,
            jd_text_clean = CASE WHEN EXCLUDED.jd_text_clean IS NOT NULL AND EXCLUDED.jd_text_clean != ''
                THEN EXCLUDED.jd_text_clean ELSE jobs.jd_text_clean END,
            jd_source = CASE WHEN EXCLUDED.jd_source != 'none' THEN EXCLUDED.jd_source ELSE jobs.jd_source END,
            fetch_status = EXCLUDED.fetch_status,
            fetch_debug = EXCLUDED.fetch_debug,
            status = CASE WHEN jobs.status = ANY($22) THEN jobs.status ELSE EXCLUDED.status END,
            system_status = CASE WHEN jobs.status = ANY($22) THEN jobs.system_status ELSE EXCLUDED.system_status END,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(&job.job_key)
    .bind(&job.job_url)
    .bind(&job.source_domain)
    .bind(&job.job_id)
    .bind(&job.company)
    .bind(&job.role_title)
    .bind(&job.location)
    .bind(&job.work_mode)
    .bind(&job.seniority)
    .bind(job.experience_years_min)
    .bind(job.experience_years_max)
    .bind(&job.must_keywords)
    .bind(&job.nice_keywords)
    .bind(&job.reject_keywords)
    .bind(&job.skills)
    .bind(&job.jd_text_clean)
    .bind(&job.jd_source)
    .bind(&job.fetch_status)
    .bind(&job.fetch_debug)
    .bind(&job.status)
    .bind(&job.system_status)
    .bind(TERMINAL_STATUSES)
    .fetch_one(pool)
    .await
}

/// Applies the scoring pipeline's `transition` output (spec §4.4, §4.6 step 6).
/// Preserves a pre-existing terminal status; timestamps advance monotonically.
pub async fn apply_scoring(
    pool: &PgPool,
    job_key: &str,
    update: &ScoreUpdate,
) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            primary_target_id = COALESCE($2, primary_target_id),
            score_must = $3,
            score_nice = $4,
            final_score = $5,
            reject_triggered = $6,
            reject_reasons = $7,
            reason_top_matches = COALESCE($8, reason_top_matches),
            status = CASE WHEN status = ANY($11) THEN status ELSE $9 END,
            system_status = CASE WHEN status = ANY($11) THEN system_status ELSE $10 END,
            last_scored_at = now(),
            updated_at = now(),
            applied_at = CASE WHEN $9 = 'APPLIED' AND applied_at IS NULL THEN now() ELSE applied_at END,
            rejected_at = CASE WHEN $9 = 'REJECTED' AND rejected_at IS NULL THEN now() ELSE rejected_at END,
            archived_at = CASE WHEN $9 = 'ARCHIVED' AND archived_at IS NULL THEN now() ELSE archived_at END
        WHERE job_key = $1
        RETURNING *
        "#,
    )
    .bind(job_key)
    .bind(update.primary_target_id)
    .bind(update.score_must)
    .bind(update.score_nice)
    .bind(update.final_score)
    .bind(update.reject_triggered)
    .bind(&update.reject_reasons)
    .bind(&update.reason_top_matches)
    .bind(&update.status)
    .bind(&update.system_status)
    .bind(TERMINAL_STATUSES)
    .fetch_one(pool)
    .await
}

/// Fields written when the scoring pipeline's own `extract` stage runs C3
/// against a job that didn't arrive with extracted fields already (spec §4.4
/// `extract` state, rescore path). Same JSON-gated replacement rule as
/// `upsert_ingested` (spec §9 Design Note, Open Question #2).
#[derive(Debug, Clone, Default)]
pub struct ExtractedUpdate {
    pub company: Option<String>,
    pub role_title: Option<String>,
    pub location: Option<String>,
    pub work_mode: Option<String>,
    pub seniority: Option<String>,
    pub experience_years_min: Option<i32>,
    pub experience_years_max: Option<i32>,
    pub must_keywords: Vec<String>,
    pub nice_keywords: Vec<String>,
    pub reject_keywords: Vec<String>,
    pub skills: Vec<String>,
}

pub async fn apply_extracted(
    pool: &PgPool,
    job_key: &str,
    update: &ExtractedUpdate,
) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            company = COALESCE($2, company),
            role_title = COALESCE($3, role_title),
            location = COALESCE($4, location),
            work_mode = COALESCE($5, work_mode),
            seniority = COALESCE($6, seniority),
            experience_years_min = COALESCE($7, experience_years_min),
            experience_years_max = COALESCE($8, experience_years_max),
            must_keywords = CASE WHEN cardinality($9::text[]) > 0 THEN $9 ELSE must_keywords END,
            nice_keywords = CASE WHEN cardinality($10::text[]) > 0 THEN $10 ELSE nice_keywords END,
            reject_keywords = CASE WHEN cardinality($11::text[]) > 0 THEN $11 ELSE reject_keywords END,
            skills = CASE WHEN cardinality($12::text[]) > 0 THEN $12 ELSE skills END,
            updated_at = now()
        WHERE job_key = $1
        RETURNING *
        "#,
    )
    .bind(job_key)
    .bind(&update.company)
    .bind(&update.role_title)
    .bind(&update.location)
    .bind(&update.work_mode)
    .bind(&update.seniority)
    .bind(update.experience_years_min)
    .bind(update.experience_years_max)
    .bind(&update.must_keywords)
    .bind(&update.nice_keywords)
    .bind(&update.reject_keywords)
    .bind(&update.skills)
    .fetch_one(pool)
    .await
}

/// Directly sets a job's lifecycle status, still honoring terminal preservation,
/// for the Application Pack Manager's `approve` transition (spec §4.7).
/// `POST /jobs/{job_key}/manual-jd` (spec §6): operator-supplied JD text
/// overwrites whatever was fetched, clearing any prior fetch failure.
pub async fn set_manual_jd(
    pool: &PgPool,
    job_key: &str,
    jd_text_clean: &str,
) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            jd_text_clean = $2,
            jd_source = 'manual',
            fetch_status = 'ok',
            updated_at = now()
        WHERE job_key = $1
        RETURNING *
        "#,
    )
    .bind(job_key)
    .bind(jd_text_clean)
    .fetch_one(pool)
    .await
}

pub async fn set_status(
    pool: &PgPool,
    job_key: &str,
    status: &str,
) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            status = CASE WHEN status = ANY($3) THEN status ELSE $2 END,
            applied_at = CASE WHEN $2 = 'APPLIED' AND applied_at IS NULL THEN now() ELSE applied_at END,
            updated_at = now()
        WHERE job_key = $1
        RETURNING *
        "#,
    )
    .bind(job_key)
    .bind(status)
    .bind(TERMINAL_STATUSES)
    .fetch_one(pool)
    .await
}

/// Batch rescoring candidates ordered oldest-`updated_at`-first (spec §6 `/score-pending`).
pub async fn list_by_status(
    pool: &PgPool,
    statuses: &[String],
    limit: i64,
) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE status = ANY($1) ORDER BY updated_at ASC LIMIT $2",
    )
    .bind(statuses)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Jobs needing a manual-JD recovery sweep (spec §4.8 `recovery_backfill`, SPEC_FULL §10).
pub async fn list_needs_manual_jd(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE system_status = 'NEEDS_MANUAL_JD' ORDER BY updated_at ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Jobs missing extracted fields for `recovery_missing_fields` (SPEC_FULL §10).
pub async fn list_missing_fields(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE (role_title IS NULL OR company IS NULL) \
         AND jd_text_clean IS NOT NULL AND jd_text_clean != '' \
         ORDER BY updated_at ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Jobs stuck `AI_UNAVAILABLE` for `recovery_rescore` (SPEC_FULL §10).
pub async fn list_ai_unavailable(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE system_status = 'AI_UNAVAILABLE' ORDER BY updated_at ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Archived/rejected jobs with evidence, for the gap report (spec §4.5, §6).
pub async fn list_archived_with_profile(
    pool: &PgPool,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<JobRow>, sqlx::Error> {
    match status {
        Some(s) => {
            sqlx::query_as::<_, JobRow>(
                "SELECT * FROM jobs WHERE status = $1 ORDER BY updated_at DESC LIMIT $2",
            )
            .bind(s)
            .bind(limit)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, JobRow>(
                "SELECT * FROM jobs WHERE status IN ('ARCHIVED', 'REJECTED') \
                 ORDER BY updated_at DESC LIMIT $1",
            )
            .bind(limit)
            .fetch_all(pool)
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TERMINAL_STATUSES;

    #[test]
    fn terminal_status_list_matches_spec_set() {
        assert_eq!(
            TERMINAL_STATUSES,
            &["READY_TO_APPLY", "APPLIED", "REJECTED", "ARCHIVED"]
        );
    }
}
