//! Typed accessors over `contacts` / `contact_touchpoints` (C9, spec §3;
//! surfaced only through the scoring pipeline's `potential_contacts`
//! sanitization, SPEC_FULL §10 — no dedicated HTTP routes).

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::contact::{ContactRow, ContactTouchpointRow};

/// Finds an existing contact by case-insensitive name + company, or inserts one.
pub async fn get_or_create(
    pool: &PgPool,
    name: &str,
    title: Option<&str>,
    company: Option<&str>,
) -> Result<ContactRow, sqlx::Error> {
    if let Some(existing) = sqlx::query_as::<_, ContactRow>(
        "SELECT * FROM contacts WHERE lower(name) = lower($1) AND \
         lower(COALESCE(company, '')) = lower(COALESCE($2, '')) LIMIT 1",
    )
    .bind(name)
    .bind(company)
    .fetch_optional(pool)
    .await?
    {
        return Ok(existing);
    }

    sqlx::query_as::<_, ContactRow>(
        r#"
        INSERT INTO contacts (id, name, title, company, linkedin_url, created_at)
        VALUES ($1, $2, $3, $4, NULL, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(title)
    .bind(company)
    .fetch_one(pool)
    .await
}

/// Upserts a touchpoint unique on `(contact_id, job_key, channel)` (spec §3).
pub async fn upsert_touchpoint(
    pool: &PgPool,
    contact_id: Uuid,
    job_key: &str,
    channel: &str,
    status: &str,
) -> Result<ContactTouchpointRow, sqlx::Error> {
    sqlx::query_as::<_, ContactTouchpointRow>(
        r#"
        INSERT INTO contact_touchpoints (
            id, contact_id, job_key, channel, status, notes, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, NULL, now(), now())
        ON CONFLICT (contact_id, job_key, channel) DO UPDATE SET
            status = EXCLUDED.status,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(contact_id)
    .bind(job_key)
    .bind(channel)
    .bind(status)
    .fetch_one(pool)
    .await
}
