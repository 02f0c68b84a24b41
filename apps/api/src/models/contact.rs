use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A person surfaced as a potential outreach contact for a job (spec §3, §4.4
/// `potential_contacts`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub linkedin_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One outreach event against a contact for a given job, unique on
/// `(contact_id, job_key, channel)` (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactTouchpointRow {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub job_key: String,
    pub channel: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchpointChannel {
    Linkedin,
    Email,
    Other,
}

impl TouchpointChannel {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TouchpointChannel::Linkedin => "LINKEDIN",
            TouchpointChannel::Email => "EMAIL",
            TouchpointChannel::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchpointStatus {
    Draft,
    Sent,
    Replied,
}

impl TouchpointStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TouchpointStatus::Draft => "DRAFT",
            TouchpointStatus::Sent => "SENT",
            TouchpointStatus::Replied => "REPLIED",
        }
    }
}
