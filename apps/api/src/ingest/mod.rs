//! Ingestion Orchestrator (C6, spec §4.6).
//!
//! Drives C1 (normalize) → C2 (resolve) → C3/C4 (extract + score, via the
//! scoring pipeline) for a batch of raw URLs, upserting each result with the
//! status-preservation rules in spec §3/§8. Work is split across a bounded
//! worker pool sharing the URL list by atomic index increment (spec §5) —
//! no mutable shared state beyond that counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::jd_resolver::{self, EmailContext};
use crate::llm_client::LlmClient;
use crate::scoring::transition::{self, EntryReason};
use crate::storage;
use crate::storage::jobs::NewJob;
use crate::url_normalizer;

#[derive(Debug, Clone, Default)]
pub struct SourceSummary {
    pub recovered: u32,
    pub manual_needed: u32,
    pub needs_ai: u32,
    pub blocked: u32,
    pub low_quality: u32,
    pub link_only: u32,
    pub ignored: u32,
    pub inserted: u32,
    pub updated: u32,
}

impl SourceSummary {
    fn merge(&mut self, other: &SourceSummary) {
        self.recovered += other.recovered;
        self.manual_needed += other.manual_needed;
        self.needs_ai += other.needs_ai;
        self.blocked += other.blocked;
        self.low_quality += other.low_quality;
        self.link_only += other.link_only;
        self.ignored += other.ignored;
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub raw_url: String,
    pub job_key: String,
    pub job_url: String,
    pub source_domain: String,
    pub action: String,
    pub status: Option<String>,
    pub system_status: Option<String>,
    pub needs_manual: bool,
    /// Resolver `fetch_status` for this URL (spec §4.2), used by `record()`
    /// to bucket `blocked`/`low_quality` counts; `None` for `ignored`/`error` rows.
    pub fetch_status: Option<String>,
    /// True when the job's `system_status` moved out of
    /// `NEEDS_MANUAL_JD`/`AI_UNAVAILABLE` as a result of this run (spec §4.6
    /// `recovered` bucket).
    pub recovered: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IngestResult {
    pub results: Vec<IngestOutcome>,
    pub by_source: HashMap<String, SourceSummary>,
}

impl IngestResult {
    fn merge(mut self, other: IngestResult) -> Self {
        self.results.extend(other.results);
        for (source, summary) in other.by_source {
            self.by_source.entry(source).or_default().merge(&summary);
        }
        self
    }
}

/// `ingest(raw_urls, email_context, channel)` (spec §4.6). Returns once every
/// URL has been processed by some worker in the pool.
pub async fn ingest(
    pool: &PgPool,
    llm: &LlmClient,
    http: &Client,
    config: &Config,
    raw_urls: &[String],
    email: &EmailContext,
    channel: &str,
) -> IngestResult {
    let urls = Arc::new(raw_urls.to_vec());
    let cursor = Arc::new(AtomicUsize::new(0));
    let worker_count = config.recover_concurrency.clamp(1, 6).min(urls.len().max(1));

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let urls = Arc::clone(&urls);
        let cursor = Arc::clone(&cursor);
        let pool = pool.clone();
        let llm = llm.clone();
        let http = http.clone();
        let config = config.clone();
        let email = email.clone();
        let channel = channel.to_string();

        handles.push(tokio::spawn(async move {
            let mut result = IngestResult::default();
            loop {
                let idx = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(raw_url) = urls.get(idx) else {
                    break;
                };
                let outcome = process_one(&pool, &llm, &http, &config, raw_url, &email, &channel).await;
                record(&mut result, outcome);
            }
            result
        }));
    }

    let mut merged = IngestResult::default();
    for handle in handles {
        if let Ok(partial) = handle.await {
            merged = merged.merge(partial);
        }
    }
    merged
}

fn record(result: &mut IngestResult, outcome: IngestOutcome) {
    let summary = result.by_source.entry(outcome.source_domain.clone()).or_default();
    if outcome.action == "ignored" {
        summary.ignored += 1;
    } else {
        if outcome.action == "inserted" {
            summary.inserted += 1;
        } else {
            summary.updated += 1;
        }
        if outcome.needs_manual {
            summary.manual_needed += 1;
        }
        match outcome.system_status.as_deref() {
            Some("AI_UNAVAILABLE") => summary.needs_ai += 1,
            _ => {}
        }
        if outcome.status.as_deref() == Some("LINK_ONLY") {
            summary.link_only += 1;
        }
        match outcome.fetch_status.as_deref() {
            Some("blocked") => summary.blocked += 1,
            Some("low_quality") => summary.low_quality += 1,
            _ => {}
        }
        if outcome.recovered {
            summary.recovered += 1;
        }
    }
    result.results.push(outcome);
}

async fn process_one(
    pool: &PgPool,
    llm: &LlmClient,
    http: &Client,
    config: &Config,
    raw_url: &str,
    email: &EmailContext,
    channel: &str,
) -> IngestOutcome {
    let normalized = match url_normalizer::normalize(raw_url) {
        Ok(n) => n,
        Err(_) => {
            return IngestOutcome {
                raw_url: raw_url.to_string(),
                job_key: String::new(),
                job_url: String::new(),
                source_domain: "invalid".to_string(),
                action: "ignored".to_string(),
                status: None,
                system_status: Some("INVALID_URL".to_string()),
                needs_manual: false,
                fetch_status: None,
                recovered: false,
            }
        }
    };

    if normalized.ignored {
        return IngestOutcome {
            raw_url: raw_url.to_string(),
            job_key: String::new(),
            job_url: String::new(),
            source_domain: normalized.source_domain,
            action: "ignored".to_string(),
            status: None,
            system_status: None,
            needs_manual: false,
            fetch_status: None,
            recovered: false,
        };
    }

    let existing = storage::jobs::get(pool, &normalized.job_key).await.ok().flatten();
    let prior_system_status = existing.as_ref().and_then(|j| j.system_status.clone());

    let resolved = jd_resolver::resolve(
        http,
        &normalized.job_url,
        &normalized.source_domain,
        email,
        config.jd_fetch_timeout_ms,
    )
    .await;

    let policy = jd_resolver::policy_for(&normalized.source_domain);
    let jd_usable = is_jd_usable(&policy, &resolved);
    let ai_available = llm.is_available();

    let reason = if !jd_usable {
        EntryReason::IngestNeedsManual
    } else if !ai_available {
        EntryReason::IngestAiUnavailable
    } else {
        EntryReason::IngestReady
    };

    if reason != EntryReason::IngestReady {
        tracing::info!(
            job_key = %normalized.job_key,
            channel,
            reason = ?reason,
            "INGEST_FALLBACK"
        );
    }

    let transition = transition::resolve(reason);
    let should_score = jd_usable && ai_available && resolved.jd_text_clean.chars().count() >= 180;

    let new_job = NewJob {
        job_key: normalized.job_key.clone(),
        job_url: normalized.job_url.clone(),
        source_domain: normalized.source_domain.clone(),
        job_id: normalized.job_id.clone(),
        jd_text_clean: if resolved.jd_text_clean.is_empty() {
            None
        } else {
            Some(resolved.jd_text_clean.clone())
        },
        jd_source: resolved.jd_source.clone(),
        fetch_status: resolved.fetch_status.clone(),
        fetch_debug: resolved.fetch_debug.clone(),
        status: transition.status.to_string(),
        system_status: transition.system_status.map(|s| s.to_string()),
        ..Default::default()
    };

    let upserted = match storage::jobs::upsert_ingested(pool, &new_job).await {
        Ok(row) => row,
        Err(e) => {
            tracing::error!(job_key = %normalized.job_key, error = %e, "ingest upsert failed");
            return IngestOutcome {
                raw_url: raw_url.to_string(),
                job_key: normalized.job_key,
                job_url: normalized.job_url,
                source_domain: normalized.source_domain,
                action: "error".to_string(),
                status: None,
                system_status: None,
                needs_manual: reason != EntryReason::IngestReady,
                fetch_status: Some(resolved.fetch_status.clone()),
                recovered: false,
            };
        }
    };

    let mut final_status = upserted.status.clone();
    let mut final_system_status = upserted.system_status.clone();

    if should_score {
        let targets = storage::targets::list_all(pool).await.unwrap_or_default();
        match crate::scoring::run(pool, llm, config, &upserted, &targets, "ingest", false).await {
            Ok(outcome) => {
                final_status = outcome.job.status.clone();
                final_system_status = outcome.job.system_status.clone();

                if let Ok(Some(profile)) = storage::resumes::get_primary_profile(pool).await {
                    if let Err(e) = crate::evidence::rebuild_for_job(pool, &outcome.job, &profile).await {
                        tracing::warn!(job_key = %normalized.job_key, error = %e, "EVIDENCE_UPSERT_FAILED during ingest");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(job_key = %normalized.job_key, error = %e, "AI_FAILED during ingest scoring");
            }
        }
    }

    // Recovered (spec §4.6): the job's system_status moved out of a
    // needs-follow-up state as a result of this run.
    let recovered = matches!(
        prior_system_status.as_deref(),
        Some("NEEDS_MANUAL_JD") | Some("AI_UNAVAILABLE")
    ) && final_system_status.is_none();

    IngestOutcome {
        raw_url: raw_url.to_string(),
        job_key: normalized.job_key,
        job_url: normalized.job_url,
        source_domain: normalized.source_domain,
        action: if existing.is_some() { "updated".to_string() } else { "inserted".to_string() },
        status: Some(final_status),
        system_status: final_system_status,
        needs_manual: reason != EntryReason::IngestReady,
        fetch_status: Some(resolved.fetch_status.clone()),
        recovered,
    }
}

fn is_jd_usable(policy: &jd_resolver::SourcePolicy, resolved: &jd_resolver::Resolved) -> bool {
    if resolved.fetch_status != "ok" {
        return false;
    }
    if resolved.jd_text_clean.chars().count() < policy.min_chars {
        return false;
    }
    if resolved.jd_source == "fetched" && policy.require_fetched_high_conf {
        return resolved.jd_confidence == jd_resolver::JdConfidence::High;
    }
    if resolved.jd_source == "email" && !policy.allow_low_conf_email {
        return resolved.jd_confidence != jd_resolver::JdConfidence::Low;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_outcome(source_domain: &str) -> IngestOutcome {
        IngestOutcome {
            raw_url: "https://example.com/job/1".to_string(),
            job_key: "key-1".to_string(),
            job_url: "https://example.com/job/1".to_string(),
            source_domain: source_domain.to_string(),
            action: "updated".to_string(),
            status: Some("SCORED".to_string()),
            system_status: None,
            needs_manual: false,
            fetch_status: Some("ok".to_string()),
            recovered: false,
        }
    }

    #[test]
    fn record_buckets_blocked_low_quality_and_recovered() {
        let mut result = IngestResult::default();

        let mut blocked = base_outcome("other");
        blocked.fetch_status = Some("blocked".to_string());
        record(&mut result, blocked);

        let mut low_quality = base_outcome("other");
        low_quality.fetch_status = Some("low_quality".to_string());
        record(&mut result, low_quality);

        let mut recovered = base_outcome("other");
        recovered.recovered = true;
        record(&mut result, recovered);

        let summary = result.by_source.get("other").expect("summary present");
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.low_quality, 1);
        assert_eq!(summary.recovered, 1);
        assert_eq!(summary.updated, 3);
    }

    fn resolved(fetch_status: &str, jd_source: &str, confidence: jd_resolver::JdConfidence, chars: usize) -> jd_resolver::Resolved {
        jd_resolver::Resolved {
            jd_text_clean: "x".repeat(chars),
            jd_source: jd_source.to_string(),
            fetch_status: fetch_status.to_string(),
            jd_confidence: confidence,
            fetch_debug: json!({}),
        }
    }

    #[test]
    fn linkedin_requires_high_confidence_fetched() {
        let policy = jd_resolver::policy_for("linkedin");
        let medium = resolved("ok", "fetched", jd_resolver::JdConfidence::Medium, 300);
        assert!(!is_jd_usable(&policy, &medium));

        let high = resolved("ok", "fetched", jd_resolver::JdConfidence::High, 300);
        assert!(is_jd_usable(&policy, &high));
    }

    #[test]
    fn whatsapp_allows_low_confidence_email() {
        let policy = jd_resolver::policy_for("whatsapp.vonage.local");
        let low_email = resolved("ok", "email", jd_resolver::JdConfidence::Low, 150);
        assert!(is_jd_usable(&policy, &low_email));
    }

    #[test]
    fn other_source_rejects_low_confidence_email() {
        let policy = jd_resolver::policy_for("other");
        let low_email = resolved("ok", "email", jd_resolver::JdConfidence::Low, 250);
        assert!(!is_jd_usable(&policy, &low_email));
    }

    #[test]
    fn failed_fetch_status_is_never_usable() {
        let policy = jd_resolver::policy_for("other");
        let failed = resolved("blocked", "none", jd_resolver::JdConfidence::Low, 0);
        assert!(!is_jd_usable(&policy, &failed));
    }

    #[test]
    fn below_min_chars_is_not_usable() {
        let policy = jd_resolver::policy_for("iimjobs");
        let short = resolved("ok", "fetched", jd_resolver::JdConfidence::Medium, 50);
        assert!(!is_jd_usable(&policy, &short));
    }
}
