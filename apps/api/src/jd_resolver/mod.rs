//! JD Resolver (C2, spec §4.2).
//!
//! Fetches the job page (except for sources under `strict_linkedin` policy,
//! which skip straight to the email/text fallback), classifies JD quality, and
//! falls back to inbound email/text when the fetch is unusable.

pub mod html;

use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use self::html::html_to_text;

const ANCHORS: &[&str] = &[
    "description:",
    "role overview",
    "job description",
    "key responsibilities",
    "responsibilities:",
];

const END_ANCHORS: &[&str] = &[
    "\napply",
    "\nsave",
    "similar jobs",
    "report this job",
    "copyright",
    "unsubscribe",
];

const LOW_QUALITY_PHRASES: &[&str] = &["linkedin respects your privacy", "enable javascript"];

/// Per-source policy table (spec §4.2), consumed by C6 to decide whether a job
/// needs manual JD entry.
#[derive(Debug, Clone, Copy)]
pub struct SourcePolicy {
    pub min_chars: usize,
    pub require_fetched_high_conf: bool,
    pub allow_low_conf_email: bool,
}

pub fn policy_for(source_domain: &str) -> SourcePolicy {
    match source_domain {
        "linkedin" => SourcePolicy {
            min_chars: 280,
            require_fetched_high_conf: true,
            allow_low_conf_email: false,
        },
        "iimjobs" => SourcePolicy {
            min_chars: 220,
            require_fetched_high_conf: false,
            allow_low_conf_email: false,
        },
        "naukri" => SourcePolicy {
            min_chars: 220,
            require_fetched_high_conf: false,
            allow_low_conf_email: false,
        },
        "whatsapp.vonage.local" => SourcePolicy {
            min_chars: 120,
            require_fetched_high_conf: false,
            allow_low_conf_email: true,
        },
        _ => SourcePolicy {
            min_chars: 220,
            require_fetched_high_conf: false,
            allow_low_conf_email: false,
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailContext {
    pub email_html: Option<String>,
    pub email_text: Option<String>,
    pub email_subject: Option<String>,
    pub email_from: Option<String>,
}

impl EmailContext {
    pub fn is_empty(&self) -> bool {
        self.email_html.is_none() && self.email_text.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JdConfidence {
    Low,
    Medium,
    High,
}

impl JdConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            JdConfidence::Low => "low",
            JdConfidence::Medium => "medium",
            JdConfidence::High => "high",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub jd_text_clean: String,
    pub jd_source: String,
    pub fetch_status: String,
    pub jd_confidence: JdConfidence,
    pub fetch_debug: Value,
}

/// `resolve(job_url, email_context) → Resolved` (spec §4.2).
pub async fn resolve(
    client: &Client,
    job_url: &str,
    source_domain: &str,
    email: &EmailContext,
    timeout_ms: u64,
) -> Resolved {
    let timeout_ms = timeout_ms.clamp(1_500, 15_000);

    if source_domain == "linkedin" {
        return fallback_or_empty(email, "skipped_strict_linkedin", None);
    }

    let fetch_outcome = fetch_page(client, job_url, timeout_ms).await;

    match fetch_outcome {
        FetchOutcome::Ok(html) => {
            let text = html_to_text(&html);
            let windowed = jd_window_extract(&text);

            if is_low_quality(&windowed, source_domain) {
                return fallback_or_empty(email, "low_quality", Some("low_quality"));
            }

            if windowed.chars().count() >= 260 {
                let confidence = classify_confidence(&windowed);
                return Resolved {
                    jd_text_clean: truncate_jd(&windowed),
                    jd_source: "fetched".to_string(),
                    fetch_status: "ok".to_string(),
                    jd_confidence: confidence.clone(),
                    fetch_debug: json!({
                        "policy": "fetched",
                        "jd_confidence": confidence.as_str(),
                        "source_domain": source_domain,
                    }),
                };
            }

            fallback_or_empty(email, "too_short_after_fetch", Some("low_quality"))
        }
        FetchOutcome::Blocked(status) => {
            fallback_or_empty(email, "blocked", Some("blocked")).with_prior_http_status(status)
        }
        FetchOutcome::Failed(reason) => {
            fallback_or_empty(email, &reason, Some("failed"))
        }
        FetchOutcome::Timeout => fallback_or_empty(email, "timeout", Some("failed")),
    }
}

impl Resolved {
    fn with_prior_http_status(mut self, status: u16) -> Self {
        if let Value::Object(ref mut map) = self.fetch_debug {
            map.insert("upstream_http_status".to_string(), json!(status));
        }
        self
    }
}

enum FetchOutcome {
    Ok(String),
    Blocked(u16),
    Failed(String),
    Timeout,
}

async fn fetch_page(client: &Client, job_url: &str, timeout_ms: u64) -> FetchOutcome {
    let request = client
        .get(job_url)
        .timeout(Duration::from_millis(timeout_ms))
        .header(
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        );

    match request.send().await {
        Ok(response) => {
            let status = response.status();
            if matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            ) {
                return FetchOutcome::Blocked(status.as_u16());
            }
            if !status.is_success() {
                return FetchOutcome::Failed(format!("http_{}", status.as_u16()));
            }
            match response.text().await {
                Ok(body) => FetchOutcome::Ok(body),
                Err(_) => FetchOutcome::Failed("body_read_error".to_string()),
            }
        }
        Err(e) if e.is_timeout() => FetchOutcome::Timeout,
        Err(_) => FetchOutcome::Failed("connect_error".to_string()),
    }
}

/// JD Window Extraction (spec §4.2 step 3): locate the first anchor, slice from
/// there, truncate before the first end-anchor, collapse whitespace.
pub fn jd_window_extract(text: &str) -> String {
    let lower = text.to_lowercase();

    let start = ANCHORS
        .iter()
        .filter_map(|a| lower.find(a))
        .min()
        .unwrap_or(0);

    let windowed = &text[start..];
    let windowed_lower = &lower[start..];

    let end = END_ANCHORS
        .iter()
        .filter_map(|a| windowed_lower.find(a))
        .min()
        .unwrap_or(windowed.len());

    let sliced = &windowed[..end];
    collapse_whitespace(sliced)
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Low-quality heuristic (spec §4.2 step 4).
fn is_low_quality(text: &str, source_domain: &str) -> bool {
    if text.chars().count() < 220 {
        return true;
    }
    let lower = text.to_lowercase();
    if LOW_QUALITY_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }

    let cookie_privacy_mentions = ["cookie", "privacy"]
        .iter()
        .map(|term| lower.matches(term).count())
        .sum::<usize>();

    let threshold = if source_domain == "linkedin" { 3 } else { 6 };
    cookie_privacy_mentions >= threshold
}

/// JD confidence classification (spec §4.2 step 5): length tiers plus presence
/// of structural anchors.
fn classify_confidence(text: &str) -> JdConfidence {
    let len = text.chars().count();
    let lower = text.to_lowercase();
    let anchors_present = ["responsibilit", "qualification", "requirement", "nice-to-have", "nice to have"]
        .iter()
        .filter(|a| lower.contains(**a))
        .count();

    let length_tier = if len >= 1_200 {
        2
    } else if len >= 600 {
        1
    } else {
        0
    };

    match (length_tier, anchors_present) {
        (2, n) if n >= 1 => JdConfidence::High,
        (2, _) => JdConfidence::Medium,
        (1, n) if n >= 1 => JdConfidence::Medium,
        (0, n) if n >= 2 => JdConfidence::Medium,
        _ => JdConfidence::Low,
    }
}

const MAX_JD_CHARS: usize = 12_000;

fn truncate_jd(text: &str) -> String {
    if text.chars().count() <= MAX_JD_CHARS {
        text.to_string()
    } else {
        text.chars().take(MAX_JD_CHARS).collect()
    }
}

/// Email/text fallback (spec §4.2 steps 6-7).
fn fallback_or_empty(email: &EmailContext, prior_reason: &str, prior_status: Option<&str>) -> Resolved {
    if email.is_empty() {
        return Resolved {
            jd_text_clean: String::new(),
            jd_source: "none".to_string(),
            fetch_status: prior_status.unwrap_or("failed").to_string(),
            jd_confidence: JdConfidence::Low,
            fetch_debug: json!({ "fallback_reason": prior_reason, "email_fallback_attempted": false }),
        };
    }

    let html_text = email
        .email_html
        .as_deref()
        .map(html_to_text)
        .unwrap_or_default();

    let mut combined = String::new();
    if let Some(subject) = &email.email_subject {
        combined.push_str(&format!("Subject: {subject}\n"));
    }
    if let Some(from) = &email.email_from {
        combined.push_str(&format!("From: {from}\n"));
    }
    combined.push('\n');
    if let Some(text) = &email.email_text {
        combined.push_str(text);
        combined.push('\n');
    }
    combined.push_str(&html_text);

    let windowed = jd_window_extract(&combined);
    let cleaned = strip_unsubscribe_tail(&windowed);

    if cleaned.chars().count() >= 180 {
        Resolved {
            jd_text_clean: truncate_jd(&cleaned),
            jd_source: "email".to_string(),
            fetch_status: "ok".to_string(),
            jd_confidence: classify_confidence(&cleaned),
            fetch_debug: json!({
                "prior_fetch_status": prior_status,
                "fallback_reason": prior_reason,
                "email_fallback_attempted": true,
            }),
        }
    } else {
        Resolved {
            jd_text_clean: String::new(),
            jd_source: "none".to_string(),
            fetch_status: prior_status.unwrap_or("failed").to_string(),
            jd_confidence: JdConfidence::Low,
            fetch_debug: json!({
                "prior_fetch_status": prior_status,
                "fallback_reason": prior_reason,
                "email_fallback_attempted": true,
                "email_fallback_too_short": true,
            }),
        }
    }
}

fn strip_unsubscribe_tail(text: &str) -> String {
    let lower = text.to_lowercase();
    let cut = ["unsubscribe", "copyright", "view in browser"]
        .iter()
        .filter_map(|a| lower.find(a))
        .min();
    match cut {
        Some(idx) => text[..idx].trim().to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkedin_policy_requires_high_confidence() {
        let p = policy_for("linkedin");
        assert_eq!(p.min_chars, 280);
        assert!(p.require_fetched_high_conf);
        assert!(!p.allow_low_conf_email);
    }

    #[test]
    fn whatsapp_policy_allows_low_confidence_email() {
        let p = policy_for("whatsapp.vonage.local");
        assert!(p.allow_low_conf_email);
        assert_eq!(p.min_chars, 120);
    }

    #[test]
    fn jd_window_extract_slices_from_first_anchor_and_truncates_at_end_anchor() {
        let text = "Company intro fluff.\nKey Responsibilities: Ship things. Own outcomes.\nApply now at example.com";
        let windowed = jd_window_extract(text);
        assert!(windowed.starts_with("Key Responsibilities"));
        assert!(!windowed.to_lowercase().contains("apply now"));
    }

    #[test]
    fn low_quality_on_short_text() {
        assert!(is_low_quality("too short", "other"));
    }

    #[test]
    fn low_quality_on_privacy_boilerplate() {
        let text = "x".repeat(300) + " please enable javascript to continue";
        assert!(is_low_quality(&text, "other"));
    }

    #[test]
    fn low_quality_linkedin_shell_lower_threshold() {
        let text = format!(
            "{} cookie policy privacy notice cookie settings privacy choices",
            "a".repeat(230)
        );
        assert!(is_low_quality(&text, "linkedin"));
    }

    #[test]
    fn confidence_high_requires_length_and_anchor() {
        let body = format!(
            "Key Responsibilities: {} Qualifications: {}",
            "build distributed systems. ".repeat(40),
            "five years experience. ".repeat(20)
        );
        assert_eq!(classify_confidence(&body), JdConfidence::High);
    }

    #[test]
    fn confidence_low_without_anchors_or_length() {
        assert_eq!(classify_confidence("short text, no anchors"), JdConfidence::Low);
    }

    #[test]
    fn strip_unsubscribe_tail_cuts_before_marker() {
        let text = "Responsibilities: build things.\nUnsubscribe from future emails here.";
        let stripped = strip_unsubscribe_tail(text);
        assert!(!stripped.to_lowercase().contains("unsubscribe"));
    }

    #[tokio::test]
    async fn linkedin_skips_fetch_and_goes_straight_to_fallback() {
        let client = Client::new();
        let email = EmailContext {
            email_text: Some(
                "Subject line filler. Responsibilities: design and ship backend services. "
                    .repeat(3),
            ),
            email_subject: Some("Senior Backend Engineer".to_string()),
            email_from: Some("recruiter@example.com".to_string()),
            ..Default::default()
        };
        let result = resolve(
            &client,
            "https://www.linkedin.com/jobs/view/1/",
            "linkedin",
            &email,
            7_000,
        )
        .await;
        assert_eq!(result.jd_source, "email");
        assert_eq!(result.fetch_status, "ok");
    }

    #[tokio::test]
    async fn no_email_and_failed_fetch_yields_empty_jd() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/job/1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Client::new();
        let email = EmailContext::default();
        let result = resolve(
            &client,
            &format!("{}/job/1", server.uri()),
            "other",
            &email,
            1_500,
        )
        .await;
        assert_eq!(result.jd_source, "none");
        assert!(result.jd_text_clean.is_empty());
    }

    #[tokio::test]
    async fn blocked_fetch_falls_back_to_email_per_scenario_2() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/job/2"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = Client::new();
        let email = EmailContext {
            email_subject: Some("Backend Engineer Opening".to_string()),
            email_text: Some(format!(
                "Responsibilities: {}",
                "design and operate backend services for our platform. ".repeat(6)
            )),
            ..Default::default()
        };

        let result = resolve(&client, &format!("{}/job/2", server.uri()), "other", &email, 1_500)
            .await;

        assert_eq!(result.fetch_status, "ok");
        assert_eq!(result.jd_source, "email");
        assert!(matches!(
            result.jd_confidence,
            JdConfidence::Medium | JdConfidence::High
        ));
    }

    #[tokio::test]
    async fn successful_fetch_above_window_returns_fetched_ok() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let body = format!(
            "<html><body><div>Intro</div><p>Key Responsibilities:</p><li>{}</li>\
             <p>Qualifications:</p><li>{}</li><p>Apply now</p></body></html>",
            "Design and ship distributed backend systems at scale. ".repeat(10),
            "Five plus years of relevant experience required. ".repeat(10)
        );
        Mock::given(method("GET"))
            .and(path("/job/3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = Client::new();
        let result = resolve(
            &client,
            &format!("{}/job/3", server.uri()),
            "other",
            &EmailContext::default(),
            1_500,
        )
        .await;

        assert_eq!(result.jd_source, "fetched");
        assert_eq!(result.fetch_status, "ok");
    }
}
