//! URL Normalizer (C1, spec §4.1).
//!
//! Canonicalizes a raw job-posting URL, unwrapping tracking redirects, applies
//! per-source policies, and derives a stable `job_key`. Never touches the network.

use regex::Regex;
use sha1::{Digest, Sha1};
use std::sync::OnceLock;
use url::Url;

use crate::errors::AppError;

/// Query parameters that commonly wrap a tracking redirect around the real URL.
const REDIRECT_PARAMS: &[&str] = &[
    "url",
    "u",
    "q",
    "redirect",
    "redirect_url",
    "redirectUrl",
    "target",
    "dest",
    "destination",
    "to",
    "r",
    "href",
    "next",
];

fn linkedin_path_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/jobs/view/(\d+)/?").unwrap())
}

fn trailing_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-(\d+)(?:\.html)?/?$").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub ignored: bool,
    pub source_domain: String,
    pub job_id: Option<String>,
    pub job_url: String,
    pub job_key: String,
}

/// Normalizes a raw URL into a canonical job record key (spec §4.1).
///
/// Fails with `AppError::InvalidInput` only when the URL cannot be parsed at
/// all; known non-job shapes return `ignored: true` instead of an error.
pub fn normalize(raw_url: &str) -> Result<NormalizedUrl, AppError> {
    normalize_inner(raw_url, 0)
}

fn normalize_inner(raw_url: &str, depth: u8) -> Result<NormalizedUrl, AppError> {
    let url = Url::parse(raw_url.trim())
        .map_err(|e| AppError::InvalidInput(format!("invalid URL: {e}")))?;

    if depth < 4 {
        if let Some(unwrapped) = unwrap_redirect(&url) {
            if unwrapped != raw_url {
                return normalize_inner(&unwrapped, depth + 1);
            }
        }
    }

    let host = url.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    if host == "linkedin.com" {
        return Ok(normalize_linkedin(&url));
    }
    if host == "iimjobs.com" {
        return Ok(normalize_iimjobs(&url));
    }
    if host == "naukri.com" {
        return Ok(normalize_naukri(&url));
    }
    Ok(normalize_other(&url, &host))
}

/// Unwraps a tracking redirect, including the iimjobs `postoffice /CL0/<encoded>/`
/// prefix, which the source occasionally double-percent-encodes.
fn unwrap_redirect(url: &Url) -> Option<String> {
    for (key, value) in url.query_pairs() {
        if REDIRECT_PARAMS.contains(&key.as_ref()) && looks_like_url(&value) {
            return Some(double_decode(&value));
        }
    }

    let path = url.path();
    if let Some(rest) = path.strip_prefix("/CL0/") {
        let encoded = rest.trim_end_matches('/');
        if !encoded.is_empty() {
            let decoded = double_decode(encoded);
            if looks_like_url(&decoded) {
                return Some(decoded);
            }
        }
    }

    None
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("http%3A") || s.starts_with("https%3A")
}

/// Percent-decodes up to twice — some sources wrap the target URL in a second
/// layer of percent-encoding.
fn double_decode(s: &str) -> String {
    let once = percent_decode(s);
    if once.contains('%') {
        let twice = percent_decode(&once);
        if twice.starts_with("http") {
            return twice;
        }
    }
    once
}

fn percent_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8_lossy()
        .into_owned()
}

fn normalize_linkedin(url: &Url) -> NormalizedUrl {
    let from_query = url
        .query_pairs()
        .find(|(k, _)| k == "currentJobId")
        .map(|(_, v)| v.to_string())
        .filter(|v| v.chars().all(|c| c.is_ascii_digit()) && !v.is_empty());

    let from_path = linkedin_path_id_re()
        .captures(url.path())
        .map(|c| c[1].to_string());

    let job_id = from_query.or(from_path);

    match job_id {
        Some(id) => {
            let job_url = format!("https://www.linkedin.com/jobs/view/{id}/");
            let job_key = job_key_from_id("linkedin", &id);
            NormalizedUrl {
                ignored: false,
                source_domain: "linkedin".to_string(),
                job_id: Some(id),
                job_url,
                job_key,
            }
        }
        None => ignored_result("linkedin"),
    }
}

fn normalize_iimjobs(url: &Url) -> NormalizedUrl {
    let path = url.path();
    if !path.starts_with("/j/") {
        return ignored_result("iimjobs");
    }

    let stripped = path.strip_suffix(".html").unwrap_or(path);
    let job_id = trailing_digits_re()
        .captures(path)
        .map(|c| c[1].to_string());

    let job_url = format!("https://www.iimjobs.com{stripped}");
    let job_key = match &job_id {
        Some(id) => job_key_from_id("iimjobs", id),
        None => job_key_from_url(&job_url),
    };

    NormalizedUrl {
        ignored: false,
        source_domain: "iimjobs".to_string(),
        job_id,
        job_url,
        job_key,
    }
}

fn normalize_naukri(url: &Url) -> NormalizedUrl {
    let path = url.path();
    if path.starts_with("/mnjuser/inbox") {
        return ignored_result("naukri");
    }
    if !path.contains("/job-listings-") {
        return ignored_result("naukri");
    }

    let job_id = trailing_digits_re()
        .captures(path)
        .map(|c| c[1].to_string());

    let job_url = format!("https://www.naukri.com{path}");
    let job_key = match &job_id {
        Some(id) => job_key_from_id("naukri", id),
        None => job_key_from_url(&job_url),
    };

    NormalizedUrl {
        ignored: false,
        source_domain: "naukri".to_string(),
        job_id,
        job_url,
        job_key,
    }
}

fn normalize_other(url: &Url, host: &str) -> NormalizedUrl {
    let scheme = url.scheme();
    let path = url.path().trim_end_matches('/');
    let job_url = if path.is_empty() {
        format!("{scheme}://{host}")
    } else {
        format!("{scheme}://{host}{path}")
    };

    NormalizedUrl {
        ignored: false,
        source_domain: "other".to_string(),
        job_id: None,
        job_key: job_key_from_url(&job_url),
        job_url,
    }
}

fn ignored_result(source_domain: &str) -> NormalizedUrl {
    NormalizedUrl {
        ignored: true,
        source_domain: source_domain.to_string(),
        job_id: None,
        job_url: String::new(),
        job_key: String::new(),
    }
}

fn job_key_from_id(source: &str, job_id: &str) -> String {
    sha1_hex(&format!("{source}|{job_id}"))
}

fn job_key_from_url(stripped_url: &str) -> String {
    sha1_hex(&format!("url|{stripped_url}"))
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_linkedin_from_current_job_id_query() {
        let result = normalize(
            "https://www.linkedin.com/jobs/search?currentJobId=3847291038&trk=public_jobs_jserp",
        )
        .unwrap();
        assert_eq!(result.source_domain, "linkedin");
        assert_eq!(result.job_id.as_deref(), Some("3847291038"));
        assert_eq!(
            result.job_url,
            "https://www.linkedin.com/jobs/view/3847291038/"
        );
        assert!(!result.ignored);
    }

    #[test]
    fn linkedin_without_job_id_is_ignored() {
        let result = normalize("https://www.linkedin.com/jobs/search?keywords=rust").unwrap();
        assert!(result.ignored);
        assert_eq!(result.source_domain, "linkedin");
    }

    #[test]
    fn iimjobs_extracts_trailing_id_and_strips_html() {
        let result =
            normalize("https://www.iimjobs.com/j/senior-backend-engineer-1182734.html").unwrap();
        assert_eq!(result.source_domain, "iimjobs");
        assert_eq!(result.job_id.as_deref(), Some("1182734"));
        assert_eq!(
            result.job_url,
            "https://www.iimjobs.com/j/senior-backend-engineer-1182734"
        );
    }

    #[test]
    fn iimjobs_non_job_path_is_ignored() {
        let result = normalize("https://www.iimjobs.com/login").unwrap();
        assert!(result.ignored);
    }

    #[test]
    fn naukri_extracts_job_listings_id() {
        let result = normalize(
            "https://www.naukri.com/job-listings-senior-rust-engineer-acme-bangalore-221045",
        )
        .unwrap();
        assert_eq!(result.source_domain, "naukri");
        assert_eq!(result.job_id.as_deref(), Some("221045"));
    }

    #[test]
    fn naukri_inbox_url_is_ignored() {
        let result = normalize("https://www.naukri.com/mnjuser/inbox?id=1").unwrap();
        assert!(result.ignored);
    }

    #[test]
    fn other_source_strips_query_and_trailing_slash() {
        let result = normalize("https://jobs.example.com/posting/42/?utm_source=feed").unwrap();
        assert_eq!(result.source_domain, "other");
        assert_eq!(result.job_url, "https://jobs.example.com/posting/42");
        assert!(result.job_id.is_none());
    }

    #[test]
    fn unwraps_generic_redirect_query_param() {
        let result = normalize(
            "https://click.tracker.example.com/go?redirect_url=https%3A%2F%2Fwww.linkedin.com%2Fjobs%2Fview%2F555%2F",
        )
        .unwrap();
        assert_eq!(result.source_domain, "linkedin");
        assert_eq!(result.job_id.as_deref(), Some("555"));
    }

    #[test]
    fn invalid_url_is_an_error_not_ignored() {
        let result = normalize("not a url at all");
        assert!(result.is_err());
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(
            "https://www.linkedin.com/jobs/search?currentJobId=3847291038&trk=public_jobs_jserp",
        )
        .unwrap();
        let twice = normalize(&once.job_url).unwrap();
        assert_eq!(once.job_url, twice.job_url);
        assert_eq!(once.job_key, twice.job_key);
    }

    #[test]
    fn job_key_stable_across_invocations() {
        let a = normalize("https://www.naukri.com/job-listings-backend-eng-555").unwrap();
        let b = normalize("https://www.naukri.com/job-listings-backend-eng-555").unwrap();
        assert_eq!(a.job_key, b.job_key);
    }
}
