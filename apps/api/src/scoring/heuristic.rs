//! Heuristic gate (C4, spec §4.4 `heuristic` state).
//!
//! Pre-AI check that short-circuits obviously irrelevant jobs before paying
//! for an LLM call: reject-keyword hits, a JD too short to reason about, or a
//! target signal too weak to bother scoring.

use crate::models::target::TargetRow;

#[derive(Debug, Clone)]
pub struct HeuristicResult {
    pub passed: bool,
    pub reasons: Vec<String>,
    pub best_target_signal: u32,
}

/// Runs the heuristic gate against every candidate target, keeping the
/// strongest signal (spec §4.4: "combined target signal (role+must overlap)
/// below `min_target_signal`").
pub fn evaluate(
    jd_text: &str,
    targets: &[TargetRow],
    min_jd_chars: usize,
    min_target_signal: u32,
) -> HeuristicResult {
    let jd_lower = jd_text.to_lowercase();
    let mut reasons = Vec::new();

    for target in targets {
        for kw in &target.reject_keywords {
            if !kw.trim().is_empty() && jd_lower.contains(&kw.to_lowercase()) {
                reasons.push(format!(
                    "reject_keyword:{kw} (target {})",
                    target.name
                ));
            }
        }
    }

    if jd_text.chars().count() < min_jd_chars {
        reasons.push(format!(
            "jd_too_short: {} chars < minimum {}",
            jd_text.chars().count(),
            min_jd_chars
        ));
    }

    let best_target_signal = targets
        .iter()
        .map(|t| target_signal(&jd_lower, t))
        .max()
        .unwrap_or(0);

    if targets.is_empty() || best_target_signal < min_target_signal {
        reasons.push(format!(
            "target_signal_low: {best_target_signal} < minimum {min_target_signal}"
        ));
    }

    HeuristicResult {
        passed: reasons.is_empty(),
        reasons,
        best_target_signal,
    }
}

/// Role-word overlap plus must-keyword overlap against the JD text.
fn target_signal(jd_lower: &str, target: &TargetRow) -> u32 {
    let role_overlap = target
        .primary_role
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && jd_lower.contains(&w.to_lowercase()))
        .count() as u32;

    let must_overlap = target
        .must_keywords
        .iter()
        .filter(|kw| !kw.trim().is_empty() && jd_lower.contains(&kw.to_lowercase()))
        .count() as u32;

    role_overlap * 2 + must_overlap * 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn target(must: &[&str], reject: &[&str], role: &str) -> TargetRow {
        TargetRow {
            id: Uuid::new_v4(),
            name: "t".to_string(),
            primary_role: role.to_string(),
            seniority_pref: None,
            location_pref: None,
            must_keywords: must.iter().map(|s| s.to_string()).collect(),
            nice_keywords: vec![],
            reject_keywords: reject.iter().map(|s| s.to_string()).collect(),
            rubric_profile: "auto".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn reject_keyword_in_jd_fails_gate() {
        let targets = vec![target(&["rust"], &["c++"], "Backend Engineer")];
        let result = evaluate(
            "Strong C++ required for this backend engineer role with rust experience a plus.",
            &targets,
            10,
            1,
        );
        assert!(!result.passed);
        assert!(result.reasons.iter().any(|r| r.starts_with("reject_keyword:c++")));
    }

    #[test]
    fn short_jd_fails_gate() {
        let targets = vec![target(&["rust"], &[], "Backend Engineer")];
        let result = evaluate("too short", &targets, 120, 1);
        assert!(!result.passed);
        assert!(result.reasons.iter().any(|r| r.starts_with("jd_too_short")));
    }

    #[test]
    fn low_target_signal_fails_gate() {
        let targets = vec![target(&["kubernetes"], &[], "Platform Engineer")];
        let jd = "x".repeat(200);
        let result = evaluate(&jd, &targets, 50, 8);
        assert!(!result.passed);
        assert!(result.reasons.iter().any(|r| r.starts_with("target_signal_low")));
    }

    #[test]
    fn strong_overlap_passes_gate() {
        let targets = vec![target(&["rust", "distributed systems"], &[], "Backend Engineer")];
        let jd = "Backend Engineer role requiring strong Rust skills and distributed systems \
                   experience across a large platform team.";
        let result = evaluate(jd, &targets, 10, 8);
        assert!(result.passed, "reasons: {:?}", result.reasons);
    }
}
