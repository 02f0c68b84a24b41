//! Verdict stage (C4, spec §4.4 `verdict` state).
//!
//! Merges the model's own `reject_triggered` flag with two deterministic
//! signals the model might miss: a literal "Reject:" marker somewhere in the
//! JD, and a per-target reject-keyword hit against the JD text. Any of the
//! three forces `final_score` to zero; otherwise the model's score is clamped
//! into `[0, 100]`.

use crate::models::target::TargetRow;

#[derive(Debug, Clone)]
pub struct Verdict {
    pub final_score: i32,
    pub reject_triggered: bool,
    pub reject_reasons: Vec<String>,
}

/// Merges model output with deterministic reject signals (spec §4.4).
pub fn merge(
    model_score: Option<i32>,
    model_reject_triggered: bool,
    jd_text: &str,
    targets: &[TargetRow],
) -> Verdict {
    let mut reasons = Vec::new();

    if model_reject_triggered {
        reasons.push("model_reject_triggered".to_string());
    }

    if jd_text.to_lowercase().contains("reject:") {
        reasons.push("jd_contains_reject_marker".to_string());
    }

    let jd_lower = jd_text.to_lowercase();
    for target in targets {
        for kw in &target.reject_keywords {
            if !kw.trim().is_empty() && jd_lower.contains(&kw.to_lowercase()) {
                reasons.push(format!("reject_keyword:{kw} (target {})", target.name));
            }
        }
    }

    let reject_triggered = !reasons.is_empty();
    let final_score = if reject_triggered {
        0
    } else {
        model_score.unwrap_or(0).clamp(0, 100)
    };

    Verdict {
        final_score,
        reject_triggered,
        reject_reasons: reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn target(reject: &[&str]) -> TargetRow {
        TargetRow {
            id: Uuid::new_v4(),
            name: "t".to_string(),
            primary_role: "Engineer".to_string(),
            seniority_pref: None,
            location_pref: None,
            must_keywords: vec![],
            nice_keywords: vec![],
            reject_keywords: reject.iter().map(|s| s.to_string()).collect(),
            rubric_profile: "auto".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn model_reject_forces_zero() {
        let v = merge(Some(88), true, "Great role.", &[]);
        assert_eq!(v.final_score, 0);
        assert!(v.reject_triggered);
    }

    #[test]
    fn jd_reject_marker_forces_zero_even_if_model_says_no() {
        let v = merge(Some(91), false, "Reject: requires onsite only, no remote.", &[]);
        assert_eq!(v.final_score, 0);
        assert!(v.reject_triggered);
        assert!(v.reject_reasons.iter().any(|r| r == "jd_contains_reject_marker"));
    }

    #[test]
    fn target_reject_keyword_hit_forces_zero() {
        let targets = vec![target(&["c++"])];
        let v = merge(Some(85), false, "Strong C++ required for this role.", &targets);
        assert_eq!(v.final_score, 0);
        assert!(v
            .reject_reasons
            .iter()
            .any(|r| r.starts_with("reject_keyword:c++")));
    }

    #[test]
    fn clean_score_is_clamped_into_range() {
        let v = merge(Some(140), false, "A normal job description.", &[]);
        assert_eq!(v.final_score, 100);
        assert!(!v.reject_triggered);

        let v2 = merge(Some(-10), false, "A normal job description.", &[]);
        assert_eq!(v2.final_score, 0);
    }

    #[test]
    fn missing_model_score_with_no_reject_defaults_to_zero() {
        let v = merge(None, false, "A normal job description.", &[]);
        assert_eq!(v.final_score, 0);
        assert!(!v.reject_triggered);
    }
}
