//! Gap classification for read-only reporting across archived jobs (spec §4.5,
//! §6 `/jobs/evidence/gap-report`).
//!
//! For each frequently-missed must-requirement, checks the candidate's resume
//! corpus for a direct normalized match, then a curated synonym cluster
//! covering leadership/strategy/execution/technical themes, before giving up
//! and calling it a true gap.

use crate::models::evidence::{GapClass, GapReportEntry};

/// Curated synonym clusters: `(keys that identify a requirement as belonging
/// to this theme, vocabulary that counts as evidence of it)`. Not exhaustive —
/// a fixed, hand-curated map per spec §4.5, not a general thesaurus.
const CLUSTERS: &[(&[&str], &[&str])] = &[
    (
        &["leadership", "lead ", "leading", "people management"],
        &["led", "managed", "mentored", "directed", "oversaw", "coached"],
    ),
    (
        &["strategy", "strategic"],
        &["strategic", "roadmap", "vision", "planned", "prioritized"],
    ),
    (
        &["execution", "delivery", "deliver"],
        &["delivered", "shipped", "executed", "launched", "drove"],
    ),
    (
        &["architecture", "architect", "system design"],
        &["designed", "architected", "built the architecture for"],
    ),
    (
        &["stakeholder management", "stakeholder", "cross-functional"],
        &["partnered with", "collaborated with", "aligned with", "worked closely with"],
    ),
    (
        &["communication", "presentation"],
        &["presented", "communicated", "reported to"],
    ),
];

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_cluster(requirement_lower: &str) -> Option<&'static [&'static str]> {
    CLUSTERS
        .iter()
        .find(|(keys, _)| keys.iter().any(|k| requirement_lower.contains(k)))
        .map(|(_, synonyms)| *synonyms)
}

/// Classifies one requirement against a candidate's flattened profile corpus.
pub fn classify(requirement: &str, profile_corpus: &str) -> (GapClass, Option<String>, Option<String>) {
    let req_norm = normalize_whitespace(&requirement.to_lowercase());
    let corpus_norm = normalize_whitespace(&profile_corpus.to_lowercase());

    if !req_norm.is_empty() && corpus_norm.contains(&req_norm) {
        return (GapClass::Matched, None, None);
    }

    if let Some(synonyms) = find_cluster(&req_norm) {
        if let Some(hit) = synonyms.iter().find(|s| corpus_norm.contains(**s)) {
            let suggestion = format!(
                "Consider rephrasing a bullet to explicitly mention \"{requirement}\" \
                 alongside your existing \"{hit}\" language."
            );
            return (GapClass::VocabularyGap, Some((*hit).to_string()), Some(suggestion));
        }
    }

    (GapClass::TrueGap, None, None)
}

/// Builds the full gap report for a set of `(requirement_text, missed_count)`
/// pairs already filtered by `min_missed` at the storage layer.
pub fn build_report(missed: &[(String, i64)], profile_corpus: &str) -> Vec<GapReportEntry> {
    missed
        .iter()
        .map(|(requirement_text, missed_count)| {
            let (class, synonym_hit, rewrite_suggestion) = classify(requirement_text, profile_corpus);
            GapReportEntry {
                requirement_text: requirement_text.clone(),
                missed_count: *missed_count,
                class,
                synonym_hit,
                rewrite_suggestion,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leadership_without_literal_token_is_vocabulary_gap() {
        let (class, synonym, suggestion) =
            classify("Leadership", "Led a team of 8 engineers shipping a payments platform.");
        assert_eq!(class, GapClass::VocabularyGap);
        assert_eq!(synonym.as_deref(), Some("led"));
        assert!(suggestion.is_some());
    }

    #[test]
    fn direct_match_short_circuits_synonym_lookup() {
        let (class, synonym, _) = classify("Rust", "Five years of Rust in production systems.");
        assert_eq!(class, GapClass::Matched);
        assert!(synonym.is_none());
    }

    #[test]
    fn no_match_and_no_synonym_is_true_gap() {
        let (class, synonym, suggestion) = classify("Kubernetes", "Worked mostly with spreadsheets.");
        assert_eq!(class, GapClass::TrueGap);
        assert!(synonym.is_none());
        assert!(suggestion.is_none());
    }

    #[test]
    fn build_report_preserves_missed_counts() {
        let missed = vec![("Leadership".to_string(), 12i64)];
        let report = build_report(&missed, "Led cross-functional teams.");
        assert_eq!(report[0].missed_count, 12);
        assert_eq!(report[0].class, GapClass::VocabularyGap);
    }
}
