//! Status transition table (C4, spec §4.4 `transition` state).
//!
//! A pure lookup from an entry reason (+ score, for the `scored` rows) to the
//! `(status, system_status)` pair the pipeline writes. Shared by the scoring
//! pipeline's own `heuristic_rejected`/`scored` rows and by the ingestion
//! orchestrator's `ingest_ready`/`ingest_needs_manual`/`ingest_ai_unavailable`
//! rows (spec §4.6 step 3), so there is exactly one table, not two.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryReason {
    IngestReady,
    IngestNeedsManual,
    IngestAiUnavailable,
    HeuristicRejected,
    Scored,
}

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub status: &'static str,
    pub system_status: Option<&'static str>,
}

/// Resolves the transition table row for non-`scored` reasons (spec §4.4 table,
/// rows 1-4).
pub fn resolve(reason: EntryReason) -> Transition {
    match reason {
        EntryReason::IngestReady => Transition {
            status: "NEW",
            system_status: None,
        },
        EntryReason::IngestNeedsManual => Transition {
            status: "LINK_ONLY",
            system_status: Some("NEEDS_MANUAL_JD"),
        },
        EntryReason::IngestAiUnavailable => Transition {
            status: "LINK_ONLY",
            system_status: Some("AI_UNAVAILABLE"),
        },
        EntryReason::HeuristicRejected => Transition {
            status: "REJECTED",
            system_status: Some("REJECTED_HEURISTIC"),
        },
        EntryReason::Scored => {
            unreachable!("Scored resolves via resolve_scored, which needs score + reject inputs")
        }
    }
}

/// Resolves the transition table row for the `scored` reason's four sub-rows
/// (spec §4.4 table, rows 5-8): reject, shortlist, archive, or plain scored.
pub fn resolve_scored(final_score: i32, reject_triggered: bool, shortlist_threshold: i32, archive_threshold: i32) -> Transition {
    if reject_triggered {
        return Transition {
            status: "REJECTED",
            system_status: None,
        };
    }
    if final_score >= shortlist_threshold {
        return Transition {
            status: "SHORTLISTED",
            system_status: None,
        };
    }
    if final_score < archive_threshold {
        return Transition {
            status: "ARCHIVED",
            system_status: None,
        };
    }
    Transition {
        status: "SCORED",
        system_status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_rows_match_spec_table() {
        assert_eq!(resolve(EntryReason::IngestReady).status, "NEW");
        assert_eq!(resolve(EntryReason::IngestReady).system_status, None);

        let needs_manual = resolve(EntryReason::IngestNeedsManual);
        assert_eq!(needs_manual.status, "LINK_ONLY");
        assert_eq!(needs_manual.system_status, Some("NEEDS_MANUAL_JD"));

        let ai_unavailable = resolve(EntryReason::IngestAiUnavailable);
        assert_eq!(ai_unavailable.status, "LINK_ONLY");
        assert_eq!(ai_unavailable.system_status, Some("AI_UNAVAILABLE"));

        let heuristic = resolve(EntryReason::HeuristicRejected);
        assert_eq!(heuristic.status, "REJECTED");
        assert_eq!(heuristic.system_status, Some("REJECTED_HEURISTIC"));
    }

    #[test]
    fn scored_reject_wins_over_threshold() {
        let t = resolve_scored(95, true, 75, 55);
        assert_eq!(t.status, "REJECTED");
        assert_eq!(t.system_status, None);
    }

    #[test]
    fn scored_above_shortlist_threshold() {
        let t = resolve_scored(80, false, 75, 55);
        assert_eq!(t.status, "SHORTLISTED");
    }

    #[test]
    fn scored_below_archive_threshold() {
        let t = resolve_scored(40, false, 75, 55);
        assert_eq!(t.status, "ARCHIVED");
    }

    #[test]
    fn scored_in_between_is_plain_scored() {
        let t = resolve_scored(65, false, 75, 55);
        assert_eq!(t.status, "SCORED");
    }

    #[test]
    fn boundary_scores_are_inclusive_on_shortlist_and_exclusive_on_archive() {
        assert_eq!(resolve_scored(75, false, 75, 55).status, "SHORTLISTED");
        assert_eq!(resolve_scored(55, false, 75, 55).status, "SCORED");
        assert_eq!(resolve_scored(54, false, 75, 55).status, "ARCHIVED");
    }
}
