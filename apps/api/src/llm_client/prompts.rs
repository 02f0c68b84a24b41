#![allow(dead_code)]

// Shared prompt constants. Each stage that calls the LLM (extractor, scorer)
// builds its own prompt body alongside its own module; this file holds the
// cross-cutting system-prompt fragments.

/// System prompt fragment that enforces JSON-only output (C3 extraction, C4 scoring).
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for the JD-field extractor (C3, spec §4.3). Temperature is pinned
/// to 0 at the call site, not here — deterministic extraction is a call-level
/// configuration knob, not a prompt instruction.
pub const EXTRACTOR_SYSTEM: &str = "You extract structured fields from a job description. \
    Return a single JSON object with keys: company, role_title, location, work_mode, \
    seniority, experience_years_min, experience_years_max, must_keywords, nice_keywords, \
    reject_keywords, skills. Use null for fields you cannot determine. \
    Keyword fields are JSON arrays of lowercase strings, never a comma-joined string.";

/// System prompt for the AI reasoning stage of the scoring pipeline (C4, spec §4.4).
pub const SCORER_SYSTEM: &str = "You score how well a job posting matches a candidate \
    target profile. Return a single JSON object with keys: primary_target_id, score_must, \
    score_nice, final_score, reject_triggered, reason_top_matches, potential_contacts. \
    final_score is an integer 0-100. potential_contacts is a JSON array of objects with a \
    'name' field and optional 'title'/'company'. If the JD contains a hard disqualifier, \
    set reject_triggered=true and begin reason_top_matches with the literal text \"Reject:\".";
