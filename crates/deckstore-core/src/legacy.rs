// ABOUTME: Candidate keys for reading records stored under earlier key conventions.
// ABOUTME: An ordered list of generators plus a base-name matcher for the full-scan fallback.

use crate::path::{DECK_EXT, LIBRARY_PREFIX, base_name, display_of, stem_key, validate_key};

/// A rule that proposes one stored key to try for a canonical key.
pub type CandidateRule = fn(&str) -> Option<String>;

/// Rules in the order they are tried. The first record found with non-empty
/// text wins; the full scan runs only after every rule missed.
pub const CANDIDATE_RULES: &[CandidateRule] =
    &[exact, library_prefixed, canonical_extension, bare_stem];

fn exact(key: &str) -> Option<String> {
    Some(key.to_string())
}

fn library_prefixed(key: &str) -> Option<String> {
    Some(format!("{}{}", LIBRARY_PREFIX, key))
}

fn canonical_extension(key: &str) -> Option<String> {
    Some(format!("{}{}", stem_key(key), DECK_EXT))
}

// Keys from before files carried an extension at all.
fn bare_stem(key: &str) -> Option<String> {
    let stem = stem_key(key);
    if stem == key { None } else { Some(stem) }
}

/// Distinct candidate keys for `key`, in rule order. Candidates that are not
/// valid keys (a stem of `.` or `..`, say) are dropped rather than tried.
pub fn candidate_keys(key: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(CANDIDATE_RULES.len());
    for rule in CANDIDATE_RULES {
        if let Some(candidate) = rule(key)
            && validate_key(&candidate).is_ok()
            && !out.contains(&candidate)
        {
            out.push(candidate);
        }
    }
    out
}

/// True when a stored key plausibly holds the record asked for by `key`:
/// the base names are identical, or identical once extensions are removed.
pub fn scan_matches(wanted: &str, stored: &str) -> bool {
    let wanted_name = base_name(wanted);
    let stored_name = base_name(stored);
    wanted_name == stored_name || display_of(wanted_name) == display_of(stored_name)
}
