// ABOUTME: Pure key normalization shared by every backend so keys stay address-compatible.
// ABOUTME: Derives group, base name, display title, and stem from a canonical key.

use thiserror::Error;

/// Group name used for records that live at the top of the library.
pub const BASE_GROUP: &str = "__base__";

/// Extension carried by deck files. Only these appear in listings.
pub const DECK_EXT: &str = ".data";

/// Historical prefix that older ingestion runs kept on stored keys.
pub const LIBRARY_PREFIX: &str = "library/";

/// Errors produced when a key cannot address a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("empty key")]
    Empty,

    #[error("key {0:?} contains an empty segment")]
    EmptySegment(String),

    #[error("key {0:?} contains a relative segment")]
    RelativeSegment(String),
}

/// Turn an arbitrary manifest or user supplied path into a canonical key.
///
/// Backslashes become forward slashes, then leading slashes and leading
/// `library/` segments are peeled off until neither remains. Peeling to a
/// fixed point keeps the function idempotent even for doubly prefixed input.
pub fn normalize(raw: &str) -> String {
    let posix = raw.replace('\\', "/");
    let mut key = posix.as_str();
    loop {
        let trimmed = key.trim_start_matches('/');
        match trimmed.strip_prefix(LIBRARY_PREFIX) {
            Some(rest) => key = rest,
            None => return trimmed.to_string(),
        }
    }
}

/// Directory component of a key, or [`BASE_GROUP`] for top-level keys.
pub fn group_of(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..idx],
        None => BASE_GROUP,
    }
}

/// Final segment of a key.
pub fn base_name(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

/// Name with its last extension removed. A leading dot is not an extension.
pub fn display_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Key with the extension of its final segment removed; the directory is kept.
pub fn stem_key(key: &str) -> String {
    let name = base_name(key);
    let stem = display_of(name);
    let dir_len = key.len() - name.len();
    format!("{}{}", &key[..dir_len], stem)
}

/// True when the name carries the deck extension, ignoring ASCII case.
pub fn is_deck_name(name: &str) -> bool {
    name.len() > DECK_EXT.len()
        && name
            .get(name.len() - DECK_EXT.len()..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DECK_EXT))
}

/// Reject keys that cannot safely address a record in every backend.
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(KeyError::EmptySegment(key.to_string())),
            "." | ".." => return Err(KeyError::RelativeSegment(key.to_string())),
            _ => {}
        }
    }
    Ok(())
}
