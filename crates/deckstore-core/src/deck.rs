// ABOUTME: Deck file conventions: the optional first-line NAME header and display titles.
// ABOUTME: Both backends derive listing titles through these functions.

use crate::path::{base_name, display_of};

/// Extract the title declared by a first line of the form `NAME: <title>`.
///
/// The keyword is matched case-insensitively and may be surrounded by
/// whitespace. Returns `None` when the first line is not a header or the
/// declared title is blank.
pub fn header_title(text: &str) -> Option<&str> {
    let first = text.lines().next()?;
    let (keyword, title) = first.split_once(':')?;
    if !keyword.trim().eq_ignore_ascii_case("name") {
        return None;
    }
    let title = title.trim();
    if title.is_empty() { None } else { Some(title) }
}

/// Human-facing title for a key: the header title when present, otherwise
/// the file name with its extension removed.
pub fn display_title(key: &str, text: &str) -> String {
    header_title(text)
        .unwrap_or_else(|| display_of(base_name(key)))
        .to_string()
}
