// ABOUTME: Core library for deckstore: pure key rules, deck conventions, and the manifest model.
// ABOUTME: Shared by both storage backends so they agree on every derived value.

pub mod collate;
pub mod deck;
pub mod legacy;
pub mod manifest;
pub mod path;
pub mod record;

pub use collate::natural_cmp;
pub use deck::{display_title, header_title};
pub use legacy::{CANDIDATE_RULES, candidate_keys, scan_matches};
pub use manifest::{Manifest, ManifestEntry};
pub use path::{
    BASE_GROUP, DECK_EXT, KeyError, LIBRARY_PREFIX, base_name, display_of, group_of, is_deck_name,
    normalize, stem_key, validate_key,
};
pub use record::{FileEntry, FileRecord, order_groups, sort_entries};
