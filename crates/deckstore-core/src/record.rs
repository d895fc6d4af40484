// ABOUTME: FileRecord (the unit of storage) and FileEntry (a listing row).
// ABOUTME: Derived fields are always computed from the key and text, never supplied by callers.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collate::natural_cmp;
use crate::deck::display_title;
use crate::path::{BASE_GROUP, base_name, group_of};

/// A stored deck file. Construct with [`FileRecord::new`] so `group`, `name`
/// and `display` always agree with `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub group: String,
    pub name: String,
    pub display: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record for a canonical key, deriving every dependent field.
    pub fn new(path: &str, text: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            path: path.to_string(),
            group: group_of(path).to_string(),
            name: base_name(path).to_string(),
            display: display_title(path, text),
            text: text.to_string(),
            timestamp,
        }
    }

    /// Listing row for this record.
    pub fn entry(&self) -> FileEntry {
        FileEntry {
            path: self.path.clone(),
            name: self.name.clone(),
            display: self.display.clone(),
        }
    }
}

/// One row of a group listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub display: String,
}

impl FileEntry {
    /// Listing order: display title, then file name, both natural and
    /// case-insensitive. The raw path breaks remaining ties so every backend
    /// yields the same sequence.
    pub fn listing_cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.display, &other.display)
            .then_with(|| natural_cmp(&self.name, &other.name))
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Sort listing rows in place using [`FileEntry::listing_cmp`].
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(FileEntry::listing_cmp);
}

/// Order group names for display: the base group first, then the rest in
/// natural order. Duplicates are removed and the base group is always present.
pub fn order_groups<I>(groups: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut rest: Vec<String> = groups.into_iter().filter(|g| g != BASE_GROUP).collect();
    rest.sort_by(|a, b| natural_cmp(a, b).then_with(|| a.cmp(b)));
    rest.dedup();

    let mut ordered = Vec::with_capacity(rest.len() + 1);
    ordered.push(BASE_GROUP.to_string());
    ordered.extend(rest);
    ordered
}
