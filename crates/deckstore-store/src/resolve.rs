// ABOUTME: Legacy-aware record lookup and one-shot legacy key migration over any DeckStore.
// ABOUTME: Tries the candidate rules in order, then scans every stored key by base name.

use deckstore_core::{FileRecord, candidate_keys, normalize, scan_matches, validate_key};
use serde::Serialize;

use crate::backend::DeckStore;
use crate::error::StoreError;

/// Find the record for a canonical key, falling back through historical key
/// conventions. A hit only counts when its text is non-empty; if the exact
/// key holds an empty record and nothing else matches, that record is returned.
pub async fn resolve_record(
    store: &dyn DeckStore,
    key: &str,
) -> Result<Option<FileRecord>, StoreError> {
    let mut empty_exact = None;

    for candidate in candidate_keys(key) {
        match store.get_record(&candidate).await? {
            Some(record) if !record.text.is_empty() => {
                if candidate != key {
                    tracing::debug!("resolved {} via legacy key {}", key, candidate);
                }
                return Ok(Some(record));
            }
            Some(record) if candidate == key => empty_exact = Some(record),
            _ => {}
        }
    }

    for stored in store.keys().await? {
        if !scan_matches(key, &stored) {
            continue;
        }
        if let Some(record) = store.get_record(&stored).await?
            && !record.text.is_empty()
        {
            tracing::debug!("resolved {} by scanning to {}", key, stored);
            return Ok(Some(record));
        }
    }

    Ok(empty_exact)
}

/// Outcome of [`migrate_legacy_keys`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Records moved to their canonical key.
    pub migrated: usize,
    /// Legacy keys left in place because their canonical key was taken or unusable.
    pub conflicts: Vec<String>,
}

/// Move every record stored under a non-canonical key to its canonical key.
///
/// Records whose canonical key is already occupied are left untouched and
/// reported as conflicts, so no data is overwritten.
pub async fn migrate_legacy_keys(store: &dyn DeckStore) -> Result<MigrationReport, StoreError> {
    let mut report = MigrationReport::default();

    for key in store.keys().await? {
        let canonical = normalize(&key);
        if canonical == key {
            continue;
        }

        if validate_key(&canonical).is_err() || store.get_record(&canonical).await?.is_some() {
            tracing::warn!("leaving legacy key {} in place; {} unavailable", key, canonical);
            report.conflicts.push(key);
            continue;
        }

        let Some(record) = store.get_record(&key).await? else {
            continue;
        };
        store.put(&canonical, &record.text).await?;
        store.remove(&key).await?;
        tracing::info!("migrated legacy key {} to {}", key, canonical);
        report.migrated += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStore;
    use crate::tree::{TreeConfig, TreeStore};
    use tempfile::TempDir;

    async fn stores(dir: &TempDir) -> Vec<Box<dyn DeckStore>> {
        let sqlite = SqliteStore::new(dir.path().join("decks.db"));
        sqlite.init().await.unwrap();
        let tree = TreeStore::new(TreeConfig::new(dir.path().join("tree")));
        tree.init().await.unwrap();
        vec![Box::new(sqlite), Box::new(tree)]
    }

    async fn text_of(store: &dyn DeckStore, key: &str) -> Option<String> {
        resolve_record(store, key).await.unwrap().map(|r| r.text)
    }

    #[tokio::test]
    async fn exact_key_wins() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("foo.data", "canonical").await.unwrap();
            store.put("library/foo.data", "legacy").await.unwrap();
            assert_eq!(text_of(store.as_ref(), "foo.data").await.as_deref(), Some("canonical"));
        }
    }

    #[tokio::test]
    async fn library_prefixed_key_is_found() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("library/foo.data", "legacy").await.unwrap();
            assert_eq!(
                text_of(store.as_ref(), "foo.data").await.as_deref(),
                Some("legacy"),
                "backend {}",
                store.kind()
            );
        }
    }

    #[tokio::test]
    async fn extension_and_stem_forms_are_found() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("miku/No_1.data", "with ext").await.unwrap();
            store.put("miku/No_2", "bare stem").await.unwrap();

            let with_ext = text_of(store.as_ref(), "miku/No_1.txt").await;
            assert_eq!(with_ext.as_deref(), Some("with ext"));
            let bare = text_of(store.as_ref(), "miku/No_2.data").await;
            assert_eq!(bare.as_deref(), Some("bare stem"));
        }
    }

    #[tokio::test]
    async fn scan_finds_matching_base_name_elsewhere() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("old/place/deck.txt", "moved").await.unwrap();
            assert_eq!(text_of(store.as_ref(), "deck.data").await.as_deref(), Some("moved"));
        }
    }

    #[tokio::test]
    async fn empty_candidates_are_skipped() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("foo.data", "").await.unwrap();
            store.put("library/foo.data", "legacy").await.unwrap();
            assert_eq!(text_of(store.as_ref(), "foo.data").await.as_deref(), Some("legacy"));
        }
    }

    #[tokio::test]
    async fn lone_empty_record_is_still_returned() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("blank.data", "").await.unwrap();
            assert_eq!(text_of(store.as_ref(), "blank.data").await.as_deref(), Some(""));
        }
    }

    #[tokio::test]
    async fn unknown_key_resolves_to_none() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("other.data", "x").await.unwrap();
            assert!(text_of(store.as_ref(), "missing.data").await.is_none());
        }
    }

    #[tokio::test]
    async fn migration_moves_legacy_keys() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("library/foo.data", "legacy").await.unwrap();
            store.put("library/taken.data", "old").await.unwrap();
            store.put("taken.data", "new").await.unwrap();

            let report = migrate_legacy_keys(store.as_ref()).await.unwrap();
            assert_eq!(report.migrated, 1);
            assert_eq!(report.conflicts, vec!["library/taken.data".to_string()]);

            let foo = store.get_record("foo.data").await.unwrap().unwrap();
            assert_eq!(foo.text, "legacy");
            assert!(store.get_record("library/foo.data").await.unwrap().is_none());
            assert_eq!(store.get_record("taken.data").await.unwrap().unwrap().text, "new");
            assert_eq!(
                store.get_record("library/taken.data").await.unwrap().unwrap().text,
                "old"
            );
        }
    }

    #[tokio::test]
    async fn migration_is_a_no_op_on_canonical_stores() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir).await {
            store.put("miku/a.data", "a").await.unwrap();
            let report = migrate_legacy_keys(store.as_ref()).await.unwrap();
            assert_eq!(report, MigrationReport::default());
        }
    }
}
