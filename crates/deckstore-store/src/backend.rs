// ABOUTME: Defines the DeckStore trait that both persistence backends implement.
// ABOUTME: Backends see canonical keys only; normalization and legacy lookup happen in the driver.

use async_trait::async_trait;
use deckstore_core::{FileEntry, FileRecord};

use crate::error::StoreError;

/// Durable persistence of deck records keyed by canonical path.
///
/// Implementations must recompute `group`, `name` and `display` from the key
/// and text on every [`DeckStore::put`], list only deck files, and order
/// listings with [`deckstore_core::order_groups`] and
/// [`deckstore_core::sort_entries`] so both backends return identical results.
#[async_trait]
pub trait DeckStore: Send + Sync {
    /// Short backend name for logging (e.g. "sqlite", "tree").
    fn kind(&self) -> &'static str;

    /// Whether [`DeckStore::init`] has completed.
    fn is_ready(&self) -> bool;

    /// Open whatever handle the backend needs. Safe to call repeatedly.
    async fn init(&self) -> Result<(), StoreError>;

    /// Group names of all deck records, base group first and always present.
    async fn list_groups(&self) -> Result<Vec<String>, StoreError>;

    /// Deck records in exactly `group`, sorted for display.
    async fn list_files(&self, group: &str) -> Result<Vec<FileEntry>, StoreError>;

    /// The record stored under exactly `key`, without any fallback.
    async fn get_record(&self, key: &str) -> Result<Option<FileRecord>, StoreError>;

    /// Every stored key, deck or not, in a stable scan order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Create or fully replace the record at `key`.
    async fn put(&self, key: &str, text: &str) -> Result<(), StoreError>;

    /// Remove the record at `key`. Absent keys are not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
