// ABOUTME: The Driver facade: one API over whichever DeckStore backend is configured.
// ABOUTME: Normalizes and validates every key, then routes reads through legacy resolution.

use std::sync::Arc;

use deckstore_core::{BASE_GROUP, FileEntry, FileRecord, normalize, validate_key};
use deckstore_remote::{HttpLibrary, RemoteLibrary};

use crate::backend::DeckStore;
use crate::config::{BackendKind, DeckstoreConfig};
use crate::error::StoreError;
use crate::resolve::{MigrationReport, migrate_legacy_keys, resolve_record};
use crate::sqlite::SqliteStore;
use crate::sync::{SyncOptions, SyncReport, sync_from_manifest};
use crate::tree::{TreeConfig, TreeStore};

pub struct Driver {
    store: Box<dyn DeckStore>,
    remote: Arc<dyn RemoteLibrary>,
    sync: SyncOptions,
}

impl Driver {
    pub fn new(
        store: Box<dyn DeckStore>,
        remote: Arc<dyn RemoteLibrary>,
        sync: SyncOptions,
    ) -> Self {
        Self {
            store,
            remote,
            sync,
        }
    }

    /// Build the backend and HTTP library described by `config`. Nothing is
    /// opened until [`Driver::init`].
    pub fn from_config(config: &DeckstoreConfig) -> Result<Self, StoreError> {
        let store: Box<dyn DeckStore> = match config.backend {
            BackendKind::Sqlite => Box::new(SqliteStore::new(config.sqlite_path())),
            BackendKind::Tree => Box::new(TreeStore::new(TreeConfig::new(config.tree_root()))),
        };
        let remote = HttpLibrary::new(&config.library_url)?;
        Ok(Self::new(store, Arc::new(remote), config.sync))
    }

    /// Name of the active backend.
    pub fn backend(&self) -> &'static str {
        self.store.kind()
    }

    pub fn store(&self) -> &dyn DeckStore {
        self.store.as_ref()
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        self.store.init().await?;
        tracing::debug!("{} backend ready", self.store.kind());
        Ok(())
    }

    pub async fn sync_from_manifest(&self, location: &str) -> Result<SyncReport, StoreError> {
        sync_from_manifest(self.store.as_ref(), self.remote.as_ref(), location, &self.sync).await
    }

    pub async fn list_groups(&self) -> Result<Vec<String>, StoreError> {
        self.store.list_groups().await
    }

    /// Deck files in `group`; `None` or an empty name means the base group.
    pub async fn list_files(&self, group: Option<&str>) -> Result<Vec<FileEntry>, StoreError> {
        let group = match group {
            Some(g) if !g.is_empty() => g,
            _ => BASE_GROUP,
        };
        self.store.list_files(group).await
    }

    /// Text of the deck at `path`, following legacy key fallbacks.
    pub async fn read_file(&self, path: &str) -> Result<String, StoreError> {
        Ok(self.read_record(path).await?.text)
    }

    pub async fn read_record(&self, path: &str) -> Result<FileRecord, StoreError> {
        let key = canonical_key(path)?;
        match resolve_record(self.store.as_ref(), &key).await? {
            Some(record) => Ok(record),
            None => Err(StoreError::NotFound(key)),
        }
    }

    pub async fn write_file(&self, path: &str, text: &str) -> Result<(), StoreError> {
        let key = canonical_key(path)?;
        self.store.put(&key, text).await
    }

    /// Remove the deck at `path`. Deleting a missing deck succeeds.
    pub async fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        let key = canonical_key(path)?;
        self.store.remove(&key).await
    }

    pub async fn migrate_legacy_keys(&self) -> Result<MigrationReport, StoreError> {
        migrate_legacy_keys(self.store.as_ref()).await
    }
}

fn canonical_key(path: &str) -> Result<String, StoreError> {
    let key = normalize(path);
    validate_key(&key)?;
    Ok(key)
}
