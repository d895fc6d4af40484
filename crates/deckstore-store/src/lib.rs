// ABOUTME: Storage layer for deckstore: backends, manifest sync, legacy resolution, and the driver.
// ABOUTME: Exposes the Driver facade plus the pieces it is assembled from.

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod resolve;
pub mod sqlite;
pub mod sync;
pub mod tree;

pub use backend::DeckStore;
pub use config::{BackendKind, ConfigError, DeckstoreConfig};
pub use driver::Driver;
pub use error::StoreError;
pub use resolve::{MigrationReport, migrate_legacy_keys, resolve_record};
pub use sqlite::SqliteStore;
pub use sync::{OverwritePolicy, SyncFailure, SyncOptions, SyncReport, sync_from_manifest};
pub use tree::{TreeConfig, TreeStore};
