// ABOUTME: Error type shared by both storage backends, the sync engine, and the driver facade.
// ABOUTME: Backend I/O failures propagate per operation; per-entry sync failures are only tallied.

use deckstore_core::KeyError;
use deckstore_remote::RemoteError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is not initialized; call init first")]
    NotReady(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("manifest unavailable: {0}")]
    ManifestUnavailable(#[source] RemoteError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// True for failures raised by the persistence mechanism itself.
    pub fn is_backend_io(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(_) | StoreError::Io(_) | StoreError::Task(_)
        )
    }
}
