// ABOUTME: Defines the RemoteLibrary trait the sync engine fetches manifests and decks through.
// ABOUTME: Also defines RemoteError, shared by the HTTP client and the in-memory test double.

use async_trait::async_trait;
use deckstore_core::Manifest;

/// Errors that can occur while talking to the remote library.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("manifest is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("not found in remote library: {0}")]
    Missing(String),
}

/// A read-only library published somewhere the store can reach.
///
/// Keys passed to [`RemoteLibrary::fetch_text`] are canonical keys, already
/// normalized by the caller; implementations resolve them against their own
/// library root.
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// Fetch and parse the manifest at `location`.
    async fn fetch_manifest(&self, location: &str) -> Result<Manifest, RemoteError>;

    /// Fetch the text body of the deck stored under `key`.
    async fn fetch_text(&self, key: &str) -> Result<String, RemoteError>;

    /// Where this library lives, for logging.
    fn describe(&self) -> String;
}
