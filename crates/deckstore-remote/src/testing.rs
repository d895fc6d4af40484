// ABOUTME: In-memory RemoteLibrary for tests, serving manifests and decks from maps.
// ABOUTME: Counts body fetches so tests can assert how much traffic a sync produced.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use deckstore_core::Manifest;

use crate::library::{RemoteError, RemoteLibrary};

/// A remote library whose contents live in memory.
#[derive(Debug, Default)]
pub struct StaticLibrary {
    manifests: Mutex<HashMap<String, String>>,
    files: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl StaticLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `json` verbatim at `location`.
    pub fn with_manifest(self, location: &str, json: &str) -> Self {
        self.set_manifest(location, json);
        self
    }

    /// Serve `text` for `key`.
    pub fn with_file(self, key: &str, text: &str) -> Self {
        self.set_file(key, text);
        self
    }

    pub fn set_manifest(&self, location: &str, json: &str) {
        lock(&self.manifests).insert(location.to_string(), json.to_string());
    }

    pub fn set_file(&self, key: &str, text: &str) {
        lock(&self.files).insert(key.to_string(), text.to_string());
    }

    /// Number of deck bodies fetched so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RemoteLibrary for StaticLibrary {
    async fn fetch_manifest(&self, location: &str) -> Result<Manifest, RemoteError> {
        let json = lock(&self.manifests)
            .get(location)
            .cloned()
            .ok_or_else(|| RemoteError::Missing(location.to_string()))?;
        Ok(Manifest::parse(json.as_bytes())?)
    }

    async fn fetch_text(&self, key: &str) -> Result<String, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.files)
            .get(key)
            .cloned()
            .ok_or_else(|| RemoteError::Missing(key.to_string()))
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
