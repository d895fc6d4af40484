// ABOUTME: Manifest-driven sync engine: fetch, normalize, diff-or-overwrite, write, tally.
// ABOUTME: A bad entry is counted and reported but never aborts the rest of the sync.

use deckstore_core::{normalize, validate_key};
use deckstore_remote::RemoteLibrary;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::backend::DeckStore;
use crate::error::StoreError;

/// What to do when the local record already holds the fetched text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Leave identical records alone and count them as skipped.
    #[default]
    SkipUnchanged,
    /// Rewrite every entry unconditionally.
    Always,
}

/// Tuning knobs for a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub overwrite: OverwritePolicy,
    /// Maximum deck bodies fetched at once. Writes stay sequential.
    pub fetch_concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            overwrite: OverwritePolicy::SkipUnchanged,
            fetch_concurrency: 4,
        }
    }
}

/// One manifest entry that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub entry: String,
    pub reason: String,
}

/// Tallies for a sync run. `written + skipped + errors` equals the number of
/// manifest entries that named a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub written: usize,
    pub skipped: usize,
    pub errors: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Entries that were processed, successfully or not.
    pub fn total(&self) -> usize {
        self.written + self.skipped + self.errors
    }
}

enum Outcome {
    Written,
    Skipped,
}

/// Pull every manifest entry from `remote` into `store`.
///
/// Fails only when the store is not ready or the manifest itself cannot be
/// fetched or parsed. Entries are applied in manifest order; bodies may be
/// fetched ahead of time up to `options.fetch_concurrency`.
pub async fn sync_from_manifest(
    store: &dyn DeckStore,
    remote: &dyn RemoteLibrary,
    location: &str,
    options: &SyncOptions,
) -> Result<SyncReport, StoreError> {
    if !store.is_ready() {
        return Err(StoreError::NotReady(store.kind()));
    }

    let manifest = remote
        .fetch_manifest(location)
        .await
        .map_err(StoreError::ManifestUnavailable)?;

    tracing::info!(
        "syncing {} manifest entries from {} into {} store",
        manifest.len(),
        remote.describe(),
        store.kind()
    );

    let targets: Vec<(String, String)> = manifest
        .files
        .iter()
        .filter_map(|entry| match entry.source_path() {
            Some(source) => Some((source.to_string(), normalize(source))),
            None => {
                tracing::debug!("skipping manifest entry without a path: {}", entry.label());
                None
            }
        })
        .collect();

    let mut fetched = stream::iter(targets)
        .map(|(source, key)| async move {
            let body = match validate_key(&key) {
                Ok(()) => remote.fetch_text(&key).await.map_err(StoreError::from),
                Err(e) => Err(StoreError::from(e)),
            };
            (source, key, body)
        })
        .buffered(options.fetch_concurrency.max(1));

    let mut report = SyncReport::default();

    while let Some((source, key, body)) = fetched.next().await {
        let outcome = match body {
            Ok(text) => ingest(store, &key, &text, options.overwrite).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(Outcome::Written) => {
                tracing::debug!("wrote {}", key);
                report.written += 1;
            }
            Ok(Outcome::Skipped) => {
                tracing::debug!("unchanged {}", key);
                report.skipped += 1;
            }
            Err(e) => {
                tracing::warn!("sync failed for {}: {}", source, e);
                report.errors += 1;
                report.failures.push(SyncFailure {
                    entry: source,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "sync complete: {} written, {} skipped, {} errors",
        report.written,
        report.skipped,
        report.errors
    );

    Ok(report)
}

async fn ingest(
    store: &dyn DeckStore,
    key: &str,
    text: &str,
    overwrite: OverwritePolicy,
) -> Result<Outcome, StoreError> {
    if overwrite == OverwritePolicy::SkipUnchanged
        && let Some(existing) = store.get_record(key).await?
        && existing.text == text
    {
        return Ok(Outcome::Skipped);
    }

    store.put(key, text).await?;
    Ok(Outcome::Written)
}
