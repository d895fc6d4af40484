// ABOUTME: Configuration loading and validation for deckstore.
// ABOUTME: Reads DECKSTORE_* environment variables and picks the storage backend.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::sync::{OverwritePolicy, SyncOptions};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DECKSTORE_BACKEND must be 'sqlite' or 'tree', got {0:?}")]
    InvalidBackend(String),

    #[error("DECKSTORE_FETCH_CONCURRENCY must be a positive integer, got {0:?}")]
    InvalidConcurrency(String),

    #[error("DECKSTORE_SYNC_OVERWRITE must be 'skip-unchanged' or 'always', got {0:?}")]
    InvalidOverwrite(String),
}

/// Which persistence mechanism backs the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Sqlite,
    Tree,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(BackendKind::Sqlite),
            "tree" | "fs" | "dir" => Ok(BackendKind::Tree),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

impl FromStr for OverwritePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip-unchanged" | "skip" => Ok(OverwritePolicy::SkipUnchanged),
            "always" => Ok(OverwritePolicy::Always),
            _ => Err(ConfigError::InvalidOverwrite(s.to_string())),
        }
    }
}

/// Deckstore configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DeckstoreConfig {
    pub home: PathBuf,
    pub backend: BackendKind,
    pub library_url: String,
    pub manifest: String,
    pub sync: SyncOptions,
}

impl DeckstoreConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - DECKSTORE_HOME: data directory (default: ~/.deckstore)
    /// - DECKSTORE_BACKEND: sqlite or tree (default: sqlite)
    /// - DECKSTORE_LIBRARY_URL: remote library root (default: http://localhost:8080/library/)
    /// - DECKSTORE_MANIFEST: manifest location under the root (default: index.json)
    /// - DECKSTORE_FETCH_CONCURRENCY: parallel body fetches during sync (default: 4)
    /// - DECKSTORE_SYNC_OVERWRITE: skip-unchanged or always (default: skip-unchanged)
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var("DECKSTORE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".deckstore")
            });

        let backend = match std::env::var("DECKSTORE_BACKEND") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => BackendKind::default(),
        };

        let library_url = std::env::var("DECKSTORE_LIBRARY_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "http://localhost:8080/library/".to_string());

        let manifest = std::env::var("DECKSTORE_MANIFEST")
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "index.json".to_string());

        let mut sync = SyncOptions::default();

        if let Ok(raw) = std::env::var("DECKSTORE_FETCH_CONCURRENCY") {
            sync.fetch_concurrency = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or(ConfigError::InvalidConcurrency(raw))?;
        }

        if let Ok(raw) = std::env::var("DECKSTORE_SYNC_OVERWRITE")
            && !raw.trim().is_empty()
        {
            sync.overwrite = raw.parse()?;
        }

        Ok(Self {
            home,
            backend,
            library_url,
            manifest,
            sync,
        })
    }

    /// Database file used by the SQLite backend.
    pub fn sqlite_path(&self) -> PathBuf {
        self.home.join("decks.db")
    }

    /// Root directory used by the tree backend.
    pub fn tree_root(&self) -> PathBuf {
        self.home.join("library")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-wide; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "DECKSTORE_HOME",
        "DECKSTORE_BACKEND",
        "DECKSTORE_LIBRARY_URL",
        "DECKSTORE_MANIFEST",
        "DECKSTORE_FETCH_CONCURRENCY",
        "DECKSTORE_SYNC_OVERWRITE",
    ];

    fn clear_env() {
        // SAFETY: test-only code, guarded by ENV_LOCK
        unsafe {
            for var in VARS {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn config_loads_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let config = DeckstoreConfig::from_env().unwrap();

        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.library_url, "http://localhost:8080/library/");
        assert_eq!(config.manifest, "index.json");
        assert_eq!(config.sync, SyncOptions::default());
        assert!(config.home.to_string_lossy().contains(".deckstore"));
        assert!(config.sqlite_path().ends_with("decks.db"));
        assert!(config.tree_root().ends_with("library"));
    }

    #[test]
    fn config_reads_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        // SAFETY: test-only code, guarded by ENV_LOCK
        unsafe {
            std::env::set_var("DECKSTORE_HOME", "/srv/decks");
            std::env::set_var("DECKSTORE_BACKEND", "Tree");
            std::env::set_var("DECKSTORE_FETCH_CONCURRENCY", "8");
            std::env::set_var("DECKSTORE_SYNC_OVERWRITE", "always");
        }

        let result = DeckstoreConfig::from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.backend, BackendKind::Tree);
        assert_eq!(config.tree_root(), PathBuf::from("/srv/decks/library"));
        assert_eq!(config.sync.fetch_concurrency, 8);
        assert_eq!(config.sync.overwrite, OverwritePolicy::Always);
    }

    #[test]
    fn config_rejects_unknown_backend() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        // SAFETY: test-only code, guarded by ENV_LOCK
        unsafe {
            std::env::set_var("DECKSTORE_BACKEND", "postgres");
        }

        let result = DeckstoreConfig::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("DECKSTORE_BACKEND"),
            "error should name the variable: {}",
            err
        );
    }

    #[test]
    fn config_rejects_zero_concurrency() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        // SAFETY: test-only code, guarded by ENV_LOCK
        unsafe {
            std::env::set_var("DECKSTORE_FETCH_CONCURRENCY", "0");
        }

        let result = DeckstoreConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::InvalidConcurrency(_))));
    }
}
