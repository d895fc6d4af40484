// ABOUTME: SQLite-backed deck store: one row per canonical key in a `files` table.
// ABOUTME: Statements run on the blocking pool behind a single connection mutex.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deckstore_core::{FileEntry, FileRecord, is_deck_name, order_groups, sort_entries};
use rusqlite::{Connection, params};
use tokio::sync::{Mutex, OnceCell};

use crate::backend::DeckStore;
use crate::error::StoreError;

/// A deck store kept in a single SQLite database file.
///
/// The connection is opened lazily by [`DeckStore::init`]; every other
/// operation fails with [`StoreError::NotReady`] until then.
pub struct SqliteStore {
    path: PathBuf,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

impl SqliteStore {
    /// Create a store for the database at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: OnceCell::new(),
        }
    }

    /// Open or create the database and ensure the schema exists.
    /// Creates parent directories if they do not exist.
    fn open_connection(path: &Path) -> Result<Connection, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                grp TEXT NOT NULL,
                name TEXT NOT NULL,
                display TEXT NOT NULL,
                text TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS files_grp ON files(grp);",
        )?;

        Ok(conn)
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .conn
            .get()
            .ok_or(StoreError::NotReady("sqlite store"))?
            .clone();

        let result = tokio::task::spawn_blocking(move || {
            let guard = conn.blocking_lock();
            f(&guard)
        })
        .await?;

        Ok(result?)
    }
}

fn parse_timestamp(idx: usize, raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[async_trait]
impl DeckStore for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn is_ready(&self) -> bool {
        self.conn.initialized()
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.conn
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let conn =
                    tokio::task::spawn_blocking(move || Self::open_connection(&path)).await??;
                tracing::info!("opened sqlite deck store at {}", self.path.display());
                Ok::<_, StoreError>(Arc::new(Mutex::new(conn)))
            })
            .await?;
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<String>, StoreError> {
        let rows = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT grp, name FROM files")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;

                let mut groups = Vec::new();
                for row in rows {
                    groups.push(row?);
                }
                Ok(groups)
            })
            .await?;

        Ok(order_groups(
            rows.into_iter()
                .filter(|(_, name)| is_deck_name(name))
                .map(|(grp, _)| grp),
        ))
    }

    async fn list_files(&self, group: &str) -> Result<Vec<FileEntry>, StoreError> {
        let group = group.to_string();
        let mut entries = self
            .with_conn(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT path, name, display FROM files WHERE grp = ?1")?;
                let rows = stmt.query_map(params![group], |row| {
                    Ok(FileEntry {
                        path: row.get(0)?,
                        name: row.get(1)?,
                        display: row.get(2)?,
                    })
                })?;

                let mut entries = Vec::new();
                for row in rows {
                    let entry = row?;
                    if is_deck_name(&entry.name) {
                        entries.push(entry);
                    }
                }
                Ok(entries)
            })
            .await?;

        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn get_record(&self, key: &str) -> Result<Option<FileRecord>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT path, grp, name, display, text, updated_at FROM files WHERE path = ?1",
            )?;

            let result = stmt.query_row(params![key], |row| {
                Ok(FileRecord {
                    path: row.get(0)?,
                    group: row.get(1)?,
                    name: row.get(2)?,
                    display: row.get(3)?,
                    text: row.get(4)?,
                    timestamp: parse_timestamp(5, row.get(5)?)?,
                })
            });

            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT path FROM files ORDER BY path ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        })
        .await
    }

    async fn put(&self, key: &str, text: &str) -> Result<(), StoreError> {
        let record = FileRecord::new(key, text, Utc::now());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO files (path, grp, name, display, text, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(path) DO UPDATE SET
                    grp = excluded.grp,
                    name = excluded.name,
                    display = excluded.display,
                    text = excluded.text,
                    updated_at = excluded.updated_at",
                params![
                    record.path,
                    record.group,
                    record.name,
                    record.display,
                    record.text,
                    record.timestamp.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM files WHERE path = ?1", params![key])?;
            Ok(())
        })
        .await
    }
}

impl SqliteStore {
    /// Insert a row exactly as given, bypassing derivation. Used to seed
    /// stores that mimic rows written by older versions.
    #[cfg(test)]
    pub(crate) async fn insert_raw(
        &self,
        key: &str,
        grp: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        let (key, grp, text) = (key.to_string(), grp.to_string(), text.to_string());
        self.with_conn(move |conn| {
            let name = deckstore_core::base_name(&key).to_string();
            conn.execute(
                "INSERT INTO files (path, grp, name, display, text, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![key, grp, name, name, text, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    /// Number of rows in the table, deck or not.
    pub async fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
        })
        .await
    }
}
