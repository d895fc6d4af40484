// ABOUTME: Directory-tree deck store: each canonical key is a file under a configured root.
// ABOUTME: Writes go through temp file + fsync + rename; empty directories are pruned on delete.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deckstore_core::{
    FileEntry, FileRecord, base_name, display_title, group_of, is_deck_name, order_groups,
    sort_entries, validate_key,
};
use tokio::sync::OnceCell;

use crate::backend::DeckStore;
use crate::error::StoreError;

/// Suffix of in-flight writes. Files carrying it are never records.
const TMP_SUFFIX: &str = ".deckstore-tmp";

/// Where a [`TreeStore`] keeps its files.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub root: PathBuf,
}

impl TreeConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// A deck store laid out as plain files: key `miku/No_47.data` lives at
/// `<root>/miku/No_47.data`. Several stores over different roots can coexist.
pub struct TreeStore {
    config: TreeConfig,
    root: OnceCell<PathBuf>,
}

impl TreeStore {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: OnceCell::new(),
        }
    }

    fn root(&self) -> Result<PathBuf, StoreError> {
        self.root
            .get()
            .cloned()
            .ok_or(StoreError::NotReady("tree store"))
    }

    /// Run a blocking filesystem job against the resolved root.
    async fn with_root<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let root = self.root()?;
        tokio::task::spawn_blocking(move || f(&root)).await?
    }
}

/// Map a key to its file, refusing keys that would leave the root.
fn file_path(root: &Path, key: &str) -> Result<PathBuf, StoreError> {
    validate_key(key)?;
    Ok(key.split('/').fold(root.to_path_buf(), |p, seg| p.join(seg)))
}

fn is_tmp(name: &str) -> bool {
    name.ends_with(TMP_SUFFIX)
}

fn modified_at(path: &Path) -> Result<DateTime<Utc>, StoreError> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

fn read_record(root: &Path, key: &str) -> Result<Option<FileRecord>, StoreError> {
    let path = file_path(root, key)?;
    if !path.is_file() {
        return Ok(None);
    }

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(FileRecord::new(key, &text, modified_at(&path)?)))
}

/// Write `text` to `path` atomically: unique temp file, fsync, rename.
/// Concurrent writers to one key each publish a whole file; the last rename wins.
fn write_atomic(path: &Path, text: &str) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::Io(std::io::Error::other("file has no parent directory")))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Dropped without persisting, the temp file removes itself.
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(TMP_SUFFIX)
        .tempfile_in(parent)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove directories left empty by a delete, walking up to (not including) the root.
fn prune_empty_dirs(root: &Path, mut dir: Option<&Path>) {
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}

/// Every record key under `root`, sorted. Temp files and non-UTF-8 names are skipped.
fn walk_keys(root: &Path) -> Result<Vec<String>, StoreError> {
    let mut keys = Vec::new();
    let mut pending = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::warn!("skipping non-UTF-8 name in {}", dir.display());
                continue;
            };

            let key = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", prefix, name)
            };

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push((entry.path(), key));
            } else if file_type.is_file() && !is_tmp(name) {
                keys.push(key);
            }
        }
    }

    keys.sort();
    Ok(keys)
}

/// Deck files directly inside `dir`, with titles read from their headers.
fn deck_entries(dir: &Path, group_prefix: Option<&str>) -> Result<Vec<FileEntry>, StoreError> {
    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for entry in listing {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !is_deck_name(name) || is_tmp(name) {
            continue;
        }

        let key = match group_prefix {
            Some(group) => format!("{}/{}", group, name),
            None => name.to_string(),
        };
        // Only the title is needed here; undecodable bytes must not hide the rest of the group.
        let bytes = fs::read(entry.path())?;
        let text = String::from_utf8_lossy(&bytes);
        entries.push(FileEntry {
            display: display_title(&key, &text),
            name: base_name(&key).to_string(),
            path: key,
        });
    }

    sort_entries(&mut entries);
    Ok(entries)
}

#[async_trait]
impl DeckStore for TreeStore {
    fn kind(&self) -> &'static str {
        "tree"
    }

    fn is_ready(&self) -> bool {
        self.root.initialized()
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.root
            .get_or_try_init(|| async {
                let configured = self.config.root.clone();
                let root = tokio::task::spawn_blocking(move || {
                    fs::create_dir_all(&configured)?;
                    fs::canonicalize(&configured)
                })
                .await??;
                tracing::info!("opened tree deck store at {}", root.display());
                Ok::<_, StoreError>(root)
            })
            .await?;
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<String>, StoreError> {
        let keys = self.with_root(|root| walk_keys(root)).await?;
        Ok(order_groups(
            keys.iter()
                .filter(|key| is_deck_name(base_name(key)))
                .map(|key| group_of(key).to_string()),
        ))
    }

    async fn list_files(&self, group: &str) -> Result<Vec<FileEntry>, StoreError> {
        let group = group.to_string();
        self.with_root(move |root| {
            if group == deckstore_core::BASE_GROUP {
                return deck_entries(root, None);
            }
            // Names that cannot be a directory under the root hold no records.
            match file_path(root, &group) {
                Ok(dir) => deck_entries(&dir, Some(group.as_str())),
                Err(_) => Ok(Vec::new()),
            }
        })
        .await
    }

    async fn get_record(&self, key: &str) -> Result<Option<FileRecord>, StoreError> {
        let key = key.to_string();
        self.with_root(move |root| read_record(root, &key)).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.with_root(|root| walk_keys(root)).await
    }

    async fn put(&self, key: &str, text: &str) -> Result<(), StoreError> {
        let (key, text) = (key.to_string(), text.to_string());
        self.with_root(move |root| {
            let path = file_path(root, &key)?;
            write_atomic(&path, &text)
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_root(move |root| {
            let path = file_path(root, &key)?;
            if !path.is_file() {
                return Ok(());
            }
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            }
            prune_empty_dirs(root, path.parent());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckstore_core::BASE_GROUP;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> TreeStore {
        let store = TreeStore::new(TreeConfig::new(dir.path().join("library")));
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn operations_before_init_are_not_ready() {
        let dir = TempDir::new().unwrap();
        let store = TreeStore::new(TreeConfig::new(dir.path()));

        assert!(!store.is_ready());
        assert!(matches!(
            store.list_groups().await,
            Err(StoreError::NotReady(_))
        ));
        assert!(matches!(
            store.remove("a.data").await,
            Err(StoreError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn init_creates_root_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.init().await.unwrap();

        assert!(dir.path().join("library").is_dir());
    }

    #[tokio::test]
    async fn put_writes_file_under_root() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("miku/No_47.data", "NAME: Greeting\n\nこんにちは").await.unwrap();

        let on_disk = fs::read_to_string(dir.path().join("library/miku/No_47.data")).unwrap();
        assert_eq!(on_disk, "NAME: Greeting\n\nこんにちは");

        let rec = store.get_record("miku/No_47.data").await.unwrap().unwrap();
        assert_eq!(rec.group, "miku");
        assert_eq!(rec.name, "No_47.data");
        assert_eq!(rec.display, "Greeting");
    }

    #[tokio::test]
    async fn put_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("a.data", "first").await.unwrap();
        store.put("a.data", "second").await.unwrap();

        let rec = store.get_record("a.data").await.unwrap().unwrap();
        assert_eq!(rec.text, "second");
        assert_eq!(store.keys().await.unwrap(), vec!["a.data"]);
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_prunes_directories() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("a/b/c.data", "x").await.unwrap();
        store.remove("a/b/c.data").await.unwrap();
        store.remove("a/b/c.data").await.unwrap();

        assert!(!dir.path().join("library/a").exists());
        assert!(dir.path().join("library").is_dir());
    }

    #[tokio::test]
    async fn remove_of_a_directory_key_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("miku/a.data", "x").await.unwrap();
        store.remove("miku").await.unwrap();

        assert!(store.get_record("miku/a.data").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        assert!(matches!(
            store.put("../outside.data", "x").await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(!dir.path().join("outside.data").exists());
        assert!(store.list_files("../").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listings_match_deck_records() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("miku/No_10.data", "ten").await.unwrap();
        store.put("miku/No_2.data", "NAME: Two\n").await.unwrap();
        store.put("miku/notes.txt", "not a deck").await.unwrap();
        store.put("drafts/readme.md", "no decks here").await.unwrap();
        store.put("top.data", "top").await.unwrap();
        fs::create_dir_all(dir.path().join("library/empty")).unwrap();

        assert_eq!(store.list_groups().await.unwrap(), vec![BASE_GROUP, "miku"]);

        let files = store.list_files("miku").await.unwrap();
        let displays: Vec<_> = files.iter().map(|f| f.display.as_str()).collect();
        assert_eq!(displays, vec!["No_10", "Two"]);
        assert_eq!(files[1].path, "miku/No_2.data");

        let base = store.list_files(BASE_GROUP).await.unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].path, "top.data");

        assert!(store.list_files("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nested_groups_list_their_own_files() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("a/b/deep.data", "deep").await.unwrap();
        store.put("a/shallow.data", "shallow").await.unwrap();

        assert_eq!(store.list_groups().await.unwrap(), vec![BASE_GROUP, "a", "a/b"]);
        let deep = store.list_files("a/b").await.unwrap();
        assert_eq!(deep.len(), 1);
        assert_eq!(deep[0].path, "a/b/deep.data");
    }

    #[tokio::test]
    async fn temp_files_are_not_records() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        fs::write(dir.path().join("library/.x.data.a1b2c3.deckstore-tmp"), "partial").unwrap();
        store.put("x.data", "done").await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["x.data"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_to_one_key_publish_a_whole_value() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(open_store(&dir).await);

        for round in 0..20 {
            let texts: Vec<String> =
                (0..8).map(|i| format!("round {} writer {}", round, i)).collect();
            let handles: Vec<_> = texts
                .iter()
                .cloned()
                .map(|text| {
                    let store = std::sync::Arc::clone(&store);
                    tokio::spawn(async move { store.put("k.data", &text).await })
                })
                .collect();

            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            let rec = store.get_record("k.data").await.unwrap().unwrap();
            assert!(texts.contains(&rec.text), "torn write: {:?}", rec.text);
        }

        assert_eq!(store.keys().await.unwrap(), vec!["k.data"]);
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("library"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temp files left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn undecodable_deck_does_not_hide_its_group() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("good.data", "NAME: Good\n").await.unwrap();
        fs::write(dir.path().join("library/bad.data"), [0xff, 0xfe, 0x00]).unwrap();

        let names: Vec<_> = store
            .list_files(BASE_GROUP)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["bad.data", "good.data"]);
    }

    #[tokio::test]
    async fn filesystem_failures_are_backend_io() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.put("a.data", "x").await.unwrap();
        let err = store.put("a.data/b.data", "y").await.unwrap_err();
        assert!(err.is_backend_io(), "got {:?}", err);

        let err = store.put("../b.data", "y").await.unwrap_err();
        assert!(!err.is_backend_io());
    }
}
