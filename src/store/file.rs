// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON-file store that survives process restarts.
//!
//! Layout on disk:
//!
//! ```text
//! ~/.votegate/store.json        key/value document
//! ~/.votegate/store.json.lock   advisory lock coordinating writers
//! ~/.votegate/store.json.tmp    staging file for atomic replace
//! ```
//!
//! Every mutation runs load -> modify -> save while holding an exclusive lock
//! on the `.lock` file, and the document is replaced through a temp file and
//! an atomic rename. Readers take a shared lock. Two processes therefore never
//! interleave a single write, but a read followed by a write in one process is
//! not atomic against another process.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::{KeyValueStore, StoreError, StoreResult};

/// Default timeout for acquiring file locks (5 seconds)
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Retry interval when waiting for lock acquisition
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

const FORMAT_VERSION: u32 = 1;

/// Serialized form of the store document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    last_saved: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            last_saved: None,
            entries: BTreeMap::new(),
        }
    }
}

/// File-backed [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    /// Open (lazily) a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".votegate").join("store.json"))
            .unwrap_or_else(|| PathBuf::from(".votegate/store.json"))
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file name><suffix>` next to the document, whatever its extension.
    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling_path(".lock")
    }

    fn open_lock_file(&self) -> StoreResult<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        Ok(file)
    }

    /// Spin on a non-blocking lock attempt until it succeeds or times out.
    fn acquire(&self, file: &File, exclusive: bool) -> StoreResult<()> {
        let start = Instant::now();
        loop {
            // Qualified so std's inherent `File` lock methods do not shadow fs2
            let attempt = if exclusive {
                FileExt::try_lock_exclusive(file)
            } else {
                FileExt::try_lock_shared(file)
            };
            match attempt {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if start.elapsed() >= self.lock_timeout {
                        return Err(StoreError::Lock {
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
    }

    /// Read the document. Caller must already hold a lock.
    fn read_document(&self) -> StoreResult<StoreDocument> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(StoreDocument::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Write the document via temp file + rename. Caller must hold the exclusive lock.
    fn write_document(&self, doc: &mut StoreDocument) -> StoreResult<()> {
        doc.last_saved = Some(Utc::now());
        let content = serde_json::to_string_pretty(doc)?;

        let temp_path = self.sibling_path(".tmp");
        {
            let mut temp_file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            temp_file.write_all(content.as_bytes())?;
            temp_file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn read_locked<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> StoreResult<T> {
        let lock_file = self.open_lock_file()?;
        self.acquire(&lock_file, false)?;
        let doc = self.read_document()?;
        // Lock released when lock_file drops
        Ok(f(&doc))
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> StoreResult<()> {
        let lock_file = self.open_lock_file()?;
        self.acquire(&lock_file, true)?;
        let mut doc = self.read_document()?;
        f(&mut doc.entries);
        self.write_document(&mut doc)
    }

    /// All entries, in key order.
    pub fn entries(&self) -> StoreResult<BTreeMap<String, String>> {
        self.read_locked(|doc| doc.entries.clone())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.read_locked(|doc| doc.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> StoreResult<()> {
        self.mutate(|entries| entries.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path().join("store.json"));

        assert_eq!(store.get("isAuthenticated").unwrap(), None);
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("store.json");

        {
            let store = FileStore::new(&path);
            store.set("userLoginAttempts", "2").unwrap();
            store.set("userLastAttemptTime", "1700000000000").unwrap();
        }

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get_i64("userLoginAttempts").unwrap(), Some(2));
        assert_eq!(
            reopened.get("userLastAttemptTime").unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[test]
    fn test_delete_and_clear() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path().join("store.json"));

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));

        store.clear().unwrap();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("a"), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_helper_files_never_alias_the_document() {
        let dir = TempDir::new().expect("Failed to create temp dir");

        for name in ["state.lock", "state.tmp", "state"] {
            let path = dir.path().join(name);
            let store = FileStore::new(&path);
            assert_ne!(store.lock_path(), path);
            assert_ne!(store.sibling_path(".tmp"), path);

            store.set("userLoginAttempts", "1").unwrap();
            store.set("username", "alice").unwrap();
            assert_eq!(store.get_i64("userLoginAttempts").unwrap(), Some(1));
            assert_eq!(FileStore::new(&path).get("username").unwrap().as_deref(), Some("alice"));
        }

        let store = FileStore::new(dir.path().join("store.json"));
        assert_eq!(store.lock_path(), dir.path().join("store.json.lock"));
    }

    #[test]
    fn test_write_times_out_while_lock_held() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path().join("store.json"))
            .with_lock_timeout(Duration::from_millis(100));

        let held = store.open_lock_file().unwrap();
        FileExt::lock_exclusive(&held).unwrap();

        let result = store.set("a", "1");
        assert!(matches!(result, Err(StoreError::Lock { .. })));

        drop(held);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
