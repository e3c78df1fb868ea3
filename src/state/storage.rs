//! Local per-user key-value storage.
//!
//! Everything the app persists (favorites, settings, preferences, the
//! response cache) goes through [`KeyValueStore`] as string values. The
//! file-backed store keeps one JSON object per file on disk; the memory store
//! backs session-scoped state and tests.

use log::warn;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}

/// Store persisted as a single JSON object.
///
/// Nothing is held in memory: every operation reads the file afresh, so a
/// second process editing the same file is seen at once and its keys survive
/// our writes. Writes go to a temporary file in the same directory that is
/// then renamed over the original, so a crash leaves the old file intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`. A missing file is an empty
    /// store; a corrupt one is logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self { path: path.into(), lock: Mutex::new(()) };
        store.read()?;
        Ok(store)
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("ignoring malformed storage file {}: {e}", self.path.display());
                BTreeMap::new()
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StorageError::Io { path: self.path.clone(), source }),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io { path: dir.to_path_buf(), source })?;

        let io_error = |source: std::io::Error| StorageError::Io { path: self.path.clone(), source };
        let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;
        serde_json::to_writer_pretty(&mut staged, entries)?;
        staged.as_file().sync_all().map_err(io_error)?;
        staged.persist(&self.path).map_err(|e| io_error(e.error))?;
        Ok(())
    }

    /// Apply `edit` to the current contents and write them back if it reports
    /// a change.
    fn update(&self, edit: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.read()?;
        if edit(&mut entries) {
            self.write(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.insert(key.to_owned(), value.to_owned()).as_deref() != Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read()?.into_keys().collect())
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store that counts writes and can be told to fail.
    #[derive(Debug, Default)]
    pub struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
        pub fail_reads: bool,
        pub fail_writes: bool,
    }

    impl CountingStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self { fail_reads: true, fail_writes: true, ..Self::default() }
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Pre-populate a value without counting it as a write.
        pub fn seed(&self, key: &str, value: &str) {
            self.inner.set(key, value).unwrap();
        }
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Poisoned);
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Poisoned);
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Poisoned);
            }
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<String>, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Poisoned);
            }
            self.inner.keys()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.set("gametime:show-preseason", "false").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("gametime:show-preseason").unwrap().as_deref(), Some("false"));
        assert_eq!(reopened.keys().unwrap(), vec!["gametime:show-preseason".to_string()]);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.keys().unwrap().is_empty());
        store.set("k", "v").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn stores_sharing_a_file_see_and_keep_each_others_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let watcher = FileStore::open(&path).unwrap();
        let cli = FileStore::open(&path).unwrap();

        watcher.set("gametime-cache:a", "1").unwrap();
        cli.set("gametime:show-preseason", "false").unwrap();
        assert_eq!(watcher.get("gametime:show-preseason").unwrap().as_deref(), Some("false"));

        watcher.set("gametime-cache:b", "2").unwrap();
        cli.remove("gametime-cache:a").unwrap();
        assert_eq!(
            FileStore::open(&path).unwrap().keys().unwrap(),
            ["gametime-cache:b", "gametime:show-preseason"]
        );
    }

    #[test]
    fn writes_leave_no_staging_files_behind() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("storage.json")).unwrap();
        for i in 0..5 {
            store.set(&format!("k{i}"), "v").unwrap();
        }
        store.remove("k0").unwrap();

        let files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, ["storage.json"]);
        assert_eq!(store.keys().unwrap().len(), 4);
    }
}
