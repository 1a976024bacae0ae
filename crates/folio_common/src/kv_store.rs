//! Persistent key-value store adapter.
//!
//! Every stateful progress field is stored under its own key as a JSON
//! document, the same shape a browser's local storage would hold. Backends
//! only move raw strings; `KvStore` owns the JSON encoding and the
//! fall-back-to-default policy for unreadable values.

use crate::error::{FolioError, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Raw string storage keyed by name
pub trait KvBackend {
    /// Read the raw value stored under `key`
    fn get(&self, key: &str) -> Option<String>;

    /// Store a single raw value
    fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// Store several values as one write where the backend allows it
    fn set_many(&mut self, entries: Vec<(String, String)>) -> Result<()> {
        for (key, value) in entries {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Remove a key (missing keys are not an error)
    fn remove(&mut self, key: &str) -> Result<()>;

    /// All keys currently stored
    fn keys(&self) -> Vec<String>;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Volatile backend, optionally bounded by a byte quota
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once keys plus values would exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes: Some(bytes),
        }
    }

    /// Change the quota after construction
    pub fn set_quota(&mut self, bytes: Option<usize>) {
        self.quota_bytes = bytes;
    }

    /// Bytes held by keys plus values
    pub fn used_bytes(&self) -> usize {
        byte_size(&self.entries)
    }
}

fn byte_size(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.set_many(vec![(key.to_string(), value)])
    }

    /// All or nothing: the quota is checked against the whole batch
    fn set_many(&mut self, entries: Vec<(String, String)>) -> Result<()> {
        let mut staged = self.entries.clone();
        let keys: Vec<String> = entries.iter().map(|(k, _)| k.clone()).collect();
        staged.extend(entries);

        if let Some(quota) = self.quota_bytes {
            let needed = byte_size(&staged);
            if needed > quota {
                return Err(FolioError::Storage(format!(
                    "quota exceeded writing '{}' ({} > {} bytes)",
                    keys.join(", "),
                    needed,
                    quota
                )));
            }
        }
        self.entries = staged;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// ============================================================================
// File backend
// ============================================================================

/// Backend persisting all keys into one JSON object on disk
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileBackend {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty. An unreadable or corrupt file also starts
    /// empty (logged) so the engine can always initialise; the file is only
    /// replaced on the next successful write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<BTreeMap<String, String>>(&data) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Ignoring corrupt store file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Cannot read store file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        debug!("Opened store {} ({} keys)", path.display(), entries.len());
        Self { path, entries }
    }

    /// Default location: <data dir>/folio/storage.json
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole map through a temp file and rename
    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(&self.entries)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.set_many(vec![(key.to_string(), value)])
    }

    fn set_many(&mut self, entries: Vec<(String, String)>) -> Result<()> {
        let previous = self.entries.clone();
        for (key, value) in entries {
            self.entries.insert(key, value);
        }
        if let Err(e) = self.flush() {
            self.entries = previous;
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(value) = self.entries.remove(key) {
            if let Err(e) = self.flush() {
                self.entries.insert(key.to_string(), value);
                return Err(e);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// ============================================================================
// JSON adapter
// ============================================================================

/// Typed JSON access over a raw backend
#[derive(Debug, Clone)]
pub struct KvStore<B: KvBackend> {
    backend: B,
}

impl<B: KvBackend> KvStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Decode `key`, or None when absent or malformed
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.backend.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Malformed value for '{}', using default: {}", key, e);
                None
            }
        }
    }

    /// Decode `key`, falling back to `default`
    pub fn read_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.read(key).unwrap_or(default)
    }

    #[cfg(test)]
    pub(crate) fn write<T: serde::Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, raw)
    }

    /// Encode and store several values in one backend write
    pub fn write_all(&mut self, values: Vec<(&str, serde_json::Value)>) -> Result<()> {
        let mut entries = Vec::with_capacity(values.len());
        for (key, value) in values {
            entries.push((key.to_string(), serde_json::to_string(&value)?));
        }
        self.backend.set_many(entries)
    }

    #[cfg(test)]
    pub(crate) fn remove(&mut self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_read_write() {
        let mut store = KvStore::new(MemoryBackend::new());
        store.write("portfolioXP", &250u64).unwrap();
        assert_eq!(store.read::<u64>("portfolioXP"), Some(250));
        assert_eq!(store.read::<u64>("missing"), None);
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let mut backend = MemoryBackend::new();
        backend.set("portfolioXP", "not json".to_string()).unwrap();
        backend.set("visitedPages", "42".to_string()).unwrap();
        let store = KvStore::new(backend);

        assert_eq!(store.read_or("portfolioXP", 7u64), 7);
        let pages: Vec<String> = store.read_or("visitedPages", Vec::new());
        assert!(pages.is_empty());
    }

    #[test]
    fn test_quota_rejects_write() {
        let mut store = KvStore::new(MemoryBackend::with_quota(16));
        store.write("a", &1).unwrap();
        let err = store.write("big", &"x".repeat(64)).unwrap_err();
        assert!(matches!(err, FolioError::Storage(_)));
        // Earlier value untouched
        assert_eq!(store.read::<i32>("a"), Some(1));
        assert_eq!(store.read::<String>("big"), None);
    }

    #[test]
    fn test_file_backend_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = KvStore::new(FileBackend::open(&path));
        store
            .write_all(vec![
                ("portfolioXP", serde_json::json!(1200)),
                ("unlockedZones", serde_json::json!(["home", "about"])),
            ])
            .unwrap();
        assert!(path.exists());

        let reopened = KvStore::new(FileBackend::open(&path));
        assert_eq!(reopened.read::<u64>("portfolioXP"), Some(1200));
        assert_eq!(
            reopened.read::<Vec<String>>("unlockedZones"),
            Some(vec!["home".to_string(), "about".to_string()])
        );
    }

    #[test]
    fn test_file_backend_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ this is not json").unwrap();

        let backend = FileBackend::open(&path);
        assert!(backend.keys().is_empty());
    }

    #[test]
    fn test_remove_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut store = KvStore::new(FileBackend::open(&path));
        store.write("crushAffection", &12).unwrap();
        store.remove("crushAffection").unwrap();

        let reopened = KvStore::new(FileBackend::open(&path));
        assert_eq!(reopened.read::<i64>("crushAffection"), None);
    }

    #[test]
    fn test_memory_batch_over_quota_writes_nothing() {
        let mut backend = MemoryBackend::new();
        backend.set("portfolioXP", "1".to_string()).unwrap();
        backend.set("unlockedSkills", "[]".to_string()).unwrap();
        backend.set_quota(Some(backend.used_bytes() + 3));

        // First key alone would fit, the batch does not
        let err = backend
            .set_many(vec![
                ("portfolioXP".to_string(), "151".to_string()),
                ("unlockedSkills".to_string(), "[\"react\"]".to_string()),
            ])
            .unwrap_err();
        assert!(matches!(err, FolioError::Storage(_)));
        assert_eq!(backend.get("portfolioXP").as_deref(), Some("1"));
        assert_eq!(backend.get("unlockedSkills").as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_remove_failure_keeps_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut backend = FileBackend::open(&path);
        backend.set("crushAffection", "12".to_string()).unwrap();

        // A directory where the temp file goes makes the flush fail
        fs::create_dir(path.with_extension("json.tmp")).unwrap();
        assert!(backend.remove("crushAffection").is_err());
        assert_eq!(backend.get("crushAffection").as_deref(), Some("12"));
    }
}
