//! Client-side credential storage.
//!
//! The client only ever reads a slot. Writing and clearing belong to
//! whatever flow issues credentials.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Named slots holding bearer credentials.
pub trait CredentialStore: Send + Sync {
    /// Read the value stored under `key`. Empty values count as absent.
    fn load(&self, key: &str) -> Option<String>;
}

/// In-process store, useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: &str) {
        let mut slots = self.slots.write().expect("memory store lock poisoned");
        slots.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        let mut slots = self.slots.write().expect("memory store lock poisoned");
        slots.remove(key);
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        let slots = self.slots.read().expect("memory store lock poisoned");
        slots.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Persistent store backed by a JSON object file (`{"slot": "value"}`).
///
/// The file is re-read on every `load`, so updates made by another process
/// are picked up by the next call.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `value` under `key`, creating the file if needed.
    pub fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut slots = self.read_slots()?;
        slots.insert(key.to_string(), value.to_string());
        self.write_slots(&slots)
    }

    /// Remove `key`. Missing files and keys are not an error.
    pub fn remove(&self, key: &str) -> io::Result<()> {
        let mut slots = self.read_slots()?;
        if slots.remove(key).is_some() {
            self.write_slots(&slots)?;
        }
        Ok(())
    }

    fn read_slots(&self) -> io::Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(io::Error::from),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e),
        }
    }

    fn write_slots(&self, slots: &HashMap<String, String>) -> io::Result<()> {
        let content = serde_json::to_string_pretty(slots)?;
        fs::write(&self.path, content)
    }
}

impl CredentialStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        match self.read_slots() {
            Ok(mut slots) => slots.remove(key).filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable credential store");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gateway-sdk-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.load("token"), None);

        store.set("token", "abc");
        assert_eq!(store.load("token").as_deref(), Some("abc"));

        store.remove("token");
        assert_eq!(store.load("token"), None);
    }

    #[test]
    fn test_empty_value_is_absent() {
        let store = MemoryStore::new();
        store.set("token", "");
        assert_eq!(store.load("token"), None);
    }

    #[test]
    fn test_file_store_persists_slots() {
        let path = temp_path("persist");
        let _ = fs::remove_file(&path);

        let store = FileStore::new(&path);
        assert_eq!(store.load("token"), None);

        store.set("token", "abc").unwrap();
        store.set("other", "xyz").unwrap();

        // A second handle on the same file sees the same slots.
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.load("token").as_deref(), Some("abc"));

        reopened.remove("token").unwrap();
        assert_eq!(store.load("token"), None);
        assert_eq!(store.load("other").as_deref(), Some("xyz"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.load("token"), None);
        assert!(store.set("token", "abc").is_err());

        let _ = fs::remove_file(&path);
    }
}
