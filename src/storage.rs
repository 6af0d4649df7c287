//! Durable key/value storage used by the session history.

use crate::error::{AnalyzerError, Result};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// All keys live in one JSON object file; every write rewrites the file.
#[derive(Clone, Debug)]
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

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Like `load`, but an unparseable file counts as empty so the next write replaces it.
    fn load_for_write(&self) -> Result<BTreeMap<String, String>> {
        match self.load() {
            Err(AnalyzerError::Serde(e)) => {
                warn!(path = %self.path.display(), "Overwriting unreadable storage file: {e}");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AnalyzerError::Storage(format!(
                    "Could not create storage directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }
        let json = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), keys = values.len(), "storage file written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.load_for_write()?;
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match self.load() {
            Err(AnalyzerError::Serde(e)) => {
                warn!(path = %self.path.display(), "Overwriting unreadable storage file: {e}");
                self.write(&BTreeMap::new())
            }
            other => {
                let mut values = other?;
                if values.remove(key).is_some() {
                    self.write(&values)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_round_trips_and_deletes() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_creates_parent_directories_and_persists_between_instances() {
        let td = tempdir().unwrap();
        let path = td.path().join("nested").join("storage.json");

        let mut store = FileStore::new(&path);
        store.set("history", "[]").unwrap();
        store.set("other", "1").unwrap();
        assert!(path.exists());

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("history").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn file_store_delete_keeps_other_keys() {
        let td = tempdir().unwrap();
        let mut store = FileStore::new(td.path().join("storage.json"));
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_reports_corrupt_files_as_errors() {
        let td = tempdir().unwrap();
        let path = td.path().join("storage.json");
        fs::write(&path, "{ not json").unwrap();
        let store = FileStore::new(&path);
        assert!(store.get("history").is_err());
    }

    #[test]
    fn writes_replace_a_corrupt_file() {
        let td = tempdir().unwrap();
        let path = td.path().join("storage.json");
        fs::write(&path, "{ truncated").unwrap();
        let mut store = FileStore::new(&path);
        store.set("history", "[]").unwrap();
        assert_eq!(store.get("history").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn delete_heals_a_corrupt_file() {
        let td = tempdir().unwrap();
        let path = td.path().join("storage.json");
        fs::write(&path, "{ truncated").unwrap();
        let mut store = FileStore::new(&path);
        store.delete("history").unwrap();
        assert_eq!(store.get("history").unwrap(), None);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let td = tempdir().unwrap();
        let store = FileStore::new(td.path().join("absent.json"));
        assert_eq!(store.get("history").unwrap(), None);
    }
}
