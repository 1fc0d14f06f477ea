//! Persisted key-value storage backends.
//!
//! The picker only persists its recent-selection list, through the
//! [`PersistedStore`] seam. Two backends ship with the crate: a JSON file
//! (the default for desktop use) and an in-memory map for tests and
//! ephemeral sessions.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use super::lock;
use crate::error::StorageError;

/// String key-value store. Errors mean "storage unavailable" and are never
/// fatal to callers.
pub trait PersistedStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistedStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

static FILES: Lazy<Mutex<HashMap<PathBuf, Arc<JsonFileStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Store backed by a single JSON object on disk.
///
/// Values are cached in memory and written through on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty; an unreadable or corrupted one is logged
    /// and also starts empty (it gets overwritten on the next `set`).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let cache = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring corrupted store file");
                    HashMap::new()
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read store file");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Self {
            path,
            cache: Mutex::new(cache),
        }
    }

    /// The process-wide store for `path`.
    ///
    /// Every `set` rewrites the whole file from memory, so two stores over
    /// one file would overwrite each other's keys. Going through here keeps
    /// one store per file.
    pub fn shared(path: &Path) -> Arc<Self> {
        let mut files = lock(&FILES);
        let store = files
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Self::open(path)));
        Arc::clone(store)
    }

    /// Get the default path for the store file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("picker").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl PersistedStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.cache).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut cache = lock(&self.cache);
        cache.insert(key.to_string(), value.to_string());
        self.flush(&cache)
    }
}
