//! Recently selected entity ids, most recent first.
//!
//! The list is bounded, deduplicated and stored as a JSON array under one key
//! of a [`PersistedStore`]. Storage trouble never reaches the caller: a
//! store that can't be read or written is swapped for an in-memory list for
//! the rest of the session, and unparseable contents read as empty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use super::lock;
use super::storage::{JsonFileStore, PersistedStore};
use crate::config::RecentConfig;

/// Default number of ids kept.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

static SHARED: Lazy<Mutex<HashMap<(Option<PathBuf>, String), Arc<RecentItemsStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Default)]
struct RecentState {
    memory: Vec<String>,
    degraded: bool,
}

pub struct RecentItemsStore {
    store: Option<Arc<dyn PersistedStore>>,
    key: String,
    limit: usize,
    // Also serializes read-modify-write cycles so concurrent adds don't
    // lose updates.
    state: Mutex<RecentState>,
}

impl RecentItemsStore {
    pub fn new(store: Arc<dyn PersistedStore>, key: impl Into<String>, limit: usize) -> Self {
        Self {
            store: Some(store),
            key: key.into(),
            limit: limit.max(1),
            state: Mutex::new(RecentState::default()),
        }
    }

    /// A store that never persists.
    pub fn in_memory(limit: usize) -> Self {
        Self {
            store: None,
            key: String::new(),
            limit: limit.max(1),
            state: Mutex::new(RecentState::default()),
        }
    }

    /// Store under the configured key, falling back to `default_key`.
    pub fn from_config(
        config: &RecentConfig,
        default_key: &str,
        store: Arc<dyn PersistedStore>,
    ) -> Self {
        Self::new(store, config.key_or(default_key), config.limit)
    }

    /// The process-wide list stored under `key` in the JSON file at `path`,
    /// or kept in memory when there is no path.
    ///
    /// Every caller asking for the same file and key gets the same list, so
    /// adds from different pickers are serialized. The first caller's
    /// `limit` wins.
    pub fn shared(path: Option<&Path>, key: &str, limit: usize) -> Arc<Self> {
        let mut registry = lock(&SHARED);
        let slot = (path.map(Path::to_path_buf), key.to_string());
        let recent = registry.entry(slot).or_insert_with(|| {
            let recent = match path {
                Some(path) => Self::new(JsonFileStore::shared(path), key, limit),
                None => Self::in_memory(limit),
            };
            Arc::new(recent)
        });
        Arc::clone(recent)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether the store fell back to memory after a storage failure.
    pub fn is_degraded(&self) -> bool {
        lock(&self.state).degraded
    }

    /// Current ids, most recent first.
    pub fn list(&self) -> Vec<String> {
        let mut state = lock(&self.state);
        self.read(&mut state)
    }

    /// Record a selection: move `id` to the front and cap the list.
    pub fn add(&self, id: &str) {
        if id.is_empty() {
            return;
        }

        let mut state = lock(&self.state);
        let mut ids = self.read(&mut state);
        ids.retain(|existing| existing != id);
        ids.insert(0, id.to_string());
        ids.truncate(self.limit);

        self.write(&mut state, &ids);
        state.memory = ids;
    }

    fn read(&self, state: &mut RecentState) -> Vec<String> {
        let Some(store) = self.store.as_ref().filter(|_| !state.degraded) else {
            return state.memory.clone();
        };

        match store.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => self.sanitize(ids),
                Err(e) => {
                    tracing::debug!(key = %self.key, error = %e, "recent list unparseable, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "recent list storage unavailable, keeping it in memory");
                state.degraded = true;
                state.memory.clone()
            }
        }
    }

    fn write(&self, state: &mut RecentState, ids: &[String]) {
        let Some(store) = self.store.as_ref().filter(|_| !state.degraded) else {
            return;
        };

        let result = serde_json::to_string(ids)
            .map_err(Into::into)
            .and_then(|json| store.set(&self.key, &json));

        if let Err(e) = result {
            tracing::warn!(key = %self.key, error = %e, "failed to persist recent list, keeping it in memory");
            state.degraded = true;
        }
    }

    fn sanitize(&self, ids: Vec<String>) -> Vec<String> {
        let mut unique: Vec<String> = Vec::with_capacity(ids.len().min(self.limit));
        for id in ids {
            if !id.is_empty() && !unique.contains(&id) {
                unique.push(id);
            }
        }
        unique.truncate(self.limit);
        unique
    }
}
