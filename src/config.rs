use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{FilterSet, Predicate};
use crate::error::PickerResult;
use crate::picker::VirtualizationPolicy;
use crate::services::cache::CacheTiming;
use crate::services::retry::RetryPolicy;
use crate::services::storage::JsonFileStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    pub search: SearchConfig,
    pub retry: RetryConfig,
    pub virtualization: VirtualizationConfig,
    pub recent: RecentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    /// How long an entry stays usable after it goes stale
    pub cache_time_ms: u64,
    /// How long an entry is served without revalidation
    pub stale_time_ms: u64,
    pub max_results: usize,
    pub search_fields: Vec<String>,
    pub predicates: Vec<Predicate>,
    /// Server-side filters sent with every query
    pub filters: FilterSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualizationConfig {
    pub enabled: bool,
    pub threshold: usize,
    pub base_row_height: u32,
    pub extra_field_height: u32,
    pub list_height: u32,
    /// Secondary info lines shown under each row (e.g. "credit_info")
    pub optional_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    pub enabled: bool,
    pub limit: usize,
    /// Storage key, defaults to the entity type's own key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    /// JSON file holding the list, defaults to the user data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            cache_time_ms: 120_000,
            stale_time_ms: 600_000,
            max_results: 100,
            search_fields: vec!["name".to_string(), "code".to_string()],
            predicates: Vec::new(),
            filters: FilterSet::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for VirtualizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 20,
            base_row_height: 60,
            extra_field_height: 20,
            list_height: 300,
            optional_fields: Vec::new(),
        }
    }
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 5,
            storage_key: None,
            storage_path: None,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_timing(&self) -> CacheTiming {
        CacheTiming {
            stale_time: Duration::from_millis(self.stale_time_ms),
            cache_time: Duration::from_millis(self.cache_time_ms),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl RecentConfig {
    /// The configured storage key, or `default` when none is set.
    pub fn key_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.storage_key.as_deref().unwrap_or(default)
    }

    /// The configured storage file, or the default data file.
    pub fn path(&self) -> Option<PathBuf> {
        self.storage_path.clone().or_else(JsonFileStore::default_path)
    }
}

impl VirtualizationConfig {
    pub fn policy(&self) -> VirtualizationPolicy {
        VirtualizationPolicy {
            enabled: self.enabled,
            threshold: self.threshold,
            base_row_height: self.base_row_height,
            extra_field_height: self.extra_field_height,
            list_height: self.list_height,
        }
    }
}

impl PickerConfig {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("picker")
            .join("config.toml")
    }

    /// Load config from the default location, or return defaults if it is
    /// missing or unreadable
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load picker config, using defaults");
                Self::default()
            }
        }
    }

    /// Load and validate config from a specific file
    pub fn load_from(path: &Path) -> PickerResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.validate();
        Ok(config)
    }

    /// Clamp config values to acceptable ranges
    pub fn validate(&mut self) {
        self.search.debounce_ms = self.search.debounce_ms.min(5_000);
        self.search.max_results = self.search.max_results.clamp(1, 1_000);

        self.retry.max_retries = self.retry.max_retries.min(10);
        self.retry.base_delay_ms = self.retry.base_delay_ms.max(1);
        self.retry.max_delay_ms = self.retry.max_delay_ms.max(self.retry.base_delay_ms);

        self.virtualization.base_row_height = self.virtualization.base_row_height.max(1);
        self.virtualization.list_height = self.virtualization.list_height.max(1);

        self.recent.limit = self.recent.limit.clamp(1, 50);
    }

    /// Save config to the default location
    pub fn save(&self) -> PickerResult<()> {
        self.save_to(&Self::config_path())
    }

    /// Save config to a specific file
    pub fn save_to(&self, path: &Path) -> PickerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PickerError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}
