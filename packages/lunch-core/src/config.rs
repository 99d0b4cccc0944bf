//! App-level configuration consumed by the service.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("lunchline")
}

fn default_cache_enabled() -> bool {
    true
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_resolves() -> usize {
    5
}

/// Small app-level config object: cache location and switches plus
/// third-party API credentials. Loaded and persisted by the surrounding
/// application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory of the day cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Global cache switch; when off, every resolution calls through.
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Zomato API key; absent means Zomato sources report a setup hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zomato_api_key: Option<String>,

    /// Outbound fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Bound on concurrently resolving entities in a batch.
    #[serde(default = "default_max_concurrent_resolves")]
    pub max_concurrent_resolves: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_enabled: default_cache_enabled(),
            zomato_api_key: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_concurrent_resolves: default_max_concurrent_resolves(),
        }
    }
}

impl AppConfig {
    /// Config with an explicit cache directory, otherwise defaults.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Disable the day cache.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Set the Zomato API key.
    pub fn with_zomato_api_key(mut self, key: impl Into<String>) -> Self {
        self.zomato_api_key = Some(key.into());
        self
    }
}
