//! Configuration management for folio

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::github::{
    AcquisitionCascade, DEFAULT_API_BASE, DEFAULT_RAW_BASE, DEFAULT_TIMEOUT, Endpoints, HttpFetcher,
};
use crate::store::{
    CACHE_TTL, CacheAsideStore, DurableStore, FileStore, MemoryCache, ProfileCache, SqliteCache,
    SqliteStore,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// GitHub token attached to every outbound request
    #[serde(default)]
    pub github_token: Option<String>,

    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL of the raw content host
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Durable backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Defaults to ~/.folio/data
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default)]
    pub backend: CacheBackend,

    /// SQLite cache directory. Defaults to the platform cache dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            backend: CacheBackend::default(),
            dir: None,
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_raw_base_url() -> String {
    DEFAULT_RAW_BASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_ttl_secs() -> u64 {
    CACHE_TTL.as_secs()
}

fn default_true() -> bool {
    true
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub github_token: Option<String>,
    pub api_base_url: Option<String>,
    pub raw_base_url: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(home_dir()?.join(".folio").join("config.yaml"))
    }

    /// Load configuration from `path`, or the default path when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path()?,
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values that cannot produce a working setup
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()).into());
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache.ttl_secs must be positive".into()).into());
        }
        for (field, url) in [
            ("api_base_url", &self.api_base_url),
            ("raw_base_url", &self.raw_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(
                    ConfigError::Invalid(format!("{} is not an http(s) URL: {}", field, url))
                        .into(),
                );
            }
        }
        Ok(())
    }

    /// Apply command line and environment values on top of the file
    pub fn apply(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(token) = overrides.github_token.filter(|t| !t.is_empty()) {
            self.github_token = Some(token);
        }
        if let Some(url) = overrides.api_base_url {
            self.api_base_url = url;
        }
        if let Some(url) = overrides.raw_base_url {
            self.raw_base_url = url;
        }
        self.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Directory holding durable profile records
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(home_dir()?.join(".folio").join("data")),
        }
    }

    /// Directory holding the SQLite cache
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(SqliteCache::cache_dir()?),
        }
    }

    pub fn open_durable(&self) -> Result<Arc<dyn DurableStore>> {
        let dir = self.data_dir()?;
        let store: Arc<dyn DurableStore> = match self.storage.backend {
            StorageBackend::File => Arc::new(FileStore::open_at(&dir)?),
            StorageBackend::Sqlite => Arc::new(SqliteStore::open_at(&dir)?),
        };
        Ok(store)
    }

    /// Open the configured cache, or `None` when caching is off.
    ///
    /// A cache that cannot be opened downgrades to no cache with a warning.
    pub fn open_cache(&self) -> Option<Arc<dyn ProfileCache>> {
        if !self.cache.enabled {
            return None;
        }
        match self.cache.backend {
            CacheBackend::Memory => Some(Arc::new(MemoryCache::new())),
            CacheBackend::Sqlite => {
                let opened = self
                    .cache_dir()
                    .and_then(|dir| SqliteCache::open_at(&dir).map_err(Into::into));
                match opened {
                    Ok(cache) => Some(Arc::new(cache)),
                    Err(e) => {
                        warn!("Cache unavailable, continuing without it: {}", e);
                        None
                    }
                }
            }
        }
    }

    /// Build the cache-aside store. `no_cache` bypasses the cache tier entirely.
    pub fn build_store(&self, no_cache: bool) -> Result<CacheAsideStore> {
        let durable = self.open_durable()?;
        let cache = if no_cache { None } else { self.open_cache() };

        let store = match cache {
            Some(cache) => CacheAsideStore::new(durable, cache),
            None => CacheAsideStore::uncached(durable),
        };
        Ok(store.with_ttl(self.cache_ttl()))
    }

    /// Build the acquisition cascade over a real HTTP fetcher
    pub fn build_cascade(&self) -> Result<AcquisitionCascade> {
        let fetcher = HttpFetcher::new(self.request_timeout())?;
        Ok(AcquisitionCascade::new(Arc::new(fetcher))
            .with_endpoints(Endpoints {
                api_base: self.api_base_url.clone(),
                raw_base: self.raw_base_url.clone(),
            })
            .with_token(self.github_token.clone()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            api_base_url: default_api_base_url(),
            raw_base_url: default_raw_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| ConfigError::Invalid("Could not determine home directory".to_string()).into())
}
