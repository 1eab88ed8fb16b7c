//! Configuration types for the container sync system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cache store configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            cache: CacheConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.cache.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the local cache is enabled
    ///
    /// With the cache disabled every mutation goes straight to the remote
    /// service, and cache-only operations fail with `CacheDisabled`.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Path to the SQLite cache database
    ///
    /// Defaults to `$HOME/.listsync/cache.db` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    /// Validate the cache configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.enabled && self.path.is_none() && std::env::var_os("HOME").is_none() {
            return Err(crate::Error::config(
                "cache path not set and $HOME is not available to derive a default",
            ));
        }
        Ok(())
    }

    /// Resolve the effective cache database path
    pub fn resolve_path(&self) -> Result<PathBuf, crate::Error> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let home = std::env::var_os("HOME").ok_or_else(|| {
            crate::Error::config("cache path not set and $HOME is not available")
        })?;
        Ok(PathBuf::from(home).join(".listsync").join("cache.db"))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: None,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}
