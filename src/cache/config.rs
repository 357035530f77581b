use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};
use crate::manifest::manifest_path;
use crate::path::normalize_path;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".konpeito_cache";

/// Configuration for one [`CacheManager`](super::CacheManager).
///
/// Every manager is built from an explicit configuration, so independent
/// instances (e.g. one per test, or a second instance reading what the first
/// one saved) never share state except through the manifest on disk.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Absolute, normalized cache directory
    cache_dir: PathBuf,
    /// Toolchain version recorded in, and required of, the manifest
    toolchain_version: String,
    /// Verbosity level for diagnostics on stderr
    verbose: u8,
    /// Suppress everything but errors
    quiet: bool,
}

impl CacheConfig {
    /// Creates a new builder for [`CacheConfig`]
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Configuration for `cache_dir` with default settings.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::builder().cache_dir(cache_dir).build()
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the manifest location inside the cache directory
    pub fn manifest_path(&self) -> PathBuf {
        manifest_path(&self.cache_dir)
    }

    /// Get the toolchain version
    pub fn toolchain_version(&self) -> &str {
        &self.toolchain_version
    }

    /// Get the verbose level
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn quiet(&self) -> bool {
        self.quiet
    }
}

/// Builder for [`CacheConfig`]
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    cache_dir: Option<PathBuf>,
    toolchain_version: Option<String>,
    verbose: u8,
    quiet: bool,
}

impl CacheConfigBuilder {
    /// Set the cache directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the toolchain version (defaults to this crate's version)
    pub fn toolchain_version(mut self, version: impl Into<String>) -> Self {
        self.toolchain_version = Some(version.into());
        self
    }

    /// Set the verbose level
    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    /// Enable quiet mode
    pub fn quiet(mut self, enabled: bool) -> Self {
        self.quiet = enabled;
        self
    }

    /// Build the configuration, normalizing the cache directory.
    pub fn build(self) -> Result<CacheConfig> {
        let cache_dir = self
            .cache_dir
            .ok_or_else(|| CacheError::ConfigError("Cache directory is required".to_string()))?;

        if cache_dir.as_os_str().is_empty() {
            return Err(CacheError::InvalidPath {
                message: "cache directory must not be empty".to_string(),
            });
        }

        let toolchain_version = self
            .toolchain_version
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        if toolchain_version.trim().is_empty() {
            return Err(CacheError::ConfigError(
                "Toolchain version must not be empty".to_string(),
            ));
        }

        Ok(CacheConfig {
            cache_dir: normalize_path(cache_dir)?,
            toolchain_version,
            verbose: if self.quiet { 0 } else { self.verbose },
            quiet: self.quiet,
        })
    }
}
