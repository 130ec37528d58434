//! Symcache Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.symcache/config.toml`
//! - Local config: `.symcache/config.toml` (next to the cache database)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::{ConfigError, FileOp};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use symcache_core::{EngineOptions, ResourceId, DEFAULT_LABEL_CACHE_CAPACITY, DEFAULT_PROBE_RANGE};

/// Root configuration for Symcache.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SymcacheConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Resolution engine configuration
    pub resolution: ResolutionConfig,

    /// String resource configuration
    pub resources: ResourcesConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the cache database lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Cache directory, relative to the root unless absolute
    pub cache_dir: PathBuf,

    /// Database file name within the cache directory
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".symcache"),
            database: "symcache.db".to_string(),
        }
    }
}

/// Resolution engine behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Run each key's locator at most once at a time
    pub single_flight: bool,

    /// Reject reusing one logical key for two kinds of symbol
    pub strict_keys: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            single_flight: true,
            strict_keys: true,
        }
    }
}

/// String resource lookups.
///
/// # Example TOML
///
/// ```toml
/// [resources]
/// probe_start = 0x7f120000
/// probe_end = 0x7f12ffff
/// label_cache_capacity = 256
/// warm_labels = ["My status", "Online"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResourcesConfig {
    /// First identifier tried when probing
    pub probe_start: ResourceId,

    /// Last identifier tried when probing
    pub probe_end: ResourceId,

    /// Capacity of the in-memory label memo
    pub label_cache_capacity: usize,

    /// Labels resolved eagerly at engine init
    pub warm_labels: Vec<String>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            probe_start: *DEFAULT_PROBE_RANGE.start(),
            probe_end: *DEFAULT_PROBE_RANGE.end(),
            label_cache_capacity: DEFAULT_LABEL_CACHE_CAPACITY,
            warm_labels: Vec::new(),
        }
    }
}

impl ResourcesConfig {
    /// Validate the probe range and memo capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_start > self.probe_end {
            return Err(ConfigError::ProbeRange {
                start: self.probe_start,
                end: self.probe_end,
            });
        }
        if self.label_cache_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "resources.label_cache_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownLogFormat(s.to_string())),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override cache directory
    pub cache_dir: Option<PathBuf>,
    /// Override database file name
    pub database: Option<String>,
    /// Override log level
    pub log_level: Option<String>,
    /// Override log format
    pub log_format: Option<LogFormat>,
    /// Override single-flight locking
    pub single_flight: Option<bool>,
}

impl SymcacheConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.cache_dir {
            self.storage.cache_dir = dir.clone();
        }
        if let Some(ref database) = overrides.database {
            self.storage.database = database.clone();
        }
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if let Some(single_flight) = overrides.single_flight {
            self.resolution.single_flight = single_flight;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "storage.database",
                "file name is empty",
            ));
        }
        self.resources.validate()
    }

    /// Get the effective cache directory under `root`.
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        if self.storage.cache_dir.is_absolute() {
            self.storage.cache_dir.clone()
        } else {
            root.join(&self.storage.cache_dir)
        }
    }

    /// Get the database file path under `root`.
    pub fn database_path(&self, root: &Path) -> PathBuf {
        self.cache_dir(root).join(&self.storage.database)
    }

    /// Build engine options from the resolution and resources sections.
    pub fn engine_options(&self) -> Result<EngineOptions, ConfigError> {
        self.resources.validate()?;
        let label_cache_capacity = NonZeroUsize::new(self.resources.label_cache_capacity)
            .ok_or_else(|| {
                ConfigError::invalid_value("resources.label_cache_capacity", "must be at least 1")
            })?;

        Ok(EngineOptions {
            single_flight: self.resolution.single_flight,
            strict_keys: self.resolution.strict_keys,
            probe_range: self.resources.probe_start..=self.resources.probe_end,
            label_cache_capacity,
            warm_labels: self.resources.warm_labels.clone(),
        })
    }
}
