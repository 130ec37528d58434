//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.symcache/config.toml`
//! 2. Local config: `.symcache/config.toml` (under the cache root)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{
    ConfigOverrides, LogFormat, LoggingConfig, ResolutionConfig, ResourcesConfig, StorageConfig,
    SymcacheConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".symcache";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".symcache";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.symcache`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<SymcacheConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.symcache`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path under a root.
    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a root with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides, then validates.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SymcacheConfig, ConfigError> {
        let mut config = SymcacheConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from one explicit file, then apply overrides.
    pub fn load_file(
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SymcacheConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = load_config_file(path)?;
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<SymcacheConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration under a root.
    pub fn load_local(&self, root: &Path) -> Result<Option<SymcacheConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &SymcacheConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    /// Save configuration to the local config file under a root.
    pub fn save_local(&self, root: &Path, config: &SymcacheConfig) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(root), config)
    }

    /// Initialize global configuration.
    ///
    /// Creates `~/.symcache/config.toml` with default configuration if missing.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_file(global_dir)
    }

    /// Initialize local configuration under a root.
    ///
    /// Creates `.symcache/config.toml` with default configuration if missing.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_file(&root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_file(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &SymcacheConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<SymcacheConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &SymcacheConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Overlay values equal to the default are treated as unset, so partial
/// files only override what they mention.
fn merge_configs(base: SymcacheConfig, overlay: SymcacheConfig) -> SymcacheConfig {
    SymcacheConfig {
        storage: merge_storage(base.storage, overlay.storage),
        resolution: merge_resolution(base.resolution, overlay.resolution),
        resources: merge_resources(base.resources, overlay.resources),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

fn merge_storage(base: StorageConfig, overlay: StorageConfig) -> StorageConfig {
    let default = StorageConfig::default();
    StorageConfig {
        cache_dir: pick(base.cache_dir, overlay.cache_dir, default.cache_dir),
        database: pick(base.database, overlay.database, default.database),
    }
}

fn merge_resolution(base: ResolutionConfig, overlay: ResolutionConfig) -> ResolutionConfig {
    let default = ResolutionConfig::default();
    ResolutionConfig {
        single_flight: pick(base.single_flight, overlay.single_flight, default.single_flight),
        strict_keys: pick(base.strict_keys, overlay.strict_keys, default.strict_keys),
    }
}

fn merge_resources(base: ResourcesConfig, overlay: ResourcesConfig) -> ResourcesConfig {
    let default = ResourcesConfig::default();
    ResourcesConfig {
        probe_start: pick(base.probe_start, overlay.probe_start, default.probe_start),
        probe_end: pick(base.probe_end, overlay.probe_end, default.probe_end),
        label_cache_capacity: pick(
            base.label_cache_capacity,
            overlay.label_cache_capacity,
            default.label_cache_capacity,
        ),
        // Overlay labels extend base labels
        warm_labels: {
            let mut labels = base.warm_labels;
            for label in overlay.warm_labels {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            labels
        },
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: pick(base.level, overlay.level, "info".to_string()),
        format: pick(base.format, overlay.format, LogFormat::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_local_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".symcache");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn create_global_config(content: &str, dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, SymcacheConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_local_config(
            r#"
            [storage]
            database = "host-v2.db"

            [resolution]
            strict_keys = false
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.storage.database, "host-v2.db");
        assert!(!config.resolution.strict_keys);
        assert!(config.resolution.single_flight);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        create_global_config(
            r#"
            [logging]
            level = "debug"

            [resolution]
            single_flight = false

            [resources]
            warm_labels = ["Online"]
            "#,
            &global_dir,
        );
        create_local_config(
            r#"
            [logging]
            format = "json"

            [resources]
            warm_labels = ["My status", "Online"]
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        // Global values survive where local is silent
        assert_eq!(config.logging.level, "debug");
        assert!(!config.resolution.single_flight);
        assert_eq!(
            config.resources.warm_labels,
            vec!["Online".to_string(), "My status".to_string()]
        );
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();
        create_local_config(
            r#"
            [logging]
            level = "warn"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let overrides = ConfigOverrides {
            log_level: Some("trace".to_string()),
            database: Some("cli.db".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.storage.database, "cli.db");
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        create_local_config(
            r#"
            [resources]
            probe_start = 0x7f130000
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        assert!(matches!(
            loader.load(temp.path(), None),
            Err(ConfigError::ProbeRange { .. })
        ));
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let path = create_local_config("[resolution\nsingle_flight = true", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = SymcacheConfig::default();
        config.resources.label_cache_capacity = 64;
        config.logging.level = "warn".to_string();
        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let loaded = loader.load(temp.path(), None).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_file_skips_inheritance() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        create_global_config("[logging]\nlevel = \"debug\"\n", &global_dir);

        let path = temp.path().join("explicit.toml");
        std::fs::write(&path, "[storage]\ndatabase = \"explicit.db\"\n").unwrap();

        let config = ConfigLoader::load_file(&path, None).unwrap();
        assert_eq!(config.storage.database, "explicit.db");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".symcache/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: SymcacheConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, SymcacheConfig::default());
    }

    #[test]
    fn test_init_global_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        create_global_config("[logging]\nlevel = \"error\"\n", &global_dir);

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let path = loader.init_global().unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("error"));
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        create_global_config("[logging]\nlevel = \"debug\"\n", &global_dir);

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}
