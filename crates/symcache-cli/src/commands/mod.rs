//! CLI command implementations

pub mod check;
pub mod config;
pub mod list;
pub mod reset;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use symcache_config::{ConfigLoader, SymcacheConfig};
use symcache_core::key::RESERVED_PREFIX;
use symcache_core::SqliteStore;

use crate::GlobalOptions;

/// Resolve the root directory from options or current directory.
pub fn resolve_root(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref root) = global.root {
        return Ok(root.clone());
    }
    std::env::current_dir().context("Failed to get current directory")
}

/// Load configuration, from `--config` alone when given, else global → local.
pub fn load_config(global: &GlobalOptions, root: &Path) -> Result<SymcacheConfig> {
    let overrides = global.to_config_overrides();

    if let Some(ref config_path) = global.config {
        return ConfigLoader::load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    ConfigLoader::new()
        .load(root, Some(&overrides))
        .context("Failed to load configuration")
}

/// Database path from `--db`, else from configuration.
pub fn database_path(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref db) = global.db {
        return Ok(db.clone());
    }
    let root = resolve_root(global)?;
    let config = load_config(global, &root)?;
    Ok(config.database_path(&root))
}

/// Open an existing cache database; never creates one.
pub fn open_existing_store(path: &Path) -> Result<SqliteStore> {
    if !path.exists() {
        anyhow::bail!("No cache database at {}", path.display());
    }
    SqliteStore::open(path)
        .with_context(|| format!("Failed to open cache database {}", path.display()))
}

/// Check if a key is epoch bookkeeping rather than a cached entry.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
