//! Status command - Show what a cache database holds

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use symcache_core::{KeyValueStore, Namespace, StoredEpoch, DESCRIPTOR_FORMAT_VERSION};

use super::{database_path, is_reserved};
use crate::GlobalOptions;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Snapshot of one database
#[derive(Debug, Serialize)]
struct CacheStatus {
    database: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host_version_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host_last_update: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    descriptor_format: Option<String>,
    descriptor_format_current: bool,
    symbol_entries: usize,
    resource_entries: usize,
}

/// Execute the status command
pub fn execute(args: StatusArgs, global: GlobalOptions) -> Result<()> {
    let path = database_path(&global)?;

    let mut status = CacheStatus {
        database: path.display().to_string(),
        exists: path.exists(),
        schema_version: None,
        host_version_code: None,
        host_last_update: None,
        tool_version: None,
        descriptor_format: None,
        descriptor_format_current: false,
        symbol_entries: 0,
        resource_entries: 0,
    };

    if status.exists {
        let store = super::open_existing_store(&path)?;
        status.schema_version = store.schema_version()?;
        if let Some(epoch) = StoredEpoch::load(&store)? {
            status.host_version_code = epoch.host_version_code;
            status.host_last_update = epoch.host_last_update;
            status.tool_version = epoch.tool_version;
            status.descriptor_format = epoch.descriptor_format;
        }
        status.descriptor_format_current =
            status.descriptor_format.as_deref() == Some(DESCRIPTOR_FORMAT_VERSION);
        status.symbol_entries = store
            .keys(Namespace::Symbols)?
            .iter()
            .filter(|key| !is_reserved(key))
            .count();
        status.resource_entries = store.len(Namespace::Resources)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Symcache Status");
    println!("===============\n");
    println!("Database: {}", status.database);

    if !status.exists {
        println!("\nNo cache database yet. It is created on first resolution.");
        return Ok(());
    }

    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    println!("Schema:   {}", show(status.schema_version.clone()));

    println!("\nEpoch:");
    println!(
        "  Host version:  {}",
        show(status.host_version_code.map(|v| v.to_string()))
    );
    println!(
        "  Host updated:  {}",
        show(status.host_last_update.map(|v| v.to_string()))
    );
    println!("  Tool version:  {}", show(status.tool_version.clone()));
    println!(
        "  Format:        {}{}",
        show(status.descriptor_format.clone()),
        if status.descriptor_format_current {
            ""
        } else {
            " (outdated, cleared on next start)"
        }
    );

    println!("\nEntries:");
    println!("  Symbols:   {}", status.symbol_entries);
    println!("  Resources: {}", status.resource_entries);

    Ok(())
}
