//! List command - Print stored entries

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use symcache_core::{KeyValueStore, Namespace};

use super::{database_path, is_reserved, open_existing_store};
use crate::GlobalOptions;

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Namespace to list (symbols, resources)
    #[arg(long, short = 'n', default_value = "symbols")]
    namespace: Namespace,

    /// Include epoch bookkeeping keys
    #[arg(long)]
    all: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Entry {
    key: String,
    value: String,
}

/// Execute the list command
pub fn execute(args: ListArgs, global: GlobalOptions) -> Result<()> {
    let store = open_existing_store(&database_path(&global)?)?;

    let entries: Vec<Entry> = store
        .entries(args.namespace)?
        .into_iter()
        .filter(|(key, _)| args.all || !is_reserved(key))
        .map(|(key, value)| Entry { key, value })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
    for entry in &entries {
        println!("{:width$}  {}", entry.key, entry.value, width = width);
    }
    super::print_info(
        &format!("{} {} entries", entries.len(), args.namespace),
        global.quiet,
    );

    Ok(())
}
