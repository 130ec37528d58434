//! Reset command - Clear cached entries on operator request
//!
//! A full reset also drops the stored epoch, so the next engine start
//! treats the database as fresh. `--symbols` keeps the epoch and resource
//! identifiers; `--resources` keeps descriptors.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use symcache_core::{KeyValueStore, Namespace, SqliteStore};
use tracing::info;

use super::{database_path, is_reserved, open_existing_store};
use crate::GlobalOptions;

/// Arguments for the reset command
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Only clear cached symbol descriptors
    #[arg(long, conflicts_with = "resources")]
    symbols: bool,

    /// Only clear cached resource identifiers
    #[arg(long)]
    resources: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Default, Serialize)]
struct ResetResult {
    symbols_removed: usize,
    resources_removed: usize,
    epoch_cleared: bool,
}

/// Remove symbol entries but keep the epoch bookkeeping
fn clear_symbol_entries(store: &SqliteStore) -> Result<usize> {
    let mut removed = 0;
    for key in store.keys(Namespace::Symbols)? {
        if !is_reserved(&key) && store.remove(Namespace::Symbols, &key)? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Execute the reset command
pub fn execute(args: ResetArgs, global: GlobalOptions) -> Result<()> {
    let path = database_path(&global)?;
    let store = open_existing_store(&path)?;

    let mut result = ResetResult::default();
    match (args.symbols, args.resources) {
        (true, _) => result.symbols_removed = clear_symbol_entries(&store)?,
        (_, true) => result.resources_removed = store.clear(Namespace::Resources)?,
        (false, false) => {
            result.symbols_removed = clear_symbol_entries(&store)?;
            result.resources_removed = store.clear(Namespace::Resources)?;
            store.clear(Namespace::Symbols)?;
            result.epoch_cleared = true;
        }
    }
    info!(
        "Reset {}: {} symbol and {} resource entries removed",
        path.display(),
        result.symbols_removed,
        result.resources_removed
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        super::print_info(
            &format!(
                "Removed {} symbol and {} resource entries{}",
                result.symbols_removed,
                result.resources_removed,
                if result.epoch_cleared {
                    ", cache epoch cleared"
                } else {
                    ""
                }
            ),
            global.quiet,
        );
    }
    Ok(())
}
