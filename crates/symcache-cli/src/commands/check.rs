//! Check command - Audit stored entries for corruption
//!
//! Entries are checked without knowing which kind of symbol each key
//! resolves, so only shape-independent rules apply here: the content
//! heuristics shared by every kind, the descriptor grammar, and decimal
//! resource identifiers. Kind-specific rules still run at resolve time.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use symcache_core::{
    check_entry, KeyValueStore, Namespace, ResourceId, SymbolDescriptor, SymbolKind,
};

use super::{database_path, is_reserved, open_existing_store};
use crate::GlobalOptions;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Delete entries that fail the audit
    #[arg(long)]
    purge: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// One entry that failed the audit
#[derive(Debug, Clone, Serialize)]
pub struct BadEntry {
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    checked: usize,
    bad: Vec<BadEntry>,
    purged: usize,
}

/// Audit one symbol entry
pub fn audit_symbol_entry(raw: &str) -> Result<(), String> {
    let elements: Vec<String> = if raw.trim_start().starts_with('{') {
        check_entry(SymbolKind::FieldMap, raw).map_err(|c| c.to_string())?;
        let map: BTreeMap<String, String> =
            serde_json::from_str(raw).map_err(|e| e.to_string())?;
        map.into_values().collect()
    } else {
        check_entry(SymbolKind::Classes, raw).map_err(|c| c.to_string())?;
        raw.split('&').map(str::to_string).collect()
    };

    for element in elements {
        element
            .parse::<SymbolDescriptor>()
            .map_err(|e| format!("'{}': {}", element, e))?;
    }
    Ok(())
}

/// Audit one resource entry
pub fn audit_resource_entry(raw: &str) -> Result<(), String> {
    raw.parse::<ResourceId>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a decimal resource id", raw))
}

/// Execute the check command
pub fn execute(args: CheckArgs, global: GlobalOptions) -> Result<()> {
    let store = open_existing_store(&database_path(&global)?)?;

    let mut checked = 0;
    let mut bad = Vec::new();
    for namespace in Namespace::ALL {
        for (key, value) in store.entries(namespace)? {
            if is_reserved(&key) {
                continue;
            }
            checked += 1;
            let verdict = match namespace {
                Namespace::Symbols => audit_symbol_entry(&value),
                Namespace::Resources => audit_resource_entry(&value),
            };
            if let Err(reason) = verdict {
                bad.push(BadEntry {
                    namespace: namespace.to_string(),
                    key,
                    value,
                    reason,
                });
            }
        }
    }

    let mut purged = 0;
    if args.purge {
        for entry in &bad {
            let namespace = entry.namespace.parse::<Namespace>().map_err(anyhow::Error::msg)?;
            if store.remove(namespace, &entry.key)? {
                purged += 1;
            }
        }
    }

    let report = CheckReport {
        checked,
        bad,
        purged,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for entry in &report.bad {
            println!(
                "{}/{}: {} ({})",
                entry.namespace, entry.key, entry.reason, entry.value
            );
        }
        super::print_info(
            &format!(
                "Checked {} entries, {} bad, {} purged",
                report.checked,
                report.bad.len(),
                report.purged
            ),
            global.quiet,
        );
    }

    let remaining = report.bad.len() - report.purged;
    if remaining > 0 {
        anyhow::bail!(
            "{} bad entries remain (run with --purge to delete them)",
            remaining
        );
    }
    Ok(())
}
