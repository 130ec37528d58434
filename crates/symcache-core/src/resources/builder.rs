//! Reverse index construction.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{normalize_label, ResourceError, ResourceId, ResourceSource};

/// Default probe range: the string type of the application package
pub const DEFAULT_PROBE_RANGE: RangeInclusive<ResourceId> = 0x7f12_0000..=0x7f12_ffff;

/// Which strategy produced a reverse index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStrategy {
    /// Parsed from the compiled string table
    StringTable,
    /// Enumerated from the generated identifier holder
    IdHolder,
    /// Brute-force probe over an identifier range
    Probe,
}

impl fmt::Display for IndexStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexStrategy::StringTable => "string table",
            IndexStrategy::IdHolder => "identifier holder",
            IndexStrategy::Probe => "range probe",
        })
    }
}

/// Normalized label to identifier map. Later duplicates win.
#[derive(Debug, Clone)]
pub struct ReverseIndex {
    labels: HashMap<String, ResourceId>,
    strategy: IndexStrategy,
}

impl ReverseIndex {
    fn new(strategy: IndexStrategy) -> Self {
        Self {
            labels: HashMap::new(),
            strategy,
        }
    }

    fn insert(&mut self, value: &str, id: ResourceId) {
        self.labels.insert(normalize_label(value), id);
    }

    /// Identifier for an already-normalized label
    pub fn get(&self, normalized: &str) -> Option<ResourceId> {
        self.labels.get(normalized).copied()
    }

    pub fn strategy(&self) -> IndexStrategy {
        self.strategy
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Builds a `ReverseIndex`, trying each strategy in turn.
#[derive(Debug, Clone)]
pub struct ReverseIndexBuilder {
    probe_range: RangeInclusive<ResourceId>,
}

impl Default for ReverseIndexBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_RANGE)
    }
}

impl ReverseIndexBuilder {
    pub fn new(probe_range: RangeInclusive<ResourceId>) -> Self {
        Self { probe_range }
    }

    /// Build the index from `source`.
    ///
    /// The string table is used when it yields entries. Otherwise the
    /// identifier holder is used whenever it can be enumerated, and only when
    /// it cannot is the probe range scanned.
    pub fn build(&self, source: &dyn ResourceSource) -> Result<ReverseIndex, ResourceError> {
        let start = Instant::now();
        let index = self.build_inner(source)?;
        info!(
            "Built resource reverse index with {} labels via {} in {:?}",
            index.len(),
            index.strategy(),
            start.elapsed()
        );
        Ok(index)
    }

    fn build_inner(&self, source: &dyn ResourceSource) -> Result<ReverseIndex, ResourceError> {
        match source.string_table() {
            Ok(Some(entries)) if !entries.is_empty() => {
                let mut index = ReverseIndex::new(IndexStrategy::StringTable);
                for entry in &entries {
                    index.insert(&entry.value, entry.id());
                }
                return Ok(index);
            }
            Ok(_) => debug!("String table unavailable, trying identifier holder"),
            Err(e) => warn!("Failed to read string table: {}", e),
        }

        match source.id_holder_constants() {
            Ok(Some(constants)) => {
                let mut index = ReverseIndex::new(IndexStrategy::IdHolder);
                for (name, id) in constants {
                    match source.lookup_string(id) {
                        Ok(value) => index.insert(&value, id),
                        Err(e) => debug!("Skipping holder constant {}: {}", name, e),
                    }
                }
                return Ok(index);
            }
            Ok(None) => debug!("Identifier holder unavailable, probing range"),
            Err(e) => warn!("Failed to enumerate identifier holder: {}", e),
        }

        self.probe(source)
    }

    fn probe(&self, source: &dyn ResourceSource) -> Result<ReverseIndex, ResourceError> {
        let results: Vec<(ResourceId, Result<String, ResourceError>)> = self
            .probe_range
            .clone()
            .into_par_iter()
            .map(|id| (id, source.lookup_string(id)))
            .collect();

        let mut index = ReverseIndex::new(IndexStrategy::Probe);
        let mut unavailable = None;
        for (id, result) in results {
            match result {
                Ok(value) => index.insert(&value, id),
                Err(ResourceError::NotFound(_)) => {}
                Err(e) => unavailable = Some(e),
            }
        }

        match unavailable {
            Some(e) if index.is_empty() => Err(e),
            _ => Ok(index),
        }
    }
}
