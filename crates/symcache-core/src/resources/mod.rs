//! String-resource reverse index.
//!
//! Maps human-readable labels (the English text of a string resource) to the
//! host's numeric resource identifiers, which change between host builds.
//! Lookups go through three layers: a bounded in-memory label memo, the
//! persistent `Resources` namespace, and finally a reverse index built once
//! per process from the host's resources.

mod builder;
mod labels;

pub use builder::{IndexStrategy, ReverseIndex, ReverseIndexBuilder, DEFAULT_PROBE_RANGE};
pub use labels::LabelCache;

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{KeyValueStore, Namespace};

/// Numeric string-resource identifier
pub type ResourceId = u32;

/// Errors reported by a resource source
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("no string resource with id {0:#010x}")]
    NotFound(ResourceId),

    #[error("resource source unavailable: {0}")]
    Unavailable(String),
}

/// One entry of the host's compiled string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    /// Package and type part of the identifier (e.g. `0x7f12`)
    pub type_prefix: u32,
    /// Entry index within the type
    pub entry: u32,
    /// String value in the default configuration
    pub value: String,
}

impl StringEntry {
    /// Full resource identifier
    pub fn id(&self) -> ResourceId {
        (self.type_prefix << 16) | (self.entry & 0xffff)
    }
}

/// Access to the host application's string resources.
pub trait ResourceSource: Send + Sync {
    /// String entries of the default configuration, if the compiled resource
    /// table can be read directly
    fn string_table(&self) -> Result<Option<Vec<StringEntry>>, ResourceError> {
        Ok(None)
    }

    /// Declared integer constants of the generated identifier holder, if it
    /// can be enumerated
    fn id_holder_constants(&self) -> Result<Option<Vec<(String, ResourceId)>>, ResourceError> {
        Ok(None)
    }

    /// The host's own string lookup routine
    fn lookup_string(&self, id: ResourceId) -> Result<String, ResourceError>;
}

/// Normalize a label for matching: lowercase, all whitespace removed
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Label lookups with memo, persistence and a lazily built reverse index.
pub struct ResourceIndex {
    source: Arc<dyn ResourceSource>,
    builder: ReverseIndexBuilder,
    labels: LabelCache,
    /// Built at most once; cleared by `clear`
    reverse: Mutex<Option<Arc<ReverseIndex>>>,
    store_errors: AtomicU64,
}

impl ResourceIndex {
    pub fn new(
        source: Arc<dyn ResourceSource>,
        builder: ReverseIndexBuilder,
        label_capacity: NonZeroUsize,
    ) -> Self {
        Self {
            source,
            builder,
            labels: LabelCache::new(label_capacity),
            reverse: Mutex::new(None),
            store_errors: AtomicU64::new(0),
        }
    }

    /// Resolve a label to its identifier.
    ///
    /// `store` is the persistent layer; pass `None` to skip it.
    pub fn lookup(
        &self,
        label: &str,
        store: Option<&dyn KeyValueStore>,
    ) -> Result<Option<ResourceId>, ResourceError> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return Ok(None);
        }

        if let Some(id) = self.labels.get(&normalized) {
            return Ok(Some(id));
        }

        if let Some(store) = store {
            if let Some(id) = self.read_persisted(store, &normalized) {
                self.labels.insert(normalized, id);
                return Ok(Some(id));
            }
        }

        let Some(id) = self.reverse_index()?.get(&normalized) else {
            debug!("No string resource matches label '{}'", normalized);
            return Ok(None);
        };

        if let Some(store) = store {
            if let Err(e) = store.put(Namespace::Resources, &normalized, &id.to_string()) {
                warn!("Failed to persist resource id for '{}': {}", normalized, e);
                self.store_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.labels.insert(normalized, id);
        Ok(Some(id))
    }

    fn read_persisted(&self, store: &dyn KeyValueStore, normalized: &str) -> Option<ResourceId> {
        let raw = match store.get(Namespace::Resources, normalized) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read resource id for '{}': {}", normalized, e);
                self.store_errors.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match raw.parse::<ResourceId>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(
                    "Corrupted resource id '{}' stored for '{}', rebuilding",
                    raw, normalized
                );
                if let Err(e) = store.remove(Namespace::Resources, normalized) {
                    warn!("Failed to drop corrupted resource id: {}", e);
                    self.store_errors.fetch_add(1, Ordering::Relaxed);
                }
                None
            }
        }
    }

    /// Resolve a label to the host's current string value
    pub fn resolve_string(
        &self,
        label: &str,
        store: Option<&dyn KeyValueStore>,
    ) -> Result<Option<String>, ResourceError> {
        match self.lookup(label, store)? {
            Some(id) => self.source.lookup_string(id).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve labels eagerly, returning how many were found
    pub fn warm<S: AsRef<str>>(&self, labels: &[S], store: Option<&dyn KeyValueStore>) -> usize {
        let mut found = 0;
        for label in labels {
            let label: &str = label.as_ref();
            match self.lookup(label, store) {
                Ok(Some(_)) => found += 1,
                Ok(None) => debug!("Warm label '{}' has no string resource", label),
                Err(e) => warn!("Failed to warm label '{}': {}", label, e),
            }
        }
        found
    }

    /// Drop the memo and the reverse index
    pub fn clear(&self) {
        self.labels.clear();
        *self.reverse.lock() = None;
    }

    /// Number of store failures seen so far
    pub fn store_errors(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    /// Get the reverse index, building it on first use
    fn reverse_index(&self) -> Result<Arc<ReverseIndex>, ResourceError> {
        let mut guard = self.reverse.lock();
        if let Some(ref index) = *guard {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(self.builder.build(self.source.as_ref())?);
        *guard = Some(Arc::clone(&index));
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    struct Table {
        strings: HashMap<ResourceId, String>,
        table_reads: AtomicUsize,
    }

    impl Table {
        fn new() -> Self {
            let strings = [
                (0x7f120001, "Online"),
                (0x7f120002, "My status"),
                (0x7f120003, "Groups"),
            ]
            .into_iter()
            .map(|(id, s)| (id, s.to_string()))
            .collect();
            Self {
                strings,
                table_reads: AtomicUsize::new(0),
            }
        }
    }

    impl ResourceSource for Table {
        fn string_table(&self) -> Result<Option<Vec<StringEntry>>, ResourceError> {
            self.table_reads.fetch_add(1, Ordering::SeqCst);
            let mut entries: Vec<StringEntry> = self
                .strings
                .iter()
                .map(|(id, value)| StringEntry {
                    type_prefix: id >> 16,
                    entry: id & 0xffff,
                    value: value.clone(),
                })
                .collect();
            entries.sort_by_key(|e| e.entry);
            Ok(Some(entries))
        }

        fn lookup_string(&self, id: ResourceId) -> Result<String, ResourceError> {
            self.strings
                .get(&id)
                .cloned()
                .ok_or(ResourceError::NotFound(id))
        }
    }

    fn index(source: Arc<Table>) -> ResourceIndex {
        ResourceIndex::new(
            source,
            ReverseIndexBuilder::default(),
            NonZeroUsize::new(8).unwrap(),
        )
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("My Status"), "mystatus");
        assert_eq!(normalize_label(" Last seen\tSun %s "), "lastseensun%s");
        assert_eq!(normalize_label("   "), "");
    }

    #[test]
    fn test_string_entry_id() {
        let entry = StringEntry {
            type_prefix: 0x7f12,
            entry: 0x0042,
            value: String::new(),
        };
        assert_eq!(entry.id(), 0x7f120042);
    }

    #[test]
    fn test_lookup_persists_and_memoizes() {
        let source = Arc::new(Table::new());
        let store = MemoryStore::new();
        let index = index(Arc::clone(&source));

        assert_eq!(index.lookup("my status", Some(&store)).unwrap(), Some(0x7f120002));
        assert_eq!(
            store.get(Namespace::Resources, "mystatus").unwrap().as_deref(),
            Some("2131886082")
        );
        assert_eq!(index.lookup("MyStatus", Some(&store)).unwrap(), Some(0x7f120002));
        assert_eq!(index.lookup("online", Some(&store)).unwrap(), Some(0x7f120001));
        assert_eq!(source.table_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_persisted_id_skips_index_build() {
        let source = Arc::new(Table::new());
        let store = MemoryStore::new();
        store.put(Namespace::Resources, "groups", "2131886083").unwrap();

        let index = index(Arc::clone(&source));
        assert_eq!(index.lookup("Groups", Some(&store)).unwrap(), Some(0x7f120003));
        assert_eq!(source.table_reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_corrupted_persisted_id_is_rebuilt() {
        let source = Arc::new(Table::new());
        let store = MemoryStore::new();
        store.put(Namespace::Resources, "groups", "not-a-number").unwrap();

        let index = index(source);
        assert_eq!(index.lookup("groups", Some(&store)).unwrap(), Some(0x7f120003));
        assert_eq!(
            store.get(Namespace::Resources, "groups").unwrap().as_deref(),
            Some("2131886083")
        );
    }

    #[test]
    fn test_missing_label_is_none_and_not_persisted() {
        let store = MemoryStore::new();
        let index = index(Arc::new(Table::new()));
        assert_eq!(index.lookup("no such label", Some(&store)).unwrap(), None);
        assert_eq!(store.len(Namespace::Resources).unwrap(), 0);
        assert_eq!(index.resolve_string("no such label", None).unwrap(), None);
    }

    #[test]
    fn test_resolve_string_and_warm() {
        let index = index(Arc::new(Table::new()));
        assert_eq!(
            index.resolve_string("groups", None).unwrap().as_deref(),
            Some("Groups")
        );
        assert_eq!(index.warm(&["online", "mystatus", "updates"], None), 2);
    }

    #[test]
    fn test_clear_forces_rebuild() {
        let source = Arc::new(Table::new());
        let index = index(Arc::clone(&source));
        index.lookup("online", None).unwrap();
        index.clear();
        index.lookup("online", None).unwrap();
        assert_eq!(source.table_reads.load(Ordering::SeqCst), 2);
    }
}
