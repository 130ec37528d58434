//! Resolution Engine
//!
//! Resolves logical keys to live program elements, consulting the persistent
//! descriptor store before running the expensive locator. The flow for one
//! `resolve` call:
//!
//! 1. Verify the cache epoch (once per process).
//! 2. Read the stored entry. If it passes content checks, parses, and still
//!    resolves against the live graph, return it.
//! 3. Otherwise run the locator, persist the encoded result, return it.
//!
//! Concurrent resolutions of the same key are single-flighted with
//! double-checked locking on a per-key mutex, so the locator runs at most
//! once per key per process.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::descriptor::{Corruption, DescriptorError, Resolvable};
use crate::epoch::{self, CacheEpoch, EpochCheck, StoredEpoch};
use crate::error::{LocateError, ResolveError};
use crate::graph::{ClassRef, ConstructorRef, FieldRef, MethodRef, TypeGraph};
use crate::key::{KeyRegistry, LogicalKey};
use crate::locate::Locator;
use crate::metrics::ResolutionMetrics;
use crate::resources::{
    ResourceId, ResourceIndex, ResourceSource, ReverseIndexBuilder, DEFAULT_PROBE_RANGE,
};
use crate::store::{KeyValueStore, Namespace, StoreError};

/// Default capacity of the in-memory label memo
pub const DEFAULT_LABEL_CACHE_CAPACITY: usize = 256;

/// Tunables for a `ResolutionEngine`
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Run each key's locator at most once at a time
    pub single_flight: bool,
    /// Reject reuse of one key for two symbol kinds
    pub strict_keys: bool,
    /// Identifier range for brute-force resource probing
    pub probe_range: RangeInclusive<ResourceId>,
    /// Capacity of the in-memory label memo
    pub label_cache_capacity: NonZeroUsize,
    /// Labels resolved eagerly by `init`
    pub warm_labels: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            single_flight: true,
            strict_keys: true,
            probe_range: DEFAULT_PROBE_RANGE,
            label_cache_capacity: NonZeroUsize::new(DEFAULT_LABEL_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            warm_labels: Vec::new(),
        }
    }
}

/// Whether the persistent layer is in use for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheMode {
    Persistent,
    /// The epoch could not be verified; locators always run, nothing is written
    Bypass,
}

/// Outcome of reading one stored entry
enum Lookup<T> {
    Hit(T),
    Missing,
    Corrupt(Corruption),
    Stale(DescriptorError),
    StoreFailed(StoreError),
}

/// The resolution cache.
///
/// One instance per process is typical; all methods take `&self`.
pub struct ResolutionEngine {
    store: Arc<dyn KeyValueStore>,
    epoch: CacheEpoch,
    options: EngineOptions,

    /// Epoch barrier, settled on first use
    mode: OnceCell<CacheMode>,

    /// Per-key single-flight locks
    locks: DashMap<LogicalKey, Arc<Mutex<()>>>,

    registry: KeyRegistry,
    metrics: Mutex<ResolutionMetrics>,

    resource_source: Option<Arc<dyn ResourceSource>>,
    resources: OnceCell<ResourceIndex>,

    shut_down: AtomicBool,
}

impl ResolutionEngine {
    /// Create an engine over `store` for the given live epoch
    pub fn new(store: Arc<dyn KeyValueStore>, epoch: CacheEpoch) -> Self {
        Self {
            store,
            epoch,
            options: EngineOptions::default(),
            mode: OnceCell::new(),
            locks: DashMap::new(),
            registry: KeyRegistry::new(),
            metrics: Mutex::new(ResolutionMetrics::default()),
            resource_source: None,
            resources: OnceCell::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable label lookups against the host's string resources
    pub fn with_resource_source(mut self, source: Arc<dyn ResourceSource>) -> Self {
        self.resource_source = Some(source);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn epoch(&self) -> &CacheEpoch {
        &self.epoch
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Verify the epoch and warm the configured labels.
    ///
    /// Calling this is optional; the first resolution does the same check.
    pub fn init(&self) -> Result<(), ResolveError> {
        self.ensure_live()?;
        self.mode();

        if let Some(resources) = self.resources() {
            if !self.options.warm_labels.is_empty() {
                let found = resources.warm(&self.options.warm_labels, self.persistent_store());
                debug!(
                    "Warmed {}/{} resource labels",
                    found,
                    self.options.warm_labels.len()
                );
            }
        }
        Ok(())
    }

    /// Discard every cached entry and in-memory state, then restamp the epoch
    pub fn invalidate(&self) -> Result<(), ResolveError> {
        self.ensure_live()?;
        info!("Invalidating resolution cache");

        self.registry.clear();
        if let Some(resources) = self.resources.get() {
            resources.clear();
        }

        if self.mode() == CacheMode::Persistent {
            for namespace in Namespace::ALL {
                if let Err(e) = self.store.clear(namespace) {
                    warn!("Failed to clear {} namespace: {}", namespace, e);
                    self.metrics.lock().record_store_error();
                }
            }
            if let Err(e) = epoch::reconcile(self.store.as_ref(), &self.epoch) {
                warn!("Failed to restamp cache epoch: {}", e);
                self.metrics.lock().record_store_error();
            }
        }
        Ok(())
    }

    /// Refuse all further resolutions
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("Resolution engine shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Check if the persistent layer is in use (settles the epoch barrier)
    pub fn is_persistent(&self) -> bool {
        self.mode() == CacheMode::Persistent
    }

    fn ensure_live(&self) -> Result<(), ResolveError> {
        if self.is_shut_down() {
            return Err(ResolveError::ShutDown);
        }
        Ok(())
    }

    fn mode(&self) -> CacheMode {
        *self
            .mode
            .get_or_init(|| match epoch::reconcile(self.store.as_ref(), &self.epoch) {
                Ok(EpochCheck::Match) => {
                    debug!("Cache epoch matches ({})", self.epoch);
                    CacheMode::Persistent
                }
                Ok(_) => CacheMode::Persistent,
                Err(e) => {
                    warn!(
                        "Cannot verify cache epoch, bypassing persistent cache: {}",
                        e
                    );
                    self.metrics.lock().record_store_error();
                    CacheMode::Bypass
                }
            })
    }

    fn persistent_store(&self) -> Option<&dyn KeyValueStore> {
        match self.mode() {
            CacheMode::Persistent => Some(self.store.as_ref()),
            CacheMode::Bypass => None,
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve `key` to a live element, running `locator` only on a miss
    pub fn resolve<T, L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<T, ResolveError>
    where
        T: Resolvable,
        L: Locator<T> + ?Sized,
    {
        self.ensure_live()?;
        if self.options.strict_keys {
            self.registry.claim(key, T::KIND)?;
        }

        let store = self.persistent_store();

        // First check: served from the store without taking the key lock
        if let Some(store) = store {
            if let Lookup::Hit(value) = Self::read_entry::<T>(store, key, graph) {
                trace!("Cache hit for '{}'", key);
                self.metrics.lock().record_hit();
                return Ok(value);
            }
        }

        if !self.options.single_flight {
            return self.resolve_slow(key, graph, locator, store);
        }

        let lock = self.key_lock(key);
        let _guard = lock.lock();
        self.resolve_slow(key, graph, locator, store)
    }

    /// Re-check under the key lock, then run the locator
    fn resolve_slow<T, L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
        store: Option<&dyn KeyValueStore>,
    ) -> Result<T, ResolveError>
    where
        T: Resolvable,
        L: Locator<T> + ?Sized,
    {
        if let Some(store) = store {
            match Self::read_entry::<T>(store, key, graph) {
                Lookup::Hit(value) => {
                    trace!("Cache hit for '{}' after waiting", key);
                    self.metrics.lock().record_hit();
                    return Ok(value);
                }
                Lookup::Missing => {
                    debug!("Cold miss for '{}', running {}", key, locator.describe());
                    self.metrics.lock().record_cold_miss();
                }
                Lookup::Corrupt(corruption) => {
                    warn!(
                        "Corrupted cache entry for '{}' failed check ({}), re-resolving",
                        key, corruption
                    );
                    self.metrics.lock().record_corruption();
                    self.drop_entry(store, key);
                }
                Lookup::Stale(e) => {
                    warn!("Stale cache entry for '{}' ({}), re-resolving", key, e);
                    self.metrics.lock().record_stale();
                    self.drop_entry(store, key);
                }
                Lookup::StoreFailed(e) => {
                    warn!("Failed to read cache entry for '{}': {}", key, e);
                    let mut metrics = self.metrics.lock();
                    metrics.record_store_error();
                    metrics.record_cold_miss();
                }
            }
        } else {
            self.metrics.lock().record_cold_miss();
        }

        let value = self.run_locator(key, graph, locator)?;

        if let Some(store) = store {
            self.persist(store, key, &value);
        }
        Ok(value)
    }

    fn run_locator<T, L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<T, ResolveError>
    where
        T: Resolvable,
        L: Locator<T> + ?Sized,
    {
        let result = match locator.locate(graph) {
            Ok(value) if value.is_empty_result() => Err(LocateError::not_found(
                T::KIND,
                "locator result",
                locator.describe(),
            )),
            other => other,
        };

        match result {
            Ok(value) => {
                debug!("Resolved '{}' to {}", key, value.summary());
                Ok(value)
            }
            Err(e) => {
                warn!(
                    "Locator {} failed for '{}': {}",
                    locator.describe(),
                    key,
                    e
                );
                self.metrics.lock().record_failure();
                Err(ResolveError::resolution_failed(key.as_str(), e))
            }
        }
    }

    fn read_entry<T: Resolvable>(
        store: &dyn KeyValueStore,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
    ) -> Lookup<T> {
        let raw = match store.get(Namespace::Symbols, key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Missing,
            Err(e) => return Lookup::StoreFailed(e),
        };
        match T::decode(&raw, graph) {
            Ok(value) => Lookup::Hit(value),
            Err(DescriptorError::Corrupted(corruption)) => Lookup::Corrupt(corruption),
            Err(e) => Lookup::Stale(e),
        }
    }

    fn persist<T: Resolvable>(&self, store: &dyn KeyValueStore, key: &LogicalKey, value: &T) {
        let encoded = match value.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Cannot encode result for '{}', not caching: {}", key, e);
                return;
            }
        };
        if let Err(e) = store.put(Namespace::Symbols, key.as_str(), &encoded) {
            warn!("Failed to persist '{}': {}", key, e);
            self.metrics.lock().record_store_error();
        }
    }

    fn drop_entry(&self, store: &dyn KeyValueStore, key: &LogicalKey) {
        if let Err(e) = store.remove(Namespace::Symbols, key.as_str()) {
            warn!("Failed to drop bad entry for '{}': {}", key, e);
            self.metrics.lock().record_store_error();
        }
    }

    /// Get or create the single-flight lock for a key
    fn key_lock(&self, key: &LogicalKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // =========================================================================
    // Typed wrappers
    // =========================================================================

    pub fn resolve_class<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<ClassRef, ResolveError>
    where
        L: Locator<ClassRef> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_classes<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<Vec<ClassRef>, ResolveError>
    where
        L: Locator<Vec<ClassRef>> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_method<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<MethodRef, ResolveError>
    where
        L: Locator<MethodRef> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_methods<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<Vec<MethodRef>, ResolveError>
    where
        L: Locator<Vec<MethodRef>> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_field<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<FieldRef, ResolveError>
    where
        L: Locator<FieldRef> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_fields<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<Vec<FieldRef>, ResolveError>
    where
        L: Locator<Vec<FieldRef>> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_field_map<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<BTreeMap<String, FieldRef>, ResolveError>
    where
        L: Locator<BTreeMap<String, FieldRef>> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_constructor<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<ConstructorRef, ResolveError>
    where
        L: Locator<ConstructorRef> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    pub fn resolve_constructors<L>(
        &self,
        key: &LogicalKey,
        graph: &dyn TypeGraph,
        locator: &L,
    ) -> Result<Vec<ConstructorRef>, ResolveError>
    where
        L: Locator<Vec<ConstructorRef>> + ?Sized,
    {
        self.resolve(key, graph, locator)
    }

    // =========================================================================
    // Resources
    // =========================================================================

    fn resources(&self) -> Option<&ResourceIndex> {
        let source = self.resource_source.as_ref()?;
        Some(self.resources.get_or_init(|| {
            ResourceIndex::new(
                Arc::clone(source),
                ReverseIndexBuilder::new(self.options.probe_range.clone()),
                self.options.label_cache_capacity,
            )
        }))
    }

    fn require_resources(&self, label: &str) -> Result<&ResourceIndex, ResolveError> {
        self.resources().ok_or_else(|| ResolveError::ResourceNotFound {
            label: label.to_string(),
        })
    }

    /// Identifier of the string resource whose text matches `label`
    pub fn resource_id(&self, label: &str) -> Result<ResourceId, ResolveError> {
        self.ensure_live()?;
        let resources = self.require_resources(label)?;
        resources
            .lookup(label, self.persistent_store())?
            .ok_or_else(|| ResolveError::ResourceNotFound {
                label: label.to_string(),
            })
    }

    /// Current host text of the string resource whose text matches `label`
    pub fn resource_string(&self, label: &str) -> Result<String, ResolveError> {
        self.ensure_live()?;
        let resources = self.require_resources(label)?;
        resources
            .resolve_string(label, self.persistent_store())?
            .ok_or_else(|| ResolveError::ResourceNotFound {
                label: label.to_string(),
            })
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Raw stored value for a key
    pub fn entry(&self, key: &LogicalKey) -> Result<Option<String>, StoreError> {
        self.store.get(Namespace::Symbols, key.as_str())
    }

    /// Drop one stored entry, reporting whether it existed
    pub fn forget(&self, key: &LogicalKey) -> Result<bool, StoreError> {
        self.store.remove(Namespace::Symbols, key.as_str())
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> ResolutionMetrics {
        let mut metrics = *self.metrics.lock();
        if let Some(resources) = self.resources.get() {
            metrics.store_errors += resources.store_errors();
        }
        metrics
    }

    /// Epoch currently recorded in the store
    pub fn stored_epoch(&self) -> Result<Option<StoredEpoch>, StoreError> {
        StoredEpoch::load(self.store.as_ref())
    }
}
