//! Symbol accessor API.
//!
//! `Symbols` pairs an engine with the live type graph so feature code can ask
//! for elements in one call:
//!
//! ```
//! use std::sync::Arc;
//! use symcache_core::{
//!     cache_epoch, find_class, find_method, ClassBuilder, ClassPool, MemoryStore, MethodFilter,
//!     Modifiers, ResolutionEngine, Symbols, TypeGraph,
//! };
//!
//! let pool = ClassPool::new().with_class(
//!     ClassBuilder::new("com.host.Sender").method("a", &["int"], "void", Modifiers::PUBLIC),
//! );
//! let engine = ResolutionEngine::new(Arc::new(MemoryStore::new()), cache_epoch!(1, 0));
//! let symbols = Symbols::new(&engine, &pool);
//!
//! let send = symbols
//!     .method("sendMessage", |g: &dyn TypeGraph| {
//!         find_method(&find_class(g, "com.host.Sender")?, &MethodFilter::new().param_count(1))
//!     })
//!     .unwrap();
//! assert_eq!(send.describe(), "com.host.Sender.a(int)");
//! ```

use std::collections::BTreeMap;

use crate::engine::ResolutionEngine;
use crate::error::ResolveError;
use crate::graph::{ClassRef, ConstructorRef, FieldRef, MethodRef, SymbolHandle, TypeGraph};
use crate::key::{IntoLogicalKey, LogicalKey};
use crate::locate::Locator;
use crate::resources::ResourceId;

/// Facade over an engine and a live type graph.
#[derive(Clone, Copy)]
pub struct Symbols<'a> {
    engine: &'a ResolutionEngine,
    graph: &'a dyn TypeGraph,
}

impl<'a> Symbols<'a> {
    pub fn new(engine: &'a ResolutionEngine, graph: &'a dyn TypeGraph) -> Self {
        Self { engine, graph }
    }

    pub fn engine(&self) -> &'a ResolutionEngine {
        self.engine
    }

    pub fn graph(&self) -> &'a dyn TypeGraph {
        self.graph
    }

    pub fn class<K, L>(&self, key: K, locator: L) -> Result<ClassRef, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<ClassRef>,
    {
        self.engine
            .resolve_class(&key.into_logical_key()?, self.graph, &locator)
    }

    pub fn classes<K, L>(&self, key: K, locator: L) -> Result<Vec<ClassRef>, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<Vec<ClassRef>>,
    {
        self.engine
            .resolve_classes(&key.into_logical_key()?, self.graph, &locator)
    }

    pub fn method<K, L>(&self, key: K, locator: L) -> Result<MethodRef, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<MethodRef>,
    {
        self.engine
            .resolve_method(&key.into_logical_key()?, self.graph, &locator)
    }

    pub fn methods<K, L>(&self, key: K, locator: L) -> Result<Vec<MethodRef>, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<Vec<MethodRef>>,
    {
        self.engine
            .resolve_methods(&key.into_logical_key()?, self.graph, &locator)
    }

    pub fn field<K, L>(&self, key: K, locator: L) -> Result<FieldRef, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<FieldRef>,
    {
        self.engine
            .resolve_field(&key.into_logical_key()?, self.graph, &locator)
    }

    pub fn fields<K, L>(&self, key: K, locator: L) -> Result<Vec<FieldRef>, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<Vec<FieldRef>>,
    {
        self.engine
            .resolve_fields(&key.into_logical_key()?, self.graph, &locator)
    }

    /// Fields keyed by caller-chosen labels
    pub fn field_map<K, L>(
        &self,
        key: K,
        locator: L,
    ) -> Result<BTreeMap<String, FieldRef>, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<BTreeMap<String, FieldRef>>,
    {
        self.engine
            .resolve_field_map(&key.into_logical_key()?, self.graph, &locator)
    }

    pub fn constructor<K, L>(&self, key: K, locator: L) -> Result<ConstructorRef, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<ConstructorRef>,
    {
        self.engine
            .resolve_constructor(&key.into_logical_key()?, self.graph, &locator)
    }

    pub fn constructors<K, L>(
        &self,
        key: K,
        locator: L,
    ) -> Result<Vec<ConstructorRef>, ResolveError>
    where
        K: IntoLogicalKey,
        L: Locator<Vec<ConstructorRef>>,
    {
        self.engine
            .resolve_constructors(&key.into_logical_key()?, self.graph, &locator)
    }

    // =========================================================================
    // Call-site keyed variants
    //
    // Keys come from `LogicalKey::caller()`; stamp the epoch with the tool's
    // own version (`cache_epoch!`) or moved calls may read another site's entry.
    // =========================================================================

    /// Resolve a class keyed by the caller's source location
    #[track_caller]
    pub fn class_here<L: Locator<ClassRef>>(&self, locator: L) -> Result<ClassRef, ResolveError> {
        self.class(LogicalKey::caller(), locator)
    }

    /// Resolve a method keyed by the caller's source location
    #[track_caller]
    pub fn method_here<L: Locator<MethodRef>>(
        &self,
        locator: L,
    ) -> Result<MethodRef, ResolveError> {
        self.method(LogicalKey::caller(), locator)
    }

    /// Resolve a field keyed by the caller's source location
    #[track_caller]
    pub fn field_here<L: Locator<FieldRef>>(&self, locator: L) -> Result<FieldRef, ResolveError> {
        self.field(LogicalKey::caller(), locator)
    }

    /// Resolve a constructor keyed by the caller's source location
    #[track_caller]
    pub fn constructor_here<L: Locator<ConstructorRef>>(
        &self,
        locator: L,
    ) -> Result<ConstructorRef, ResolveError> {
        self.constructor(LogicalKey::caller(), locator)
    }

    // =========================================================================
    // Resources and diagnostics
    // =========================================================================

    pub fn resource_id(&self, label: &str) -> Result<ResourceId, ResolveError> {
        self.engine.resource_id(label)
    }

    pub fn resource_string(&self, label: &str) -> Result<String, ResolveError> {
        self.engine.resource_string(label)
    }

    /// Human-readable signature of a resolved element
    pub fn describe(&self, handle: impl Into<SymbolHandle>) -> String {
        handle.into().describe()
    }
}
