//! Symcache Core - Adaptive symbol resolution with a persistent cache
//!
//! This crate provides the core functionality for locating program elements
//! in a foreign application whose names change from build to build:
//! - A read-only model of the foreign type graph and live element handles
//! - Structural predicates and search helpers (locators)
//! - Name-based descriptors with a compact, checked text encoding
//! - A SQLite-backed descriptor store invalidated by a build epoch
//! - The resolution engine (cache lookup, self-healing, single-flight)
//! - A string-resource reverse index keyed by normalized labels

pub mod accessor;
pub mod descriptor;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod graph;
pub mod key;
pub mod locate;
pub mod metrics;
pub mod predicate;
pub mod resources;
pub mod store;
pub mod xref;

// Graph model re-exports
pub use graph::{
    ClassBuilder, ClassPool, ClassRef, ConstructorInfo, ConstructorRef, FieldInfo, FieldRef,
    ForeignType, MethodInfo, MethodRef, Modifiers, SymbolHandle, TypeGraph,
};

// Search re-exports
pub use locate::{
    described, find_class, find_classes_by_name, find_constructor, find_constructor_in,
    find_constructors, find_field, find_field_in, find_field_in_hierarchy, find_fields,
    find_first_class_by_name, find_method, find_method_in, find_method_in_hierarchy,
    find_methods, find_unique_constructor, find_unique_field, find_unique_method,
    locate_class_via, locate_field_via, locate_method_via, Described, Locator,
};
pub use predicate::{ConstructorFilter, FieldFilter, MethodFilter, NameMatch, Predicate};
pub use xref::{XrefEngine, XrefError, XrefQuery};

// Descriptor re-exports
pub use descriptor::{
    check_entry, Corruption, CorruptionCheck, DescriptorError, Resolvable, SymbolDescriptor,
    SymbolKind, CONSTRUCTOR_NAME, DESCRIPTOR_FORMAT_VERSION,
};

// Engine re-exports
pub use accessor::Symbols;
pub use engine::{EngineOptions, ResolutionEngine, DEFAULT_LABEL_CACHE_CAPACITY};
pub use epoch::{CacheEpoch, EpochCheck, StoredEpoch};
pub use error::{LocateError, ResolveError};
pub use key::{IntoLogicalKey, KeyRegistry, LogicalKey};
pub use metrics::ResolutionMetrics;

// Storage re-exports
pub use store::{KeyValueStore, MemoryStore, Namespace, SqliteStore, StoreError};

// Resource re-exports
pub use resources::{
    normalize_label, IndexStrategy, ResourceError, ResourceId, ResourceIndex, ResourceSource,
    ReverseIndex, ReverseIndexBuilder, StringEntry, DEFAULT_PROBE_RANGE,
};
