//! Common test utilities for integration tests.
//!
//! Provides a synthetic host application in two builds, a store whose reads
//! and writes can be made to fail, and an in-memory resource table.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use symcache_core::{
    ClassBuilder, ClassPool, KeyValueStore, MemoryStore, Modifiers, Namespace, ResourceError,
    ResourceId, ResourceSource, StoreError, StringEntry,
};

pub const STRING: &str = "java.lang.String";

// ============================================================================
// Host application graphs
// ============================================================================

/// First host build: the helper keeps a readable suffix, members are renamed
pub fn host_build_a() -> ClassPool {
    ClassPool::new()
        .with_class(
            ClassBuilder::new("X.a0")
                .method("A00", &[], "void", Modifiers::PUBLIC)
                .field("A01", "int", Modifiers::PRIVATE),
        )
        .with_class(
            ClassBuilder::new("SomeHelper")
                .extends("X.a0")
                .method("a", &["int"], "void", Modifiers::PUBLIC)
                .method("send", &[STRING, "int", "boolean"], "void", Modifiers::PUBLIC)
                .using_strings(&["sendmessage/failed"])
                .method("b", &[STRING], "boolean", Modifiers::PUBLIC | Modifiers::STATIC)
                .field("A00", "com.host.jid.UserJid", Modifiers::PRIVATE)
                .field("A01", STRING, Modifiers::PRIVATE | Modifiers::FINAL)
                .constructor(&[], Modifiers::PUBLIC)
                .constructor(&["int", STRING], Modifiers::PUBLIC),
        )
        .with_class(ClassBuilder::new("com.host.jid.UserJid").field(
            "A00",
            STRING,
            Modifiers::PUBLIC,
        ))
}

/// Second host build: the same helper with its send method renamed
pub fn host_build_b() -> ClassPool {
    ClassPool::new()
        .with_class(ClassBuilder::new("X.b7"))
        .with_class(
            ClassBuilder::new("SomeHelper")
                .extends("X.b7")
                .method("c", &[STRING, "int", "boolean"], "void", Modifiers::PUBLIC)
                .using_strings(&["sendmessage/failed"])
                .field("A02", "com.host.jid.UserJid", Modifiers::PRIVATE)
                .constructor(&[], Modifiers::PUBLIC),
        )
        .with_class(ClassBuilder::new("com.host.jid.UserJid"))
}

// ============================================================================
// Store with injectable failures
// ============================================================================

/// MemoryStore wrapper that fails reads and/or writes on demand
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }

    fn read_guard(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }

    fn write_guard(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, StoreError> {
        self.read_guard()?;
        self.inner.get(namespace, key)
    }

    fn put(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), StoreError> {
        self.write_guard()?;
        self.inner.put(namespace, key, value)
    }

    fn remove(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError> {
        self.write_guard()?;
        self.inner.remove(namespace, key)
    }

    fn clear(&self, namespace: Namespace) -> Result<usize, StoreError> {
        self.write_guard()?;
        self.inner.clear(namespace)
    }

    fn entries(&self, namespace: Namespace) -> Result<Vec<(String, String)>, StoreError> {
        self.read_guard()?;
        self.inner.entries(namespace)
    }
}

// ============================================================================
// Resource table
// ============================================================================

/// Host string resources, readable through the compiled string table
pub struct HostStrings {
    strings: BTreeMap<ResourceId, String>,
    pub table_reads: AtomicUsize,
    pub with_table: bool,
}

impl HostStrings {
    pub fn new(entries: &[(ResourceId, &str)]) -> Self {
        Self {
            strings: entries
                .iter()
                .map(|(id, value)| (*id, value.to_string()))
                .collect(),
            table_reads: AtomicUsize::new(0),
            with_table: true,
        }
    }

    /// Same strings, but only reachable by probing identifiers
    pub fn probe_only(entries: &[(ResourceId, &str)]) -> Self {
        Self {
            with_table: false,
            ..Self::new(entries)
        }
    }

    pub fn default_build() -> Self {
        Self::new(&[
            (0x7f12_0100, "My status"),
            (0x7f12_0101, "Online"),
            (0x7f12_0102, "Groups"),
            (0x7f12_0103, "This message was deleted"),
            (0x7f12_0104, "Updates"),
        ])
    }
}

impl ResourceSource for HostStrings {
    fn string_table(&self) -> Result<Option<Vec<StringEntry>>, ResourceError> {
        if !self.with_table {
            return Ok(None);
        }
        self.table_reads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(
            self.strings
                .iter()
                .map(|(id, value)| StringEntry {
                    type_prefix: id >> 16,
                    entry: id & 0xffff,
                    value: value.clone(),
                })
                .collect(),
        ))
    }

    fn lookup_string(&self, id: ResourceId) -> Result<String, ResourceError> {
        self.strings
            .get(&id)
            .cloned()
            .ok_or(ResourceError::NotFound(id))
    }
}
