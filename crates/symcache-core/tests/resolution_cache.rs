//! Resolution cache integration tests.
//!
//! These tests validate the end-to-end cache behaviour against a SQLite file:
//! - A cold miss runs the locator once and persists a descriptor
//! - A later process (fresh engine, same file) resolves without locating
//! - Host or tool version changes invalidate stored descriptors
//! - Corrupted and stale entries are dropped and re-resolved
//! - Locator failures propagate and leave nothing behind
//! - An unusable store degrades to locating on every call
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package symcache-core --test resolution_cache
//! ```

mod common;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{host_build_a, host_build_b, FlakyStore, STRING};
use symcache_core::{
    find_class, find_first_class_by_name, find_method, find_methods, locate_method_via,
    CacheEpoch, ClassRef, FieldFilter, KeyValueStore, LogicalKey, MethodFilter, MethodRef,
    Modifiers, NameMatch, Namespace, ResolutionEngine, ResolveError, SqliteStore, Symbols,
    TypeGraph, XrefQuery,
};

// ============================================================================
// Helpers
// ============================================================================

fn epoch(host_version_code: i64) -> CacheEpoch {
    CacheEpoch::new(host_version_code, 1_700_000_000, "2.4.0")
}

fn open_engine(path: &Path, epoch: CacheEpoch) -> ResolutionEngine {
    let store = SqliteStore::open(path).expect("Failed to open store");
    ResolutionEngine::new(Arc::new(store), epoch)
}

fn key(k: &str) -> LogicalKey {
    LogicalKey::new(k).unwrap()
}

/// Locates the helper's three-argument send method
fn send_message(graph: &dyn TypeGraph) -> Result<MethodRef, symcache_core::LocateError> {
    let helper = find_first_class_by_name(graph, &NameMatch::EndsWith("Helper".into()))?;
    find_method(&helper, &MethodFilter::new().params([STRING, "int", "boolean"]))
}

fn panicking_locator(_: &dyn TypeGraph) -> Result<MethodRef, symcache_core::LocateError> {
    panic!("locator must not run on a warm cache");
}

// ============================================================================
// Persistence Across Processes
// ============================================================================

#[test]
fn test_second_process_resolves_from_cache() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("symcache.db");
    let pool = host_build_a();

    {
        let engine = open_engine(&db, epoch(100));
        let method = engine
            .resolve_method(&key("sendMessage"), &pool, &send_message)
            .unwrap();
        assert_eq!(method.name(), "send");
        assert_eq!(
            engine.entry(&key("sendMessage")).unwrap().as_deref(),
            Some("SomeHelper:send:java.lang.String,int,boolean")
        );
        assert_eq!(engine.metrics().cold_misses, 1);
    }

    let engine = open_engine(&db, epoch(100));
    let method = engine
        .resolve_method(&key("sendMessage"), &pool, &panicking_locator)
        .unwrap();
    assert_eq!(
        method.describe(),
        "SomeHelper.send(java.lang.String, int, boolean)"
    );

    let metrics = engine.metrics();
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.misses(), 0);
}

#[test]
fn test_hit_does_not_run_locator() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir.path().join("symcache.db"), epoch(100));
    let pool = host_build_a();
    let calls = AtomicUsize::new(0);
    let locator = |g: &dyn TypeGraph| {
        calls.fetch_add(1, Ordering::SeqCst);
        send_message(g)
    };

    for _ in 0..5 {
        engine
            .resolve_method(&key("sendMessage"), &pool, &locator)
            .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.metrics().hits, 4);
}

#[test]
fn test_every_kind_round_trips_through_sqlite() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("symcache.db");
    let pool = host_build_a();

    let resolve_all = |engine: &ResolutionEngine| {
        let symbols = Symbols::new(engine, &pool);
        let helper = symbols
            .class("helper", |g: &dyn TypeGraph| {
                find_first_class_by_name(g, &NameMatch::EndsWith("Helper".into()))
            })
            .unwrap();
        let publics = symbols
            .methods("helperMethods", |g: &dyn TypeGraph| {
                let helper = find_class(g, "SomeHelper")?;
                Ok(find_methods(&helper, &MethodFilter::new().with(Modifiers::PUBLIC)))
            })
            .unwrap();
        let jid = symbols
            .field("helperJid", |g: &dyn TypeGraph| {
                symcache_core::find_field(
                    &find_class(g, "SomeHelper")?,
                    &FieldFilter::new().of_type("com.host.jid.UserJid"),
                )
            })
            .unwrap();
        let ctor = symbols
            .constructor("helperCtor", |g: &dyn TypeGraph| {
                symcache_core::find_constructor(
                    &find_class(g, "SomeHelper")?,
                    &symcache_core::ConstructorFilter::new().param_count(2),
                )
            })
            .unwrap();
        (helper, publics, jid, ctor)
    };

    let first = resolve_all(&open_engine(&db, epoch(100)));

    let engine = open_engine(&db, epoch(100));
    let second = resolve_all(&engine);
    assert_eq!(first, second);
    assert_eq!(engine.metrics().hits, 4);
    assert_eq!(
        engine.entry(&key("helperCtor")).unwrap().as_deref(),
        Some("SomeHelper:<init>:int,java.lang.String")
    );
    assert_eq!(
        engine.entry(&key("helperMethods")).unwrap().as_deref(),
        Some(
            "SomeHelper:a:int&SomeHelper:send:java.lang.String,int,boolean\
             &SomeHelper:b:java.lang.String"
        )
    );
}

// ============================================================================
// Epoch Invalidation
// ============================================================================

#[test]
fn test_host_update_invalidates_entries() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("symcache.db");

    open_engine(&db, epoch(100))
        .resolve_method(&key("sendMessage"), &host_build_a(), &send_message)
        .unwrap();

    // The new build renamed the method; the old descriptor must not be served
    let pool = host_build_b();
    let calls = AtomicUsize::new(0);
    let engine = open_engine(&db, epoch(101));
    let method = engine
        .resolve_method(&key("sendMessage"), &pool, &|g: &dyn TypeGraph| {
            calls.fetch_add(1, Ordering::SeqCst);
            send_message(g)
        })
        .unwrap();

    assert_eq!(method.name(), "c");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        engine.entry(&key("sendMessage")).unwrap().as_deref(),
        Some("SomeHelper:c:java.lang.String,int,boolean")
    );
    let stored = engine.stored_epoch().unwrap().unwrap();
    assert_eq!(stored.host_version_code, Some(101));
}

#[test]
fn test_tool_update_invalidates_entries() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("symcache.db");
    let pool = host_build_a();

    open_engine(&db, epoch(100))
        .resolve_method(&key("sendMessage"), &pool, &send_message)
        .unwrap();

    let engine = open_engine(&db, CacheEpoch::new(100, 1_700_000_000, "2.5.0"));
    assert!(engine.entry(&key("sendMessage")).unwrap().is_some());

    engine.init().unwrap();
    assert_eq!(engine.entry(&key("sendMessage")).unwrap(), None);
}

#[test]
fn test_call_site_keys_do_not_survive_a_tool_release() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("symcache.db");
    let pool = host_build_a();

    let resolve_here = |engine: &ResolutionEngine| {
        Symbols::new(engine, &pool).method_here(send_message)
    };
    let site_keys = || {
        SqliteStore::open(&db)
            .unwrap()
            .keys(Namespace::Symbols)
            .unwrap()
            .into_iter()
            .filter(|k| k.starts_with("site:"))
            .count()
    };

    let first = open_engine(&db, symcache_core::cache_epoch!(100, 1_700_000_000, "2.4.0"));
    resolve_here(&first).unwrap();
    assert_eq!(site_keys(), 1);

    let next = open_engine(&db, symcache_core::cache_epoch!(100, 1_700_000_000, "2.4.1"));
    next.init().unwrap();
    assert_eq!(site_keys(), 0);

    resolve_here(&next).unwrap();
    assert_eq!(next.metrics().cold_misses, 1);
    assert_eq!(next.metrics().hits, 0);
}

// ============================================================================
// Self-Healing
// ============================================================================

fn seeded_engine(raw: &str) -> (TempDir, ResolutionEngine) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("symcache.db");
    let engine = open_engine(&db, epoch(100));
    engine.init().unwrap();

    let store = SqliteStore::open(&db).unwrap();
    store.put(Namespace::Symbols, "sendMessage", raw).unwrap();
    (dir, engine)
}

#[test]
fn test_internal_signature_entry_is_replaced() {
    let (_dir, engine) = seeded_engine("LSomeHelper;->send(Ljava/lang/String;IZ)V");
    let pool = host_build_a();

    let method = engine
        .resolve_method(&key("sendMessage"), &pool, &send_message)
        .unwrap();
    assert_eq!(method.name(), "send");
    assert_eq!(
        engine.entry(&key("sendMessage")).unwrap().as_deref(),
        Some("SomeHelper:send:java.lang.String,int,boolean")
    );

    let metrics = engine.metrics();
    assert_eq!(metrics.corruption_recoveries, 1);
    assert_eq!(metrics.hits, 0);
}

#[test]
fn test_leaked_intent_entry_is_replaced() {
    let (_dir, engine) = seeded_engine("android.content.Intent");
    let pool = host_build_a();

    engine
        .resolve_method(&key("sendMessage"), &pool, &send_message)
        .unwrap();
    assert_eq!(engine.metrics().corruption_recoveries, 1);

    // Healed entry is served from now on
    engine
        .resolve_method(&key("sendMessage"), &pool, &panicking_locator)
        .unwrap();
}

#[test]
fn test_entry_for_removed_member_is_stale() {
    let (_dir, engine) = seeded_engine("SomeHelper:removedLater:int");
    let pool = host_build_a();

    let method = engine
        .resolve_method(&key("sendMessage"), &pool, &send_message)
        .unwrap();
    assert_eq!(method.name(), "send");

    let metrics = engine.metrics();
    assert_eq!(metrics.stale_recoveries, 1);
    assert_eq!(metrics.corruption_recoveries, 0);
}

// ============================================================================
// Failure Propagation
// ============================================================================

#[test]
fn test_not_found_propagates_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir.path().join("symcache.db"), epoch(100));
    let pool = host_build_b();
    let calls = AtomicUsize::new(0);
    let locator = |g: &dyn TypeGraph| {
        calls.fetch_add(1, Ordering::SeqCst);
        let helper = find_class(g, "SomeHelper")?;
        find_method(&helper, &MethodFilter::new().name(NameMatch::Exact("send".into())))
    };

    for _ in 0..2 {
        let err = engine
            .resolve_method(&key("sendMessage"), &pool, &locator)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.key(), Some("sendMessage"));
    }

    // Failures are not cached; each call searches again
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.entry(&key("sendMessage")).unwrap(), None);
    assert_eq!(engine.metrics().failures, 2);
}

#[test]
fn test_xref_locator_failure_is_resolution_failure() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir.path().join("symcache.db"), epoch(100));
    let pool = host_build_a();
    let known = XrefQuery::method_using_strings(["sendmessage/failed"], None);
    let unknown = XrefQuery::method_using_strings(["no such string"], None);

    let found = engine
        .resolve_method(&key("sendViaStrings"), &pool, &|g: &dyn TypeGraph| {
            locate_method_via(g, &pool, &known)
        })
        .unwrap();
    assert_eq!(found.name(), "send");

    let err = engine
        .resolve_method(&key("missingViaStrings"), &pool, &|g: &dyn TypeGraph| {
            locate_method_via(g, &pool, &unknown)
        })
        .unwrap_err();
    assert!(matches!(err, ResolveError::ResolutionFailed { .. }));
    assert!(err.to_string().contains("missingViaStrings"));
}

// ============================================================================
// Degraded Store
// ============================================================================

#[test]
fn test_unreadable_store_bypasses_cache() {
    let store = Arc::new(FlakyStore::failing_reads());
    let engine = ResolutionEngine::new(store.clone(), epoch(100));
    let pool = host_build_a();
    let calls = AtomicUsize::new(0);
    let locator = |g: &dyn TypeGraph| {
        calls.fetch_add(1, Ordering::SeqCst);
        find_class(g, "SomeHelper")
    };

    for _ in 0..3 {
        let class: ClassRef = engine.resolve_class(&key("helper"), &pool, &locator).unwrap();
        assert_eq!(class.name(), "SomeHelper");
    }

    assert!(!engine.is_persistent());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    assert_eq!(engine.metrics().store_errors, 1);
}

#[test]
fn test_write_failure_still_returns_element() {
    let store = Arc::new(FlakyStore::new());
    let engine = ResolutionEngine::new(store.clone(), epoch(100));
    let pool = host_build_a();
    engine.init().unwrap();
    store.fail_writes.store(true, Ordering::SeqCst);

    let method = engine
        .resolve_method(&key("sendMessage"), &pool, &send_message)
        .unwrap();
    assert_eq!(method.name(), "send");
    assert!(engine.is_persistent());
    assert_eq!(engine.metrics().store_errors, 1);
    assert_eq!(store.inner.get(Namespace::Symbols, "sendMessage").unwrap(), None);
}
