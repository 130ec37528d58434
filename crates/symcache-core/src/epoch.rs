//! Cache epoch.
//!
//! Entries are only valid for the host build and tool build that produced
//! them. The epoch is stored under reserved keys in the symbol namespace and
//! compared once per process; any difference invalidates the cache.

use std::fmt;

use tracing::info;

use crate::descriptor::DESCRIPTOR_FORMAT_VERSION;
use crate::store::{KeyValueStore, Namespace, StoreError};

/// Reserved key holding the host version code
pub const KEY_HOST_VERSION_CODE: &str = "@host_version_code";
/// Reserved key holding the host last-update timestamp
pub const KEY_HOST_LAST_UPDATE: &str = "@host_last_update";
/// Reserved key holding the tool version
pub const KEY_TOOL_VERSION: &str = "@tool_version";
/// Reserved key holding the descriptor grammar version
pub const KEY_DESCRIPTOR_FORMAT: &str = "@descriptor_format";

/// Build a `CacheEpoch` stamped with the calling crate's package version.
///
/// `env!` expands in the crate that invokes the macro, so the stored tool
/// version tracks the embedding tool rather than this library. Call-site keys
/// (`Symbols::*_here`) are only safe when that version is bumped on every
/// release that moves code.
///
/// ```
/// let epoch = symcache_core::cache_epoch!(231, 1_700_000_000);
/// assert_eq!(epoch.tool_version, env!("CARGO_PKG_VERSION"));
///
/// let pinned = symcache_core::cache_epoch!(231, 1_700_000_000, "2.4.0");
/// assert_eq!(pinned.tool_version, "2.4.0");
/// ```
#[macro_export]
macro_rules! cache_epoch {
    ($host_version_code:expr, $host_last_update:expr) => {
        $crate::CacheEpoch::new(
            $host_version_code,
            $host_last_update,
            env!("CARGO_PKG_VERSION"),
        )
    };
    ($host_version_code:expr, $host_last_update:expr, $tool_version:expr) => {
        $crate::CacheEpoch::new($host_version_code, $host_last_update, $tool_version)
    };
}

/// Identity of the environment cache entries are valid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEpoch {
    /// Build number of the host application
    pub host_version_code: i64,
    /// Install/update timestamp of the host application
    pub host_last_update: i64,
    /// Version of the tool doing the resolving
    pub tool_version: String,
}

impl CacheEpoch {
    pub fn new(
        host_version_code: i64,
        host_last_update: i64,
        tool_version: impl Into<String>,
    ) -> Self {
        Self {
            host_version_code,
            host_last_update,
            tool_version: tool_version.into(),
        }
    }

    fn stamp(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.put(Namespace::Symbols, KEY_DESCRIPTOR_FORMAT, DESCRIPTOR_FORMAT_VERSION)?;
        store.put(Namespace::Symbols, KEY_TOOL_VERSION, &self.tool_version)?;
        store.put(
            Namespace::Symbols,
            KEY_HOST_LAST_UPDATE,
            &self.host_last_update.to_string(),
        )?;
        store.put(
            Namespace::Symbols,
            KEY_HOST_VERSION_CODE,
            &self.host_version_code.to_string(),
        )?;
        Ok(())
    }
}

impl fmt::Display for CacheEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host {} (updated {}), tool {}",
            self.host_version_code, self.host_last_update, self.tool_version
        )
    }
}

/// Epoch bookkeeping as found in a store; unparsable values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredEpoch {
    pub host_version_code: Option<i64>,
    pub host_last_update: Option<i64>,
    pub tool_version: Option<String>,
    pub descriptor_format: Option<String>,
}

impl StoredEpoch {
    /// Read the reserved keys, returning None when none are present
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StoreError> {
        let read = |key| store.get(Namespace::Symbols, key);
        let stored = StoredEpoch {
            host_version_code: read(KEY_HOST_VERSION_CODE)?.and_then(|v| v.parse().ok()),
            host_last_update: read(KEY_HOST_LAST_UPDATE)?.and_then(|v| v.parse().ok()),
            tool_version: read(KEY_TOOL_VERSION)?,
            descriptor_format: read(KEY_DESCRIPTOR_FORMAT)?,
        };
        if stored == StoredEpoch::default() {
            return Ok(None);
        }
        Ok(Some(stored))
    }

    /// Check if this matches `live` under the current descriptor grammar
    pub fn matches(&self, live: &CacheEpoch) -> bool {
        self.host_version_code == Some(live.host_version_code)
            && self.host_last_update == Some(live.host_last_update)
            && self.tool_version.as_deref() == Some(live.tool_version.as_str())
            && self.descriptor_format.as_deref() == Some(DESCRIPTOR_FORMAT_VERSION)
    }
}

impl fmt::Display for StoredEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<String>| v.unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "host {} (updated {}), tool {}, format {}",
            show(self.host_version_code.map(|v| v.to_string())),
            show(self.host_last_update.map(|v| v.to_string())),
            show(self.tool_version.clone()),
            show(self.descriptor_format.clone()),
        )
    }
}

/// Outcome of comparing the stored epoch with the live one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpochCheck {
    /// No epoch was stored
    Fresh,
    /// Stored epoch equals the live one
    Match,
    /// Stored epoch differs from the live one
    Mismatch { stored: StoredEpoch, live: CacheEpoch },
}

impl EpochCheck {
    /// Compare a stored epoch (if any) with the live one
    pub fn evaluate(stored: Option<StoredEpoch>, live: &CacheEpoch) -> Self {
        match stored {
            None => EpochCheck::Fresh,
            Some(stored) if stored.matches(live) => EpochCheck::Match,
            Some(stored) => EpochCheck::Mismatch {
                stored,
                live: live.clone(),
            },
        }
    }

    /// Check if resource identifiers must be discarded too
    pub fn host_build_changed(&self) -> bool {
        match self {
            EpochCheck::Fresh => true,
            EpochCheck::Match => false,
            EpochCheck::Mismatch { stored, live } => {
                stored.host_version_code != Some(live.host_version_code)
            }
        }
    }
}

/// Compare the stored epoch with `live` and bring the store in line.
///
/// On anything but a match the symbol namespace is cleared; resources are
/// cleared only when the host build number changed. The live epoch is then
/// stamped.
pub fn reconcile(store: &dyn KeyValueStore, live: &CacheEpoch) -> Result<EpochCheck, StoreError> {
    let check = EpochCheck::evaluate(StoredEpoch::load(store)?, live);

    match &check {
        EpochCheck::Match => return Ok(check),
        EpochCheck::Fresh => info!("No cache epoch stored, starting fresh at {}", live),
        EpochCheck::Mismatch { stored, .. } => {
            info!("Cache epoch changed from [{}] to [{}], clearing symbol cache", stored, live)
        }
    }

    store.clear(Namespace::Symbols)?;
    if check.host_build_changed() {
        let cleared = store.clear(Namespace::Resources)?;
        if cleared > 0 {
            info!("Host build changed, cleared {} resource identifiers", cleared);
        }
    }
    live.stamp(store)?;

    Ok(check)
}
