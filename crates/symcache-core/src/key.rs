//! Logical keys.
//!
//! A logical key names one resolution site. It is the primary key of the
//! persistent cache, so it must be stable across runs of the same tool build.

use std::fmt;
use std::panic::Location;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::descriptor::SymbolKind;
use crate::error::ResolveError;

/// Prefix of keys reserved for cache bookkeeping.
pub const RESERVED_PREFIX: char = '@';

/// Stable identifier for one resolution site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalKey(String);

impl LogicalKey {
    /// Create a validated key
    pub fn new(key: impl Into<String>) -> Result<Self, ResolveError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ResolveError::invalid_key(key, "key is empty"));
        }
        if key.starts_with(RESERVED_PREFIX) {
            return Err(ResolveError::invalid_key(key, "'@' prefix is reserved"));
        }
        if key.chars().any(char::is_control) {
            return Err(ResolveError::invalid_key(key, "key contains control characters"));
        }
        Ok(Self(key))
    }

    /// Derive a key from the caller's source location.
    ///
    /// The key changes whenever the call moves. A moved call can land on a
    /// location an older build used for another site of the same kind, so
    /// these keys are only safe when the tool version in the cache epoch
    /// (see `cache_epoch!`) changes with every release.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self(format!(
            "site:{}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        ))
    }

    /// Get the key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for LogicalKey {
    type Error = ResolveError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        LogicalKey::new(value)
    }
}

impl TryFrom<String> for LogicalKey {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LogicalKey::new(value)
    }
}

/// Conversion into a validated `LogicalKey`.
pub trait IntoLogicalKey {
    fn into_logical_key(self) -> Result<LogicalKey, ResolveError>;
}

impl IntoLogicalKey for LogicalKey {
    fn into_logical_key(self) -> Result<LogicalKey, ResolveError> {
        Ok(self)
    }
}

impl IntoLogicalKey for &LogicalKey {
    fn into_logical_key(self) -> Result<LogicalKey, ResolveError> {
        Ok(self.clone())
    }
}

impl IntoLogicalKey for &str {
    fn into_logical_key(self) -> Result<LogicalKey, ResolveError> {
        LogicalKey::new(self)
    }
}

impl IntoLogicalKey for String {
    fn into_logical_key(self) -> Result<LogicalKey, ResolveError> {
        LogicalKey::new(self)
    }
}

/// Kinds each key has resolved as in this process.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    kinds: DashMap<LogicalKey, SymbolKind>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` resolves a `kind`, rejecting a different earlier kind
    pub fn claim(&self, key: &LogicalKey, kind: SymbolKind) -> Result<(), ResolveError> {
        match self.kinds.entry(key.clone()) {
            Entry::Occupied(existing) if *existing.get() != kind => {
                Err(ResolveError::KeyConflict {
                    key: key.to_string(),
                    existing: *existing.get(),
                    requested: kind,
                })
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(kind);
                Ok(())
            }
        }
    }

    /// Kind recorded for `key`, if any
    pub fn kind_of(&self, key: &LogicalKey) -> Option<SymbolKind> {
        self.kinds.get(key).map(|k| *k)
    }

    pub fn clear(&self) {
        self.kinds.clear();
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
