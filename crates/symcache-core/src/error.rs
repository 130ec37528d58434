//! Error types for locating and resolving symbols.
//!
//! `LocateError` is what a locator strategy reports. `ResolveError` is what
//! the engine surfaces to callers; it always names the logical key so a
//! feature module can log it and disable itself. Cache corruption and epoch
//! mismatches are recovered inside the engine and never appear here.

use thiserror::Error;

use crate::descriptor::SymbolKind;
use crate::resources::ResourceError;
use crate::xref::XrefError;

/// Errors reported by locator strategies.
#[derive(Debug, Error)]
pub enum LocateError {
    /// The predicate matched zero declared members
    #[error("no {kind} matched {predicate} in {scope}")]
    ElementNotFound {
        kind: SymbolKind,
        scope: String,
        predicate: String,
    },

    /// The predicate matched more than one member where exactly one was required
    #[error("{count} candidates ({kind}) matched {predicate} in {scope}, expected exactly one")]
    AmbiguousMatch {
        kind: SymbolKind,
        scope: String,
        predicate: String,
        count: usize,
    },

    /// The cross-reference query collaborator failed
    #[error("cross-reference query failed: {0}")]
    Query(#[from] XrefError),

    /// Locator-specific failure
    #[error("{0}")]
    Other(String),
}

impl LocateError {
    /// Create an ElementNotFound error.
    pub fn not_found(
        kind: SymbolKind,
        scope: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self::ElementNotFound {
            kind,
            scope: scope.into(),
            predicate: predicate.into(),
        }
    }

    /// Create an AmbiguousMatch error.
    pub fn ambiguous(
        kind: SymbolKind,
        scope: impl Into<String>,
        predicate: impl Into<String>,
        count: usize,
    ) -> Self {
        Self::AmbiguousMatch {
            kind,
            scope: scope.into(),
            predicate: predicate.into(),
            count,
        }
    }

    /// Create a locator-specific error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors surfaced by the resolution engine.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The locator strategy could not produce the element
    #[error("failed to resolve '{key}': {source}")]
    ResolutionFailed {
        key: String,
        #[source]
        source: LocateError,
    },

    /// The same logical key was used for two different kinds of symbol
    #[error("key '{key}' already resolved a {existing} in this process, refusing to reuse it for a {requested}")]
    KeyConflict {
        key: String,
        existing: SymbolKind,
        requested: SymbolKind,
    },

    /// The logical key is not usable as a cache key
    #[error("invalid logical key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// No string resource carries the requested label
    #[error("no string resource matches label '{label}'")]
    ResourceNotFound { label: String },

    /// The resource source failed while looking up a resolved identifier
    #[error("resource lookup failed: {0}")]
    Resource(#[from] ResourceError),

    /// The engine was shut down
    #[error("resolution engine has been shut down")]
    ShutDown,
}

impl ResolveError {
    /// Create a ResolutionFailed error.
    pub fn resolution_failed(key: impl Into<String>, source: LocateError) -> Self {
        Self::ResolutionFailed {
            key: key.into(),
            source,
        }
    }

    /// Create an InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason,
        }
    }

    /// The logical key this error concerns, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::ResolutionFailed { key, .. }
            | Self::KeyConflict { key, .. }
            | Self::InvalidKey { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The locator failure behind this error, if any
    pub fn locate_error(&self) -> Option<&LocateError> {
        match self {
            Self::ResolutionFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Check whether the locator matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.locate_error(),
            Some(LocateError::ElementNotFound { .. })
        ) || matches!(self, Self::ResourceNotFound { .. })
    }
}
