//! Configuration error types.

use std::fmt;
use std::path::PathBuf;

use symcache_core::ResourceId;
use thiserror::Error;

/// File operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read config file"),
            Self::Write => write!(f, "write config file"),
            Self::CreateDir => write!(f, "create config directory"),
        }
    }
}

/// Errors from loading, validating or saving Symcache configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to {op} '{path}': {source}")]
    Io {
        op: FileOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No home directory, so there is no global config location
    #[error("could not determine home directory for the global config")]
    NoHomeDir,

    /// `resources.probe_end` lies below `resources.probe_start`
    #[error("resources.probe_end {end:#010x} is below resources.probe_start {start:#010x}")]
    ProbeRange { start: ResourceId, end: ResourceId },

    #[error("unknown log format '{0}', valid values: text, json")]
    UnknownLogFormat(String),

    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::Read, path, source)
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::Write, path, source)
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::CreateDir, path, source)
    }

    fn io(op: FileOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Dotted key of the offending setting, when one is known
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::ProbeRange { .. } => Some("resources.probe_end"),
            Self::UnknownLogFormat(_) => Some("logging.format"),
            Self::InvalidValue { key, .. } => Some(key),
            _ => None,
        }
    }
}
