use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by store backends and collections
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing file could not be read or written
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Value could not be encoded
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored bytes do not decode as expected
    #[error("corrupt value under '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Conditional writes kept losing to concurrent writers
    #[error("gave up writing '{key}' after {attempts} conflicting attempts")]
    Contention { key: String, attempts: u32 },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(key: &str, reason: &impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
