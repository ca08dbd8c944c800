//! Error types for the analytics ledger

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the ledger's fallible entry points (legacy migration
/// and configuration). History loading never returns these; it recovers.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to decode analytics history: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist flag {key}: {reason}")]
    Flag { key: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }
}
