//! Error types for the store module.

use cellar_core::{CellError, Hash};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A cell could not be built, decoded or resolved.
    #[error(transparent)]
    Cell(#[from] CellError),

    /// A stored entry does not decode, or does not match its key.
    #[error("corrupt entry {hash}: {reason}")]
    Corrupt { hash: Hash, reason: String },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True if the operation failed because a referenced cell is not present.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, StoreError::Cell(e) if e.is_missing_data())
    }

    /// The hash of the missing cell, for a missing-data failure.
    pub fn missing_hash(&self) -> Option<Hash> {
        match self {
            StoreError::Cell(CellError::MissingData(hash)) => Some(*hash),
            _ => None,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_classification() {
        let hash = Hash::from_bytes([0x44; 32]);
        let err = StoreError::from(CellError::MissingData(hash));
        assert!(err.is_missing_data());
        assert_eq!(err.missing_hash(), Some(hash));
        assert_eq!(err.to_string(), "missing data: 4444444444444444");

        let err = StoreError::Migration("nope".into());
        assert!(!err.is_missing_data());
        assert_eq!(err.missing_hash(), None);
    }
}
