//! Error types for Cellar.

use cellar_core::CellError;
use cellar_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Cellar operations.
#[derive(Debug, Error)]
pub enum CellarError {
    /// Cell model error.
    #[error("cell error: {0}")]
    Cell(#[from] CellError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CellarError {
    /// True if the operation failed because a referenced cell is not present.
    pub fn is_missing_data(&self) -> bool {
        match self {
            CellarError::Cell(e) => e.is_missing_data(),
            CellarError::Store(e) => e.is_missing_data(),
            CellarError::Config(_) => false,
        }
    }
}

/// Result type for Cellar operations.
pub type Result<T> = std::result::Result<T, CellarError>;
