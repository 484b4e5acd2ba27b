//! Error types for Cellar Core.

use thiserror::Error;

use crate::hash::Hash;

/// Classification of a [`CellError`], for presentation layers that should not
/// inspect error internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bytes do not decode to a well-formed canonical value.
    Format,
    /// A referenced cell exists somewhere, but not here.
    MissingData,
    /// A value violates a domain invariant.
    InvalidData,
    /// A caller passed an out-of-domain argument.
    Argument,
}

/// Core errors that can occur when building, encoding or decoding cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("bad format: {0}")]
    BadFormat(String),

    #[error("missing data: {0}")]
    MissingData(Hash),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CellError {
    /// Get the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CellError::BadFormat(_) => ErrorKind::Format,
            CellError::MissingData(_) => ErrorKind::MissingData,
            CellError::InvalidData(_) => ErrorKind::InvalidData,
            CellError::InvalidArgument(_) => ErrorKind::Argument,
        }
    }

    /// True if this is a missing-data condition. Callers may retry after
    /// acquiring the missing subgraph.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, CellError::MissingData(_))
    }

    pub(crate) fn bad_format(msg: impl Into<String>) -> Self {
        CellError::BadFormat(msg.into())
    }

    pub(crate) fn invalid_data(msg: impl Into<String>) -> Self {
        CellError::InvalidData(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        CellError::InvalidArgument(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CellError>;
