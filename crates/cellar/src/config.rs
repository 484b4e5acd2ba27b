//! Configuration for a [`Cellar`](crate::Cellar) handle.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which store backend to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-memory store. Contents are lost on drop.
    Memory,
    /// SQLite database file.
    Sqlite { path: PathBuf },
}

/// Configuration for Cellar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellarConfig {
    /// Whether lookups also check that every cell reachable from the result
    /// is available in the store.
    pub validate_on_lookup: bool,
    /// Whether lookups re-hash stored cells and compare with the key.
    pub verify_hashes: bool,
    /// Store backend.
    pub backend: StoreBackend,
}

impl Default for CellarConfig {
    fn default() -> Self {
        Self {
            validate_on_lookup: false,
            verify_hashes: true,
            backend: StoreBackend::Memory,
        }
    }
}
