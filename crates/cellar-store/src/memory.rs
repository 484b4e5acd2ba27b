//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing and for the default store context. It has the
//! same semantics as SQLite but keeps decoded cells in memory with no
//! persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use cellar_core::{Cell, Hash, RefStatus};

use crate::error::{Result, StoreError};
use crate::traits::Store;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    cells: RwLock<HashMap<Hash, StoredCell>>,
}

struct StoredCell {
    cell: Cell,
    status: RefStatus,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Hash, StoredCell>>> {
        self.cells
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Hash, StoredCell>>> {
        self.cells
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn put(&self, cell: &Cell, status: RefStatus) -> Result<Option<RefStatus>> {
        let hash = cell.hash();
        let mut cells = self.write()?;

        match cells.get_mut(&hash) {
            Some(stored) => {
                let previous = stored.status;
                stored.status = previous.max(status);
                Ok(Some(previous))
            }
            None => {
                cells.insert(
                    hash,
                    StoredCell {
                        cell: cell.clone(),
                        status,
                    },
                );
                Ok(None)
            }
        }
    }

    fn get(&self, hash: &Hash) -> Result<Option<Cell>> {
        Ok(self.read()?.get(hash).map(|stored| stored.cell.clone()))
    }

    fn status(&self, hash: &Hash) -> Result<Option<RefStatus>> {
        Ok(self.read()?.get(hash).map(|stored| stored.status))
    }

    fn all_hashes(&self) -> Result<Vec<Hash>> {
        let mut hashes: Vec<Hash> = self.read()?.keys().copied().collect();
        hashes.sort();
        Ok(hashes)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
