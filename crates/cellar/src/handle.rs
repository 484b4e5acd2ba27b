//! The main Cellar handle.

use std::sync::Arc;

use cellar_core::{Cell, Hash, Ref};
use cellar_store::{MemoryStore, Novelty, SqliteStore, Store, StoreExt};

use crate::config::{CellarConfig, StoreBackend};
use crate::context;
use crate::error::Result;

/// A store plus the policy for using it.
///
/// Provides a unified API for:
/// - Persisting and announcing cell graphs
/// - Looking up cells by hash
/// - Resolving soft references
#[derive(Clone)]
pub struct Cellar {
    store: Arc<dyn Store>,
    config: CellarConfig,
}

impl Cellar {
    /// Create a handle over an existing store.
    pub fn new(store: impl Store + 'static, config: CellarConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a handle over a store that is shared with other owners.
    pub fn with_shared_store(store: Arc<dyn Store>, config: CellarConfig) -> Self {
        Self { store, config }
    }

    /// Open the store named by `config.backend`.
    pub fn open(config: CellarConfig) -> Result<Self> {
        let store: Arc<dyn Store> = match &config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
        };
        Ok(Self::with_shared_store(store, config))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &CellarConfig {
        &self.config
    }

    /// Persist a cell and everything it references.
    pub fn persist(&self, cell: &Cell) -> Result<Ref> {
        Ok(self.store.persist(cell)?)
    }

    /// Announce a cell. `novelty` sees each cell announced here for the first
    /// time, children before parents.
    pub fn announce(&self, cell: &Cell, novelty: Option<Novelty<'_>>) -> Result<Ref> {
        Ok(self.store.announce(cell, novelty)?)
    }

    /// Look up a cell by hash.
    pub fn lookup(&self, hash: &Hash) -> Result<Option<Cell>> {
        let cell = if self.config.verify_hashes {
            self.store.lookup(hash)?
        } else {
            self.store.get(hash)?
        };

        if self.config.validate_on_lookup {
            if let Some(cell) = &cell {
                let visited = self.store.check_complete(cell)?;
                tracing::debug!(%hash, visited, "validated cell graph");
            }
        }
        Ok(cell)
    }

    /// Get the target of a reference, fetching it from the store if needed.
    pub fn resolve(&self, r: &Ref) -> Result<Cell> {
        Ok(self.store.resolve(r)?)
    }

    /// Run `f` with this handle's store as the current store for
    /// [`cells`](crate::cells) functions on this thread.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        context::with_store(self.store.clone(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells;
    use cellar_core::RefStatus;

    #[test]
    fn test_open_memory() {
        let cellar = Cellar::open(CellarConfig::default()).unwrap();
        let cell = Cell::string("hello");
        cellar.persist(&cell).unwrap();
        assert_eq!(cellar.lookup(&cell.hash()).unwrap(), Some(cell));
    }

    #[test]
    fn test_validate_on_lookup_detects_missing_child() {
        let config = CellarConfig {
            validate_on_lookup: true,
            ..CellarConfig::default()
        };
        let cellar = Cellar::new(MemoryStore::new(), config);

        let child = Cell::string("c".repeat(300));
        let top = Cell::vector_of_refs([Ref::soft(child.hash())]);
        // Store only the top cell, bypassing the walk
        cellar.store().put(&top, RefStatus::Stored).unwrap();

        let err = cellar.lookup(&top.hash()).unwrap_err();
        assert!(err.is_missing_data());

        cellar.persist(&child).unwrap();
        assert_eq!(cellar.lookup(&top.hash()).unwrap(), Some(top));
    }

    #[test]
    fn test_scope_installs_store() {
        let cellar = Cellar::new(MemoryStore::new(), CellarConfig::default());
        let cell = Cell::vector([Cell::string("s".repeat(200))]);

        cellar.scope(|| cells::persist(&cell)).unwrap();
        assert_eq!(cellar.store().count().unwrap(), 2);
    }
}
