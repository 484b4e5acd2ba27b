//! Store trait: the abstract interface for cell persistence.
//!
//! A store maps each cell's hash to its encoding and a [`RefStatus`]. The
//! walks that make a cell graph durable live in [`StoreExt`] and work with any
//! backend.

use cellar_core::{Cell, Hash, Ref, RefStatus};

use crate::error::{Result, StoreError};

/// Callback invoked for each cell that reaches a walk's target status in a
/// store for the first time.
pub type Novelty<'a> = &'a mut dyn FnMut(&Ref);

/// The store trait: minimal interface for cell persistence.
///
/// Implementations can be in-memory or SQLite. Every entry's key is the hash
/// of its encoding, so inserts never conflict.
///
/// # Design Notes
///
/// - **Atomic insert-if-absent**: concurrent `put`s of the same cell store it
///   exactly once.
/// - **Monotonic status**: a stored status only ever rises.
pub trait Store: Send + Sync {
    /// Store a cell with at least the given status.
    ///
    /// Returns the status the entry had before, or `None` if it is new.
    fn put(&self, cell: &Cell, status: RefStatus) -> Result<Option<RefStatus>>;

    /// Get a stored cell by hash.
    fn get(&self, hash: &Hash) -> Result<Option<Cell>>;

    /// Get the stored status of a cell.
    fn status(&self, hash: &Hash) -> Result<Option<RefStatus>>;

    /// Check if a cell is stored.
    fn has(&self, hash: &Hash) -> Result<bool> {
        Ok(self.status(hash)?.is_some())
    }

    /// Get all stored hashes, in ascending order.
    fn all_hashes(&self) -> Result<Vec<Hash>>;

    /// Count of stored cells.
    fn count(&self) -> Result<usize>;
}

/// Extension trait with graph-level operations over any [`Store`].
pub trait StoreExt: Store {
    /// Make the graph under `r` reach `target` in this store.
    ///
    /// Children are stored before their parents, so a parent is never marked
    /// durable while a child is missing. `novelty` is called once for each
    /// cell that reaches `target` here for the first time.
    ///
    /// Returns `r`, now advanced to at least `target`.
    fn store_top_ref(&self, r: &Ref, target: RefStatus, novelty: Option<Novelty<'_>>)
        -> Result<Ref>;

    /// Store a cell and everything it references with status `Stored`.
    fn store_cell(&self, cell: &Cell) -> Result<Ref>;

    /// Persist a cell and everything it references.
    fn persist(&self, cell: &Cell) -> Result<Ref>;

    /// Announce a cell, persisting anything not yet persisted.
    fn announce(&self, cell: &Cell, novelty: Option<Novelty<'_>>) -> Result<Ref>;

    /// Look up a cell, checking that it hashes to its key.
    fn lookup(&self, hash: &Hash) -> Result<Option<Cell>>;

    /// Get the target of a reference, fetching it from this store if it is
    /// not resident.
    fn resolve(&self, r: &Ref) -> Result<Cell>;

    /// Check that every cell reachable from `cell` is available.
    ///
    /// Returns the number of cells visited.
    fn check_complete(&self, cell: &Cell) -> Result<usize>;
}

impl<S: Store + ?Sized> StoreExt for S {
    fn store_top_ref(
        &self,
        r: &Ref,
        target: RefStatus,
        mut novelty: Option<Novelty<'_>>,
    ) -> Result<Ref> {
        tracing::debug!(hash = %r.hash(), ?target, "storing cell graph");
        store_ref(self, r, target, &mut novelty, true)?;
        Ok(r.clone())
    }

    fn store_cell(&self, cell: &Cell) -> Result<Ref> {
        self.store_top_ref(&cell.to_ref(), RefStatus::Stored, None)
    }

    fn persist(&self, cell: &Cell) -> Result<Ref> {
        self.store_top_ref(&cell.to_ref(), RefStatus::Persisted, None)
    }

    fn announce(&self, cell: &Cell, novelty: Option<Novelty<'_>>) -> Result<Ref> {
        self.store_top_ref(&cell.to_ref(), RefStatus::Announced, novelty)
    }

    fn lookup(&self, hash: &Hash) -> Result<Option<Cell>> {
        let cell = match self.get(hash)? {
            Some(cell) => cell,
            None => return Ok(None),
        };
        let actual = cell.hash();
        if actual != *hash {
            tracing::warn!(%hash, %actual, "stored cell does not match its key");
            return Err(StoreError::Corrupt {
                hash: *hash,
                reason: format!("content hashes to {}", actual),
            });
        }
        Ok(Some(cell))
    }

    fn resolve(&self, r: &Ref) -> Result<Cell> {
        if let Some(cell) = r.resident() {
            return Ok(cell.clone());
        }
        let fetched = self.get(&r.hash())?;
        Ok(r.resolve(|_| Ok(fetched))?)
    }

    fn check_complete(&self, cell: &Cell) -> Result<usize> {
        let mut visited = 1;
        for child in cell.child_refs() {
            let child = self.resolve(child)?;
            visited += self.check_complete(&child)?;
        }
        Ok(visited)
    }
}

fn store_ref<S: Store + ?Sized>(
    store: &S,
    r: &Ref,
    target: RefStatus,
    novelty: &mut Option<Novelty<'_>>,
    top: bool,
) -> Result<()> {
    if r.status() >= target {
        return Ok(());
    }

    let hash = r.hash();
    let cell = match r.resident() {
        Some(cell) => cell.clone(),
        None => {
            // A soft ref is only durable here if the store already has it.
            if let Some(status) = store.status(&hash)? {
                if status >= target {
                    r.advance(status);
                    return Ok(());
                }
            }
            store.resolve(r)?
        }
    };

    let stored_alone = top || !cell.is_embedded();
    if stored_alone {
        if let Some(status) = store.status(&hash)? {
            if status >= target {
                r.advance(status);
                return Ok(());
            }
        }
    }

    for child in cell.child_refs() {
        store_ref(store, child, target, novelty, false)?;
    }

    if stored_alone {
        let previous = store.put(&cell, target)?;
        tracing::trace!(%hash, ?previous, ?target, "stored cell");
        if previous.map_or(true, |p| p < target) {
            if let Some(f) = novelty.as_mut() {
                f(r);
            }
        }
    }

    r.advance(target);
    Ok(())
}
