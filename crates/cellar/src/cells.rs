//! Null-safe helpers over optional cells, and persistence through the current
//! store context.

use cellar_core::{Cell, Hash, Ref};
use cellar_store::{Novelty, StoreExt};

use crate::context;
use crate::error::Result;

/// Compare two optional cells. Absent equals only absent.
pub fn equals(a: Option<&Cell>, b: Option<&Cell>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the hash of an optional cell. An absent cell hashes as the absence
/// token.
pub fn hash_of(cell: Option<&Cell>) -> Hash {
    cell.map_or_else(Hash::null, Cell::hash)
}

/// Number of child references of an optional cell.
pub fn ref_count(cell: Option<&Cell>) -> usize {
    cell.map_or(0, Cell::ref_count)
}

/// Get a child reference by index.
pub fn child_ref(cell: &Cell, index: usize) -> Result<Ref> {
    Ok(cell.child_ref(index)?)
}

/// Persist a cell to the current store.
pub fn persist(cell: &Cell) -> Result<Ref> {
    Ok(context::current().persist(cell)?)
}

/// Announce a cell to the current store.
pub fn announce(cell: &Cell, novelty: Option<Novelty<'_>>) -> Result<Ref> {
    Ok(context::current().announce(cell, novelty)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::RefStatus;
    use cellar_store::{MemoryStore, Store};
    use std::sync::Arc;

    #[test]
    fn test_equals_handles_absence() {
        let a = Cell::integer(1);
        assert!(equals(None, None));
        assert!(!equals(Some(&a), None));
        assert!(!equals(None, Some(&a)));
        assert!(equals(Some(&a), Some(&Cell::integer(1))));
        assert!(!equals(Some(&a), Some(&Cell::integer(2))));
    }

    #[test]
    fn test_hash_of_absent() {
        assert_eq!(hash_of(None), Hash::null());
        assert_eq!(hash_of(None), Hash::compute(&[0x00]));
        let a = Cell::string("a");
        assert_eq!(hash_of(Some(&a)), a.hash());
    }

    #[test]
    fn test_ref_count_and_child_ref() {
        let v = Cell::vector([Cell::integer(1), Cell::integer(2), Cell::integer(3)]);
        assert_eq!(ref_count(None), 0);
        assert_eq!(ref_count(Some(&v)), 3);
        assert_eq!(child_ref(&v, 2).unwrap().value().unwrap(), Cell::integer(3));
        assert!(child_ref(&v, 3).is_err());
    }

    #[test]
    fn test_persist_uses_context_store() {
        let store = Arc::new(MemoryStore::new());
        let cell = Cell::vector([Cell::string("q".repeat(200))]);

        let r = context::with_store(store.clone(), || persist(&cell)).unwrap();
        assert_eq!(r.status(), RefStatus::Persisted);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_announce_reports_novelty() {
        let store = Arc::new(MemoryStore::new());
        let cell = Cell::string("announce me");

        let mut seen = Vec::new();
        let mut record = |r: &Ref| seen.push(r.hash());
        context::with_store(store.clone(), || announce(&cell, Some(&mut record))).unwrap();

        assert_eq!(seen, vec![cell.hash()]);
        assert_eq!(store.status(&cell.hash()).unwrap(), Some(RefStatus::Announced));
    }
}
