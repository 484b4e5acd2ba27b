//! References: lazily-resolvable links from a parent cell to a child.
//!
//! A reference is either *direct* (the child cell is held in memory) or *soft*
//! (only the child's hash is known). A soft reference can be resolved through a
//! fetch callback, usually a store lookup, and keeps the fetched cell unless it
//! is small enough to be embedded.
//!
//! A reference is written inline when its target is resident and embeddable,
//! and as a hash otherwise. Equality follows that written form.
//!
//! Every reference also carries a [`RefStatus`] that only ever advances. Store
//! walks use it to skip subgraphs that are already durable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use crate::cell::Cell;
use crate::error::{CellError, Result};
use crate::hash::Hash;

/// Durability status of a reference, ordered from least to most durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RefStatus {
    /// Nothing known beyond the link itself.
    Unknown = 0,
    /// The target's hash has been checked against its content.
    Verified = 1,
    /// Present in a local store.
    Stored = 2,
    /// Durably written.
    Persisted = 3,
    /// Shared externally.
    Announced = 4,
}

impl RefStatus {
    /// Convert to u8 for storage.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Verified),
            2 => Some(Self::Stored),
            3 => Some(Self::Persisted),
            4 => Some(Self::Announced),
            _ => None,
        }
    }
}

/// A shared, status-tracked link to a cell.
///
/// Cloning a `Ref` shares the link: status advances are seen by every clone.
#[derive(Clone)]
pub struct Ref(Arc<RefInner>);

struct RefInner {
    target: Target,
    status: AtomicU8,
}

enum Target {
    Direct(Cell),
    Soft { hash: Hash, value: OnceLock<Cell> },
}

impl Ref {
    /// Create a direct reference to a resident cell.
    pub fn direct(cell: Cell) -> Self {
        Self::with_target(Target::Direct(cell))
    }

    /// Create a soft reference known only by hash.
    ///
    /// The encoder always writes a soft reference as a hash, so soft
    /// references should only be created for non-embedded cells.
    pub fn soft(hash: Hash) -> Self {
        Self::with_target(Target::Soft {
            hash,
            value: OnceLock::new(),
        })
    }

    fn with_target(target: Target) -> Self {
        Self(Arc::new(RefInner {
            target,
            status: AtomicU8::new(RefStatus::Unknown.to_u8()),
        }))
    }

    /// Get the hash of the target cell.
    pub fn hash(&self) -> Hash {
        match &self.0.target {
            Target::Direct(cell) => cell.hash(),
            Target::Soft { hash, .. } => *hash,
        }
    }

    /// The target's hash, if already known without encoding anything.
    pub fn cached_hash(&self) -> Option<Hash> {
        match &self.0.target {
            Target::Direct(cell) => cell.cached_hash(),
            Target::Soft { hash, .. } => Some(*hash),
        }
    }

    /// Get the target cell if it is held in memory.
    pub fn resident(&self) -> Option<&Cell> {
        match &self.0.target {
            Target::Direct(cell) => Some(cell),
            Target::Soft { value, .. } => value.get(),
        }
    }

    pub fn is_resident(&self) -> bool {
        self.resident().is_some()
    }

    /// True if this reference was created from a resident cell.
    pub fn is_direct(&self) -> bool {
        matches!(self.0.target, Target::Direct(_))
    }

    /// The target, if it is written inline in a parent's encoding.
    pub fn embedded(&self) -> Option<&Cell> {
        self.resident().filter(|cell| cell.is_embedded())
    }

    /// Get the target cell.
    ///
    /// Fails with `MissingData` if the cell is not held in memory: the value
    /// exists somewhere, but not here.
    pub fn value(&self) -> Result<Cell> {
        self.resident()
            .cloned()
            .ok_or_else(|| CellError::MissingData(self.hash()))
    }

    /// Get the target cell, fetching it by hash if it is not resident.
    ///
    /// A fetched cell must hash to this reference's hash. On success the status
    /// advances to at least `Verified`, and the cell is kept if it is too large
    /// to embed.
    pub fn resolve<F>(&self, fetch: F) -> Result<Cell>
    where
        F: FnOnce(&Hash) -> Result<Option<Cell>>,
    {
        if let Some(cell) = self.resident() {
            return Ok(cell.clone());
        }

        let hash = self.hash();
        let cell = fetch(&hash)?.ok_or(CellError::MissingData(hash))?;
        if cell.hash() != hash {
            return Err(CellError::InvalidData(format!(
                "fetched cell hashes to {}, expected {}",
                cell.hash(),
                hash
            )));
        }

        if let Target::Soft { value, .. } = &self.0.target {
            // An embeddable target stays unresolved so the ref keeps its
            // by-hash form. A concurrent resolve may have won the set.
            if !cell.is_embedded() {
                let _ = value.set(cell.clone());
            }
        }
        self.advance(RefStatus::Verified);
        Ok(cell)
    }

    /// Get the current status.
    pub fn status(&self) -> RefStatus {
        RefStatus::from_u8(self.0.status.load(Ordering::Acquire)).unwrap_or(RefStatus::Unknown)
    }

    /// Advance the status to at least `status`. Never moves backward.
    pub fn advance(&self, status: RefStatus) {
        self.0.status.fetch_max(status.to_u8(), Ordering::AcqRel);
    }

    /// Check if two references share the same link.
    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Cell> for Ref {
    fn from(cell: Cell) -> Self {
        Ref::direct(cell)
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.embedded(), other.embedded()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.hash() == other.hash(),
            _ => false,
        }
    }
}

impl Eq for Ref {}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resident() {
            Some(cell) => write!(f, "Ref({:?}, {:?})", cell, self.status()),
            None => write!(f, "Ref(soft {}, {:?})", self.hash(), self.status()),
        }
    }
}
