//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use cellar::{Cellar, CellarConfig};
use cellar_core::{Address, Cell, PeerStatus, Result};
use cellar_store::MemoryStore;

/// A test fixture with a shared memory store and a set of accounts.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub controller: Address,
    pub delegators: Vec<Address>,
}

impl TestFixture {
    /// Create a fixture with controller `#1` and no delegators.
    pub fn new() -> Self {
        Self::with_delegators(0)
    }

    /// Create a fixture with `count` delegators, `#100` upwards.
    pub fn with_delegators(count: usize) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            controller: Address(1),
            delegators: delegators(count),
        }
    }

    /// A handle over this fixture's store.
    pub fn cellar(&self) -> Cellar {
        Cellar::with_shared_store(self.store.clone(), CellarConfig::default())
    }

    /// A fresh peer record for the controller.
    pub fn peer(&self, stake: i64) -> Result<PeerStatus> {
        PeerStatus::create(self.controller, stake)
    }

    /// A peer record where every delegator holds `shares`.
    pub fn delegated_peer(&self, stake: i64, shares: i64) -> Result<PeerStatus> {
        self.delegators
            .iter()
            .try_fold(self.peer(stake)?, |ps, d| ps.with_delegated_stake(*d, shares))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate `count` distinct delegator addresses.
pub fn delegators(count: usize) -> Vec<Address> {
    (0..count as u64).map(|i| Address(100 + i)).collect()
}

/// A string cell too large to be embedded in a parent.
pub fn large_cell(seed: char) -> Cell {
    Cell::string(seed.to_string().repeat(300))
}

/// A chain of vectors, each holding a large leaf, an embedded blob and the
/// next level down.
///
/// Every level and every leaf is stored on its own when persisted, so the
/// graph has `2 * depth + 1` stored cells.
pub fn nested_graph(depth: usize) -> Cell {
    let mut cell = large_cell('0');
    for level in 0..depth {
        let leaf = Cell::string(format!("{}{}", level, "n".repeat(300)));
        let padding = Cell::blob(vec![level as u8; 100]);
        cell = Cell::vector([leaf, padding, cell]);
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_store::Store;

    #[test]
    fn test_delegated_peer() {
        let fixture = TestFixture::with_delegators(3);
        let ps = fixture.delegated_peer(100, 10).unwrap();
        assert_eq!(ps.delegated_stake_shares(), 30);
        assert_eq!(ps.balance(), 130);
    }

    #[test]
    fn test_nested_graph_store_count() {
        let fixture = TestFixture::new();
        let graph = nested_graph(3);
        fixture.cellar().persist(&graph).unwrap();
        assert!(!graph.is_embedded());
        assert_eq!(fixture.store.count().unwrap(), 2 * 3 + 1);
    }
}
