//! Proptest generators for cells and peer stake records.

use proptest::prelude::*;

use cellar_core::{Address, Cell, Hash, PeerStatus, Result};

/// Generate a random hash.
pub fn hash() -> impl Strategy<Value = Hash> {
    any::<[u8; 32]>().prop_map(Hash::from_bytes)
}

/// Generate an account address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<u64>().prop_map(Address)
}

/// Generate a valid keyword cell.
pub fn keyword() -> impl Strategy<Value = Cell> {
    "[a-z][a-z0-9-]{0,20}".prop_filter_map("valid keyword", |s| Cell::keyword(&s).ok())
}

/// Generate a cell with no children. Strings and blobs are sometimes large
/// enough to be written by hash when used as a child.
pub fn leaf_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        any::<i64>().prop_map(Cell::integer),
        address().prop_map(Cell::address),
        ".{0,40}".prop_map(Cell::string),
        "[a-z]{100,300}".prop_map(Cell::string),
        prop::collection::vec(any::<u8>(), 0..300).prop_map(Cell::blob),
        keyword(),
    ]
}

/// Generate an arbitrary cell tree of vectors and maps over leaf cells.
pub fn cell() -> impl Strategy<Value = Cell> {
    leaf_cell().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Cell::vector),
            prop::collection::vec((inner.clone(), inner), 0..4).prop_map(Cell::map),
        ]
    })
}

/// A single update to a peer stake record.
#[derive(Debug, Clone)]
pub enum PeerOp {
    Delegate { delegator: u64, shares: i64 },
    PeerStake(i64),
    Reward(i64),
    Timestamp(i64),
    Hostname(Option<String>),
}

impl PeerOp {
    /// Apply the update, returning the new record.
    pub fn apply(&self, ps: &PeerStatus) -> Result<PeerStatus> {
        match self {
            PeerOp::Delegate { delegator, shares } => {
                ps.with_delegated_stake(Address(*delegator), *shares)
            }
            PeerOp::PeerStake(shares) => ps.with_peer_stake(*shares),
            PeerOp::Reward(amount) => ps.add_reward(*amount),
            PeerOp::Timestamp(ts) => Ok(ps.with_timestamp(*ts)),
            PeerOp::Hostname(None) => ps.with_metadata(None),
            PeerOp::Hostname(Some(url)) => ps.with_metadata(Some(Cell::map([(
                Cell::keyword("url")?,
                Cell::string(url.as_str()),
            )]))),
        }
    }
}

/// Delegator addresses used by generated operations.
pub const DELEGATORS: std::ops::Range<u64> = 100..106;

/// Generate a peer update within ranges that never overflow.
pub fn peer_op() -> impl Strategy<Value = PeerOp> {
    prop_oneof![
        4 => (DELEGATORS, 0i64..1_000_000)
            .prop_map(|(delegator, shares)| PeerOp::Delegate { delegator, shares }),
        2 => (0i64..1_000_000).prop_map(PeerOp::PeerStake),
        2 => (0i64..1_000_000).prop_map(PeerOp::Reward),
        1 => any::<i64>().prop_map(PeerOp::Timestamp),
        1 => proptest::option::of("[a-z]{1,20}:[0-9]{2,5}").prop_map(PeerOp::Hostname),
    ]
}

/// Generate a sequence of peer updates.
pub fn peer_ops(max_len: usize) -> impl Strategy<Value = Vec<PeerOp>> {
    prop::collection::vec(peer_op(), 0..max_len)
}

/// Generate a peer stake record reached through a random update sequence.
pub fn peer_status() -> impl Strategy<Value = PeerStatus> {
    (1u64..100, 0i64..1_000_000, peer_ops(12)).prop_filter_map(
        "updates apply",
        |(controller, stake, ops)| {
            let mut ps = PeerStatus::create(Address(controller), stake).ok()?;
            for op in &ops {
                ps = op.apply(&ps).ok()?;
            }
            Some(ps)
        },
    )
}
