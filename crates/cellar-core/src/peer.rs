//! Peer stake-accounting record.
//!
//! A [`PeerStatus`] tracks a peer's pooled balance and how it is owned. The
//! peer and its delegators hold *shares*; the value of a holding is its
//! proportion of the balance, so rewards added to the balance accrue to every
//! holder pro rata. Payouts truncate, so rounding always favours the pool.
//!
//! Records are immutable. Every `with_*` operation validates its arguments,
//! builds a new record and checks the invariants before returning it.

use crate::address::Address;
use crate::cell::{self, Cell, Value};
use crate::error::{CellError, Result};
use crate::format::{self, Reader};
use crate::reference::Ref;
use crate::tag::{self, MAX_EMBEDDED_LENGTH};

/// Timestamp of a peer that has not yet taken part in consensus.
pub const INITIAL_PEER_TIMESTAMP: i64 = -1;

/// Compute `a * b / c` in i128, truncating. `None` if `c` is zero or the
/// quotient does not fit in an i64.
pub(crate) fn mul_div(a: i64, b: i64, c: i64) -> Option<i64> {
    let quotient = (a as i128 * b as i128).checked_div(c as i128)?;
    i64::try_from(quotient).ok()
}

/// Stake record for a single peer.
#[derive(Debug, Clone)]
pub struct PeerStatus {
    controller: Address,
    /// Shares owned by the peer itself.
    peer_stake: i64,
    /// Map of delegator address to shares. Absent when nobody has delegated.
    stakes: Option<Ref>,
    /// Sum of all delegated shares.
    delegated_stake: i64,
    metadata: Option<Ref>,
    timestamp: i64,
    /// Pooled balance owned jointly by the peer and its delegators.
    balance: i64,
}

impl PeerStatus {
    /// Create a record for a new peer with its own initial stake.
    pub fn create(controller: Address, stake: i64) -> Result<Self> {
        if stake < 0 {
            return Err(CellError::invalid_argument("negative peer stake"));
        }
        Ok(Self {
            controller,
            peer_stake: stake,
            stakes: None,
            delegated_stake: 0,
            metadata: None,
            timestamp: INITIAL_PEER_TIMESTAMP,
            balance: stake,
        })
    }

    fn checked(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn controller(&self) -> Address {
        self.controller
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Total shares: the peer's own plus all delegated shares.
    pub fn total_stake(&self) -> i64 {
        self.peer_stake.saturating_add(self.delegated_stake)
    }

    /// Shares owned by the peer itself.
    pub fn peer_stake_shares(&self) -> i64 {
        self.peer_stake
    }

    /// Sum of all delegated shares.
    pub fn delegated_stake_shares(&self) -> i64 {
        self.delegated_stake
    }

    /// Value of all delegated holdings, as a portion of the balance.
    pub fn delegated_stake(&self) -> i64 {
        let total = self.total_stake();
        if total <= 0 {
            return 0;
        }
        // delegated_stake <= total, so the quotient never exceeds the balance
        mul_div(self.balance, self.delegated_stake, total).unwrap_or(self.balance)
    }

    /// Value of the peer's own holding: whatever delegators do not own.
    pub fn peer_stake(&self) -> i64 {
        self.balance - self.delegated_stake()
    }

    /// Shares held by a single delegator, or 0 if none.
    pub fn shares_of(&self, delegator: Address) -> Result<i64> {
        let stakes = match self.stakes_cell()? {
            Some(stakes) => stakes,
            None => return Ok(0),
        };
        match stakes.map_get(&Cell::address(delegator))? {
            Some(shares) => shares.as_integer().ok_or_else(|| {
                CellError::invalid_data(format!("stake for {} is not an integer", delegator))
            }),
            None => Ok(0),
        }
    }

    /// Value of a single delegator's holding.
    pub fn delegated_stake_of(&self, delegator: Address) -> Result<i64> {
        if self.delegated_stake <= 0 {
            return Ok(0);
        }
        let shares = self.shares_of(delegator)?;
        mul_div(self.delegated_stake(), shares, self.delegated_stake).ok_or_else(|| {
            CellError::invalid_data(format!("shares of {} exceed delegated stake", delegator))
        })
    }

    pub fn stakes(&self) -> Option<&Ref> {
        self.stakes.as_ref()
    }

    /// The delegator map, if any. Fails if it is not resident.
    pub fn stakes_cell(&self) -> Result<Option<Cell>> {
        self.stakes.as_ref().map(Ref::value).transpose()
    }

    pub fn metadata(&self) -> Option<&Ref> {
        self.metadata.as_ref()
    }

    /// The metadata map, if any. Fails if it is not resident.
    pub fn metadata_cell(&self) -> Result<Option<Cell>> {
        self.metadata.as_ref().map(Ref::value).transpose()
    }

    /// The `:url` entry of the metadata, if it is a string.
    pub fn hostname(&self) -> Result<Option<String>> {
        let metadata = match self.metadata_cell()? {
            Some(metadata) => metadata,
            None => return Ok(None),
        };
        let url = metadata.map_get(&Cell::keyword("url")?)?;
        Ok(url.and_then(|c| c.as_str().map(str::to_string)))
    }

    /// Look up a record field by keyword name.
    pub fn get(&self, field: &str) -> Result<Option<Cell>> {
        Ok(match field {
            "controller" => Some(Cell::address(self.controller)),
            "stake" => Some(Cell::integer(self.peer_stake)),
            "stakes" => self.stakes_cell()?,
            "delegated-stake" => Some(Cell::integer(self.delegated_stake)),
            "metadata" => self.metadata_cell()?,
            "timestamp" => Some(Cell::integer(self.timestamp)),
            "balance" => Some(Cell::integer(self.balance)),
            _ => None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Updates
    // ─────────────────────────────────────────────────────────────────────────

    /// Set a delegator's shares. Zero removes the delegator.
    ///
    /// The change in shares is applied to both the aggregate and the balance.
    pub fn with_delegated_stake(&self, delegator: Address, shares: i64) -> Result<Self> {
        if shares < 0 {
            return Err(CellError::invalid_argument("negative delegated stake"));
        }
        let old = self.shares_of(delegator)?;
        if old == shares {
            return Ok(self.clone());
        }

        let overflow = || CellError::invalid_argument("delegated stake overflow");
        let change = shares.checked_sub(old).ok_or_else(overflow)?;
        let delegated_stake = self.delegated_stake.checked_add(change).ok_or_else(overflow)?;
        let balance = self.balance.checked_add(change).ok_or_else(overflow)?;

        let key = Cell::address(delegator);
        let map = self.stakes_cell()?.unwrap_or_else(Cell::empty_map);
        let map = if shares == 0 {
            map.map_dissoc(&key)?
        } else {
            map.map_assoc(key, Cell::integer(shares))?
        };
        let stakes = if map.map_len()? == 0 { None } else { Some(map.to_ref()) };

        Self {
            stakes,
            delegated_stake,
            balance,
            ..self.clone()
        }
        .checked()
    }

    /// Set the peer's own shares. The change in shares is applied to the
    /// balance.
    pub fn with_peer_stake(&self, shares: i64) -> Result<Self> {
        if shares < 0 {
            return Err(CellError::invalid_argument("negative peer stake"));
        }
        if shares == self.peer_stake {
            return Ok(self.clone());
        }
        let change = shares - self.peer_stake;
        let balance = self
            .balance
            .checked_add(change)
            .ok_or_else(|| CellError::invalid_argument("peer stake overflow"))?;

        Self {
            peer_stake: shares,
            balance,
            ..self.clone()
        }
        .checked()
    }

    /// Add to the pooled balance without changing any shares.
    pub fn add_reward(&self, amount: i64) -> Result<Self> {
        if amount < 0 {
            return Err(CellError::invalid_argument("negative reward"));
        }
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| CellError::invalid_argument("balance overflow"))?;

        Self {
            balance,
            ..self.clone()
        }
        .checked()
    }

    /// Replace the metadata. An empty map is stored as absent.
    pub fn with_metadata(&self, metadata: Option<Cell>) -> Result<Self> {
        let metadata = match metadata {
            None => None,
            Some(map) => {
                let len = map
                    .map_len()
                    .map_err(|_| CellError::invalid_argument("metadata must be a map"))?;
                if len == 0 {
                    None
                } else {
                    Some(map.to_ref())
                }
            }
        };
        Self {
            metadata,
            ..self.clone()
        }
        .checked()
    }

    pub fn with_timestamp(&self, timestamp: i64) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cell support
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn child_refs(&self) -> Vec<&Ref> {
        self.stakes.iter().chain(self.metadata.iter()).collect()
    }

    pub(crate) fn estimated_encoding_size(&self) -> usize {
        let child = MAX_EMBEDDED_LENGTH.max(tag::REF_LENGTH);
        1 + (1 + format::MAX_VLQ_COUNT_LENGTH)
            + 3 * format::MAX_VLQ_LONG_LENGTH
            + 2 * child
            + format::MAX_VLQ_COUNT_LENGTH
    }

    pub(crate) fn is_canonical(&self) -> bool {
        let non_empty = |r: &Option<Ref>| match r.as_ref().and_then(Ref::resident) {
            Some(c) => !matches!(c.value(), Value::Map(entries) if entries.is_empty()),
            None => true,
        };
        non_empty(&self.stakes) && non_empty(&self.metadata)
    }

    /// Check the record invariants. Child maps are only checked if resident.
    pub fn validate(&self) -> Result<()> {
        if self.balance < 0 {
            return Err(CellError::invalid_data("negative balance"));
        }
        if self.delegated_stake < 0 {
            return Err(CellError::invalid_data("negative delegated stake"));
        }
        if self.peer_stake < 0 {
            return Err(CellError::invalid_data("negative peer stake"));
        }

        match &self.stakes {
            None if self.delegated_stake != 0 => {
                return Err(CellError::invalid_data(
                    "delegated stake without any delegators",
                ));
            }
            None => {}
            Some(r) => {
                if let Some(stakes) = r.resident() {
                    self.validate_stakes(stakes)?;
                }
            }
        }

        if let Some(metadata) = self.metadata.as_ref().and_then(Ref::resident) {
            match metadata.value() {
                Value::Map(entries) if !entries.is_empty() => {}
                Value::Map(_) => return Err(CellError::invalid_data("empty metadata map")),
                _ => return Err(CellError::invalid_data("metadata is not a map")),
            }
        }
        Ok(())
    }

    fn validate_stakes(&self, stakes: &Cell) -> Result<()> {
        let entries = match stakes.value() {
            Value::Map(entries) => entries,
            _ => return Err(CellError::invalid_data("stakes is not a map")),
        };
        if entries.is_empty() {
            return Err(CellError::invalid_data("empty stakes map"));
        }

        let mut sum: i128 = 0;
        for (k, v) in entries {
            if let Some(key) = k.resident() {
                if key.as_address().is_none() {
                    return Err(CellError::invalid_data("stakes key is not an address"));
                }
            }
            // Values of a partially loaded map cannot be summed.
            let value = match v.resident() {
                Some(value) => value,
                None => return Ok(()),
            };
            match value.as_integer() {
                Some(n) if n > 0 => sum += n as i128,
                Some(_) => return Err(CellError::invalid_data("non-positive stake entry")),
                None => return Err(CellError::invalid_data("stake entry is not an integer")),
            }
        }

        if sum != self.delegated_stake as i128 {
            return Err(CellError::invalid_data(format!(
                "stakes sum to {}, delegated stake is {}",
                sum, self.delegated_stake
            )));
        }
        Ok(())
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.push(tag::PEER_STATUS);
        cell::write_address(buf, self.controller);
        format::write_vlq_long(buf, self.peer_stake);
        cell::write_optional_child(buf, self.stakes.as_ref());
        format::write_vlq_long(buf, self.delegated_stake);
        cell::write_optional_child(buf, self.metadata.as_ref());
        format::write_vlq_long(buf, self.timestamp);
        format::write_vlq_count(buf, self.balance as u64);
    }

    /// Read the record body. The tag byte has already been consumed.
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        if reader.read_byte()? != tag::ADDRESS {
            return Err(CellError::bad_format("peer controller must be an address"));
        }
        let controller = Address(reader.read_vlq_count()?);
        let peer_stake = reader.read_vlq_long()?;
        let stakes = read_non_empty_child(reader, "stakes")?;
        let delegated_stake = reader.read_vlq_long()?;
        let metadata = read_non_empty_child(reader, "metadata")?;
        let timestamp = reader.read_vlq_long()?;
        let balance = i64::try_from(reader.read_vlq_count()?)
            .map_err(|_| CellError::bad_format("peer balance out of range"))?;

        Ok(Self {
            controller,
            peer_stake,
            stakes,
            delegated_stake,
            metadata,
            timestamp,
            balance,
        })
    }
}

/// Read an optional map child. An empty map must be written as the absence
/// token instead.
fn read_non_empty_child(reader: &mut Reader<'_>, field: &str) -> Result<Option<Ref>> {
    let child = cell::read_optional_child(reader)?;
    if let Some(c) = child.as_ref().and_then(Ref::resident) {
        if matches!(c.value(), Value::Map(entries) if entries.is_empty()) {
            return Err(CellError::bad_format(format!(
                "empty {} map must be encoded as absent",
                field
            )));
        }
    }
    Ok(child)
}

impl PartialEq for PeerStatus {
    fn eq(&self, other: &Self) -> bool {
        self.controller == other.controller
            && self.peer_stake == other.peer_stake
            && self.delegated_stake == other.delegated_stake
            && self.balance == other.balance
            && self.timestamp == other.timestamp
            && self.stakes == other.stakes
            && self.metadata == other.metadata
    }
}

impl Eq for PeerStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    const C: Address = Address::new(11);
    const D1: Address = Address::new(21);
    const D2: Address = Address::new(22);

    fn url_metadata(url: &str) -> Cell {
        Cell::map([(Cell::keyword("url").unwrap(), Cell::string(url))])
    }

    #[test]
    fn test_create() {
        let ps = PeerStatus::create(C, 100).unwrap();
        assert_eq!(ps.controller(), C);
        assert_eq!(ps.balance(), 100);
        assert_eq!(ps.total_stake(), 100);
        assert_eq!(ps.peer_stake(), 100);
        assert_eq!(ps.delegated_stake(), 0);
        assert_eq!(ps.timestamp(), INITIAL_PEER_TIMESTAMP);
        assert!(ps.stakes().is_none());

        assert!(PeerStatus::create(C, -1).is_err());
    }

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(10, 1, 3), Some(3));
        assert_eq!(mul_div(i64::MAX, i64::MAX, i64::MAX), Some(i64::MAX));
        assert_eq!(mul_div(0, 5, 7), Some(0));
    }

    #[test]
    fn test_mul_div_rejects_zero_divisor_and_overflow() {
        assert_eq!(mul_div(1, 1, 0), None);
        assert_eq!(mul_div(i64::MAX, 2, 1), None);
        assert_eq!(mul_div(i64::MIN, -1, 1), None);
        assert_eq!(mul_div(i64::MAX, 2, 2), Some(i64::MAX));
    }

    #[test]
    fn test_delegated_stake_at_extremes() {
        let ps = PeerStatus::create(C, 0)
            .unwrap()
            .with_delegated_stake(D1, i64::MAX)
            .unwrap();
        assert_eq!(ps.delegated_stake(), i64::MAX);
        assert_eq!(ps.peer_stake(), 0);
        assert_eq!(ps.delegated_stake_of(D1).unwrap(), i64::MAX);
    }

    #[test]
    fn test_delegate_adds_to_pool() {
        let ps = PeerStatus::create(C, 100)
            .unwrap()
            .with_delegated_stake(D1, 25)
            .unwrap();
        assert_eq!(ps.balance(), 125);
        assert_eq!(ps.total_stake(), 125);
        assert_eq!(ps.delegated_stake(), 25);
        assert_eq!(ps.delegated_stake_of(D1).unwrap(), 25);
        assert_eq!(ps.peer_stake(), 100);
        assert_eq!(ps.shares_of(D2).unwrap(), 0);
    }

    #[test]
    fn test_removing_last_delegator_matches_fresh_record() {
        let base = PeerStatus::create(C, 100).unwrap();
        let back = base
            .with_delegated_stake(D1, 25)
            .unwrap()
            .with_delegated_stake(D1, 0)
            .unwrap();

        assert!(back.stakes().is_none());
        let a = Cell::from(back);
        let b = Cell::from(base);
        assert_eq!(a.encoding(), b.encoding());
    }

    #[test]
    fn test_proportional_shares() {
        let ps = PeerStatus::create(C, 70)
            .unwrap()
            .with_delegated_stake(D1, 30)
            .unwrap();
        assert_eq!(ps.balance(), 100);
        assert_eq!(ps.delegated_stake_of(D1).unwrap(), 30);

        let ps = ps.add_reward(50).unwrap();
        assert_eq!(ps.balance(), 150);
        assert_eq!(ps.delegated_stake_of(D1).unwrap(), 45);
        assert_eq!(ps.peer_stake(), 105);
    }

    #[test]
    fn test_payouts_favour_pool() {
        let ps = PeerStatus::create(C, 1)
            .unwrap()
            .with_delegated_stake(D1, 1)
            .unwrap()
            .with_delegated_stake(D2, 1)
            .unwrap()
            .add_reward(1)
            .unwrap();
        // balance 4 over 3 shares
        let paid = ps.delegated_stake_of(D1).unwrap() + ps.delegated_stake_of(D2).unwrap();
        assert!(paid <= ps.delegated_stake());
        assert_eq!(ps.peer_stake() + ps.delegated_stake(), ps.balance());
    }

    #[test]
    fn test_negative_arguments_rejected() {
        let ps = PeerStatus::create(C, 10).unwrap();
        assert!(matches!(
            ps.with_delegated_stake(D1, -1),
            Err(CellError::InvalidArgument(_))
        ));
        assert!(matches!(ps.with_peer_stake(-1), Err(CellError::InvalidArgument(_))));
        assert!(matches!(ps.add_reward(-5), Err(CellError::InvalidArgument(_))));
        assert_eq!(ps.balance(), 10);
    }

    #[test]
    fn test_overflow_rejected() {
        let ps = PeerStatus::create(C, i64::MAX).unwrap();
        assert!(matches!(ps.add_reward(1), Err(CellError::InvalidArgument(_))));
        assert!(matches!(
            ps.with_delegated_stake(D1, 1),
            Err(CellError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_with_peer_stake() {
        let ps = PeerStatus::create(C, 100).unwrap().with_peer_stake(75).unwrap();
        assert_eq!(ps.balance(), 75);
        assert_eq!(ps.peer_stake_shares(), 75);
    }

    #[test]
    fn test_metadata_and_hostname() {
        let ps = PeerStatus::create(C, 1).unwrap();
        assert_eq!(ps.hostname().unwrap(), None);

        let ps = ps.with_metadata(Some(url_metadata("peer.example:18888"))).unwrap();
        assert_eq!(ps.hostname().unwrap().as_deref(), Some("peer.example:18888"));

        let cleared = ps.with_metadata(Some(Cell::empty_map())).unwrap();
        assert!(cleared.metadata().is_none());

        assert!(ps.with_metadata(Some(Cell::integer(3))).is_err());
    }

    #[test]
    fn test_get_fields() {
        let ps = PeerStatus::create(C, 5)
            .unwrap()
            .with_delegated_stake(D1, 2)
            .unwrap()
            .with_timestamp(1000);
        assert_eq!(ps.get("controller").unwrap(), Some(Cell::address(C)));
        assert_eq!(ps.get("stake").unwrap(), Some(Cell::integer(5)));
        assert_eq!(ps.get("delegated-stake").unwrap(), Some(Cell::integer(2)));
        assert_eq!(ps.get("timestamp").unwrap(), Some(Cell::integer(1000)));
        assert_eq!(ps.get("balance").unwrap(), Some(Cell::integer(7)));
        assert_eq!(ps.get("metadata").unwrap(), None);
        assert_eq!(ps.get("nope").unwrap(), None);

        let stakes = ps.get("stakes").unwrap().unwrap();
        assert_eq!(stakes.map_get(&Cell::address(D1)).unwrap(), Some(Cell::integer(2)));
    }

    #[test]
    fn test_roundtrip() {
        let ps = PeerStatus::create(C, 100)
            .unwrap()
            .with_delegated_stake(D1, 25)
            .unwrap()
            .with_delegated_stake(D2, 5)
            .unwrap()
            .with_metadata(Some(url_metadata("host:1")))
            .unwrap()
            .with_timestamp(12345)
            .add_reward(7)
            .unwrap();
        let cell = Cell::from(ps.clone());
        let decoded = Cell::decode(cell.encoding()).unwrap();
        assert_eq!(decoded.as_peer_status(), Some(&ps));
        assert_eq!(decoded.hash(), cell.hash());
        assert_eq!(decoded.ref_count(), 2);
    }

    #[test]
    fn test_fresh_record_encoding() {
        let ps = PeerStatus::create(Address(1), 100).unwrap();
        let cell = Cell::from(ps);
        assert_eq!(
            cell.encoding().as_ref(),
            &[0xd1, 0xea, 0x01, 0x80, 0x64, 0x00, 0x00, 0x00, 0x7f, 0x64]
        );
    }

    #[test]
    fn test_decode_rejects_empty_stakes_map() {
        // Same record as above, with an empty map in the stakes position
        let bytes = [0xd1, 0xea, 0x01, 0x80, 0x64, 0x82, 0x00, 0x00, 0x00, 0x7f, 0x64];
        assert!(matches!(Cell::decode(&bytes), Err(CellError::BadFormat(_))));
    }

    #[test]
    fn test_decode_rejects_broken_invariants() {
        // Negative peer stake (-1)
        let bytes = [0xd1, 0xea, 0x01, 0x7f, 0x00, 0x00, 0x00, 0x7f, 0x00];
        assert!(matches!(Cell::decode(&bytes), Err(CellError::InvalidData(_))));

        // Delegated stake 5 with no delegators
        let bytes = [0xd1, 0xea, 0x01, 0x00, 0x00, 0x05, 0x00, 0x7f, 0x05];
        assert!(matches!(Cell::decode(&bytes), Err(CellError::InvalidData(_))));
    }

    #[test]
    fn test_equality_includes_timestamp() {
        let a = PeerStatus::create(C, 1).unwrap();
        let b = a.with_timestamp(5);
        assert_ne!(a, b);
        assert_eq!(a, PeerStatus::create(C, 1).unwrap());
    }
}
