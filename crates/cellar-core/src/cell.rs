//! Cells: the immutable, content-addressed unit of value.
//!
//! A cell is one of a closed set of variants selected by tag byte. Each cell
//! memoizes its canonical encoding and its hash on first use; both are
//! write-once and safe to compute concurrently.
//!
//! Children are held through [`Ref`]s. When a parent is encoded, a child whose
//! own encoding is at most [`MAX_EMBEDDED_LENGTH`] bytes is embedded inline;
//! any other child is written as its hash.

use bytes::Bytes;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::address::Address;
use crate::error::{CellError, Result};
use crate::format::{self, Reader};
use crate::hash::Hash;
use crate::peer::PeerStatus;
use crate::reference::Ref;
use crate::tag::{self, MAX_EMBEDDED_LENGTH, MAX_KEYWORD_LENGTH, REF_LENGTH};

/// The logical value held by a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Address(Address),
    String(String),
    Blob(Bytes),
    Keyword(String),
    Vector(Vec<Ref>),
    /// Entries in strictly ascending order of key hash.
    Map(Vec<(Ref, Ref)>),
    PeerStatus(PeerStatus),
}

/// An immutable cell. Cloning shares the underlying value.
#[derive(Clone)]
pub struct Cell(Arc<CellInner>);

struct CellInner {
    value: Value,
    hash: OnceLock<Hash>,
    encoding: OnceLock<Bytes>,
}

impl Cell {
    fn new(value: Value) -> Self {
        Self(Arc::new(CellInner {
            value,
            hash: OnceLock::new(),
            encoding: OnceLock::new(),
        }))
    }

    fn with_encoding(value: Value, encoding: Bytes) -> Self {
        let cell = Self::new(value);
        let _ = cell.0.encoding.set(encoding);
        cell
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn integer(n: i64) -> Self {
        Self::new(Value::Integer(n))
    }

    pub fn address(a: impl Into<Address>) -> Self {
        Self::new(Value::Address(a.into()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(Value::String(s.into()))
    }

    pub fn blob(b: impl Into<Bytes>) -> Self {
        Self::new(Value::Blob(b.into()))
    }

    /// Create a keyword. Names must be 1 to 64 bytes.
    pub fn keyword(name: &str) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_KEYWORD_LENGTH {
            return Err(CellError::invalid_argument(format!(
                "keyword length {} outside 1..={}",
                name.len(),
                MAX_KEYWORD_LENGTH
            )));
        }
        Ok(Self::new(Value::Keyword(name.to_string())))
    }

    pub fn vector(items: impl IntoIterator<Item = Cell>) -> Self {
        Self::new(Value::Vector(items.into_iter().map(Ref::direct).collect()))
    }

    /// Create a vector from existing references (which may be soft).
    pub fn vector_of_refs(refs: impl IntoIterator<Item = Ref>) -> Self {
        Self::new(Value::Vector(refs.into_iter().collect()))
    }

    /// Create a map. Entries are put in canonical order; for duplicate keys
    /// the last entry wins.
    pub fn map(entries: impl IntoIterator<Item = (Cell, Cell)>) -> Self {
        let mut sorted: Vec<(Ref, Ref)> = Vec::new();
        for (k, v) in entries {
            insert_sorted(&mut sorted, Ref::direct(k), Ref::direct(v));
        }
        Self::new(Value::Map(sorted))
    }

    pub fn empty_map() -> Self {
        Self::new(Value::Map(Vec::new()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn value(&self) -> &Value {
        &self.0.value
    }

    /// Get the tag byte for this cell's variant.
    pub fn tag(&self) -> u8 {
        match &self.0.value {
            Value::Integer(_) => tag::INTEGER,
            Value::Address(_) => tag::ADDRESS,
            Value::String(_) => tag::STRING,
            Value::Blob(_) => tag::BLOB,
            Value::Keyword(_) => tag::KEYWORD,
            Value::Vector(_) => tag::VECTOR,
            Value::Map(_) => tag::MAP,
            Value::PeerStatus(_) => tag::PEER_STATUS,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match &self.0.value {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match &self.0.value {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.0.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_peer_status(&self) -> Option<&PeerStatus> {
        match &self.0.value {
            Value::PeerStatus(ps) => Some(ps),
            _ => None,
        }
    }

    /// Get the canonical encoding, computing it on first use.
    pub fn encoding(&self) -> &Bytes {
        self.0.encoding.get_or_init(|| {
            let mut buf = Vec::with_capacity(self.estimated_encoding_size());
            self.write_value(&mut buf);
            Bytes::from(buf)
        })
    }

    /// Get the content hash, computing it on first use.
    pub fn hash(&self) -> Hash {
        *self.0.hash.get_or_init(|| Hash::compute(self.encoding()))
    }

    /// The hash, if it has already been computed.
    pub fn cached_hash(&self) -> Option<Hash> {
        self.0.hash.get().copied()
    }

    /// True if this cell is small enough to be embedded in its parent.
    pub fn is_embedded(&self) -> bool {
        self.encoding().len() <= MAX_EMBEDDED_LENGTH
    }

    /// An upper bound on the encoding size. Never less than the real size.
    pub fn estimated_encoding_size(&self) -> usize {
        if let Some(encoding) = self.0.encoding.get() {
            return encoding.len();
        }
        let child = MAX_EMBEDDED_LENGTH.max(REF_LENGTH);
        let header = 1 + format::MAX_VLQ_COUNT_LENGTH;
        match &self.0.value {
            Value::Integer(_) => 1 + format::MAX_VLQ_LONG_LENGTH,
            Value::Address(_) => header,
            Value::String(s) => header + s.len(),
            Value::Blob(b) => header + b.len(),
            Value::Keyword(k) => 2 + k.len(),
            Value::Vector(refs) => header + refs.len() * child,
            Value::Map(entries) => header + entries.len() * 2 * child,
            Value::PeerStatus(ps) => ps.estimated_encoding_size(),
        }
    }

    /// Create a direct reference to this cell.
    pub fn to_ref(&self) -> Ref {
        Ref::direct(self.clone())
    }

    /// Get the references to this cell's children, in encoding order.
    pub fn child_refs(&self) -> Vec<&Ref> {
        match &self.0.value {
            Value::Vector(refs) => refs.iter().collect(),
            Value::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            Value::PeerStatus(ps) => ps.child_refs(),
            _ => Vec::new(),
        }
    }

    /// Number of child references.
    pub fn ref_count(&self) -> usize {
        match &self.0.value {
            Value::Vector(refs) => refs.len(),
            Value::Map(entries) => entries.len() * 2,
            Value::PeerStatus(ps) => ps.child_refs().len(),
            _ => 0,
        }
    }

    /// Get a child reference by index.
    pub fn child_ref(&self, index: usize) -> Result<Ref> {
        self.child_refs().get(index).map(|r| (*r).clone()).ok_or_else(|| {
            CellError::invalid_argument(format!(
                "ref index {} out of range for {}",
                index,
                tag::name(self.tag())
            ))
        })
    }

    /// Check if two cells share the same allocation.
    pub fn ptr_eq(&self, other: &Cell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Canonical form and validation
    // ─────────────────────────────────────────────────────────────────────────

    /// True if the in-memory form is exactly the form that must be encoded.
    ///
    /// Public constructors always produce canonical cells.
    pub fn is_canonical(&self) -> bool {
        match &self.0.value {
            Value::Keyword(k) => !k.is_empty() && k.len() <= MAX_KEYWORD_LENGTH,
            Value::Map(entries) => entries
                .windows(2)
                .all(|pair| pair[0].0.hash() < pair[1].0.hash()),
            Value::PeerStatus(ps) => ps.is_canonical(),
            _ => true,
        }
    }

    /// Check this cell's own invariants. Children that are not resident are
    /// not checked.
    pub fn validate(&self) -> Result<()> {
        if !self.is_canonical() {
            return Err(CellError::invalid_data(format!(
                "{} is not in canonical form",
                tag::name(self.tag())
            )));
        }
        if let Value::PeerStatus(ps) = &self.0.value {
            ps.validate()?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Map operations
    // ─────────────────────────────────────────────────────────────────────────

    fn map_entries(&self) -> Result<&[(Ref, Ref)]> {
        match &self.0.value {
            Value::Map(entries) => Ok(entries),
            _ => Err(CellError::invalid_argument(format!(
                "expected map, got {}",
                tag::name(self.tag())
            ))),
        }
    }

    /// Number of entries in a map.
    pub fn map_len(&self) -> Result<usize> {
        Ok(self.map_entries()?.len())
    }

    /// Look up a key in a map. The value must be resident.
    pub fn map_get(&self, key: &Cell) -> Result<Option<Cell>> {
        let entries = self.map_entries()?;
        let key_hash = key.hash();
        match entries.binary_search_by(|(k, _)| k.hash().cmp(&key_hash)) {
            Ok(i) => entries[i].1.value().map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Resident key/value pairs of a map, in canonical order.
    pub fn map_iter(&self) -> Result<Vec<(Cell, Cell)>> {
        self.map_entries()?
            .iter()
            .map(|(k, v)| Ok((k.value()?, v.value()?)))
            .collect()
    }

    /// Return a new map with `key` bound to `value`.
    pub fn map_assoc(&self, key: Cell, value: Cell) -> Result<Cell> {
        let mut entries = self.map_entries()?.to_vec();
        insert_sorted(&mut entries, Ref::direct(key), Ref::direct(value));
        Ok(Self::new(Value::Map(entries)))
    }

    /// Return a new map without `key`.
    pub fn map_dissoc(&self, key: &Cell) -> Result<Cell> {
        let entries = self.map_entries()?;
        let key_hash = key.hash();
        match entries.binary_search_by(|(k, _)| k.hash().cmp(&key_hash)) {
            Ok(i) => {
                let mut remaining = entries.to_vec();
                remaining.remove(i);
                Ok(Self::new(Value::Map(remaining)))
            }
            Err(_) => Ok(self.clone()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Encoding
    // ─────────────────────────────────────────────────────────────────────────

    fn write_value(&self, buf: &mut Vec<u8>) {
        match &self.0.value {
            Value::Integer(n) => {
                buf.push(tag::INTEGER);
                format::write_vlq_long(buf, *n);
            }
            Value::Address(a) => write_address(buf, *a),
            Value::String(s) => {
                buf.push(tag::STRING);
                format::write_vlq_count(buf, s.len() as u64);
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Blob(b) => {
                buf.push(tag::BLOB);
                format::write_vlq_count(buf, b.len() as u64);
                buf.extend_from_slice(b);
            }
            Value::Keyword(k) => {
                buf.push(tag::KEYWORD);
                buf.push(k.len() as u8);
                buf.extend_from_slice(k.as_bytes());
            }
            Value::Vector(refs) => {
                buf.push(tag::VECTOR);
                format::write_vlq_count(buf, refs.len() as u64);
                for r in refs {
                    write_child(buf, r);
                }
            }
            Value::Map(entries) => {
                buf.push(tag::MAP);
                format::write_vlq_count(buf, entries.len() as u64);
                for (k, v) in entries {
                    write_child(buf, k);
                    write_child(buf, v);
                }
            }
            Value::PeerStatus(ps) => ps.write(buf),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decoding
    // ─────────────────────────────────────────────────────────────────────────

    /// Decode a cell from its canonical bytes.
    pub fn decode(bytes: &[u8]) -> Result<Cell> {
        format::decode(bytes)
    }

    /// Read one cell at the reader's position. The bytes read become the
    /// cell's memoized encoding.
    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Cell> {
        let start = reader.position();
        let tag = reader.read_byte()?;

        let value = match tag {
            tag::NULL => {
                return Err(CellError::bad_format("absence token is not a cell"));
            }
            tag::INTEGER => Value::Integer(reader.read_vlq_long()?),
            tag::ADDRESS => Value::Address(Address(reader.read_vlq_count()?)),
            tag::STRING => {
                let len = reader.read_length(1)?;
                let bytes = reader.read_slice(len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| CellError::bad_format(format!("invalid UTF-8: {}", e)))?;
                Value::String(s.to_string())
            }
            tag::BLOB => {
                let len = reader.read_length(1)?;
                Value::Blob(Bytes::copy_from_slice(reader.read_slice(len)?))
            }
            tag::KEYWORD => {
                let len = reader.read_byte()? as usize;
                if len == 0 || len > MAX_KEYWORD_LENGTH {
                    return Err(CellError::bad_format(format!("bad keyword length {}", len)));
                }
                let bytes = reader.read_slice(len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| CellError::bad_format(format!("invalid UTF-8: {}", e)))?;
                Value::Keyword(s.to_string())
            }
            tag::VECTOR => {
                let n = reader.read_length(1)?;
                let mut refs = Vec::with_capacity(n);
                for _ in 0..n {
                    refs.push(read_child(reader)?);
                }
                Value::Vector(refs)
            }
            tag::MAP => {
                let n = reader.read_length(2)?;
                let mut entries: Vec<(Ref, Ref)> = Vec::with_capacity(n);
                for _ in 0..n {
                    let k = read_child(reader)?;
                    let v = read_child(reader)?;
                    if let Some((prev, _)) = entries.last() {
                        if prev.hash() >= k.hash() {
                            return Err(CellError::bad_format(
                                "map keys duplicated or out of canonical order",
                            ));
                        }
                    }
                    entries.push((k, v));
                }
                Value::Map(entries)
            }
            tag::PEER_STATUS => Value::PeerStatus(PeerStatus::read(reader)?),
            tag::REF => {
                return Err(CellError::bad_format("ref outside a child position"));
            }
            other => {
                return Err(CellError::bad_format(format!("unknown tag 0x{:02x}", other)));
            }
        };

        let encoding = Bytes::copy_from_slice(reader.slice_from(start));
        let cell = Cell::with_encoding(value, encoding);
        cell.validate()?;
        Ok(cell)
    }
}

/// Insert or replace an entry, keeping keys in ascending hash order.
fn insert_sorted(entries: &mut Vec<(Ref, Ref)>, key: Ref, value: Ref) {
    let key_hash = key.hash();
    match entries.binary_search_by(|(k, _)| k.hash().cmp(&key_hash)) {
        Ok(i) => entries[i] = (key, value),
        Err(i) => entries.insert(i, (key, value)),
    }
}

pub(crate) fn write_address(buf: &mut Vec<u8>, a: Address) {
    buf.push(tag::ADDRESS);
    format::write_vlq_count(buf, a.0);
}

/// Write a child: inline if its target is resident and small, else as a hash.
pub(crate) fn write_child(buf: &mut Vec<u8>, r: &Ref) {
    match r.embedded() {
        Some(cell) => buf.extend_from_slice(cell.encoding()),
        None => {
            buf.push(tag::REF);
            buf.extend_from_slice(r.hash().as_bytes());
        }
    }
}

/// Write an optional child, using the absence token for `None`.
pub(crate) fn write_optional_child(buf: &mut Vec<u8>, r: Option<&Ref>) {
    match r {
        Some(r) => write_child(buf, r),
        None => buf.push(tag::NULL),
    }
}

/// Read a child in a position where the absence token is not allowed.
pub(crate) fn read_child(reader: &mut Reader<'_>) -> Result<Ref> {
    match reader.peek_byte()? {
        tag::NULL => Err(CellError::bad_format("absence token in required child position")),
        tag::REF => {
            reader.read_byte()?;
            Ok(Ref::soft(reader.read_hash()?))
        }
        _ => {
            let cell = Cell::read_from(reader)?;
            if !cell.is_embedded() {
                return Err(CellError::bad_format(format!(
                    "embedded child of {} bytes exceeds {}",
                    cell.encoding().len(),
                    MAX_EMBEDDED_LENGTH
                )));
            }
            Ok(Ref::direct(cell))
        }
    }
}

/// Read a child in a position where the absence token is allowed.
pub(crate) fn read_optional_child(reader: &mut Reader<'_>) -> Result<Option<Ref>> {
    if reader.peek_byte()? == tag::NULL {
        reader.read_byte()?;
        return Ok(None);
    }
    read_child(reader).map(Some)
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if let (Some(a), Some(b)) = (self.cached_hash(), other.cached_hash()) {
            return a == b;
        }
        self.0.value == other.0.value
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Cell::hash(self).0.hash(state);
    }
}

impl From<PeerStatus> for Cell {
    fn from(ps: PeerStatus) -> Self {
        Cell::new(Value::PeerStatus(ps))
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::integer(n)
    }
}

impl From<Address> for Cell {
    fn from(a: Address) -> Self {
        Cell::address(a)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::string(s)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({})", self)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn child(f: &mut fmt::Formatter<'_>, r: &Ref) -> fmt::Result {
            match r.resident() {
                Some(cell) => write!(f, "{}", cell),
                None => write!(f, "#ref[{}]", r.hash()),
            }
        }

        match &self.0.value {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Address(a) => write!(f, "{}", a),
            Value::String(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::Vector(refs) => {
                write!(f, "[")?;
                for (i, r) in refs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    child(f, r)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    child(f, k)?;
                    write!(f, " ")?;
                    child(f, v)?;
                }
                write!(f, "}}")
            }
            Value::PeerStatus(ps) => write!(
                f,
                "#PeerStatus{{:controller {}, :stake {}, :balance {}}}",
                ps.controller(),
                ps.total_stake(),
                ps.balance()
            ),
        }
    }
}
