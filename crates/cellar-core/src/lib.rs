//! # Cellar Core
//!
//! Pure primitives for Cellar: cells, references and their canonical encoding.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! immutable, content-addressed values.
//!
//! ## Key Types
//!
//! - [`Cell`] - An immutable value identified by the hash of its encoding
//! - [`Hash`] - Content-addressed identifier (Blake3 hash)
//! - [`Ref`] - Lazily-resolvable, status-tracked link to a child cell
//! - [`PeerStatus`] - Stake-accounting record for a peer
//! - [`ErrorValue`] - Structured domain error
//!
//! ## Encoding
//!
//! Every cell has exactly one valid encoding: a tag byte followed by minimal
//! VLQ integers and children. See the [`format`] and [`tag`] modules.

pub mod address;
pub mod cell;
pub mod error;
pub mod error_value;
pub mod format;
pub mod hash;
pub mod peer;
pub mod reference;
pub mod tag;

pub use address::Address;
pub use cell::{Cell, Value};
pub use error::{CellError, ErrorKind, Result};
pub use error_value::ErrorValue;
pub use format::{decode, encode};
pub use hash::Hash;
pub use peer::{PeerStatus, INITIAL_PEER_TIMESTAMP};
pub use reference::{Ref, RefStatus};
