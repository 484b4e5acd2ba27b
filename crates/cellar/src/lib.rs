//! # Cellar
//!
//! The unified API for Cellar: immutable, content-addressed cells with a
//! canonical encoding, lazily-resolved references and durable storage.
//!
//! ## Overview
//!
//! - **Cells**: Immutable values identified by the hash of their encoding
//! - **References**: Links to child cells that may not be loaded yet
//! - **Stores**: Hash-keyed repositories that persist whole cell graphs
//! - **Peer status**: A stake-accounting record built from cells
//!
//! ## Key Concepts
//!
//! - **Canonical encoding**: Every value has exactly one valid encoding.
//! - **Embedding**: Small children live inside their parent's encoding.
//! - **Missing data**: A reference whose target is not here is reported as
//!   such, never replaced by a default.
//! - **Novelty**: A cell reaching a target status in a store for the first
//!   time.
//!
//! ## Usage
//!
//! ```rust
//! use cellar::{Address, Cell, Cellar, CellarConfig, PeerStatus};
//!
//! let cellar = Cellar::open(CellarConfig::default()).unwrap();
//!
//! let status = PeerStatus::create(Address(1), 100)
//!     .unwrap()
//!     .with_delegated_stake(Address(2), 25)
//!     .unwrap();
//! let cell = Cell::from(status);
//!
//! let r = cellar.persist(&cell).unwrap();
//! let loaded = cellar.lookup(&r.hash()).unwrap().unwrap();
//! assert_eq!(loaded, cell);
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `cellar::core` - Cells, references, encoding, peer status
//! - `cellar::store` - Storage abstraction and SQLite

pub mod cells;
pub mod config;
pub mod context;
pub mod error;
pub mod handle;

// Re-export component crates
pub use cellar_core as core;
pub use cellar_store as store;

// Re-export main types for convenience
pub use config::{CellarConfig, StoreBackend};
pub use error::{CellarError, Result};
pub use handle::Cellar;

// Re-export commonly used core types
pub use cellar_core::{
    Address, Cell, CellError, ErrorValue, Hash, PeerStatus, Ref, RefStatus, Value,
};
pub use cellar_store::{MemoryStore, SqliteStore, Store, StoreExt};
