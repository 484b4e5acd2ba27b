//! # Cellar Store
//!
//! Storage abstraction for Cellar. Provides a trait-based interface for cell
//! persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! A store maps each cell's hash to its canonical encoding and a durability
//! status. Graph walks ([`StoreExt::persist`], [`StoreExt::announce`]) store a
//! cell and everything it references, children first.
//!
//! ## Key Types
//!
//! - [`Store`] - The trait for all storage backends
//! - [`StoreExt`] - Graph walks, lookup and resolution over any store
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cellar_core::Cell;
//! use cellar_store::{SqliteStore, Store, StoreExt};
//!
//! let store = SqliteStore::open("cells.db").unwrap();
//! let cell = Cell::vector([Cell::integer(1), Cell::string("x".repeat(500))]);
//! let r = store.persist(&cell).unwrap();
//! assert!(store.has(&r.hash()).unwrap());
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent persistence**: persisting an already durable graph writes
//!   nothing and reports no novelty
//! - **Missing data**: a walk that meets an unavailable child fails with a
//!   missing-data error and leaves the parent unstored

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Novelty, Store, StoreExt};
