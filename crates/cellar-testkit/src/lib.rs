//! # Cellar Testkit
//!
//! Testing utilities for Cellar.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed values with their expected encoding and hash
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the canonical encoding across implementations:
//!
//! ```rust
//! use cellar_testkit::vectors::{all_vectors, compute};
//!
//! for vector in all_vectors() {
//!     let record = compute(&vector).unwrap();
//!     println!("{}: {}", vector.name, record.hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cellar_testkit::generators::cell;
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(c in cell()) {
//!         let again = cellar_core::decode(c.encoding()).unwrap();
//!         prop_assert_eq!(again.hash(), c.hash());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use cellar_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_delegators(2);
//! let status = fixture.delegated_peer(100, 10).unwrap();
//! assert_eq!(status.balance(), 120);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{delegators, large_cell, nested_graph, TestFixture};
pub use generators::PeerOp;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector, VectorRecord};
