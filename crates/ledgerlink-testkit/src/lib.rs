//! # Ledgerlink Testkit
//!
//! Testing utilities for Ledgerlink.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Sign docs with their exact expected canonical bytes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A scripted in-memory node, clients and event builders
//!
//! ## Golden Vectors
//!
//! ```rust
//! use ledgerlink_testkit::vectors::{all_vectors, sign_bytes_from_vector};
//!
//! for vector in all_vectors() {
//!     let bytes = sign_bytes_from_vector(&vector);
//!     assert_eq!(bytes, vector.expected.as_bytes());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ledgerlink_testkit::generators::SignDocParams;
//!
//! proptest! {
//!     #[test]
//!     fn sign_bytes_are_deterministic(params: SignDocParams) {
//!         // build twice, compare
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{test_codec, TestFixture, TestMsg};
pub use generators::SignDocParams;
pub use vectors::{all_vectors, sign_bytes_from_vector, verify_all_vectors, GoldenVector};
