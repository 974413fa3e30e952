//! # Ledgerlink Cache
//!
//! TTL key-value cache abstraction used by the client as a best-effort
//! accelerator for slow-changing queries.
//!
//! ## Key Types
//!
//! - [`Cache`] - The async trait for cache operations
//! - [`MemoryCache`] - In-process implementation with per-entry expiry
//! - [`MemoryCacheConfig`] - Capacity settings for [`MemoryCache`]
//!
//! ## Design Notes
//!
//! - **Not authoritative**: a miss or an error always falls through to the
//!   real query path; callers never surface cache failures
//! - **Lazy expiry**: expired entries are dropped when read or when space is
//!   needed, there is no background sweeper

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{CacheError, Result};
pub use memory::{MemoryCache, MemoryCacheConfig};
pub use traits::Cache;
