//! The Cache trait.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A key-value cache with per-entry time-to-live.
///
/// All methods take `&self`; implementations handle their own locking.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a live value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store a value that expires after `ttl`.
    ///
    /// Replaces any existing entry under the same key.
    async fn set_with_expire(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Remove an entry. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
