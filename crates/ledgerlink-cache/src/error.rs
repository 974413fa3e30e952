//! Error types for the cache module.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A lock guarding the cache was poisoned by a panicking writer.
    #[error("cache lock poisoned")]
    Poisoned,

    /// No room for a new entry.
    #[error("cache full: {max_entries} entries")]
    Full { max_entries: usize },

    /// The backing service failed.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
