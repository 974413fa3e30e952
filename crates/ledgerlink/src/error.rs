//! Error types for the Ledgerlink client.

use ledgerlink_cache::CacheError;
use ledgerlink_core::{CoreError, ValidationError};
use ledgerlink_rpc::RpcError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Encoding or signing error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// An operation or transaction failed its local checks.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The node could not be reached or rejected the call.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    /// The node's response broke the expected protocol contract.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
