//! Error types for the rpc module.

use thiserror::Error;

/// Errors that can occur talking to a ledger node.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The node could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// A query was rejected or failed.
    #[error("query {path} failed: {message}")]
    Query { path: String, message: String },

    /// A broadcast was rejected or failed.
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// No active subscription under this id.
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// An event query expression could not be parsed.
    #[error("invalid event query: {0}")]
    InvalidQuery(String),

    /// A payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Encoding error from core.
    #[error("core error: {0}")]
    Core(#[from] ledgerlink_core::CoreError),
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Decode(e.to_string())
    }
}

/// Result type for rpc operations.
pub type Result<T> = std::result::Result<T, RpcError>;
