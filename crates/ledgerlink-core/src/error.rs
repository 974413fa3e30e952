//! Error types for Ledgerlink Core.

use thiserror::Error;

/// Core errors raised while encoding, signing or decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("operation {route}/{msg_type} is not registered with the codec")]
    UnregisteredMsg {
        route: &'static str,
        msg_type: &'static str,
    },

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::DecodingError(e.to_string())
    }
}

/// Validation errors for operations and transactions.
///
/// These are always detected locally and never sent over the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid fee {0} amount provided")]
    NegativeFee(String),

    #[error("no signers")]
    NoSigners,

    #[error("wrong number of signers: expected {expected}, got {got}")]
    WrongSignerCount { expected: usize, got: usize },

    #[error("maximum number of characters is {max} but received {got} characters")]
    MemoTooLong { max: usize, got: usize },

    #[error("too many signatures: {count}, limit: {limit}")]
    TooManySignatures { count: usize, limit: usize },

    #[error("{0} missing")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
