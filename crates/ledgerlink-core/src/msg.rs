//! Operations: the signable units of intent carried by a transaction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ValidationError;
use crate::types::AccAddress;

/// A typed, immutable operation.
///
/// Module crates implement this for each of their message types. The
/// transaction pipeline treats implementors as opaque: it only needs the
/// capability contract below.
pub trait Msg: fmt::Debug + Send + Sync {
    /// Module that owns this operation, e.g. `"service"`.
    fn route(&self) -> &'static str;

    /// Type tag within the module, e.g. `"request_service"`.
    fn msg_type(&self) -> &'static str;

    /// Stateless structural validity check.
    fn validate_basic(&self) -> Result<(), ValidationError>;

    /// Identities that must sign, in a deterministic order.
    fn signers(&self) -> Vec<AccAddress>;

    /// JSON body of the operation (without the type wrapper).
    fn json_value(&self) -> Value;
}

/// An operation as it appears on the wire: a registered type name plus an
/// undecoded body.
///
/// Decoded transactions carry raw operations; modules interpret the ones
/// they recognize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMsg {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
}

impl RawMsg {
    pub fn new(type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}
