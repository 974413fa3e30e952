//! Service module constants, identifiers and query results.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use ledgerlink_core::types::as_string;
use ledgerlink_core::{AccAddress, Coins, ValidationError};

use super::msgs::MsgRequestService;

/// Route of every service operation.
pub const ROUTE: &str = "service";

pub const TAG_SERVICE_NAME: &str = "service-name";
pub const TAG_PROVIDER: &str = "provider";
pub const TAG_CONSUMER: &str = "consumer";
pub const TAG_REQUEST_ID: &str = "request-id";
pub const TAG_REQUEST_CONTEXT_ID: &str = "request-context-id";

/// Action tag value of a response transaction.
pub const TAG_RESPOND_SERVICE: &str = "respond_service";

/// Length of a request context id in bytes.
pub const REQUEST_CONTEXT_ID_LEN: usize = 32;

/// Identifier tying a service request to its responses.
///
/// Hex in text and JSON form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestContextId(pub [u8; REQUEST_CONTEXT_ID_LEN]);

impl RequestContextId {
    pub const fn from_bytes(bytes: [u8; REQUEST_CONTEXT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; REQUEST_CONTEXT_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex. Anything but exactly 32 bytes is rejected.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(s).map_err(|e| ValidationError::InvalidField {
            field: "request_context_id",
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        let arr: [u8; REQUEST_CONTEXT_ID_LEN] =
            bytes.try_into().map_err(|_| ValidationError::InvalidField {
                field: "request_context_id",
                reason: format!(
                    "length must be {REQUEST_CONTEXT_ID_LEN} bytes, got {}",
                    bytes.len()
                ),
            })?;
        Ok(Self(arr))
    }

    /// Whether `request_id` was issued under this context.
    ///
    /// A request id is the hex context id followed by the batch and
    /// request counters.
    pub fn owns_request(&self, request_id: &str) -> bool {
        let prefix = self.to_hex();
        request_id
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(&prefix))
    }
}

impl fmt::Debug for RequestContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestContextId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for RequestContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RequestContextId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for RequestContextId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RequestContextId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Parameters of a service invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationRequest {
    pub service_name: String,
    pub providers: Vec<AccAddress>,
    pub input: String,
    pub service_fee_cap: Coins,
    pub timeout: i64,
    pub super_mode: bool,
    pub repeated: bool,
    pub repeated_frequency: u64,
    pub repeated_total: i64,
}

impl InvocationRequest {
    pub fn new(
        service_name: impl Into<String>,
        providers: Vec<AccAddress>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            providers,
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn repeated(mut self, frequency: u64, total: i64) -> Self {
        self.repeated = true;
        self.repeated_frequency = frequency;
        self.repeated_total = total;
        self
    }

    pub fn timeout(mut self, timeout: i64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn service_fee_cap(mut self, cap: Coins) -> Self {
        self.service_fee_cap = cap;
        self
    }

    pub(crate) fn into_msg(self, consumer: AccAddress) -> MsgRequestService {
        MsgRequestService {
            service_name: self.service_name,
            providers: self.providers,
            consumer,
            input: self.input,
            service_fee_cap: self.service_fee_cap,
            timeout: self.timeout,
            super_mode: self.super_mode,
            repeated: self.repeated,
            repeated_frequency: self.repeated_frequency,
            repeated_total: self.repeated_total,
        }
    }
}

/// An active request assigned to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub service_name: String,
    pub provider: AccAddress,
    pub consumer: AccAddress,
    pub input: String,
    #[serde(default)]
    pub service_fee: Coins,
    #[serde(default)]
    pub super_mode: bool,
    #[serde(default, with = "as_string")]
    pub request_height: i64,
    #[serde(default, with = "as_string")]
    pub expiration_height: i64,
    #[serde(default)]
    pub request_context_id: String,
    #[serde(default, with = "as_string")]
    pub request_context_batch_counter: u64,
}

/// A request context: the consumer-side state of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub service_name: String,
    pub providers: Vec<AccAddress>,
    pub consumer: AccAddress,
    pub input: String,
    #[serde(default)]
    pub service_fee_cap: Coins,
    #[serde(with = "as_string")]
    pub timeout: i64,
    #[serde(default)]
    pub super_mode: bool,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default, with = "as_string")]
    pub repeated_frequency: u64,
    #[serde(default, with = "as_string")]
    pub repeated_total: i64,
    #[serde(default, with = "as_string")]
    pub batch_counter: u64,
    #[serde(default)]
    pub state: String,
}

/// A provider's response to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub provider: AccAddress,
    pub consumer: AccAddress,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub request_context_id: String,
    #[serde(default, with = "as_string")]
    pub request_context_batch_counter: u64,
}
