//! Service operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ledgerlink_core::canonical::to_value;
use ledgerlink_core::types::{as_base64, as_string};
use ledgerlink_core::{AccAddress, Codec, Coins, Msg, RawMsg, ValidationError};

use super::types::{RequestContextId, REQUEST_CONTEXT_ID_LEN, ROUTE};

pub const MSG_REQUEST_SERVICE: &str = "irishub/service/MsgRequestService";
pub const MSG_RESPOND_SERVICE: &str = "irishub/service/MsgRespondService";
pub const MSG_START_REQUEST_CONTEXT: &str = "irishub/service/MsgStartRequestContext";
pub const MSG_PAUSE_REQUEST_CONTEXT: &str = "irishub/service/MsgPauseRequestContext";
pub const MSG_KILL_REQUEST_CONTEXT: &str = "irishub/service/MsgKillRequestContext";

/// Register the wire names of every service operation.
pub fn register_codec(codec: &mut Codec) {
    codec
        .register(ROUTE, "request_service", MSG_REQUEST_SERVICE)
        .register(ROUTE, "respond_service", MSG_RESPOND_SERVICE)
        .register(ROUTE, "start_request_context", MSG_START_REQUEST_CONTEXT)
        .register(ROUTE, "pause_request_context", MSG_PAUSE_REQUEST_CONTEXT)
        .register(ROUTE, "kill_request_context", MSG_KILL_REQUEST_CONTEXT);
}

/// Invoke a service on one or more providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRequestService {
    pub service_name: String,
    pub providers: Vec<AccAddress>,
    pub consumer: AccAddress,
    pub input: String,
    pub service_fee_cap: Coins,
    #[serde(with = "as_string")]
    pub timeout: i64,
    pub super_mode: bool,
    pub repeated: bool,
    #[serde(with = "as_string")]
    pub repeated_frequency: u64,
    #[serde(with = "as_string")]
    pub repeated_total: i64,
}

impl Msg for MsgRequestService {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "request_service"
    }

    fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.providers.is_empty() {
            return Err(ValidationError::MissingField("providers"));
        }
        if self.service_name.is_empty() {
            return Err(ValidationError::MissingField("service_name"));
        }
        if self.input.is_empty() {
            return Err(ValidationError::MissingField("input"));
        }
        Ok(())
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.consumer]
    }

    fn json_value(&self) -> Value {
        to_value(self)
    }
}

/// A provider's answer to one request.
///
/// Exactly one of `output` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRespondService {
    pub request_id: String,
    pub provider: AccAddress,
    pub output: String,
    pub error: String,
}

impl Msg for MsgRespondService {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "respond_service"
    }

    fn validate_basic(&self) -> Result<(), ValidationError> {
        match (self.output.is_empty(), self.error.is_empty()) {
            (true, true) => Err(ValidationError::InvalidField {
                field: "output",
                reason: "either output or error should be specified, but neither was provided"
                    .into(),
            }),
            (false, false) => Err(ValidationError::InvalidField {
                field: "output",
                reason: "either output or error should be specified, but both were provided"
                    .into(),
            }),
            _ => Ok(()),
        }
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.provider]
    }

    fn json_value(&self) -> Value {
        to_value(self)
    }
}

macro_rules! request_context_msg {
    ($(#[$doc:meta])* $name:ident, $msg_type:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(with = "as_base64")]
            pub request_context_id: Vec<u8>,
            pub consumer: AccAddress,
        }

        impl $name {
            pub fn new(request_context_id: &RequestContextId, consumer: AccAddress) -> Self {
                Self {
                    request_context_id: request_context_id.as_bytes().to_vec(),
                    consumer,
                }
            }
        }

        impl Msg for $name {
            fn route(&self) -> &'static str {
                ROUTE
            }

            fn msg_type(&self) -> &'static str {
                $msg_type
            }

            fn validate_basic(&self) -> Result<(), ValidationError> {
                validate_request_context_id(&self.request_context_id)
            }

            fn signers(&self) -> Vec<AccAddress> {
                vec![self.consumer]
            }

            fn json_value(&self) -> Value {
                to_value(self)
            }
        }
    };
}

request_context_msg!(
    /// Resume a paused request context.
    MsgStartRequestContext,
    "start_request_context"
);
request_context_msg!(
    /// Suspend a running request context.
    MsgPauseRequestContext,
    "pause_request_context"
);
request_context_msg!(
    /// Terminate a request context.
    MsgKillRequestContext,
    "kill_request_context"
);

fn validate_request_context_id(id: &[u8]) -> Result<(), ValidationError> {
    if id.len() != REQUEST_CONTEXT_ID_LEN {
        return Err(ValidationError::InvalidField {
            field: "request_context_id",
            reason: format!("length must be {REQUEST_CONTEXT_ID_LEN} bytes, got {}", id.len()),
        });
    }
    Ok(())
}

/// The service operations a client recognizes inside decoded transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMsg {
    RequestService(MsgRequestService),
    RespondService(MsgRespondService),
    StartRequestContext(MsgStartRequestContext),
    PauseRequestContext(MsgPauseRequestContext),
    KillRequestContext(MsgKillRequestContext),
}

impl ServiceMsg {
    /// Decode a raw wire operation.
    ///
    /// Operations of other modules decode to `Ok(None)`; a service operation
    /// with a malformed body is an error.
    pub fn from_raw(raw: &RawMsg) -> Result<Option<Self>, serde_json::Error> {
        let body = || raw.value.clone();
        let msg = match raw.type_name.as_str() {
            MSG_REQUEST_SERVICE => ServiceMsg::RequestService(serde_json::from_value(body())?),
            MSG_RESPOND_SERVICE => ServiceMsg::RespondService(serde_json::from_value(body())?),
            MSG_START_REQUEST_CONTEXT => {
                ServiceMsg::StartRequestContext(serde_json::from_value(body())?)
            }
            MSG_PAUSE_REQUEST_CONTEXT => {
                ServiceMsg::PauseRequestContext(serde_json::from_value(body())?)
            }
            MSG_KILL_REQUEST_CONTEXT => {
                ServiceMsg::KillRequestContext(serde_json::from_value(body())?)
            }
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }
}
