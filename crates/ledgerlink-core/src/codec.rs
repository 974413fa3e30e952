//! Operation type registry.
//!
//! A [`Codec`] maps each operation's `(route, msg_type)` to the type name the
//! ledger uses on the wire. It is a plain value built once per client and
//! passed wherever operations are encoded, so independent clients never share
//! registration state.

use std::collections::HashMap;

use crate::canonical::{canonical_json, to_value};
use crate::error::{CoreError, Result};
use crate::msg::{Msg, RawMsg};

/// Registry of operation wire names.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    names: HashMap<(&'static str, &'static str), &'static str>,
}

impl Codec {
    /// Create an empty codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the wire name of an operation type.
    ///
    /// Registering the same `(route, msg_type)` twice replaces the name.
    pub fn register(
        &mut self,
        route: &'static str,
        msg_type: &'static str,
        type_name: &'static str,
    ) -> &mut Self {
        self.names.insert((route, msg_type), type_name);
        self
    }

    /// Look up the wire name of an operation.
    pub fn type_name(&self, msg: &dyn Msg) -> Result<&'static str> {
        self.names
            .get(&(msg.route(), msg.msg_type()))
            .copied()
            .ok_or(CoreError::UnregisteredMsg {
                route: msg.route(),
                msg_type: msg.msg_type(),
            })
    }

    /// Check whether a wire name is known to this codec.
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.names.values().any(|name| *name == type_name)
    }

    /// Wrap an operation as `{"type": <name>, "value": <body>}`.
    pub fn encode_msg(&self, msg: &dyn Msg) -> Result<RawMsg> {
        let name = self.type_name(msg)?;
        Ok(RawMsg::new(name, msg.json_value()))
    }

    /// Canonical sign bytes of a single operation.
    pub fn msg_sign_bytes(&self, msg: &dyn Msg) -> Result<Vec<u8>> {
        let raw = self.encode_msg(msg)?;
        Ok(canonical_json(&to_value(&raw)))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::AccAddress;
    use serde_json::{json, Value};

    #[derive(Debug)]
    struct Ping {
        from: AccAddress,
    }

    impl Msg for Ping {
        fn route(&self) -> &'static str {
            "test"
        }

        fn msg_type(&self) -> &'static str {
            "ping"
        }

        fn validate_basic(&self) -> std::result::Result<(), ValidationError> {
            Ok(())
        }

        fn signers(&self) -> Vec<AccAddress> {
            vec![self.from]
        }

        fn json_value(&self) -> Value {
            json!({"zz": 1, "from": self.from})
        }
    }

    #[test]
    fn test_unregistered_msg_rejected() {
        let codec = Codec::new();
        let msg = Ping {
            from: AccAddress::from_bytes([1; 20]),
        };
        assert!(matches!(
            codec.msg_sign_bytes(&msg),
            Err(CoreError::UnregisteredMsg { route: "test", msg_type: "ping" })
        ));
    }

    #[test]
    fn test_sign_bytes_wrap_and_sort() {
        let mut codec = Codec::new();
        codec.register("test", "ping", "ledger/test/MsgPing");

        let msg = Ping {
            from: AccAddress::from_bytes([1; 20]),
        };
        let bytes = codec.msg_sign_bytes(&msg).unwrap();
        let expected = format!(
            r#"{{"type":"ledger/test/MsgPing","value":{{"from":"{}","zz":1}}}}"#,
            "01".repeat(20)
        );
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
        assert!(codec.is_registered("ledger/test/MsgPing"));
    }

    #[test]
    fn test_codecs_are_independent() {
        let mut a = Codec::new();
        a.register("test", "ping", "ledger/test/MsgPing");
        let b = Codec::new();
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
