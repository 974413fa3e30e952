//! Sign documents and transactions.
//!
//! The sign doc is the exact byte string every signer signs. Its layout:
//!
//! ```text
//! {"account_number":"<n>","chain_id":"<id>","fee":<fee bytes>,
//!  "memo":"<memo>","msgs":[<msg sign bytes>...],"sequence":"<n>"}
//! ```
//!
//! The fee and every operation are rendered to canonical bytes on their own
//! first and embedded verbatim; the whole envelope is then canonicalized.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::HashSet;
use std::sync::Arc;

use crate::canonical::{canonical_json, sort_json};
use crate::codec::Codec;
use crate::crypto::PubKey;
use crate::error::{CoreError, Result, ValidationError};
use crate::msg::{Msg, RawMsg};
use crate::types::{as_base64, as_string, AccAddress, Coins};

/// The fee attached to a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Coins,
    #[serde(with = "as_string")]
    pub gas: u64,
}

impl StdFee {
    pub fn new(amount: Coins, gas: u64) -> Self {
        Self { amount, gas }
    }

    /// Canonical bytes of the fee, as embedded in the sign doc.
    pub fn bytes(&self) -> Vec<u8> {
        canonical_json(self)
    }
}

/// A signature over a sign doc.
///
/// `pub_key` is absent for an unsigned placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: Option<PubKey>,
    #[serde(with = "as_base64")]
    pub signature: Vec<u8>,
    #[serde(with = "as_string")]
    pub account_number: u64,
    #[serde(with = "as_string")]
    pub sequence: u64,
}

#[derive(Serialize)]
struct StdSignDoc<'a> {
    #[serde(with = "as_string")]
    account_number: u64,
    chain_id: &'a str,
    fee: Box<RawValue>,
    memo: &'a str,
    msgs: Vec<Box<RawValue>>,
    #[serde(with = "as_string")]
    sequence: u64,
}

/// Build the canonical bytes a signer signs.
///
/// Operations are embedded in the order given. Identical inputs always
/// yield identical bytes.
pub fn build_sign_bytes(
    codec: &Codec,
    chain_id: &str,
    account_number: u64,
    sequence: u64,
    fee: &StdFee,
    msgs: &[Arc<dyn Msg>],
    memo: &str,
) -> Result<Vec<u8>> {
    let fee = raw_fragment(fee.bytes())?;
    let msgs = msgs
        .iter()
        .map(|msg| codec.msg_sign_bytes(msg.as_ref()).and_then(raw_fragment))
        .collect::<Result<Vec<_>>>()?;

    let doc = StdSignDoc {
        account_number,
        chain_id,
        fee,
        memo,
        msgs,
        sequence,
    };
    let bytes = serde_json::to_vec(&doc).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(sort_json(&bytes))
}

fn raw_fragment(bytes: Vec<u8>) -> Result<Box<RawValue>> {
    let text = String::from_utf8(bytes).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    RawValue::from_string(text).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Collect the required signers of `msgs`, deduplicated in first-seen order.
pub fn collect_signers(msgs: &[Arc<dyn Msg>]) -> Vec<AccAddress> {
    let mut seen = HashSet::new();
    let mut signers = Vec::new();
    for msg in msgs {
        for addr in msg.signers() {
            if seen.insert(addr) {
                signers.push(addr);
            }
        }
    }
    signers
}

/// A fully assembled transaction.
#[derive(Debug, Clone)]
pub struct StdTx {
    pub msgs: Vec<Arc<dyn Msg>>,
    pub fee: StdFee,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
}

impl StdTx {
    pub fn new(
        msgs: Vec<Arc<dyn Msg>>,
        fee: StdFee,
        signatures: Vec<StdSignature>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            msgs,
            fee,
            signatures,
            memo: memo.into(),
        }
    }

    /// Signers whose signatures this transaction must carry, in order.
    pub fn signers(&self) -> Vec<AccAddress> {
        collect_signers(&self.msgs)
    }

    /// Run the transaction-level validity checks.
    pub fn validate_basic(&self) -> std::result::Result<(), ValidationError> {
        crate::validation::validate_tx(self)
    }

    /// Convert to the wire envelope.
    pub fn to_envelope(&self, codec: &Codec) -> Result<TxEnvelope> {
        let msg = self
            .msgs
            .iter()
            .map(|m| codec.encode_msg(m.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(TxEnvelope {
            msg,
            fee: self.fee.clone(),
            signatures: self.signatures.clone(),
            memo: self.memo.clone(),
        })
    }

    /// Encode for broadcast.
    pub fn encode(&self, codec: &Codec) -> Result<Vec<u8>> {
        let envelope = self.to_envelope(codec)?;
        serde_json::to_vec(&envelope).map_err(|e| CoreError::EncodingError(e.to_string()))
    }
}

/// A transaction as carried on the wire and in events.
///
/// Operations stay undecoded; consumers match the wire names they know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxEnvelope {
    pub msg: Vec<RawMsg>,
    pub fee: StdFee,
    #[serde(default)]
    pub signatures: Vec<StdSignature>,
    #[serde(default)]
    pub memo: String,
}

impl TxEnvelope {
    /// Decode from broadcast bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
