//! Event payloads delivered by a node's subscription transport.

use serde::{Deserialize, Serialize};

use ledgerlink_core::{PubKey, TxEnvelope};

use crate::query::{
    EVENT_KEY, EVENT_NEW_BLOCK, EVENT_NEW_BLOCK_HEADER, EVENT_TX, EVENT_VALIDATOR_SET_UPDATES,
};

/// A key/value pair attached to a transaction or block result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An ordered list of result tags.
///
/// A key may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(pub Vec<Tag>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Tag::new(key, value));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// All values under `key`, in order.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|t| t.key == key)
            .map(|t| t.value.as_str())
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of a broadcast transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTx {
    pub gas_wanted: i64,
    pub gas_used: i64,
    pub tags: Tags,
    pub hash: String,
    pub height: i64,
}

/// Execution result of a transaction inside a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub code: u32,
    #[serde(default)]
    pub log: String,
    pub gas_wanted: i64,
    pub gas_used: i64,
    pub tags: Tags,
}

/// A transaction included in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDataTx {
    pub hash: String,
    pub height: i64,
    pub index: u32,
    pub tx: TxEnvelope,
    pub result: TxResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: i64,
    pub num_txs: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub txs: Vec<TxEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub pub_key: PubKey,
    pub power: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBeginBlock {
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEndBlock {
    pub tags: Tags,
    #[serde(default)]
    pub validator_updates: Vec<ValidatorUpdate>,
}

/// A newly committed block with its begin/end-block results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDataNewBlock {
    pub block: Block,
    pub result_begin_block: ResultBeginBlock,
    pub result_end_block: ResultEndBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDataNewBlockHeader {
    pub header: BlockHeader,
    pub result_begin_block: ResultBeginBlock,
    pub result_end_block: ResultEndBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDataValidatorSetUpdates {
    pub validator_updates: Vec<ValidatorUpdate>,
}

/// Any event a subscription can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Event {
    NewBlock(EventDataNewBlock),
    Tx(EventDataTx),
    NewBlockHeader(EventDataNewBlockHeader),
    ValidatorSetUpdates(EventDataValidatorSetUpdates),
}

impl Event {
    /// The `tm.event` value of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::NewBlock(_) => EVENT_NEW_BLOCK,
            Event::Tx(_) => EVENT_TX,
            Event::NewBlockHeader(_) => EVENT_NEW_BLOCK_HEADER,
            Event::ValidatorSetUpdates(_) => EVENT_VALIDATOR_SET_UPDATES,
        }
    }

    /// Key/value attributes an event query is evaluated against.
    ///
    /// Always includes `tm.event`; result tags follow.
    pub fn attributes(&self) -> Vec<(&str, &str)> {
        let mut attrs = vec![(EVENT_KEY, self.event_type())];
        let tags: Vec<&Tags> = match self {
            Event::Tx(data) => vec![&data.result.tags],
            Event::NewBlock(data) => {
                vec![&data.result_begin_block.tags, &data.result_end_block.tags]
            }
            Event::NewBlockHeader(data) => {
                vec![&data.result_begin_block.tags, &data.result_end_block.tags]
            }
            Event::ValidatorSetUpdates(_) => vec![],
        };
        for tag in tags.into_iter().flat_map(Tags::iter) {
            attrs.push((tag.key.as_str(), tag.value.as_str()));
        }
        attrs
    }

    pub fn into_tx(self) -> Option<EventDataTx> {
        match self {
            Event::Tx(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_new_block(self) -> Option<EventDataNewBlock> {
        match self {
            Event::NewBlock(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_new_block_header(self) -> Option<EventDataNewBlockHeader> {
        match self {
            Event::NewBlockHeader(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_validator_set_updates(self) -> Option<EventDataValidatorSetUpdates> {
        match self {
            Event::ValidatorSetUpdates(data) => Some(data),
            _ => None,
        }
    }
}
