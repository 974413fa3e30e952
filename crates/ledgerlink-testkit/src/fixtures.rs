//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a scripted in-memory node,
//! clients bound to it, a signable test operation, and event builders.

use std::sync::Arc;

use serde_json::{json, Value};

use ledgerlink::cache::MemoryCache;
use ledgerlink::client::ACCOUNT_QUERY_PATH;
use ledgerlink::service::msgs::{MsgRespondService, MSG_RESPOND_SERVICE};
use ledgerlink::service::types::{
    TAG_CONSUMER, TAG_PROVIDER, TAG_REQUEST_CONTEXT_ID, TAG_REQUEST_ID, TAG_RESPOND_SERVICE,
    TAG_SERVICE_NAME,
};
use ledgerlink::service::RequestContextId;
use ledgerlink::{Client, ClientConfig};
use ledgerlink_core::{
    AccAddress, Codec, Coins, Keypair, Msg, RawMsg, Signer, StdFee, TxEnvelope, ValidationError,
};
use ledgerlink_rpc::query::ACTION_KEY;
use ledgerlink_rpc::transport::memory::MemoryNode;
use ledgerlink_rpc::{
    Block, BlockHeader, Event, EventDataNewBlock, EventDataTx, ResultBeginBlock, ResultEndBlock,
    Tags, TxResult,
};

/// Wire name of [`TestMsg`].
pub const TEST_MSG_TYPE: &str = "test/TestMsg";

/// A minimal signable operation.
///
/// Its JSON body is `{"text": ...}`. An empty text fails `validate_basic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMsg {
    pub signers: Vec<AccAddress>,
    pub text: String,
}

impl TestMsg {
    pub fn new(signer: AccAddress, text: impl Into<String>) -> Self {
        Self {
            signers: vec![signer],
            text: text.into(),
        }
    }

    pub fn with_signers(signers: Vec<AccAddress>, text: impl Into<String>) -> Self {
        Self {
            signers,
            text: text.into(),
        }
    }
}

impl Msg for TestMsg {
    fn route(&self) -> &'static str {
        "test"
    }

    fn msg_type(&self) -> &'static str {
        "test_msg"
    }

    fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.text.is_empty() {
            return Err(ValidationError::MissingField("text"));
        }
        Ok(())
    }

    fn signers(&self) -> Vec<AccAddress> {
        self.signers.clone()
    }

    fn json_value(&self) -> Value {
        json!({ "text": self.text })
    }
}

/// A codec that knows [`TestMsg`] and the service operations.
pub fn test_codec() -> Codec {
    let mut codec = Codec::new();
    codec.register("test", "test_msg", TEST_MSG_TYPE);
    ledgerlink::service::register_codec(&mut codec);
    codec
}

/// Deterministic keypair from a one-byte seed.
pub fn keypair(seed: u8) -> Keypair {
    Keypair::from_seed(&[seed; 32])
}

/// The address of [`keypair`]`(seed)`.
pub fn address(seed: u8) -> AccAddress {
    keypair(seed).address()
}

/// A fresh random request context id.
pub fn random_request_context_id() -> RequestContextId {
    RequestContextId::from_bytes(rand::random())
}

/// The `index`-th request id issued under `context`.
pub fn request_id(context: &RequestContextId, index: u64) -> String {
    format!("{}{:016x}{index:016x}", context.to_hex(), 1)
}

/// A test fixture: one in-memory node shared by any number of clients.
pub struct TestFixture {
    pub node: Arc<MemoryNode>,
    pub config: ClientConfig,
}

impl TestFixture {
    /// Create a fixture whose node answers account queries.
    pub async fn new() -> Self {
        let fixture = Self {
            node: Arc::new(MemoryNode::new()),
            config: ClientConfig {
                chain_id: "ledgerlink-test".to_string(),
                ..ClientConfig::default()
            },
        };
        fixture.serve_accounts(1, 0).await;
        fixture
    }

    /// Answer every account query with `account_number` and `sequence`.
    pub async fn serve_accounts(&self, account_number: u64, sequence: u64) {
        self.node
            .set_query_handler(ACCOUNT_QUERY_PATH, move |data| {
                let params: Value = serde_json::from_slice(data).map_err(|e| e.to_string())?;
                let account = json!({
                    "address": params["Address"],
                    "coins": [],
                    "account_number": account_number.to_string(),
                    "sequence": sequence.to_string(),
                });
                serde_json::to_vec(&account).map_err(|e| e.to_string())
            })
            .await;
    }

    /// A client signing with `keypair(seed)`.
    pub fn client(&self, seed: u8) -> Client<MemoryNode> {
        Client::with_codec(
            self.config.clone(),
            test_codec(),
            Arc::clone(&self.node),
            Arc::new(keypair(seed)),
            Arc::new(MemoryCache::new()),
        )
    }

    /// Make every broadcast return a request context id tag.
    pub async fn tag_request_context(&self, id: RequestContextId) {
        self.node
            .on_broadcast(move |_| Ok(Tags::new().with(TAG_REQUEST_CONTEXT_ID, id.to_hex())))
            .await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// A transaction event carrying `msgs` and result `tags`.
pub fn tx_event(height: i64, tags: Tags, msgs: Vec<RawMsg>) -> Event {
    Event::Tx(EventDataTx {
        hash: format!("{height:064x}"),
        height,
        index: 0,
        tx: TxEnvelope {
            msg: msgs,
            fee: StdFee::new(Coins::empty(), 200_000),
            signatures: vec![],
            memo: String::new(),
        },
        result: TxResult {
            tags,
            ..TxResult::default()
        },
    })
}

/// Result tags of a response transaction.
pub fn respond_tags(consumer: &AccAddress, service_name: &str) -> Tags {
    Tags::new()
        .with(ACTION_KEY, TAG_RESPOND_SERVICE)
        .with(TAG_CONSUMER, consumer.to_string())
        .with(TAG_SERVICE_NAME, service_name)
}

/// A raw `MsgRespondService` with `output`.
pub fn respond_msg(provider: AccAddress, request_id: &str, output: &str) -> RawMsg {
    let msg = MsgRespondService {
        request_id: request_id.to_string(),
        provider,
        output: output.to_string(),
        error: String::new(),
    };
    RawMsg::new(MSG_RESPOND_SERVICE, ledgerlink_core::canonical::to_value(&msg))
}

/// A response transaction event for `consumer` and `service_name`,
/// answering a request of `context`.
pub fn respond_event(
    height: i64,
    consumer: &AccAddress,
    service_name: &str,
    context: &RequestContextId,
    output: &str,
) -> Event {
    let provider = address(0xee);
    let id = request_id(context, height.unsigned_abs());
    tx_event(
        height,
        respond_tags(consumer, service_name).with(TAG_PROVIDER, provider.to_string()),
        vec![respond_msg(provider, &id, output)],
    )
}

/// A new block whose end-block tags announce `request_ids`.
pub fn new_block_event(height: i64, request_ids: &[&str]) -> Event {
    let mut tags = Tags::new();
    for id in request_ids {
        tags.push(TAG_REQUEST_ID, *id);
    }
    Event::NewBlock(EventDataNewBlock {
        block: Block {
            header: BlockHeader {
                chain_id: "ledgerlink-test".to_string(),
                height,
                num_txs: 0,
            },
            txs: vec![],
        },
        result_begin_block: ResultBeginBlock::default(),
        result_end_block: ResultEndBlock {
            tags,
            ..ResultEndBlock::default()
        },
    })
}
