//! The Client: unified API for talking to the ledger.
//!
//! The Client brings together the codec, a signer, a node connection and a
//! params cache. Every transaction goes through the same pipeline:
//! operation checks, account lookup, sign doc, signature, transaction
//! checks, encode, broadcast.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ledgerlink_cache::Cache;
use ledgerlink_core::types::as_string;
use ledgerlink_core::{
    build_sign_bytes, AccAddress, Codec, CoreError, Coins, Msg, PubKey, Signer, StdFee,
    StdSignature, StdTx,
};
use ledgerlink_rpc::{BroadcastMode, Node, ResultTx, SubscriptionManager};

use crate::error::Result;
use crate::params::ParamsQuery;

/// Query path of account state.
pub const ACCOUNT_QUERY_PATH: &str = "custom/acc/account";

/// Configuration for the Client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Chain the client signs for.
    pub chain_id: String,
    /// Gas limit when a transaction sets none.
    pub default_gas: u64,
    /// Fee when a transaction sets none.
    pub default_fee: Coins,
    /// Broadcast mode when a transaction sets none.
    pub broadcast_mode: BroadcastMode,
    /// How long fetched module params stay cached.
    pub params_cache_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: "ledgerlink".to_string(),
            default_gas: 200_000,
            default_fee: Coins::empty(),
            broadcast_mode: BroadcastMode::Sync,
            params_cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Per-transaction overrides. Unset fields fall back to [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct BaseTx {
    pub gas: Option<u64>,
    pub fee: Option<Coins>,
    pub memo: String,
    pub mode: Option<BroadcastMode>,
}

impl BaseTx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn fee(mut self, fee: Coins) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn mode(mut self, mode: BroadcastMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Account state as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    pub address: AccAddress,
    #[serde(default)]
    pub coins: Coins,
    #[serde(default)]
    pub pub_key: Option<PubKey>,
    #[serde(with = "as_string")]
    pub account_number: u64,
    #[serde(with = "as_string")]
    pub sequence: u64,
}

#[derive(Serialize)]
struct AccountParams {
    #[serde(rename = "Address")]
    address: AccAddress,
}

/// The main Client struct.
///
/// Cheap to clone; clones share the node connection, signer, cache and
/// subscriptions.
pub struct Client<N: Node + 'static> {
    config: Arc<ClientConfig>,
    codec: Arc<Codec>,
    node: Arc<N>,
    signer: Arc<dyn Signer>,
    cache: Arc<dyn Cache>,
    subscriptions: SubscriptionManager<N>,
}

impl<N: Node + 'static> Clone for Client<N> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            codec: Arc::clone(&self.codec),
            node: Arc::clone(&self.node),
            signer: Arc::clone(&self.signer),
            cache: Arc::clone(&self.cache),
            subscriptions: self.subscriptions.clone(),
        }
    }
}

impl<N: Node + 'static> Client<N> {
    /// Create a client whose codec knows the service module's operations.
    pub fn new(
        config: ClientConfig,
        node: Arc<N>,
        signer: Arc<dyn Signer>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        let mut codec = Codec::new();
        crate::service::register_codec(&mut codec);
        Self::with_codec(config, codec, node, signer, cache)
    }

    /// Create a client with a caller-built codec.
    pub fn with_codec(
        config: ClientConfig,
        codec: Codec,
        node: Arc<N>,
        signer: Arc<dyn Signer>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        let subscriptions = SubscriptionManager::new(Arc::clone(&node));
        Self {
            config: Arc::new(config),
            codec: Arc::new(codec),
            node,
            signer,
            cache,
            subscriptions,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    /// The address this client signs as.
    pub fn address(&self) -> AccAddress {
        self.signer.address()
    }

    /// Subscription manager bound to this client's node.
    pub fn subscriptions(&self) -> &SubscriptionManager<N> {
        &self.subscriptions
    }

    /// Params lookups through this client's cache.
    pub fn params(&self) -> ParamsQuery<N> {
        ParamsQuery::new(
            Arc::clone(&self.node),
            Arc::clone(&self.cache),
            self.config.params_cache_ttl,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Query `path` with JSON params and decode a JSON answer.
    pub async fn query_json<P, R>(&self, path: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let data =
            serde_json::to_vec(params).map_err(|e| CoreError::EncodingError(e.to_string()))?;
        let bytes = self.node.query(path, data).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch account number, sequence and balance.
    pub async fn query_account(&self, address: AccAddress) -> Result<BaseAccount> {
        self.query_json(ACCOUNT_QUERY_PATH, &AccountParams { address })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Build, sign and check a transaction without broadcasting it.
    pub async fn build_and_sign(&self, msgs: Vec<Arc<dyn Msg>>, base_tx: &BaseTx) -> Result<StdTx> {
        for msg in &msgs {
            msg.validate_basic()?;
        }

        let account = self.query_account(self.address()).await?;
        let fee = StdFee::new(
            base_tx
                .fee
                .clone()
                .unwrap_or_else(|| self.config.default_fee.clone()),
            base_tx.gas.unwrap_or(self.config.default_gas),
        );

        let sign_bytes = build_sign_bytes(
            &self.codec,
            &self.config.chain_id,
            account.account_number,
            account.sequence,
            &fee,
            &msgs,
            &base_tx.memo,
        )?;
        let signature = StdSignature {
            pub_key: Some(self.signer.pub_key()),
            signature: self.signer.sign(&sign_bytes)?,
            account_number: account.account_number,
            sequence: account.sequence,
        };
        debug!(
            account_number = account.account_number,
            sequence = account.sequence,
            msgs = msgs.len(),
            "signed transaction"
        );

        let tx = StdTx::new(msgs, fee, vec![signature], base_tx.memo.clone());
        tx.validate_basic()?;
        Ok(tx)
    }

    /// Build, sign, check and broadcast a transaction.
    pub async fn broadcast(&self, msgs: Vec<Arc<dyn Msg>>, base_tx: &BaseTx) -> Result<ResultTx> {
        let tx = self.build_and_sign(msgs, base_tx).await?;
        let bytes = tx.encode(&self.codec)?;
        let mode = base_tx.mode.unwrap_or(self.config.broadcast_mode);

        let result = self.node.broadcast_tx(bytes, mode).await?;
        info!(hash = %result.hash, height = result.height, "broadcast transaction");
        Ok(result)
    }
}
