//! Contracts of the ledger node the client talks to.
//!
//! A node broadcasts transactions, answers queries and streams events.
//! Implementations may use HTTP, WebSockets, or anything else; retry and
//! timeout policy belongs to the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::{Event, ResultTx};
use crate::subscription::SubscriptionId;

/// How long a broadcast waits before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Return after the transaction passes the mempool check.
    #[default]
    Sync,
    /// Return immediately.
    Async,
    /// Return after the transaction is committed in a block.
    Commit,
}

/// Submits encoded transactions.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_tx(&self, tx: Vec<u8>, mode: BroadcastMode) -> Result<ResultTx>;
}

/// Answers ABCI-style path queries.
#[async_trait]
pub trait Querier: Send + Sync {
    /// Query `path` with a JSON-encoded parameter document.
    async fn query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>>;
}

/// Streams events matching a query expression.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Register `id` for events matching `query`.
    ///
    /// Events on the returned channel arrive in emission order.
    async fn subscribe(&self, id: &SubscriptionId, query: &str) -> Result<mpsc::Receiver<Event>>;

    /// Stop delivering events to `id`.
    async fn unsubscribe(&self, id: &SubscriptionId) -> Result<()>;
}

/// A full node connection: broadcast, query and subscribe.
pub trait Node: Broadcaster + Querier + EventTransport {}

impl<T: Broadcaster + Querier + EventTransport> Node for T {}

/// An in-memory node for testing.
///
/// Broadcast results, query answers and events are all scripted by the test.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use ledgerlink_core::TxEnvelope;

    use crate::error::RpcError;
    use crate::events::Tags;
    use crate::query::EventQuery;

    /// Produces the result tags of an accepted broadcast, or a rejection.
    pub type BroadcastHook = Arc<dyn Fn(&TxEnvelope) -> std::result::Result<Tags, String> + Send + Sync>;

    /// Answers a query path.
    pub type QueryHandler = Arc<dyn Fn(&[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync>;

    struct Subscriber {
        query: EventQuery,
        sender: mpsc::Sender<Event>,
    }

    #[derive(Default)]
    struct NodeState {
        height: i64,
        offline: bool,
        broadcasts: Vec<TxEnvelope>,
        on_broadcast: Option<BroadcastHook>,
        queries: HashMap<String, QueryHandler>,
        subscribers: HashMap<SubscriptionId, Subscriber>,
    }

    impl NodeState {
        fn ensure_online(&self) -> Result<()> {
            if self.offline {
                return Err(RpcError::Transport("node offline".into()));
            }
            Ok(())
        }
    }

    /// In-memory node implementation.
    #[derive(Default)]
    pub struct MemoryNode {
        state: RwLock<NodeState>,
    }

    impl MemoryNode {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script broadcast results. Without a hook every broadcast succeeds
        /// with no tags.
        pub async fn on_broadcast<F>(&self, hook: F)
        where
            F: Fn(&TxEnvelope) -> std::result::Result<Tags, String> + Send + Sync + 'static,
        {
            self.state.write().await.on_broadcast = Some(Arc::new(hook));
        }

        /// Script the answer to a query path.
        pub async fn set_query_handler<F>(&self, path: &str, handler: F)
        where
            F: Fn(&[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync + 'static,
        {
            self.state
                .write()
                .await
                .queries
                .insert(path.to_string(), Arc::new(handler));
        }

        /// Take the node off the network, or bring it back.
        ///
        /// Going offline closes every open event stream. While offline every
        /// call fails with [`RpcError::Transport`].
        pub async fn set_offline(&self, offline: bool) {
            let mut state = self.state.write().await;
            state.offline = offline;
            if offline {
                state.subscribers.clear();
            }
        }

        /// Deliver an event to every subscriber whose query matches.
        ///
        /// Returns the number of subscribers it was delivered to.
        pub async fn publish(&self, event: Event) -> usize {
            let targets: Vec<mpsc::Sender<Event>> = {
                let state = self.state.read().await;
                state
                    .subscribers
                    .values()
                    .filter(|s| s.query.matches(event.attributes()))
                    .map(|s| s.sender.clone())
                    .collect()
            };

            let mut delivered = 0;
            for sender in targets {
                // Subscribers that went away are skipped.
                if sender.send(event.clone()).await.is_ok() {
                    delivered += 1;
                }
            }
            delivered
        }

        /// Transactions broadcast so far, in order.
        pub async fn broadcasts(&self) -> Vec<TxEnvelope> {
            self.state.read().await.broadcasts.clone()
        }

        pub async fn subscriber_count(&self) -> usize {
            self.state.read().await.subscribers.len()
        }
    }

    #[async_trait]
    impl Broadcaster for MemoryNode {
        async fn broadcast_tx(&self, tx: Vec<u8>, _mode: BroadcastMode) -> Result<ResultTx> {
            let envelope = TxEnvelope::decode(&tx).map_err(|e| RpcError::Broadcast(e.to_string()))?;
            let hook = {
                let state = self.state.read().await;
                state.ensure_online()?;
                state.on_broadcast.clone()
            };
            let tags = match hook {
                Some(hook) => hook(&envelope).map_err(RpcError::Broadcast)?,
                None => Tags::new(),
            };

            let gas = i64::try_from(envelope.fee.gas).unwrap_or(i64::MAX);
            let mut state = self.state.write().await;
            state.height += 1;
            state.broadcasts.push(envelope);

            Ok(ResultTx {
                gas_wanted: gas,
                gas_used: gas,
                tags,
                hash: blake3::hash(&tx).to_hex().to_string(),
                height: state.height,
            })
        }
    }

    #[async_trait]
    impl Querier for MemoryNode {
        async fn query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>> {
            let handler = {
                let state = self.state.read().await;
                state.ensure_online()?;
                state.queries.get(path).cloned()
            };
            let handler = handler.ok_or_else(|| RpcError::Query {
                path: path.to_string(),
                message: "unknown query path".into(),
            })?;
            handler(&data).map_err(|message| RpcError::Query {
                path: path.to_string(),
                message,
            })
        }
    }

    #[async_trait]
    impl EventTransport for MemoryNode {
        async fn subscribe(
            &self,
            id: &SubscriptionId,
            query: &str,
        ) -> Result<mpsc::Receiver<Event>> {
            let query = EventQuery::parse(query)?;
            let mut state = self.state.write().await;
            state.ensure_online()?;
            let (sender, receiver) = mpsc::channel(1000);
            state
                .subscribers
                .insert(id.clone(), Subscriber { query, sender });
            Ok(receiver)
        }

        async fn unsubscribe(&self, id: &SubscriptionId) -> Result<()> {
            self.state
                .write()
                .await
                .subscribers
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| RpcError::SubscriptionNotFound(id.to_string()))
        }
    }
}
