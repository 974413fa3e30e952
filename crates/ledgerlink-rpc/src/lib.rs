//! # Ledgerlink RPC
//!
//! The client's view of a ledger node: broadcast, query and event
//! subscription contracts, the event query language, and the subscription
//! manager that drives event handlers.
//!
//! ## Overview
//!
//! The node itself is an external collaborator reached through the
//! [`Broadcaster`], [`Querier`] and [`EventTransport`] traits. Everything in
//! this crate is written against those traits, with
//! [`MemoryNode`](transport::memory::MemoryNode) for testing.
//!
//! ## Key Types
//!
//! - [`EventQueryBuilder`] / [`Condition`] - Render `key op 'value'` filters
//! - [`EventQuery`] - Parse and evaluate filters
//! - [`SubscriptionManager`] - One task per subscription, ordered delivery
//! - [`Event`] - Closed set of deliverable event payloads
//! - [`Tags`] - Result tags of transactions and blocks

pub mod error;
pub mod events;
pub mod query;
pub mod subscription;
pub mod transport;

pub use error::{Result, RpcError};
pub use events::{
    Block, BlockHeader, Event, EventDataNewBlock, EventDataNewBlockHeader, EventDataTx,
    EventDataValidatorSetUpdates, ResultBeginBlock, ResultEndBlock, ResultTx, Tag, Tags, TxResult,
    ValidatorUpdate,
};
pub use query::{Condition, EventQuery, EventQueryBuilder, Operator};
pub use subscription::{EventHandler, FnHandler, Subscription, SubscriptionId, SubscriptionManager};
pub use transport::{BroadcastMode, Broadcaster, EventTransport, Node, Querier};
