//! # Ledgerlink
//!
//! The unified client for a remote ledger: deterministic signed
//! transactions, event subscriptions, and service invocation correlated
//! with asynchronous on-ledger responses.
//!
//! ## Overview
//!
//! - **Transactions**: operations are checked, signed over canonical sign
//!   bytes, checked again as a whole and broadcast
//! - **Subscriptions**: filtered event streams delivered in emission order
//! - **Service invocation**: a request is broadcast, and its responses are
//!   routed back to a callback by request context id
//! - **Provider listeners**: requests assigned to this client are answered
//!   by registered handlers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledgerlink::{BaseTx, Client, ClientConfig, InvocationRequest};
//! use ledgerlink::cache::MemoryCache;
//! use ledgerlink::core::{AccAddress, Keypair};
//! use ledgerlink::rpc::transport::memory::MemoryNode;
//!
//! async fn example(provider: AccAddress) {
//!     let client = Client::new(
//!         ClientConfig::default(),
//!         Arc::new(MemoryNode::new()),
//!         Arc::new(Keypair::generate()),
//!         Arc::new(MemoryCache::new()),
//!     );
//!
//!     let request = InvocationRequest::new("price", vec![provider], r#"{"pair":"a/b"}"#);
//!     let invocation = client
//!         .invoke_service(request, &BaseTx::new(), |id, output| {
//!             println!("{id}: {output}");
//!         })
//!         .await
//!         .unwrap();
//!
//!     // Non-repeated invocations close their subscription on the first response.
//!     let _ = client.subscriptions().is_active(&invocation.subscription).await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ledgerlink::core` - Canonical JSON, operations, transactions, validation
//! - `ledgerlink::cache` - TTL cache
//! - `ledgerlink::rpc` - Node contracts, event queries, subscriptions

pub mod client;
pub mod error;
pub mod params;
pub mod service;

// Re-export component crates
pub use ledgerlink_cache as cache;
pub use ledgerlink_core as core;
pub use ledgerlink_rpc as rpc;

pub use client::{BaseAccount, BaseTx, Client, ClientConfig};
pub use error::{ClientError, Result};
pub use params::ParamsQuery;
pub use service::{
    CorrelationContext, Invocation, InvocationRequest, RequestContextId, ServiceRouter,
};

// Re-export commonly used core types
pub use ledgerlink_core::{AccAddress, Coin, Coins, Keypair, Msg, StdFee, StdTx};
pub use ledgerlink_rpc::{BroadcastMode, ResultTx, Subscription};
