//! Subscription manager.
//!
//! Each subscription owns one tokio task that drains its event channel and
//! feeds a handler. Within a subscription events reach the handler in the
//! order the transport emitted them; across subscriptions nothing is ordered.
//!
//! Every handler invocation is spawned and awaited, so a panicking handler
//! is logged and the subscription keeps running. A handler returning
//! [`ControlFlow::Break`] cancels its own subscription.
//!
//! Cancelling never aborts a handler that is already running; it only stops
//! further deliveries.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use rand::RngCore;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, warn};

use crate::error::{Result, RpcError};
use crate::events::{
    Event, EventDataNewBlock, EventDataNewBlockHeader, EventDataTx, EventDataValidatorSetUpdates,
};
use crate::query::{
    Condition, EventQueryBuilder, EVENT_KEY, EVENT_NEW_BLOCK, EVENT_NEW_BLOCK_HEADER, EVENT_TX,
    EVENT_VALIDATOR_SET_UPDATES,
};
use crate::transport::EventTransport;

/// Opaque identifier of one subscription.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to an open subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// The full expression registered with the transport.
    pub query: String,
}

/// Receives the events of one subscription.
#[async_trait]
pub trait EventHandler<E: Send + 'static>: Send + Sync + 'static {
    /// Handle one event. Return `Break` to cancel the subscription.
    async fn handle(&self, event: E) -> ControlFlow<()>;
}

/// Adapts a synchronous closure into an [`EventHandler`].
pub struct FnHandler<F, E> {
    f: F,
    _event: PhantomData<fn(E)>,
}

impl<F, E> FnHandler<F, E>
where
    F: Fn(E) -> ControlFlow<()> + Send + Sync + 'static,
    E: Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

#[async_trait]
impl<F, E> EventHandler<E> for FnHandler<F, E>
where
    F: Fn(E) -> ControlFlow<()> + Send + Sync + 'static,
    E: Send + 'static,
{
    async fn handle(&self, event: E) -> ControlFlow<()> {
        (self.f)(event)
    }
}

/// Opens and cancels subscriptions against an [`EventTransport`].
pub struct SubscriptionManager<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    transport: Arc<T>,
    active: Mutex<HashMap<SubscriptionId, watch::Sender<bool>>>,
}

impl<T> Clone for SubscriptionManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: EventTransport + 'static> SubscriptionManager<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to new blocks matching `builder`.
    pub async fn subscribe_new_block<H>(
        &self,
        builder: EventQueryBuilder,
        handler: H,
    ) -> Result<Subscription>
    where
        H: EventHandler<EventDataNewBlock>,
    {
        let query = with_event_type(builder, EVENT_NEW_BLOCK);
        self.subscribe(query, Event::into_new_block, handler).await
    }

    /// Subscribe to transactions matching `builder`.
    pub async fn subscribe_tx<H>(
        &self,
        builder: EventQueryBuilder,
        handler: H,
    ) -> Result<Subscription>
    where
        H: EventHandler<EventDataTx>,
    {
        let query = with_event_type(builder, EVENT_TX);
        self.subscribe(query, Event::into_tx, handler).await
    }

    /// Subscribe to every new block header.
    pub async fn subscribe_new_block_header<H>(&self, handler: H) -> Result<Subscription>
    where
        H: EventHandler<EventDataNewBlockHeader>,
    {
        let query = with_event_type(EventQueryBuilder::new(), EVENT_NEW_BLOCK_HEADER);
        self.subscribe(query, Event::into_new_block_header, handler)
            .await
    }

    /// Subscribe to every validator set change.
    pub async fn subscribe_validator_set_updates<H>(&self, handler: H) -> Result<Subscription>
    where
        H: EventHandler<EventDataValidatorSetUpdates>,
    {
        let query = with_event_type(EventQueryBuilder::new(), EVENT_VALIDATOR_SET_UPDATES);
        self.subscribe(query, Event::into_validator_set_updates, handler)
            .await
    }

    /// Cancel a subscription.
    ///
    /// Unknown and already-cancelled subscriptions both return
    /// [`RpcError::SubscriptionNotFound`]. Does not wait for a handler that
    /// is currently running.
    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<()> {
        self.inner.cancel(&subscription.id).await
    }

    /// Check whether a subscription is still delivering events.
    pub async fn is_active(&self, subscription: &Subscription) -> bool {
        self.inner.active.lock().await.contains_key(&subscription.id)
    }

    /// Number of open subscriptions.
    pub async fn active_count(&self) -> usize {
        self.inner.active.lock().await.len()
    }

    async fn subscribe<E, H>(
        &self,
        query: String,
        extract: fn(Event) -> Option<E>,
        handler: H,
    ) -> Result<Subscription>
    where
        E: Send + 'static,
        H: EventHandler<E>,
    {
        let id = SubscriptionId::generate();
        let events = self.inner.transport.subscribe(&id, &query).await?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.inner.active.lock().await.insert(id.clone(), cancel_tx);
        debug!(subscription = %id, query = %query, "subscription opened");

        let inner = Arc::clone(&self.inner);
        let task_id = id.clone();
        tokio::spawn(async move {
            inner
                .run(task_id, events, cancel_rx, extract, Arc::new(handler))
                .await;
        });

        Ok(Subscription { id, query })
    }
}

impl<T: EventTransport + 'static> Inner<T> {
    async fn run<E, H>(
        &self,
        id: SubscriptionId,
        mut events: mpsc::Receiver<Event>,
        mut cancel: watch::Receiver<bool>,
        extract: fn(Event) -> Option<E>,
        handler: Arc<H>,
    ) where
        E: Send + 'static,
        H: EventHandler<E>,
    {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.changed() => break,
                next = events.recv() => match next {
                    Some(event) => event,
                    None => {
                        debug!(subscription = %id, "event stream closed");
                        self.active.lock().await.remove(&id);
                        break;
                    }
                },
            };

            let event_type = event.event_type();
            let Some(data) = extract(event) else {
                warn!(subscription = %id, event_type, "ignoring event of unexpected type");
                continue;
            };

            let handler = Arc::clone(&handler);
            match tokio::spawn(async move { handler.handle(data).await }).await {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => {
                    match self.cancel(&id).await {
                        Ok(()) | Err(RpcError::SubscriptionNotFound(_)) => {}
                        Err(e) => warn!(subscription = %id, error = %e, "unsubscribe failed"),
                    }
                    break;
                }
                Err(e) => error!(subscription = %id, error = %e, "event handler failed"),
            }
        }
    }

    async fn cancel(&self, id: &SubscriptionId) -> Result<()> {
        let Some(cancel) = self.active.lock().await.remove(id) else {
            return Err(RpcError::SubscriptionNotFound(id.to_string()));
        };
        let _ = cancel.send(true);
        debug!(subscription = %id, "subscription closed");
        self.transport.unsubscribe(id).await
    }
}

fn with_event_type(builder: EventQueryBuilder, event_type: &str) -> String {
    builder
        .add_condition(Condition::key(EVENT_KEY).eq(event_type))
        .build()
}
