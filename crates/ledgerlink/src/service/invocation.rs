//! Consumer side of a service invocation.
//!
//! After the request transaction is accepted, the node's result tags carry
//! the request context id. Responses are then picked out of the
//! transaction stream by action, consumer and service name, and matched
//! structurally: only `MsgRespondService` operations inside a delivered
//! transaction reach the callback, and only those whose request id was
//! issued under this invocation's request context. Other invocations of the
//! same service share the filter but never see each other's responses.
//!
//! A non-repeated invocation cancels its subscription right after the first
//! transaction that carried one of its responses. A repeated one stays open
//! until the caller unsubscribes.

use std::ops::ControlFlow;

use async_trait::async_trait;
use tracing::{debug, warn};

use ledgerlink_core::AccAddress;
use ledgerlink_rpc::query::ACTION_KEY;
use ledgerlink_rpc::{
    Condition, EventDataTx, EventHandler, EventQueryBuilder, ResultTx, Subscription,
};

use crate::error::{ClientError, Result};

use super::msgs::ServiceMsg;
use super::types::{
    RequestContextId, TAG_CONSUMER, TAG_REQUEST_CONTEXT_ID, TAG_RESPOND_SERVICE, TAG_SERVICE_NAME,
};

/// What ties an invocation to its responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    pub request_context_id: RequestContextId,
    pub consumer: AccAddress,
    pub service_name: String,
    pub repeated: bool,
}

/// A live invocation: its correlation context and the response subscription.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub context: CorrelationContext,
    pub subscription: Subscription,
}

/// Read the request context id out of a request's broadcast result.
pub fn request_context_id(result: &ResultTx) -> Result<RequestContextId> {
    let value = result.tags.value(TAG_REQUEST_CONTEXT_ID).ok_or_else(|| {
        ClientError::ProtocolViolation(format!(
            "broadcast result of {} carries no {TAG_REQUEST_CONTEXT_ID} tag",
            result.hash
        ))
    })?;
    RequestContextId::from_hex(value).map_err(|e| {
        ClientError::ProtocolViolation(format!("malformed {TAG_REQUEST_CONTEXT_ID} tag: {e}"))
    })
}

/// Filter selecting response transactions for `consumer` and `service_name`.
pub fn response_filter(consumer: &AccAddress, service_name: &str) -> EventQueryBuilder {
    EventQueryBuilder::new()
        .add_condition(Condition::key(ACTION_KEY).eq(TAG_RESPOND_SERVICE))
        .add_condition(Condition::key(TAG_CONSUMER).eq(consumer.to_string()))
        .add_condition(Condition::key(TAG_SERVICE_NAME).eq(service_name))
}

/// Routes response operations of one invocation to its callback.
pub struct ResponseDispatcher<F> {
    context: CorrelationContext,
    callback: F,
}

impl<F> ResponseDispatcher<F>
where
    F: Fn(RequestContextId, String) + Send + Sync + 'static,
{
    pub fn new(context: CorrelationContext, callback: F) -> Self {
        Self { context, callback }
    }

    /// Call back once per response operation of this context in `tx`.
    /// Returns how many.
    fn dispatch(&self, tx: &EventDataTx) -> usize {
        let id = self.context.request_context_id;
        let mut dispatched = 0;
        for raw in &tx.tx.msg {
            match ServiceMsg::from_raw(raw) {
                Ok(Some(ServiceMsg::RespondService(msg))) if id.owns_request(&msg.request_id) => {
                    (self.callback)(id, msg.output);
                    dispatched += 1;
                }
                Ok(Some(ServiceMsg::RespondService(msg))) => {
                    debug!(
                        request_context_id = %id,
                        request_id = %msg.request_id,
                        "skipping response of another request context"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(
                    tx = %tx.hash,
                    msg_type = %raw.type_name,
                    error = %e,
                    "skipping undecodable service operation"
                ),
            }
        }
        dispatched
    }
}

#[async_trait]
impl<F> EventHandler<EventDataTx> for ResponseDispatcher<F>
where
    F: Fn(RequestContextId, String) + Send + Sync + 'static,
{
    async fn handle(&self, tx: EventDataTx) -> ControlFlow<()> {
        let dispatched = self.dispatch(&tx);
        debug!(
            request_context_id = %self.context.request_context_id,
            tx = %tx.hash,
            dispatched,
            "service responses dispatched"
        );

        if dispatched > 0 && !self.context.repeated {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
