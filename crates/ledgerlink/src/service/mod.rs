//! The service module: request/response invocation between consumers and
//! providers.
//!
//! ## Consumer
//!
//! [`Client::invoke_service`] broadcasts a `MsgRequestService`, reads the
//! request context id from the result tags and subscribes to the matching
//! responses. The callback receives every response output together with the
//! request context id.
//!
//! ## Provider
//!
//! [`Client::register_invocation_listener`] and
//! [`Client::register_single_invocation_listener`] answer requests assigned
//! to this client's address as they appear in new blocks.

pub mod invocation;
pub mod listener;
pub mod msgs;
pub mod types;

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use ledgerlink_core::types::as_base64;
use ledgerlink_core::Msg;
use ledgerlink_rpc::{EventQueryBuilder, Node, ResultTx, Subscription};

use crate::client::{BaseTx, Client};
use crate::error::Result;

pub use invocation::{CorrelationContext, Invocation, ResponseDispatcher};
pub use listener::{ServiceHandler, ServiceRouter};
pub use msgs::{
    register_codec, MsgKillRequestContext, MsgPauseRequestContext, MsgRequestService,
    MsgRespondService, MsgStartRequestContext, ServiceMsg,
};
pub use types::{InvocationRequest, Request, RequestContext, RequestContextId, Response};

use listener::{InvocationListener, Routing};

pub const REQUEST_QUERY_PATH: &str = "custom/service/request";
pub const REQUEST_CONTEXT_QUERY_PATH: &str = "custom/service/context";
pub const RESPONSE_QUERY_PATH: &str = "custom/service/response";

#[derive(Serialize)]
struct RequestIdParams<'a> {
    #[serde(rename = "RequestID")]
    request_id: &'a str,
}

#[derive(Serialize)]
struct RequestContextParams {
    #[serde(rename = "RequestContextID", with = "as_base64")]
    request_context_id: Vec<u8>,
}

impl<N: Node + 'static> Client<N> {
    // ─────────────────────────────────────────────────────────────────────────
    // Consumer
    // ─────────────────────────────────────────────────────────────────────────

    /// Request a service and route its responses to `callback`.
    ///
    /// A request is answered once unless it is `repeated`, in which case
    /// the subscription stays open until the caller unsubscribes through
    /// [`Client::subscriptions`]. A broadcast result without a well-formed
    /// request context id fails with
    /// [`ClientError::ProtocolViolation`](crate::ClientError::ProtocolViolation).
    pub async fn invoke_service<F>(
        &self,
        request: InvocationRequest,
        base_tx: &BaseTx,
        callback: F,
    ) -> Result<Invocation>
    where
        F: Fn(RequestContextId, String) + Send + Sync + 'static,
    {
        let consumer = self.address();
        let service_name = request.service_name.clone();
        let repeated = request.repeated;

        let msgs: Vec<Arc<dyn Msg>> = vec![Arc::new(request.into_msg(consumer))];
        let result = self.broadcast(msgs, base_tx).await?;

        let context = CorrelationContext {
            request_context_id: invocation::request_context_id(&result)?,
            consumer,
            service_name,
            repeated,
        };
        let filter = invocation::response_filter(&consumer, &context.service_name);
        let subscription = self
            .subscriptions()
            .subscribe_tx(filter, ResponseDispatcher::new(context.clone(), callback))
            .await?;

        info!(
            request_context_id = %context.request_context_id,
            service = %context.service_name,
            repeated,
            "service invoked"
        );
        Ok(Invocation {
            context,
            subscription,
        })
    }

    /// Resume a paused request context.
    pub async fn start_request_context(
        &self,
        id: &RequestContextId,
        base_tx: &BaseTx,
    ) -> Result<ResultTx> {
        let msg = MsgStartRequestContext::new(id, self.address());
        let msgs: Vec<Arc<dyn Msg>> = vec![Arc::new(msg)];
        self.broadcast(msgs, base_tx).await
    }

    /// Suspend a running request context.
    pub async fn pause_request_context(
        &self,
        id: &RequestContextId,
        base_tx: &BaseTx,
    ) -> Result<ResultTx> {
        let msg = MsgPauseRequestContext::new(id, self.address());
        let msgs: Vec<Arc<dyn Msg>> = vec![Arc::new(msg)];
        self.broadcast(msgs, base_tx).await
    }

    /// Terminate a request context.
    pub async fn kill_request_context(
        &self,
        id: &RequestContextId,
        base_tx: &BaseTx,
    ) -> Result<ResultTx> {
        let msg = MsgKillRequestContext::new(id, self.address());
        let msgs: Vec<Arc<dyn Msg>> = vec![Arc::new(msg)];
        self.broadcast(msgs, base_tx).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Provider
    // ─────────────────────────────────────────────────────────────────────────

    /// Answer requests for every service in `router`.
    pub async fn register_invocation_listener(
        &self,
        router: ServiceRouter,
        base_tx: BaseTx,
    ) -> Result<Subscription> {
        self.listen(Routing::Router(router), base_tx).await
    }

    /// Answer requests for `service_name` with `handler`.
    pub async fn register_single_invocation_listener<F>(
        &self,
        service_name: impl Into<String>,
        handler: F,
        base_tx: BaseTx,
    ) -> Result<Subscription>
    where
        F: Fn(&str) -> std::result::Result<String, String> + Send + Sync + 'static,
    {
        let routing = Routing::Single {
            service_name: service_name.into(),
            handler: Arc::new(handler),
        };
        self.listen(routing, base_tx).await
    }

    async fn listen(&self, routing: Routing, base_tx: BaseTx) -> Result<Subscription> {
        let listener = InvocationListener::new(self.clone(), routing, base_tx);
        let subscription = self
            .subscriptions()
            .subscribe_new_block(EventQueryBuilder::new(), listener)
            .await?;
        info!(provider = %self.address(), "invocation listener registered");
        Ok(subscription)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch an active request.
    pub async fn query_request(&self, request_id: &str) -> Result<Request> {
        self.query_json(REQUEST_QUERY_PATH, &RequestIdParams { request_id })
            .await
    }

    /// Fetch a request context.
    pub async fn query_request_context(&self, id: &RequestContextId) -> Result<RequestContext> {
        let params = RequestContextParams {
            request_context_id: id.as_bytes().to_vec(),
        };
        self.query_json(REQUEST_CONTEXT_QUERY_PATH, &params).await
    }

    /// Fetch the response to a request.
    pub async fn query_response(&self, request_id: &str) -> Result<Response> {
        self.query_json(RESPONSE_QUERY_PATH, &RequestIdParams { request_id })
            .await
    }
}
