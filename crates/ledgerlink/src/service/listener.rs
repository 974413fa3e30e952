//! Provider side of a service invocation.
//!
//! A listener watches new blocks for request ids in the end-block tags,
//! fetches each request and answers the ones assigned to this provider.
//! Every request is handled on its own: a failed lookup or a panicking
//! handler skips that request and the listener moves on. Responses are
//! queued to one broadcasting task per listener so a slow node never stalls
//! block delivery, and they go out one after another so each is signed with
//! the account sequence its predecessor left behind.

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use ledgerlink_core::{AccAddress, Msg};
use ledgerlink_rpc::{EventDataNewBlock, EventHandler, Node};

use crate::client::{BaseTx, Client};

use super::msgs::MsgRespondService;
use super::types::{Request, TAG_REQUEST_ID};

/// Answers a request input with an output, or an error message.
pub type ServiceHandler = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Handlers keyed by service name.
#[derive(Clone, Default)]
pub struct ServiceRouter {
    handlers: HashMap<String, ServiceHandler>,
}

impl ServiceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for `service_name`, replacing any earlier one.
    pub fn route<F>(mut self, service_name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.handlers.insert(service_name.into(), Arc::new(handler));
        self
    }

    pub fn handler(&self, service_name: &str) -> Option<&ServiceHandler> {
        self.handlers.get(service_name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for ServiceRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Which requests a listener answers.
pub(crate) enum Routing {
    Router(ServiceRouter),
    Single {
        service_name: String,
        handler: ServiceHandler,
    },
}

impl Routing {
    fn resolve(&self, service_name: &str) -> Option<&ServiceHandler> {
        match self {
            Routing::Router(router) => router.handler(service_name),
            Routing::Single {
                service_name: name,
                handler,
            } if name == service_name => Some(handler),
            Routing::Single { .. } => None,
        }
    }
}

/// New-block handler that answers requests assigned to `provider`.
pub(crate) struct InvocationListener<N: Node + 'static> {
    client: Client<N>,
    provider: AccAddress,
    routing: Routing,
    responses: mpsc::UnboundedSender<MsgRespondService>,
}

impl<N: Node + 'static> InvocationListener<N> {
    /// Must be called inside a tokio runtime: it spawns the response queue.
    pub(crate) fn new(client: Client<N>, routing: Routing, base_tx: BaseTx) -> Self {
        let (responses, queue) = mpsc::unbounded_channel();
        tokio::spawn(send_responses(client.clone(), base_tx, queue));
        Self {
            provider: client.address(),
            client,
            routing,
            responses,
        }
    }

    /// Run the matching handler for `request`, if any.
    ///
    /// `None` when the request is not ours or the handler panicked.
    fn answer(&self, request: &Request) -> Option<MsgRespondService> {
        if request.provider != self.provider {
            return None;
        }
        let handler = self.routing.resolve(&request.service_name)?;

        let (output, error) = match catch_unwind(AssertUnwindSafe(|| handler(&request.input))) {
            Ok(Ok(output)) => (output, String::new()),
            Ok(Err(message)) => (String::new(), message),
            Err(_) => {
                error!(
                    request_id = %request.id,
                    service = %request.service_name,
                    "service handler panicked"
                );
                return None;
            }
        };

        Some(MsgRespondService {
            request_id: request.id.clone(),
            provider: self.provider,
            output,
            error,
        })
    }

    fn respond(&self, msg: MsgRespondService) {
        if let Err(unsent) = self.responses.send(msg) {
            error!(request_id = %unsent.0.request_id, "service response queue closed");
        }
    }
}

/// Broadcast queued responses in order until the listener goes away.
async fn send_responses<N: Node + 'static>(
    client: Client<N>,
    base_tx: BaseTx,
    mut queue: mpsc::UnboundedReceiver<MsgRespondService>,
) {
    while let Some(msg) = queue.recv().await {
        let request_id = msg.request_id.clone();
        let msgs: Vec<Arc<dyn Msg>> = vec![Arc::new(msg)];
        match client.broadcast(msgs, &base_tx).await {
            Ok(result) => {
                debug!(request_id = %request_id, hash = %result.hash, "service response sent")
            }
            Err(e) => {
                error!(request_id = %request_id, error = %e, "service response broadcast failed")
            }
        }
    }
    debug!(provider = %client.address(), "service response queue closed");
}

#[async_trait]
impl<N: Node + 'static> EventHandler<EventDataNewBlock> for InvocationListener<N> {
    async fn handle(&self, block: EventDataNewBlock) -> ControlFlow<()> {
        let height = block.block.header.height;
        for request_id in block.result_end_block.tags.values(TAG_REQUEST_ID) {
            let request = match self.client.query_request(request_id).await {
                Ok(request) => request,
                Err(e) => {
                    warn!(height, request_id, error = %e, "request lookup failed");
                    continue;
                }
            };
            if let Some(msg) = self.answer(&request) {
                self.respond(msg);
            }
        }
        ControlFlow::Continue(())
    }
}
