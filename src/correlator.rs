//! Request/response correlation and inbound request dispatch.
//!
//! Outbound requests get a fresh namespaced id and a pending continuation.
//! Inbound requests are routed by message type to a registered handler, and
//! every inbound request is answered with exactly one response, handled or not.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{future::BoxFuture, stream::FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{
    error::RpcError,
    protocol::{Envelope, ViewRequest},
    transport::Outbox,
};

/// What a handler produces for an inbound request.
pub enum Reply {
    /// Result available immediately.
    Ready(Option<Value>),
    /// Result resolves later; the response is posted once it does.
    Deferred(BoxFuture<'static, Option<Value>>),
}

impl Reply {
    pub const fn empty() -> Self {
        Self::Ready(None)
    }
}

type Handler<S> = Box<dyn FnMut(&mut S, Option<Value>) -> Reply + Send>;

/// Continuation of an outbound request.
pub type Continuation = oneshot::Sender<Envelope>;

/// Completes with the host's response envelope.
///
/// Resolves to [`RpcError::Abandoned`] if the correlator is torn down, or the
/// request could not be posted, before a response arrives.
#[derive(Debug)]
pub struct ResponseHandle {
    id: String,
    rx: oneshot::Receiver<Envelope>,
}

impl ResponseHandle {
    pub(crate) const fn new(id: String, rx: oneshot::Receiver<Envelope>) -> Self {
        Self { id, rx }
    }

    /// Correlation id. Empty for requests queued through `Actions`, which get
    /// their id only when the client loop issues them.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for ResponseHandle {
    type Output = Result<Envelope, RpcError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| RpcError::Abandoned))
    }
}

/// How an inbound envelope was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A response matched a pending request.
    Resolved,
    /// A response with no pending request (late, duplicate, or never issued).
    Orphan,
    /// A request was answered immediately.
    Answered,
    /// A request handler is still running.
    Deferred,
    /// Neither request nor response.
    Violation,
}

/// Generate a correlation id: `<namespace>_<32 alphanumerics>`.
pub fn fresh_id(namespace: &str) -> String {
    format!("{namespace}_{}", Uuid::new_v4().simple())
}

/// Pending-call bookkeeping and handler table over some context `S`.
///
/// `S` is what handlers mutate, typically the state store.
pub struct Correlator<S> {
    namespace: String,
    outbox: Outbox,
    pending: HashMap<String, Continuation>,
    handlers: HashMap<String, Handler<S>>,
    deferred: FuturesUnordered<BoxFuture<'static, Envelope>>,
}

impl<S> Correlator<S> {
    pub fn new(namespace: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            namespace: namespace.into(),
            outbox,
            pending: HashMap::new(),
            handlers: HashMap::new(),
            deferred: FuturesUnordered::new(),
        }
    }

    /// Register the handler for inbound requests of `kind`, replacing any previous one.
    pub fn on<F>(&mut self, kind: &str, handler: F)
    where
        F: FnMut(&mut S, Option<Value>) -> Reply + Send + 'static,
    {
        self.handlers.insert(kind.to_string(), Box::new(handler));
    }

    /// Issue a request to the peer. Never blocks; the handle completes on a later turn.
    pub fn issue(&mut self, kind: &str, params: Option<Value>) -> ResponseHandle {
        let (tx, rx) = oneshot::channel();
        let id = self.issue_with(kind, params, tx);
        ResponseHandle::new(id, rx)
    }

    /// Issue a typed view request.
    pub fn issue_request(&mut self, request: &ViewRequest) -> ResponseHandle {
        let (tx, rx) = oneshot::channel();
        let id = self.issue_request_with(request, tx);
        ResponseHandle::new(id, rx)
    }

    /// Issue a typed view request, resolving an existing continuation.
    pub fn issue_request_with(&mut self, request: &ViewRequest, continuation: Continuation) -> String {
        match request.params() {
            Ok(params) => self.issue_with(request.kind(), params, continuation),
            Err(e) => {
                // Dropping the continuation abandons the call.
                tracing::warn!("Could not encode {} params: {e}", request.kind());
                String::new()
            }
        }
    }

    /// Issue a request whose response resolves `continuation`. Returns the id used.
    pub fn issue_with(&mut self, kind: &str, params: Option<Value>, continuation: Continuation) -> String {
        let id = fresh_id(&self.namespace);
        self.pending.insert(id.clone(), continuation);
        if self.outbox.send(Envelope::request(kind, id.clone(), params)) {
            tracing::debug!("Issued {kind} request {id}");
        } else {
            // Dropping the continuation abandons the call.
            self.pending.remove(&id);
            tracing::warn!("Could not post {kind} request {id}: {}", RpcError::ChannelClosed);
        }
        id
    }

    /// Route one inbound envelope that already passed the namespace filter.
    pub fn dispatch(&mut self, ctx: &mut S, envelope: Envelope) -> Dispatch {
        if envelope.response {
            return self.resolve(envelope);
        }
        if envelope.request {
            return self.answer(ctx, envelope);
        }
        tracing::warn!(
            "{}",
            RpcError::ProtocolMismatch(format!(
                "envelope {} ({}) is neither request nor response",
                envelope.id, envelope.kind
            ))
        );
        Dispatch::Violation
    }

    fn resolve(&mut self, envelope: Envelope) -> Dispatch {
        let Some(continuation) = self.pending.remove(&envelope.id) else {
            tracing::debug!("Dropping orphan response {}", envelope.id);
            return Dispatch::Orphan;
        };
        if continuation.send(envelope).is_err() {
            tracing::debug!("Response arrived after its handle was dropped");
        }
        Dispatch::Resolved
    }

    fn answer(&mut self, ctx: &mut S, envelope: Envelope) -> Dispatch {
        let Envelope {
            kind, id, params, ..
        } = envelope;
        let reply = match self.handlers.get_mut(&kind) {
            Some(handler) => handler(ctx, params),
            None => {
                tracing::debug!("No handler for {kind}, answering empty");
                Reply::empty()
            }
        };
        match reply {
            Reply::Ready(result) => {
                self.outbox.send(Envelope::response(&kind, id, result));
                Dispatch::Answered
            }
            Reply::Deferred(future) => {
                self.deferred.push(Box::pin(async move {
                    let result = future.await;
                    Envelope::response(&kind, id, result)
                }));
                Dispatch::Deferred
            }
        }
    }

    /// Wait for the next deferred handler to finish and post its response.
    ///
    /// Returns `None` immediately when no handler is outstanding.
    pub async fn flush_deferred(&mut self) -> Option<()> {
        let response = self.deferred.next().await?;
        self.outbox.send(response);
        Some(())
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Drop every pending continuation and outstanding handler.
    ///
    /// Waiting handles resolve to [`RpcError::Abandoned`]; nothing is sent to the peer.
    pub fn abandon_all(&mut self) {
        if !self.pending.is_empty() {
            tracing::info!("Abandoning {} pending request(s)", self.pending.len());
        }
        self.pending.clear();
        self.deferred = FuturesUnordered::new();
    }
}
