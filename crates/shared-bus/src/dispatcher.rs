//! # Handler Registry / Dispatcher
//!
//! Routes inbound requests and events to registered handlers.
//!
//! ## Semantics
//!
//! - Registrations are evaluated in registration order; every match runs.
//! - `Once` registrations are removed before their callback runs, so they
//!   fire at most once even under concurrent dispatch.
//! - Handlers start in place, in arrival order and then registration order,
//!   and run up to their first suspension point. Only a handler that has to
//!   wait (on a user prompt, say) moves to its own task, so it never blocks
//!   the context loop and never reorders the messages behind it.
//! - A request reaches its handlers together with a single-use
//!   [`Responder`]. When several handlers match, only the first response is
//!   sent.
//! - Every request gets a response. A request no handler matches is rejected
//!   at once; one whose responders are all dropped unanswered is rejected
//!   when the last one goes.

use crate::transport::{Inbound, Transport, TransportError};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use shared_types::status;
use shared_types::{
    CodecError, ContextId, CorrelationId, DomainValue, Envelope, MessageKind, MessageType,
    MessagingError,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::Context;
use tracing::{debug, warn};

/// Boxed future returned by handler callbacks.
pub type HandlerFuture = BoxFuture<'static, ()>;

/// Handler callback.
pub type Callback = Arc<dyn Fn(Incoming) -> HandlerFuture + Send + Sync>;

/// Extra condition evaluated after the filter matched.
pub type Predicate = Arc<dyn Fn(&Inbound) -> bool + Send + Sync>;

/// Whether a registration survives its first invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerMode {
    Once,
    Persistent,
}

/// Selects envelopes by type and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    /// Message types to match (empty = all types).
    pub types: Vec<MessageType>,
    /// Envelope kinds to match.
    pub kinds: Vec<MessageKind>,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl MessageFilter {
    /// Every request and event.
    #[must_use]
    pub fn all() -> Self {
        Self {
            types: Vec::new(),
            kinds: vec![MessageKind::Request, MessageKind::Event],
        }
    }

    /// Requests and events of the given types.
    #[must_use]
    pub fn types(types: impl IntoIterator<Item = MessageType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Self::all()
        }
    }

    /// Requests and events of one type.
    #[must_use]
    pub fn message_type(message_type: MessageType) -> Self {
        Self::types([message_type])
    }

    /// Restrict to requests.
    #[must_use]
    pub fn requests(mut self) -> Self {
        self.kinds = vec![MessageKind::Request];
        self
    }

    /// Restrict to events.
    #[must_use]
    pub fn events(mut self) -> Self {
        self.kinds = vec![MessageKind::Event];
        self
    }

    /// Check if an envelope matches this filter.
    #[must_use]
    pub fn matches(&self, envelope: &Envelope) -> bool {
        let type_match = self.types.is_empty() || self.types.contains(&envelope.message_type());
        let kind_match = self.kinds.contains(&envelope.kind());
        type_match && kind_match
    }
}

/// What a handler receives.
#[derive(Debug)]
pub struct Incoming {
    pub inbound: Inbound,
    /// Present for requests only.
    pub responder: Option<Responder>,
}

impl Incoming {
    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.inbound.envelope
    }

    #[must_use]
    pub fn from(&self) -> &ContextId {
        &self.inbound.from
    }

    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.inbound.origin.as_deref()
    }

    /// Decoded payload of the envelope.
    ///
    /// # Errors
    ///
    /// `CodecError` when the payload holds malformed typed values.
    pub fn payload(&self) -> Result<DomainValue, CodecError> {
        self.inbound.envelope.decoded_payload()
    }

    /// Take the responder out, leaving `None`.
    pub fn take_responder(&mut self) -> Option<Responder> {
        self.responder.take()
    }
}

/// Reason sent for a request whose responders were all dropped unanswered.
pub const UNANSWERED_REASON: &str = "Request dropped without a response";

/// Single-use reply channel for one inbound request.
///
/// All responders handed out for one request share a single reply.
pub struct Responder {
    reply: Arc<Reply>,
}

/// The one response owed for a request.
struct Reply {
    transport: Arc<dyn Transport>,
    to: ContextId,
    correlation_id: CorrelationId,
    request_type: MessageType,
    answered: AtomicBool,
}

impl Reply {
    fn send(&self, message_type: MessageType, payload: &DomainValue) -> Result<bool, TransportError> {
        if self.answered.swap(true, Ordering::AcqRel) {
            debug!(
                correlation_id = %self.correlation_id,
                "Request already answered, dropping response"
            );
            return Ok(false);
        }

        let envelope = Envelope::response(message_type, self.correlation_id.clone(), Some(payload));
        self.transport.send(&self.to, envelope)?;
        debug!(
            correlation_id = %self.correlation_id,
            to = %self.to,
            message_type = ?message_type,
            "Sent response"
        );
        Ok(true)
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if self.answered.load(Ordering::Acquire) {
            return;
        }
        warn!(
            correlation_id = %self.correlation_id,
            message_type = ?self.request_type,
            "Request left unanswered, rejecting"
        );
        if let Err(e) = self.send(self.request_type, &status::rejected(UNANSWERED_REASON)) {
            debug!(correlation_id = %self.correlation_id, error = %e, "Rejection not delivered");
        }
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("to", &self.reply.to)
            .field("correlation_id", &self.reply.correlation_id)
            .field("request_type", &self.reply.request_type)
            .field("answered", &self.is_answered())
            .finish()
    }
}

impl Responder {
    /// Build a responder for a request envelope. `None` for anything else.
    #[must_use]
    pub fn for_request(transport: Arc<dyn Transport>, inbound: &Inbound) -> Option<Self> {
        if !inbound.envelope.is_request() {
            return None;
        }
        let correlation_id = inbound.envelope.correlation_id()?.clone();
        Some(Self {
            reply: Arc::new(Reply {
                transport,
                to: inbound.from,
                correlation_id,
                request_type: inbound.envelope.message_type(),
                answered: AtomicBool::new(false),
            }),
        })
    }

    fn share(&self) -> Self {
        Self {
            reply: Arc::clone(&self.reply),
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.reply.correlation_id
    }

    #[must_use]
    pub fn request_type(&self) -> MessageType {
        self.reply.request_type
    }

    /// Whether a response for this request has already been sent.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.reply.answered.load(Ordering::Acquire)
    }

    /// Answer with a response of the request's own type.
    ///
    /// Returns false if another responder for the same request already
    /// answered.
    ///
    /// # Errors
    ///
    /// `TransportError` if the requester is gone.
    pub fn respond(self, payload: DomainValue) -> Result<bool, TransportError> {
        let message_type = self.reply.request_type;
        self.respond_with_type(message_type, payload)
    }

    /// Answer with a response of an explicit type.
    ///
    /// # Errors
    ///
    /// `TransportError` if the requester is gone.
    pub fn respond_with_type(
        self,
        message_type: MessageType,
        payload: DomainValue,
    ) -> Result<bool, TransportError> {
        self.reply.send(message_type, &payload)
    }

    /// Answer with a declined status wrapper carrying `reason`.
    ///
    /// # Errors
    ///
    /// `TransportError` if the requester is gone.
    pub fn reject(self, reason: impl Into<String>) -> Result<bool, TransportError> {
        self.respond(status::rejected(reason))
    }
}

struct Registration {
    id: u64,
    filter: MessageFilter,
    predicate: Option<Predicate>,
    callback: Callback,
    mode: HandlerMode,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Registration>,
    next_id: u64,
}

impl Registry {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }
}

/// Handle to a registration.
///
/// Dropping the handle does not unregister; call [`HandlerHandle::unsubscribe`].
#[derive(Debug, Clone)]
pub struct HandlerHandle {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl HandlerHandle {
    /// Remove the registration. Safe to call repeatedly, after a once
    /// handler fired, or after the dispatcher is gone.
    ///
    /// Returns true if this call removed it.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.lock().remove(self.id);
        if removed {
            debug!(handler_id = self.id, "Handler unsubscribed");
        }
        removed
    }

    /// Whether the registration is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.lock().entries.iter().any(|e| e.id == self.id))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// Handler registry of one context.
pub struct Dispatcher {
    registry: Arc<Mutex<Registry>>,
    /// Used to answer requests
    transport: Arc<dyn Transport>,
    /// Total envelopes dispatched
    dispatched: AtomicU64,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            transport,
            dispatched: AtomicU64::new(0),
        }
    }

    /// Register a persistent handler.
    pub fn handle<F, Fut>(&self, filter: MessageFilter, callback: F) -> HandlerHandle
    where
        F: Fn(Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(filter, None, boxed(callback), HandlerMode::Persistent)
    }

    /// Register a handler removed before its first invocation.
    pub fn handle_once<F, Fut>(&self, filter: MessageFilter, callback: F) -> HandlerHandle
    where
        F: Fn(Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(filter, None, boxed(callback), HandlerMode::Once)
    }

    /// Register a handler with an extra predicate.
    ///
    /// The predicate runs while the registry is locked and must not call
    /// back into this dispatcher.
    pub fn handle_with<P, F, Fut>(
        &self,
        filter: MessageFilter,
        predicate: P,
        callback: F,
        mode: HandlerMode,
    ) -> HandlerHandle
    where
        P: Fn(&Inbound) -> bool + Send + Sync + 'static,
        F: Fn(Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(filter, Some(Arc::new(predicate)), boxed(callback), mode)
    }

    fn register(
        &self,
        filter: MessageFilter,
        predicate: Option<Predicate>,
        callback: Callback,
        mode: HandlerMode,
    ) -> HandlerHandle {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;

        debug!(handler_id = id, types = ?filter.types, mode = ?mode, "Handler registered");

        registry.entries.push(Registration {
            id,
            filter,
            predicate,
            callback,
            mode,
        });

        HandlerHandle {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every matching handler, in registration order.
    ///
    /// Returns the number of handlers invoked. A request that matches no
    /// handler is rejected with a "Not accessible" reason. Must be called
    /// inside a tokio runtime.
    pub fn dispatch(&self, inbound: Inbound) -> usize {
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        let matched: Vec<Callback> = {
            let mut registry = self.registry.lock();
            let mut matched = Vec::new();
            registry.entries.retain(|entry| {
                let is_match = entry.filter.matches(&inbound.envelope)
                    && entry.predicate.as_ref().map_or(true, |p| p(&inbound));
                if is_match {
                    matched.push(Arc::clone(&entry.callback));
                }
                !(is_match && entry.mode == HandlerMode::Once)
            });
            matched
        };

        if matched.is_empty() {
            warn!(
                from = %inbound.from,
                message_type = ?inbound.envelope.message_type(),
                kind = ?inbound.envelope.kind(),
                "No handler for inbound message"
            );
            if let Some(responder) = Responder::for_request(Arc::clone(&self.transport), &inbound) {
                let reason = MessagingError::TransportUnavailable(format!(
                    "no handler for {}",
                    inbound.envelope.message_type()
                ));
                if let Err(e) = responder.reject(reason.to_string()) {
                    debug!(error = %e, "Rejection not delivered");
                }
            }
            return 0;
        }

        let responder = Responder::for_request(Arc::clone(&self.transport), &inbound);
        let count = matched.len();
        for callback in matched {
            let incoming = Incoming {
                inbound: inbound.clone(),
                responder: responder.as_ref().map(Responder::share),
            };
            start(callback(incoming));
        }

        debug!(
            from = %inbound.from,
            message_type = ?inbound.envelope.message_type(),
            handlers = count,
            "Dispatched inbound message"
        );
        count
    }

    /// Number of active registrations.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Total envelopes passed to `dispatch`.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}

/// Poll a handler once in place; only a handler that has to wait is handed
/// to the runtime.
fn start(mut handler: HandlerFuture) {
    let mut cx = Context::from_waker(futures::task::noop_waker_ref());
    if handler.as_mut().poll(&mut cx).is_pending() {
        tokio::spawn(handler);
    }
}

fn boxed<F, Fut>(callback: F) -> Callback
where
    F: Fn(Incoming) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |incoming| -> HandlerFuture { Box::pin(callback(incoming)) })
}
