//! # Transport Adapter
//!
//! Moves envelopes between isolated contexts. Sending is fire-and-forget:
//! there is no retry and no acknowledgement beyond "a listener exists".
//!
//! ## In-memory router
//!
//! ```text
//!  page:1 ──┐                      ┌──► Mailbox(background)
//!  page:2 ──┼──► InMemoryRouter ───┼──► Mailbox(popup)
//!  popup  ──┘     (JSON frames)    └──► Mailbox(page:N)
//! ```
//!
//! Frames cross the router as JSON text, so only what survives
//! serialization reaches the other side. Every context owns one unbounded
//! FIFO queue; the router stamps each frame with the sender's context id and
//! origin the way a browser stamps `MessageSender`.

use dashmap::DashMap;
use shared_types::{ContextId, Envelope, MessageError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors from the send side of a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No live listener for the target context.
    #[error("Not accessible: no listener for {target}")]
    NotAccessible { target: ContextId },

    /// The envelope could not be serialized.
    #[error("Encode failure: {0}")]
    Encode(#[from] MessageError),
}

/// Send side of a context's connection.
pub trait Transport: Send + Sync {
    /// Context this transport sends from.
    fn context(&self) -> &ContextId;

    /// Deliver an envelope to another context.
    ///
    /// # Errors
    ///
    /// `TransportError::NotAccessible` when the target has no listener.
    fn send(&self, to: &ContextId, envelope: Envelope) -> Result<(), TransportError>;

    /// Whether `to` currently has a listener. Transports that cannot tell
    /// report every context as reachable.
    fn is_reachable(&self, to: &ContextId) -> bool {
        let _ = to;
        true
    }
}

/// A decoded envelope together with what the transport knows of its sender.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// Context that sent the envelope.
    pub from: ContextId,
    /// Origin (page URL origin) of the sender, if it has one.
    pub origin: Option<String>,
    pub envelope: Envelope,
}

/// Raw frame on the router.
#[derive(Debug)]
struct Frame {
    from: ContextId,
    origin: Option<String>,
    text: String,
}

/// In-process router connecting any number of contexts.
#[derive(Debug, Default)]
pub struct InMemoryRouter {
    routes: DashMap<ContextId, mpsc::UnboundedSender<Frame>>,
    frames_routed: AtomicU64,
}

impl InMemoryRouter {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connect a context. Attaching an already attached context replaces its
    /// mailbox; the old one observes end of stream.
    pub fn attach(
        self: &Arc<Self>,
        context: ContextId,
        origin: Option<String>,
    ) -> (RouterEndpoint, Mailbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.routes.insert(context, tx).is_some() {
            debug!(context = %context, "Context re-attached, previous mailbox closed");
        } else {
            debug!(context = %context, "Context attached");
        }

        let endpoint = RouterEndpoint {
            router: Arc::clone(self),
            context,
            origin,
        };
        let mailbox = Mailbox {
            context,
            receiver: rx,
        };
        (endpoint, mailbox)
    }

    /// Disconnect a context (popup window closed, tab gone).
    pub fn detach(&self, context: &ContextId) -> bool {
        let removed = self.routes.remove(context).is_some();
        if removed {
            debug!(context = %context, "Context detached");
        }
        removed
    }

    /// Whether a context currently has a live mailbox.
    #[must_use]
    pub fn is_attached(&self, context: &ContextId) -> bool {
        self.routes
            .get(context)
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Total frames delivered to a mailbox queue.
    #[must_use]
    pub fn frames_routed(&self) -> u64 {
        self.frames_routed.load(Ordering::Relaxed)
    }

    fn deliver(&self, to: &ContextId, frame: Frame) -> Result<(), TransportError> {
        let not_accessible = || TransportError::NotAccessible { target: *to };

        let sender = self.routes.get(to).map(|s| s.clone()).ok_or_else(not_accessible)?;
        sender.send(frame).map_err(|_| {
            warn!(to = %to, "Mailbox dropped, removing route");
            self.routes.remove_if(to, |_, s| s.is_closed());
            not_accessible()
        })?;

        self.frames_routed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Send side handed out by [`InMemoryRouter::attach`].
#[derive(Debug, Clone)]
pub struct RouterEndpoint {
    router: Arc<InMemoryRouter>,
    context: ContextId,
    origin: Option<String>,
}

impl RouterEndpoint {
    /// Origin stamped on frames from this endpoint.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Send text that bypasses the envelope encoder, as a foreign or buggy
    /// sender would.
    ///
    /// # Errors
    ///
    /// `TransportError::NotAccessible` when the target has no listener.
    pub fn send_raw(&self, to: &ContextId, text: impl Into<String>) -> Result<(), TransportError> {
        self.router.deliver(
            to,
            Frame {
                from: self.context,
                origin: self.origin.clone(),
                text: text.into(),
            },
        )
    }
}

impl Transport for RouterEndpoint {
    fn context(&self) -> &ContextId {
        &self.context
    }

    fn send(&self, to: &ContextId, envelope: Envelope) -> Result<(), TransportError> {
        let text = envelope.to_json()?;
        debug!(
            from = %self.context,
            to = %to,
            message_type = ?envelope.message_type(),
            kind = ?envelope.kind(),
            "Sending envelope"
        );
        self.send_raw(to, text)
    }

    fn is_reachable(&self, to: &ContextId) -> bool {
        self.router.is_attached(to)
    }
}

/// Receive side of a context.
#[derive(Debug)]
pub struct Mailbox {
    context: ContextId,
    receiver: mpsc::UnboundedReceiver<Frame>,
}

impl Mailbox {
    #[must_use]
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    /// Next decodable envelope.
    ///
    /// Frames that are not valid envelopes are logged and skipped.
    ///
    /// # Returns
    ///
    /// - `Some(inbound)` - The next envelope
    /// - `None` - The context was detached or re-attached
    pub async fn recv(&mut self) -> Option<Inbound> {
        loop {
            let frame = self.receiver.recv().await?;
            match Envelope::from_json(&frame.text) {
                Ok(envelope) => {
                    return Some(Inbound {
                        from: frame.from,
                        origin: frame.origin,
                        envelope,
                    })
                }
                Err(e) => {
                    warn!(
                        context = %self.context,
                        from = %frame.from,
                        error = %e,
                        "Dropping undecodable frame"
                    );
                }
            }
        }
    }
}
