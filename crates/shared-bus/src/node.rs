//! # Context Node
//!
//! The receive loop of one context. Responses complete pending requests;
//! requests and events go to the dispatcher.
//!
//! ```text
//! Mailbox ──► ContextNode::route ──┬── response ──► PendingRequestStore::complete
//!                                  └── request/event ──► Dispatcher::dispatch
//! ```
//!
//! Between messages the loop sweeps the pending store: expired requests are
//! dropped and requests to a context that stopped listening fail with
//! `TransportUnavailable`.

use crate::config::BusConfig;
use crate::correlator::Correlator;
use crate::dispatcher::Dispatcher;
use crate::pending::PendingRequestStore;
use crate::transport::{Inbound, Mailbox, Transport};
use shared_types::{ContextId, MessageKind};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument};
use wallet_telemetry::{context_span, envelope_span};

/// Messaging state of one context: its transport, pending store and
/// dispatcher.
#[derive(Clone)]
pub struct ContextNode {
    transport: Arc<dyn Transport>,
    pending: Arc<PendingRequestStore>,
    dispatcher: Arc<Dispatcher>,
    config: BusConfig,
}

impl ContextNode {
    pub fn new(transport: Arc<dyn Transport>, config: BusConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(Arc::clone(&transport))),
            pending: Arc::new(PendingRequestStore::new()),
            transport,
            config,
        }
    }

    #[must_use]
    pub fn context(&self) -> &ContextId {
        self.transport.context()
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn pending(&self) -> &Arc<PendingRequestStore> {
        &self.pending
    }

    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Correlator for requests to `target`, sharing this node's pending store.
    #[must_use]
    pub fn correlator_to(&self, target: ContextId) -> Correlator {
        Correlator::new(
            Arc::clone(&self.pending),
            Arc::clone(&self.transport),
            target,
            self.config.default_request_timeout,
        )
    }

    /// Route one inbound envelope.
    pub fn route(&self, inbound: Inbound) {
        let _span = envelope_span(self.context(), &inbound.envelope).entered();
        match inbound.envelope.kind() {
            MessageKind::Response => {
                let Some(correlation_id) = inbound.envelope.correlation_id().cloned() else {
                    warn!(from = %inbound.from, "Response without correlation ID");
                    return;
                };
                if !self.pending.complete(&correlation_id, inbound.envelope) {
                    debug!(
                        context = %self.context(),
                        correlation_id = %correlation_id,
                        "Ignoring unmatched response"
                    );
                }
            }
            MessageKind::Request | MessageKind::Event => {
                self.dispatcher.dispatch(inbound);
            }
        }
    }

    /// Run the loop until the mailbox closes.
    pub async fn run(self, mut mailbox: Mailbox) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(context = %self.context(), "Context node started");

        loop {
            tokio::select! {
                inbound = mailbox.recv() => match inbound {
                    Some(inbound) => self.route(inbound),
                    None => break,
                },
                _ = sweep.tick() => self.sweep(),
            }
        }

        info!(context = %self.context(), "Mailbox closed, stopping context node");
    }

    /// Drop expired requests and fail those whose target is gone.
    pub fn sweep(&self) {
        let removed = self.pending.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Cleaned up expired pending requests");
        }
        let failed = self
            .pending
            .fail_unreachable(|target| self.transport.is_reachable(target));
        if failed > 0 {
            debug!(failed = failed, "Failed requests to unreachable contexts");
        }
    }

    /// Spawn the loop onto the runtime.
    pub fn spawn(&self, mailbox: Mailbox) -> JoinHandle<()> {
        let span = context_span!("context_node", context = %self.context());
        tokio::spawn(self.clone().run(mailbox).instrument(span))
    }
}
