//! # Prompt Lifecycle Manager
//!
//! Opens a prompt for every prompt request reaching the popup and makes sure
//! each one is answered exactly once: by the user, or synthetically when the
//! window closes.

use crate::domain::{PromptDecision, PromptError, PromptRoute, PromptSession, PromptState};
use crate::ports::PromptNavigator;
use dashmap::DashMap;
use shared_bus::{Dispatcher, HandlerHandle, Incoming, MessageFilter};
use shared_types::{keys, CorrelationId, DomainValue, MessageType};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wallet_telemetry::{log_message_event, log_prompt_event};

type Sessions = DashMap<CorrelationId, Arc<PromptSession>>;

/// UI-facing handle of one open prompt.
#[derive(Debug, Clone)]
pub struct PromptHandle {
    session: Arc<PromptSession>,
    sessions: Arc<Sessions>,
}

impl PromptHandle {
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        self.session.correlation_id()
    }

    #[must_use]
    pub fn request_type(&self) -> MessageType {
        self.session.request_type()
    }

    /// Decoded request payload.
    #[must_use]
    pub fn payload(&self) -> &DomainValue {
        self.session.payload()
    }

    /// Origin of the page that caused the prompt.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.session
            .payload()
            .get(keys::ORIGIN)
            .and_then(DomainValue::as_str)
            .or(self.session.origin())
    }

    #[must_use]
    pub fn state(&self) -> PromptState {
        self.session.state()
    }

    /// Approve with a result value.
    ///
    /// # Errors
    ///
    /// `PromptError::AlreadyAnswered` if the prompt was answered or closed.
    pub fn approve(&self, result: DomainValue) -> Result<(), PromptError> {
        self.respond(PromptDecision::Approve(result))
    }

    /// Reject with a reason shown to the dApp.
    ///
    /// # Errors
    ///
    /// `PromptError::AlreadyAnswered` if the prompt was answered or closed.
    pub fn reject(&self, reason: impl Into<String>) -> Result<(), PromptError> {
        self.respond(PromptDecision::Reject(reason.into()))
    }

    /// Answer with an explicit decision.
    ///
    /// # Errors
    ///
    /// `PromptError::AlreadyAnswered` if the prompt was answered or closed.
    pub fn respond(&self, decision: PromptDecision) -> Result<(), PromptError> {
        let result = self.session.answer(decision.into_payload());
        self.release();
        result
    }

    /// The UI left the prompt without a decision.
    ///
    /// Returns true if this call sent the synthetic rejection.
    pub fn abandon(&self) -> bool {
        let sent = self.session.abandon();
        self.release();
        sent
    }

    fn release(&self) {
        self.sessions.remove(self.session.correlation_id());
    }
}

/// Prompt lifecycle manager of the popup context.
pub struct PromptManager {
    navigator: Arc<dyn PromptNavigator>,
    sessions: Arc<Sessions>,
}

impl PromptManager {
    pub fn new(navigator: Arc<dyn PromptNavigator>) -> Arc<Self> {
        Arc::new(Self {
            navigator,
            sessions: Arc::new(DashMap::new()),
        })
    }

    /// Register the prompt handler on the popup dispatcher.
    ///
    /// The handler does not keep the manager alive. Once the manager is
    /// dropped, requests reaching the handler are rejected unanswered.
    pub fn attach(self: &Arc<Self>, dispatcher: &Dispatcher) -> HandlerHandle {
        let manager = Arc::downgrade(self);
        dispatcher.handle(
            MessageFilter::types(PromptRoute::PROMPT_TYPES).requests(),
            move |incoming| {
                let manager = manager.upgrade();
                async move {
                    let Some(manager) = manager else {
                        debug!("Prompt manager gone");
                        return;
                    };
                    if let Err(e) = manager.open(incoming) {
                        warn!(error = %e, "Prompt not opened");
                    }
                }
            },
        )
    }

    /// Open a prompt for an inbound request.
    ///
    /// A payload that cannot be decoded is rejected right away and opens no
    /// prompt.
    ///
    /// # Errors
    ///
    /// `PromptError` when no prompt was opened.
    pub fn open(&self, mut incoming: Incoming) -> Result<PromptHandle, PromptError> {
        let Some(responder) = incoming.take_responder() else {
            return Err(PromptError::NotARequest);
        };

        log_message_event!(debug, "popup", incoming.envelope(), "Prompt request received");

        let request_type = responder.request_type();
        let Some(route) = PromptRoute::for_request(request_type) else {
            responder.reject(format!("No prompt for {request_type}"))?;
            return Err(PromptError::Unsupported(request_type));
        };

        let payload = match incoming.payload() {
            Ok(payload) => payload,
            Err(e) => {
                log_prompt_event!(
                    warn,
                    "Undecodable prompt payload, rejecting",
                    responder.correlation_id(),
                    incoming.origin(),
                    error = %e
                );
                responder.reject(e.to_string())?;
                return Err(PromptError::Decode(e));
            }
        };

        let session = Arc::new(PromptSession::new(
            responder,
            payload,
            incoming.inbound.origin.clone(),
        ));
        self.sessions
            .insert(session.correlation_id().clone(), Arc::clone(&session));
        session.await_decision();

        let handle = PromptHandle {
            session,
            sessions: Arc::clone(&self.sessions),
        };

        log_prompt_event!(
            info,
            "Prompt opened",
            handle.correlation_id(),
            handle.origin(),
            route = ?route
        );
        self.navigator.navigate(route, handle.clone());
        Ok(handle)
    }

    /// The popup window closed: every open prompt gets a synthetic
    /// rejection.
    ///
    /// Returns the number of rejections sent.
    pub fn window_closed(&self) -> usize {
        let open: Vec<Arc<PromptSession>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.sessions.clear();

        let rejected = open.iter().filter(|session| session.abandon()).count();
        if rejected > 0 {
            info!(rejected = rejected, "Popup closed with open prompts");
        } else {
            debug!("Popup closed");
        }
        rejected
    }

    /// Number of prompts awaiting a decision.
    #[must_use]
    pub fn open_prompts(&self) -> usize {
        self.sessions.len()
    }
}

impl Drop for PromptManager {
    fn drop(&mut self) {
        self.window_closed();
    }
}
