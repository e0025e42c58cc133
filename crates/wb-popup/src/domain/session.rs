//! # Prompt Session
//!
//! Popup-side state of one pending prompt.
//!
//! ```text
//! Idle ──open──► AwaitingUserDecision ──approve/reject/close──► Answered
//! ```
//!
//! `Answered` is terminal. The state flips to `Answered` under the session
//! lock before the response leaves, so an explicit decision and a window
//! close can never both send.

use crate::domain::errors::PromptError;
use parking_lot::Mutex;
use shared_bus::Responder;
use shared_types::status;
use shared_types::{CorrelationId, DomainValue, MessageType, MessagingError};
use std::time::Instant;
use tracing::{debug, warn};
use wallet_telemetry::log_prompt_event;

/// Lifecycle state of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    Idle,
    AwaitingUserDecision,
    Answered,
}

/// Page of the popup that handles a request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRoute {
    ConnectionRequest,
    SendTransaction,
    SignMessage,
    AddTokens,
}

impl PromptRoute {
    /// Route for a request type, `None` if it never prompts.
    #[must_use]
    pub fn for_request(message_type: MessageType) -> Option<Self> {
        match message_type {
            MessageType::Connect => Some(Self::ConnectionRequest),
            MessageType::SendTransaction => Some(Self::SendTransaction),
            MessageType::SignMessage => Some(Self::SignMessage),
            MessageType::AddCis2Tokens => Some(Self::AddTokens),
            _ => None,
        }
    }

    /// Request types that open a prompt.
    pub const PROMPT_TYPES: [MessageType; 4] = [
        MessageType::Connect,
        MessageType::SendTransaction,
        MessageType::SignMessage,
        MessageType::AddCis2Tokens,
    ];
}

/// The user's answer to a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptDecision {
    Approve(DomainValue),
    Reject(String),
}

impl PromptDecision {
    /// Response payload for this decision.
    #[must_use]
    pub fn into_payload(self) -> DomainValue {
        match self {
            Self::Approve(result) => status::approved(result),
            Self::Reject(reason) => status::rejected(reason),
        }
    }
}

struct Inner {
    state: PromptState,
    responder: Option<Responder>,
}

/// One pending prompt.
pub struct PromptSession {
    correlation_id: CorrelationId,
    request_type: MessageType,
    payload: DomainValue,
    origin: Option<String>,
    opened_at: Instant,
    inner: Mutex<Inner>,
}

impl PromptSession {
    pub fn new(responder: Responder, payload: DomainValue, origin: Option<String>) -> Self {
        Self {
            correlation_id: responder.correlation_id().clone(),
            request_type: responder.request_type(),
            payload,
            origin,
            opened_at: Instant::now(),
            inner: Mutex::new(Inner {
                state: PromptState::Idle,
                responder: Some(responder),
            }),
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    #[must_use]
    pub fn request_type(&self) -> MessageType {
        self.request_type
    }

    #[must_use]
    pub fn payload(&self) -> &DomainValue {
        &self.payload
    }

    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> PromptState {
        self.inner.lock().state
    }

    /// `Idle → AwaitingUserDecision`. No-op in any other state.
    pub fn await_decision(&self) {
        let mut inner = self.inner.lock();
        if inner.state == PromptState::Idle {
            inner.state = PromptState::AwaitingUserDecision;
        }
    }

    /// Send the one response of this prompt.
    ///
    /// # Errors
    ///
    /// - `PromptError::AlreadyAnswered` if a response was already sent
    /// - `PromptError::Transport` if the requester is gone; the session is
    ///   still `Answered` afterwards
    pub fn answer(&self, payload: DomainValue) -> Result<(), PromptError> {
        let responder = {
            let mut inner = self.inner.lock();
            if inner.state == PromptState::Answered {
                return Err(PromptError::AlreadyAnswered);
            }
            inner.state = PromptState::Answered;
            inner.responder.take()
        };

        let Some(responder) = responder else {
            return Err(PromptError::AlreadyAnswered);
        };

        log_prompt_event!(
            debug,
            "Answering prompt",
            self.correlation_id,
            self.origin,
            request_type = %self.request_type,
            open_ms = self.opened_at.elapsed().as_millis()
        );
        responder.respond(payload)?;
        Ok(())
    }

    /// Answer with a synthetic rejection unless already answered.
    ///
    /// Returns true if this call sent the rejection.
    pub fn abandon(&self) -> bool {
        match self.answer(status::rejected(MessagingError::PromptAbandoned.to_string())) {
            Ok(()) => true,
            Err(PromptError::AlreadyAnswered) => false,
            Err(e) => {
                warn!(
                    correlation_id = %self.correlation_id,
                    error = %e,
                    "Synthetic rejection not delivered"
                );
                true
            }
        }
    }
}

impl std::fmt::Debug for PromptSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSession")
            .field("correlation_id", &self.correlation_id)
            .field("request_type", &self.request_type)
            .field("origin", &self.origin)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for PromptSession {
    fn drop(&mut self) {
        if self.inner.get_mut().state != PromptState::Answered {
            debug!(correlation_id = %self.correlation_id, "Unanswered prompt dropped");
            self.abandon();
        }
    }
}
