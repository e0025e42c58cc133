//! # Message Envelope
//!
//! The universal wrapper for everything that crosses a context boundary.
//!
//! ## Wire form
//!
//! ```text
//! { "version": 1, "kind": "request", "type": "Connect",
//!   "correlationId": "c1", "payload": <codec JSON> }
//! ```
//!
//! - **Versioning**: `version` makes format changes explicit. A missing field
//!   is the legacy format (version 0) and is still accepted.
//! - **Direction**: `kind` tells requests, responses and events apart, so a
//!   late response can never be replayed into a handler as a new request.
//! - **Correlation**: requests and responses carry the same `correlationId`;
//!   events never carry one. The id is the only matching key, response types
//!   may differ from request types.

use crate::codec;
use crate::correlation::CorrelationId;
use crate::errors::{CodecError, MessageError};
use crate::value::DomainValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Fixed vocabulary of envelope types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    // =========================================================================
    // PAGE → BACKGROUND → POPUP REQUESTS
    // =========================================================================
    /// Ask the wallet to connect an account to the calling origin.
    Connect,
    /// Most recently selected account, if connected to the origin.
    GetMostRecentlySelectedAccount,
    /// Sign and submit an account transaction.
    SendTransaction,
    /// Sign an arbitrary message.
    SignMessage,
    /// Track CIS-2 tokens of a contract.
    AddCis2Tokens,

    // =========================================================================
    // RESPONSES
    // =========================================================================
    /// Generic response to a request of another type.
    Result,

    // =========================================================================
    // BACKGROUND → PAGE EVENTS
    // =========================================================================
    AccountChanged,
    AccountDisconnected,
    ChainChanged,
}

impl MessageType {
    /// Types that are only ever sent as events.
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(
            self,
            Self::AccountChanged | Self::AccountDisconnected | Self::ChainChanged
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Direction of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
    Event,
}

/// An immutable envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub struct Envelope {
    version: u16,
    kind: MessageKind,
    message_type: MessageType,
    correlation_id: Option<CorrelationId>,
    payload: Option<Value>,
}

impl Envelope {
    /// Current wire format version.
    pub const CURRENT_VERSION: u16 = 1;

    /// Version assumed for envelopes without a `version` field.
    pub const LEGACY_VERSION: u16 = 0;

    /// A request expecting exactly one response with the same id.
    #[must_use]
    pub fn request(
        message_type: MessageType,
        correlation_id: CorrelationId,
        payload: Option<&DomainValue>,
    ) -> Self {
        Self::build(MessageKind::Request, message_type, Some(correlation_id), payload)
    }

    /// A response to the request carrying `correlation_id`.
    #[must_use]
    pub fn response(
        message_type: MessageType,
        correlation_id: CorrelationId,
        payload: Option<&DomainValue>,
    ) -> Self {
        Self::build(MessageKind::Response, message_type, Some(correlation_id), payload)
    }

    /// A fire-and-forget event.
    #[must_use]
    pub fn event(message_type: MessageType, payload: Option<&DomainValue>) -> Self {
        Self::build(MessageKind::Event, message_type, None, payload)
    }

    fn build(
        kind: MessageKind,
        message_type: MessageType,
        correlation_id: Option<CorrelationId>,
        payload: Option<&DomainValue>,
    ) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            kind,
            message_type,
            correlation_id,
            payload: payload.map(codec::encode),
        }
    }

    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Encoded payload as carried on the wire.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Payload revived through the codec; an absent payload is `Null`.
    ///
    /// # Errors
    ///
    /// `CodecError` when a typed value in the payload is malformed.
    pub fn decoded_payload(&self) -> Result<DomainValue, CodecError> {
        match &self.payload {
            Some(value) => codec::decode(value.clone()),
            None => Ok(DomainValue::Null),
        }
    }

    #[must_use]
    pub fn is_request(&self) -> bool {
        self.kind == MessageKind::Request
    }

    #[must_use]
    pub fn is_response(&self) -> bool {
        self.kind == MessageKind::Response
    }

    #[must_use]
    pub fn is_event(&self) -> bool {
        self.kind == MessageKind::Event
    }

    /// Serialize to wire text.
    ///
    /// # Errors
    ///
    /// `MessageError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        serde_json::to_string(self).map_err(|e| MessageError::Malformed(e.to_string()))
    }

    /// Parse wire text.
    ///
    /// # Errors
    ///
    /// `MessageError::UnsupportedVersion` for envelopes from a newer format,
    /// `MessageError::Malformed` for anything that is not an envelope.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let wire: WireEnvelope =
            serde_json::from_str(text).map_err(|e| MessageError::Malformed(e.to_string()))?;
        Self::try_from(wire)
    }
}

/// Serde representation; keeps optional fields off the wire when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    #[serde(default)]
    version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<MessageKind>,
    #[serde(rename = "type")]
    message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = MessageError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        if wire.version > Self::CURRENT_VERSION {
            return Err(MessageError::UnsupportedVersion {
                received: wire.version,
                supported: Self::CURRENT_VERSION,
            });
        }

        // Legacy envelopes have no kind: a correlation id marks a request.
        let kind = match (wire.kind, &wire.correlation_id) {
            (Some(kind), _) => kind,
            (None, Some(_)) => MessageKind::Request,
            (None, None) => MessageKind::Event,
        };

        if kind != MessageKind::Event && wire.correlation_id.is_none() {
            return Err(MessageError::Malformed(format!(
                "{kind:?} envelope without correlationId"
            )));
        }

        Ok(Self {
            version: wire.version,
            kind,
            message_type: wire.message_type,
            correlation_id: if kind == MessageKind::Event {
                None
            } else {
                wire.correlation_id
            },
            payload: wire.payload,
        })
    }
}

impl From<Envelope> for WireEnvelope {
    fn from(envelope: Envelope) -> Self {
        Self {
            version: envelope.version,
            kind: Some(envelope.kind),
            message_type: envelope.message_type,
            correlation_id: envelope.correlation_id,
            payload: envelope.payload,
        }
    }
}
