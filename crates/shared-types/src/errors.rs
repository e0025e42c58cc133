//! # Error Types
//!
//! Error taxonomy shared by every context of the bridge.

use thiserror::Error;

/// Errors raised while reviving typed values from their JSON form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A reserved `@type` tag carried a value that could not be parsed.
    #[error("Malformed {tag} value {value:?}: {reason}")]
    MalformedValue {
        tag: &'static str,
        value: String,
        reason: String,
    },

    /// A reserved `@type` tag without a string `value` field.
    #[error("Typed value {tag} is missing its string value")]
    MissingValue { tag: &'static str },

    /// The text was not JSON at all.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

/// Errors related to envelope framing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageError {
    /// Envelope written by a newer wire format.
    #[error("Unsupported version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u16, supported: u16 },

    /// The frame was not a valid envelope.
    #[error("Malformed envelope: {0}")]
    Malformed(String),
}

/// Errors a caller of a cross-context request can observe.
///
/// Every request settles with either a value or exactly one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    /// The target context has no listener (extension inactive, popup closed).
    #[error("Not accessible: {0}")]
    TransportUnavailable(String),

    /// The user or a policy declined the request.
    #[error("{0}")]
    ConnectionRejected(String),

    /// No response arrived within the configured window.
    #[error("Request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The response payload could not be revived.
    #[error("Decode failure: {0}")]
    Decode(#[from] CodecError),

    /// The prompt was closed without an explicit decision.
    #[error("Prompt closed before a decision was made")]
    PromptAbandoned,

    /// The pending entry vanished before a response arrived.
    #[error("Response channel closed")]
    ChannelClosed,
}

impl MessagingError {
    /// Default reason used for the bare `false` rejection sentinel.
    pub const CONNECTION_REJECTED: &'static str = "Connection rejected";

    /// Shorthand for a rejection carrying the default reason.
    #[must_use]
    pub fn rejected() -> Self {
        Self::ConnectionRejected(Self::CONNECTION_REJECTED.to_string())
    }

    /// True for user/policy rejections, including abandoned prompts.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::ConnectionRejected(_) | Self::PromptAbandoned)
    }
}

/// Errors parsing domain values from their string forms.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid account address: {0}")]
    AccountAddress(String),

    #[error("Invalid contract address: {0}")]
    ContractAddress(String),

    #[error("Invalid module reference: {0}")]
    ModuleReference(String),

    #[error("Invalid CCD amount: {0}")]
    CcdAmount(String),
}
