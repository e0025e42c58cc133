//! Structured logging helpers.
//!
//! Log lines about envelopes carry a consistent field set:
//! - `context`: context that logs (page:N, background, popup)
//! - `message_type`: envelope type
//! - `kind`: request, response or event
//! - `correlation_id`: present for requests and responses

use shared_types::{ContextId, Envelope};
use tracing::Span;

/// Span covering the handling of one envelope in one context.
#[must_use]
pub fn envelope_span(context: &ContextId, envelope: &Envelope) -> Span {
    let correlation_id = envelope
        .correlation_id()
        .map_or_else(String::new, ToString::to_string);
    tracing::info_span!(
        "envelope",
        context = %context,
        message_type = %envelope.message_type(),
        kind = ?envelope.kind(),
        correlation_id = %correlation_id,
    )
}

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    // Info level with context
    (info, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            context = %$context,
            $($($field)*,)?
            $msg
        )
    };

    // Warn level with context
    (warn, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            context = %$context,
            $($($field)*,)?
            $msg
        )
    };

    // Error level with context
    (error, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            context = %$context,
            $($($field)*,)?
            $msg
        )
    };

    // Debug level with context
    (debug, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            context = %$context,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log an envelope-related event with standard fields.
#[macro_export]
macro_rules! log_message_event {
    ($level:ident, $context:expr, $envelope:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            context = %$context,
            message_type = %$envelope.message_type(),
            kind = ?$envelope.kind(),
            correlation_id = ?$envelope.correlation_id().map(|id| id.as_str()),
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a prompt-related event with standard fields.
#[macro_export]
macro_rules! log_prompt_event {
    ($level:ident, $msg:expr, $correlation_id:expr, $origin:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            context = "popup",
            correlation_id = %$correlation_id,
            origin = ?$origin,
            $($($field)*,)?
            $msg
        )
    };
}
