//! # Response Status
//!
//! Shapes a response payload can take besides a bare value:
//!
//! - `false`: the rejection sentinel.
//! - `{ "success": true, "result": r }`: approved, resolves to `r`.
//! - `{ "success": false, "message": m }`: declined with reason `m`.
//!
//! Anything else is returned to the caller as is.

use crate::errors::MessagingError;
use crate::value::DomainValue;

pub const SUCCESS_KEY: &str = "success";
pub const RESULT_KEY: &str = "result";
pub const MESSAGE_KEY: &str = "message";

/// Payload answering a request with a plain rejection.
pub const REJECTION_SENTINEL: DomainValue = DomainValue::Bool(false);

/// Status wrapper for an approved request.
#[must_use]
pub fn approved(result: DomainValue) -> DomainValue {
    DomainValue::object([(SUCCESS_KEY, true.into()), (RESULT_KEY, result)])
}

/// Status wrapper for a declined request.
#[must_use]
pub fn rejected(message: impl Into<String>) -> DomainValue {
    DomainValue::object([
        (SUCCESS_KEY, false.into()),
        (MESSAGE_KEY, DomainValue::String(message.into())),
    ])
}

/// Turn a decoded response payload into the caller-visible outcome.
///
/// # Errors
///
/// `MessagingError::ConnectionRejected` for the sentinel and for declined
/// status wrappers.
pub fn classify(payload: DomainValue) -> Result<DomainValue, MessagingError> {
    if payload == REJECTION_SENTINEL {
        return Err(MessagingError::rejected());
    }

    let DomainValue::Object(mut map) = payload else {
        return Ok(payload);
    };

    match map.get(SUCCESS_KEY).and_then(DomainValue::as_bool) {
        Some(true) => Ok(map.remove(RESULT_KEY).unwrap_or_default()),
        Some(false) => {
            let message = map
                .get(MESSAGE_KEY)
                .and_then(DomainValue::as_str)
                .unwrap_or(MessagingError::CONNECTION_REJECTED);
            Err(MessagingError::ConnectionRejected(message.to_string()))
        }
        None => Ok(DomainValue::Object(map)),
    }
}
