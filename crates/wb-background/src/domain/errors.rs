//! Background service errors.

use shared_bus::{ConfigError, TransportError};
use shared_types::MessagingError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackgroundError {
    /// The storage backend failed.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// The popup could not be opened.
    #[error("Popup unavailable: {0}")]
    PopupUnavailable(String),

    /// The popup did not start listening in time.
    #[error("Popup did not open within {after_ms}ms")]
    LaunchTimeout { after_ms: u64 },

    /// The origin has no connection to the requested account.
    #[error("Account {account} is not connected to {origin}")]
    NotConnected { origin: String, account: String },

    /// A request arrived without the page origin.
    #[error("Request has no origin")]
    MissingOrigin,

    /// A request payload lacks a required field.
    #[error("Missing field {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
