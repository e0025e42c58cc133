//! Prompt errors.

use shared_bus::TransportError;
use shared_types::{CodecError, MessageType};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PromptError {
    /// The prompt already sent its one response.
    #[error("Prompt already answered")]
    AlreadyAnswered,

    /// Only requests can open prompts.
    #[error("Only requests open prompts")]
    NotARequest,

    /// The request type has no prompt page.
    #[error("No prompt for {0}")]
    Unsupported(MessageType),

    /// The request payload could not be revived.
    #[error("Prompt payload decode failure: {0}")]
    Decode(#[from] CodecError),

    /// The response could not be delivered.
    #[error("Prompt response not delivered: {0}")]
    Transport(#[from] TransportError),
}
