//! Prompt domain: sessions, decisions and their errors.

pub mod errors;
pub mod session;

pub use errors::PromptError;
pub use session::{PromptDecision, PromptRoute, PromptSession, PromptState};
