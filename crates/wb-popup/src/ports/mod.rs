//! Ports of the popup context.

pub mod outbound;

pub use outbound::PromptNavigator;
