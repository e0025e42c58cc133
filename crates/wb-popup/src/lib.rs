//! # Wallet Popup - Prompt Lifecycle
//!
//! The popup context asks the user to approve what a dApp requested.
//!
//! ## Guarantees
//!
//! - Every prompt request gets exactly one response.
//! - Closing the window or leaving a prompt answers with a rejection
//!   ("Prompt closed before a decision was made").
//! - A request whose payload cannot be decoded is rejected without a prompt.
//!
//! ## Wiring
//!
//! ```rust,ignore
//! let node = ContextNode::new(Arc::new(popup_endpoint), BusConfig::from_env());
//! let prompts = PromptManager::new(Arc::new(ui_router));
//! prompts.attach(node.dispatcher());
//! node.spawn(popup_mailbox);
//! // on window unload:
//! prompts.window_closed();
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{PromptDecision, PromptError, PromptRoute, PromptSession, PromptState};
pub use ports::PromptNavigator;
pub use service::{PromptHandle, PromptManager};
