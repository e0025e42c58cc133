//! # Shared Bus - Cross-Context Messaging
//!
//! Connects the isolated contexts of the wallet (pages, background, popup).
//!
//! ## Architecture Rules
//!
//! - Contexts share no memory; everything crosses as an `Envelope`.
//! - Each context owns exactly one `PendingRequestStore` and one
//!   `Dispatcher`, both injected through its `ContextNode`.
//! - A request is settled exactly once: by its response, a transport
//!   failure, or a timeout.
//!
//! ## Request/Response Pattern
//!
//! ```text
//! ┌──────────────┐   request(Envelope)    ┌──────────────┐
//! │  Correlator  │ ─────────────────────► │  Dispatcher  │
//! │  (context A) │                        │  (context B) │
//! │              │ ◄───────────────────── │  Responder   │
//! └──────────────┘   response(same id)    └──────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod correlator;
pub mod dispatcher;
pub mod node;
pub mod pending;
pub mod transport;

// Re-export main types
pub use config::{BusConfig, ConfigError};
pub use correlator::{Correlator, RequestOptions};
pub use dispatcher::{
    Dispatcher, HandlerHandle, HandlerMode, Incoming, MessageFilter, Responder, UNANSWERED_REASON,
};
pub use node::ContextNode;
pub use pending::{PendingOutcome, PendingRequestStore, PendingResponse, PendingStats};
pub use transport::{InMemoryRouter, Inbound, Mailbox, RouterEndpoint, Transport, TransportError};
