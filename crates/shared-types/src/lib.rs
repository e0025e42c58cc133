//! # Shared Types Crate
//!
//! Everything that crosses a context boundary of the wallet bridge: the
//! `Envelope`, the typed value codec, domain values and the error taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the page, background and popup contexts
//!   agree on the wire format by depending on this crate only.
//! - **Envelope Integrity**: `Envelope` is the sole wrapper for cross-context
//!   traffic; payloads are always codec output.
//! - **JSON-only boundary**: values that JSON cannot carry natively are
//!   tagged by the codec and revived on the other side.
//!
//! ## Data Flow
//!
//! ```text
//! DomainValue ──encode──► JSON ──Envelope──► wire ──Envelope──► JSON ──decode──► DomainValue
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod context;
pub mod correlation;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod keys;
pub mod status;
pub mod value;

pub use codec::TypeTag;
pub use context::{ContextId, TabId};
pub use correlation::CorrelationId;
pub use entities::*;
pub use envelope::{Envelope, MessageKind, MessageType};
pub use errors::*;
pub use value::{DomainValue, ValueMap};
