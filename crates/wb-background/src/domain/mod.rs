//! Background domain: connection state and errors.

pub mod allowlist;
pub mod errors;

pub use allowlist::{Allowlist, ConnectedTabs};
pub use errors::BackgroundError;
