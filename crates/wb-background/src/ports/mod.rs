//! Ports of the background service.

pub mod outbound;

pub use outbound::{PopupLauncher, Storage};
