//! Adapters for the background ports.

pub mod memory_storage;
pub mod popup_launcher;

pub use memory_storage::MemoryStorage;
pub use popup_launcher::RouterPopupLauncher;
