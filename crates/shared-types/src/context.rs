//! # Execution Contexts
//!
//! The isolated environments of the extension. They share no memory and talk
//! only through envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser tab identifier.
pub type TabId = u32;

/// One of the isolated execution environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "camelCase")]
pub enum ContextId {
    /// The injected provider (through its content script) in one tab.
    Page { tab: TabId },
    /// The service worker owning wallet state.
    Background,
    /// The popup window prompting the user.
    Popup,
}

impl ContextId {
    #[must_use]
    pub fn page(tab: TabId) -> Self {
        Self::Page { tab }
    }

    #[must_use]
    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page { .. })
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page { tab } => write!(f, "page:{tab}"),
            Self::Background => f.write_str("background"),
            Self::Popup => f.write_str("popup"),
        }
    }
}
