//! # Outbound Ports (Driven Ports)
//!
//! What the prompt manager needs from the popup UI.

use crate::domain::PromptRoute;
use crate::service::PromptHandle;

/// UI router of the popup.
///
/// The UI shows the page for `route` and eventually calls `approve` or
/// `reject` on the handle. Navigating away without a decision should call
/// `abandon`.
pub trait PromptNavigator: Send + Sync {
    fn navigate(&self, route: PromptRoute, prompt: PromptHandle);
}
