//! `PopupLauncher` over the in-memory router.

use crate::domain::BackgroundError;
use crate::ports::PopupLauncher;
use async_trait::async_trait;
use shared_bus::InMemoryRouter;
use shared_types::ContextId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type OpenWindow = Box<dyn Fn() -> Result<(), BackgroundError> + Send + Sync>;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Opens the popup window and waits until the popup context is attached to
/// the router.
pub struct RouterPopupLauncher {
    router: Arc<InMemoryRouter>,
    open_window: OpenWindow,
    poll_interval: Duration,
    /// Set while a window is being opened, so concurrent callers wait on
    /// the same window
    launching: AtomicBool,
}

/// Clears the launching flag when the launching caller finishes, fails or
/// is cancelled.
struct LaunchGuard<'a>(&'a AtomicBool);

impl Drop for LaunchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RouterPopupLauncher {
    pub fn new<F>(router: Arc<InMemoryRouter>, open_window: F) -> Self
    where
        F: Fn() -> Result<(), BackgroundError> + Send + Sync + 'static,
    {
        Self {
            router,
            open_window: Box::new(open_window),
            poll_interval: DEFAULT_POLL_INTERVAL,
            launching: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn is_open(&self) -> bool {
        self.router.is_attached(&ContextId::Popup)
    }
}

#[async_trait]
impl PopupLauncher for RouterPopupLauncher {
    async fn ensure_open(&self) -> Result<(), BackgroundError> {
        if self.is_open() {
            return Ok(());
        }

        let _guard = if self.launching.swap(true, Ordering::AcqRel) {
            None
        } else {
            let guard = LaunchGuard(&self.launching);
            info!("Opening popup window");
            (self.open_window)()?;
            Some(guard)
        };

        while !self.is_open() {
            tokio::time::sleep(self.poll_interval).await;
        }
        debug!("Popup is listening");
        Ok(())
    }
}
