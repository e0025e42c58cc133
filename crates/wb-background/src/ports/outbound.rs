//! Driven Ports (SPI - Outbound Dependencies)

use crate::domain::BackgroundError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use shared_types::DomainValue;

/// Opaque key-value store owned by the extension.
///
/// Values survive the background context being torn down and restarted.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a key, `None` if never set.
    async fn get(&self, key: &str) -> Result<Option<DomainValue>, BackgroundError>;

    /// Write a key.
    async fn set(&self, key: &str, value: DomainValue) -> Result<(), BackgroundError>;

    /// Every later write of `key`.
    fn subscribe(&self, key: &str) -> BoxStream<'static, DomainValue>;
}

/// Opens the popup window.
#[async_trait]
pub trait PopupLauncher: Send + Sync {
    /// Resolve once the popup context listens for messages.
    ///
    /// No timeout is applied here; callers bound the wait.
    async fn ensure_open(&self) -> Result<(), BackgroundError>;
}
