//! In-memory `Storage` adapter.

use crate::domain::BackgroundError;
use crate::ports::Storage;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::RwLock;
use shared_types::DomainValue;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Key-value store kept in process memory.
pub struct MemoryStorage {
    values: RwLock<HashMap<String, DomainValue>>,
    changes: broadcast::Sender<(String, DomainValue)>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create with a custom change-channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            values: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<DomainValue>, BackgroundError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: DomainValue) -> Result<(), BackgroundError> {
        self.values.write().insert(key.to_string(), value.clone());
        debug!(key = key, "Storage updated");
        // No subscribers is fine
        let _ = self.changes.send((key.to_string(), value));
        Ok(())
    }

    fn subscribe(&self, key: &str) -> BoxStream<'static, DomainValue> {
        let key = key.to_string();
        BroadcastStream::new(self.changes.subscribe())
            .filter_map(
                move |change: Result<(String, DomainValue), BroadcastStreamRecvError>| {
                    let value = match change {
                        Ok((changed, value)) if changed == key => Some(value),
                        Ok(_) => None,
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            warn!(key = %key, skipped = skipped, "Storage subscriber lagged");
                            None
                        }
                    };
                    futures::future::ready(value)
                },
            )
            .boxed()
    }
}
