//! Pending Request Store - bridges an outgoing request to its response.
//!
//! Maps correlation IDs to the oneshot channel the requester awaits.

use dashmap::DashMap;
use shared_types::{ContextId, CorrelationId, Envelope, MessageType, MessagingError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Response delivered to a waiting requester.
#[derive(Debug)]
pub struct PendingResponse {
    /// Correlation ID this response is for
    pub correlation_id: CorrelationId,
    /// The response envelope as received
    pub envelope: Envelope,
    /// Time between registration and completion
    pub response_time: Duration,
}

/// What a waiting requester receives: the response, or why none will come.
pub type PendingOutcome = Result<PendingResponse, MessagingError>;

/// A pending request waiting for response
struct PendingRequest {
    /// Channel to send response
    sender: oneshot::Sender<PendingOutcome>,
    /// Context the request was sent to
    target: ContextId,
    /// When request was created
    created_at: Instant,
    /// Request type (for logging)
    method: MessageType,
    /// Timeout for this request, if any
    timeout: Option<Duration>,
}

/// Statistics for pending request store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total requests completed
    pub total_completed: AtomicU64,
    /// Total requests timed out
    pub total_timeouts: AtomicU64,
    /// Total requests cancelled (send failure, dropped requester)
    pub total_cancelled: AtomicU64,
}

/// Pending request store owned by one context node.
///
/// Flow:
/// 1. Correlator calls `register()` to get an id and a oneshot receiver
/// 2. Correlator sends the request envelope carrying the id
/// 3. Node loop receives the response and calls `complete()`
/// 4. Correlator awaits the receiver or times out and calls `expire()`
#[derive(Default)]
pub struct PendingRequestStore {
    /// Map of correlation ID to pending request
    pending: DashMap<CorrelationId, PendingRequest>,
    /// Statistics
    stats: Arc<PendingStats>,
}

impl PendingRequestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request to `target` under a fresh correlation ID.
    pub fn register(
        &self,
        target: ContextId,
        method: MessageType,
        timeout: Option<Duration>,
    ) -> (CorrelationId, oneshot::Receiver<PendingOutcome>) {
        let correlation_id = CorrelationId::new();
        let (tx, rx) = oneshot::channel();

        let request = PendingRequest {
            sender: tx,
            target,
            created_at: Instant::now(),
            method,
            timeout,
        };

        self.pending.insert(correlation_id.clone(), request);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            target = %target,
            method = ?method,
            "Registered pending request"
        );

        (correlation_id, rx)
    }

    /// Complete a pending request with its response envelope.
    ///
    /// Returns true if the request was found and completed, false if unknown,
    /// already completed, expired, or the requester has gone away.
    pub fn complete(&self, correlation_id: &CorrelationId, envelope: Envelope) -> bool {
        let Some((_, pending)) = self.pending.remove(correlation_id) else {
            debug!(
                correlation_id = %correlation_id,
                "Response for unknown or expired correlation ID"
            );
            return false;
        };

        let response_time = pending.created_at.elapsed();
        let response = PendingResponse {
            correlation_id: correlation_id.clone(),
            envelope,
            response_time,
        };

        match pending.sender.send(Ok(response)) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    method = ?pending.method,
                    response_time_ms = response_time.as_millis(),
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                // Receiver was dropped (requester gave up)
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    method = ?pending.method,
                    "Pending request receiver dropped"
                );
                false
            }
        }
    }

    /// Remove a request whose requester stopped waiting after its timeout.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        if let Some((_, request)) = self.pending.remove(correlation_id) {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %correlation_id,
                method = ?request.method,
                elapsed_ms = request.created_at.elapsed().as_millis(),
                "Pending request timed out"
            );
            true
        } else {
            false
        }
    }

    /// Cancel a pending request
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove requests past their timeout and requests nobody awaits.
    ///
    /// Returns the number of requests removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, request| {
            let elapsed = now.duration_since(request.created_at);
            if request.sender.is_closed() {
                debug!(correlation_id = %id, method = ?request.method, "Removing abandoned pending request");
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                removed += 1;
                return false;
            }
            match request.timeout {
                Some(timeout) if elapsed > timeout => {
                    warn!(
                        correlation_id = %id,
                        method = ?request.method,
                        elapsed_ms = elapsed.as_millis(),
                        timeout_ms = timeout.as_millis(),
                        "Removing expired pending request"
                    );
                    self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                    removed += 1;
                    false
                }
                _ => true,
            }
        });

        removed
    }

    /// Fail every request whose target has stopped listening.
    ///
    /// The requester settles with `MessagingError::TransportUnavailable`.
    /// Returns the number of requests failed.
    pub fn fail_unreachable<F>(&self, is_reachable: F) -> usize
    where
        F: Fn(&ContextId) -> bool,
    {
        let gone: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| !is_reachable(&entry.value().target))
            .map(|entry| entry.key().clone())
            .collect();

        let mut failed = 0;
        for correlation_id in gone {
            let Some((_, request)) = self.pending.remove(&correlation_id) else {
                continue;
            };
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %correlation_id,
                target = %request.target,
                method = ?request.method,
                "Target stopped listening, failing pending request"
            );
            let _ = request
                .sender
                .send(Err(MessagingError::TransportUnavailable(request.target.to_string())));
            failed += 1;
        }
        failed
    }

    /// Get number of currently pending requests
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Get statistics
    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    /// Check if a correlation ID is pending
    #[must_use]
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }
}
