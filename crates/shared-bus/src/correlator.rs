//! # Request/Response Correlator
//!
//! Turns a fire-and-forget transport into awaitable request/response calls.
//!
//! ```text
//! request() ──register──► PendingRequestStore ◄──complete── node loop
//!     │                          │                              ▲
//!     └──send(Envelope)──► Transport ─ ─ ─ ─ response ─ ─ ─ ─ ─ ┘
//! ```
//!
//! Matching is strictly by correlation id; concurrent requests are
//! independent and may resolve in any order.

use crate::pending::PendingRequestStore;
use crate::transport::{Transport, TransportError};
use shared_types::status;
use shared_types::{ContextId, DomainValue, Envelope, MessageType, MessagingError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-request overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the correlator's default timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Sends requests from one context to one target context.
#[derive(Clone)]
pub struct Correlator {
    /// Pending request store shared with the node loop
    pending: Arc<PendingRequestStore>,
    /// Transport of the owning context
    transport: Arc<dyn Transport>,
    /// Context every request goes to
    target: ContextId,
    /// Default timeout
    default_timeout: Option<Duration>,
}

impl Correlator {
    pub fn new(
        pending: Arc<PendingRequestStore>,
        transport: Arc<dyn Transport>,
        target: ContextId,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            pending,
            transport,
            target,
            default_timeout,
        }
    }

    #[must_use]
    pub fn target(&self) -> &ContextId {
        &self.target
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// See [`Correlator::request_with`].
    pub async fn request(
        &self,
        message_type: MessageType,
        payload: Option<DomainValue>,
    ) -> Result<DomainValue, MessagingError> {
        self.request_with(message_type, payload, RequestOptions::default())
            .await
    }

    /// Send a request with explicit options and wait for its response.
    ///
    /// # Errors
    ///
    /// - `TransportUnavailable` if the target has no listener
    /// - `Timeout` if no response arrives in time
    /// - `ConnectionRejected` if the response is a rejection
    /// - `Decode` if the response payload is malformed
    /// - `ChannelClosed` if the pending entry vanished
    pub async fn request_with(
        &self,
        message_type: MessageType,
        payload: Option<DomainValue>,
        options: RequestOptions,
    ) -> Result<DomainValue, MessagingError> {
        let timeout = options.timeout.or(self.default_timeout);

        // Register pending request
        let (correlation_id, rx) = self.pending.register(self.target, message_type, timeout);

        let envelope = Envelope::request(message_type, correlation_id.clone(), payload.as_ref());

        if let Err(e) = self.transport.send(&self.target, envelope) {
            // Remove from pending if send fails
            self.pending.cancel(&correlation_id);
            debug!(
                correlation_id = %correlation_id,
                target = %self.target,
                error = %e,
                "Request send failed"
            );
            return Err(unavailable(e));
        }

        debug!(
            correlation_id = %correlation_id,
            from = %self.transport.context(),
            target = %self.target,
            message_type = ?message_type,
            "Sent request"
        );

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.pending.expire(&correlation_id);
                    return Err(MessagingError::Timeout {
                        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            },
            None => rx.await,
        };

        // Channel was dropped, or the target stopped listening
        let response = received.map_err(|_| MessagingError::ChannelClosed)??;

        let payload = response.envelope.decoded_payload()?;
        status::classify(payload)
    }

    /// Get pending request count
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }
}

fn unavailable(error: TransportError) -> MessagingError {
    match error {
        TransportError::NotAccessible { target } => {
            MessagingError::TransportUnavailable(target.to_string())
        }
        TransportError::Encode(e) => MessagingError::TransportUnavailable(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{InMemoryRouter, Mailbox};
    use shared_types::{CorrelationId, MessagingError};

    struct Harness {
        correlator: Correlator,
        pending: Arc<PendingRequestStore>,
        background: Mailbox,
    }

    fn harness(default_timeout: Option<Duration>) -> Harness {
        let router = InMemoryRouter::new();
        let (page, _page_box) = router.attach(ContextId::page(1), None);
        let (_bg, background) = router.attach(ContextId::Background, None);
        let pending = Arc::new(PendingRequestStore::new());
        let correlator = Correlator::new(
            Arc::clone(&pending),
            Arc::new(page),
            ContextId::Background,
            default_timeout,
        );
        Harness {
            correlator,
            pending,
            background,
        }
    }

    fn answer(pending: &PendingRequestStore, id: &CorrelationId, payload: DomainValue) -> bool {
        pending.complete(
            id,
            Envelope::response(MessageType::Result, id.clone(), Some(&payload)),
        )
    }

    #[tokio::test]
    async fn test_request_resolves_with_response_payload() {
        let mut h = harness(None);
        let correlator = h.correlator.clone();
        let call = tokio::spawn(async move { correlator.request(MessageType::Connect, None).await });

        let inbound = h.background.recv().await.unwrap();
        assert!(inbound.envelope.is_request());
        let id = inbound.envelope.correlation_id().unwrap().clone();
        assert!(answer(&h.pending, &id, "account".into()));

        assert_eq!(call.await.unwrap(), Ok(DomainValue::from("account")));
        assert_eq!(h.correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_rejections_are_classified() {
        let mut h = harness(None);

        let correlator = h.correlator.clone();
        let call = tokio::spawn(async move { correlator.request(MessageType::Connect, None).await });
        let id = h.background.recv().await.unwrap().envelope.correlation_id().unwrap().clone();
        answer(&h.pending, &id, status::REJECTION_SENTINEL);
        assert_eq!(call.await.unwrap(), Err(MessagingError::rejected()));

        let correlator = h.correlator.clone();
        let call = tokio::spawn(async move { correlator.request(MessageType::SignMessage, None).await });
        let id = h.background.recv().await.unwrap().envelope.correlation_id().unwrap().clone();
        answer(&h.pending, &id, status::rejected("User declined"));
        assert_eq!(
            call.await.unwrap(),
            Err(MessagingError::ConnectionRejected("User declined".into()))
        );
    }

    #[tokio::test]
    async fn test_unavailable_target_cancels_entry() {
        let router = InMemoryRouter::new();
        let (page, _page_box) = router.attach(ContextId::page(1), None);
        let pending = Arc::new(PendingRequestStore::new());
        let correlator = Correlator::new(
            Arc::clone(&pending),
            Arc::new(page),
            ContextId::Background,
            None,
        );

        let err = correlator.request(MessageType::Connect, None).await.unwrap_err();
        assert_eq!(err, MessagingError::TransportUnavailable("background".into()));
        assert!(err.to_string().starts_with("Not accessible"));
        assert_eq!(pending.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_cleans_up_and_late_response_is_ignored() {
        let mut h = harness(Some(Duration::from_millis(20)));

        let err = h.correlator.request(MessageType::Connect, None).await.unwrap_err();
        assert_eq!(err, MessagingError::Timeout { after_ms: 20 });
        assert_eq!(h.pending.pending_count(), 0);

        let id = h.background.recv().await.unwrap().envelope.correlation_id().unwrap().clone();
        assert!(!answer(&h.pending, &id, "late".into()));
    }

    #[tokio::test]
    async fn test_per_request_timeout_overrides_default() {
        let h = harness(None);
        let err = h
            .correlator
            .request_with(
                MessageType::Connect,
                None,
                RequestOptions::timeout(Duration::from_millis(5)),
            )
            .await
            .unwrap_err();
        assert_eq!(err, MessagingError::Timeout { after_ms: 5 });
    }

    #[tokio::test]
    async fn test_malformed_response_payload_is_decode_error() {
        let mut h = harness(None);
        let correlator = h.correlator.clone();
        let call = tokio::spawn(async move { correlator.request(MessageType::Connect, None).await });

        let id = h.background.recv().await.unwrap().envelope.correlation_id().unwrap().clone();
        let text = format!(
            r#"{{"kind":"response","type":"Result","correlationId":"{id}","payload":{{"@type":"BigInt","value":"x1"}}}}"#
        );
        h.pending.complete(&id, Envelope::from_json(&text).unwrap());

        assert!(matches!(call.await.unwrap(), Err(MessagingError::Decode(_))));
    }
}
