//! # Correlation Across Contexts
//!
//! Request/response matching between a page node and a hand-driven
//! background endpoint: duplicates, strays, reordering and timeouts.

#[cfg(test)]
mod tests {
    use crate::fixtures::PATIENCE;
    use shared_bus::{
        BusConfig, ContextNode, InMemoryRouter, Mailbox, RequestOptions, RouterEndpoint, Transport,
    };
    use shared_types::{ContextId, CorrelationId, DomainValue, Envelope, MessageType, MessagingError};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const PAGE: ContextId = ContextId::Page { tab: 3 };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Pair {
        page: ContextNode,
        background: RouterEndpoint,
        background_box: Mailbox,
    }

    fn pair() -> Pair {
        let router = InMemoryRouter::new();
        let (page_endpoint, page_box) = router.attach(PAGE, Some("https://dapp.example".into()));
        let (background, background_box) = router.attach(ContextId::Background, None);
        let page = ContextNode::new(Arc::new(page_endpoint), BusConfig::default());
        page.spawn(page_box);
        Pair {
            page,
            background,
            background_box,
        }
    }

    async fn next_request(mailbox: &mut Mailbox) -> Envelope {
        timeout(PATIENCE, mailbox.recv())
            .await
            .expect("no request arrived")
            .expect("mailbox closed")
            .envelope
    }

    fn reply(background: &RouterEndpoint, request: &Envelope, payload: DomainValue) {
        let id = request.correlation_id().expect("request without id").clone();
        background
            .send(&PAGE, Envelope::response(request.message_type(), id, Some(&payload)))
            .expect("page gone");
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_duplicate_response_is_ignored() {
        let Pair { page, background, mut background_box } = pair();
        let correlator = page.correlator_to(ContextId::Background);

        let (result, ()) = tokio::join!(
            correlator.request(MessageType::GetMostRecentlySelectedAccount, None),
            async {
                let request = next_request(&mut background_box).await;
                reply(&background, &request, "first".into());
                reply(&background, &request, "second".into());
            }
        );

        assert_eq!(result, Ok("first".into()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(page.pending().pending_count(), 0);
        assert_eq!(page.pending().stats().total_completed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_unmatched_response_is_noop() {
        let Pair { page, background, mut background_box } = pair();
        background
            .send(
                &PAGE,
                Envelope::response(MessageType::Connect, CorrelationId::from("nobody"), None),
            )
            .unwrap();

        let correlator = page.correlator_to(ContextId::Background);
        let (result, ()) = tokio::join!(correlator.request(MessageType::Connect, None), async {
            let request = next_request(&mut background_box).await;
            reply(&background, &request, "acc".into());
        });
        assert_eq!(result, Ok("acc".into()));
        assert_eq!(page.pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_resolve_independently_of_order() {
        let Pair { page, background, mut background_box } = pair();
        let correlator = page.correlator_to(ContextId::Background);

        let ask = |n: u32| {
            let correlator = correlator.clone();
            async move {
                correlator
                    .request(MessageType::SignMessage, Some(n.into()))
                    .await
            }
        };

        let (a, b, c, ()) = tokio::join!(ask(1), ask(2), ask(3), async {
            let mut requests = Vec::new();
            for _ in 0..3 {
                requests.push(next_request(&mut background_box).await);
            }
            // Answer in reverse, echoing each payload
            for request in requests.iter().rev() {
                reply(&background, request, request.decoded_payload().unwrap());
            }
        });

        assert_eq!(a, Ok(1u32.into()));
        assert_eq!(b, Ok(2u32.into()));
        assert_eq!(c, Ok(3u32.into()));
    }

    #[tokio::test]
    async fn test_timeout_cleans_up_and_stale_response_is_noop() {
        let Pair { page, background, mut background_box } = pair();
        let correlator = page.correlator_to(ContextId::Background);

        let result = correlator
            .request_with(
                MessageType::Connect,
                None,
                RequestOptions::timeout(Duration::from_millis(50)),
            )
            .await;
        assert_eq!(result, Err(MessagingError::Timeout { after_ms: 50 }));
        assert_eq!(page.pending().pending_count(), 0);

        let stale = next_request(&mut background_box).await;
        reply(&background, &stale, "too late".into());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stats = page.pending().stats();
        assert_eq!(stats.total_timeouts.load(Ordering::Relaxed), 1);
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_unreachable_target_fails_fast() {
        let router = InMemoryRouter::new();
        let (page_endpoint, _page_box) = router.attach(PAGE, None);
        let page = ContextNode::new(Arc::new(page_endpoint), BusConfig::default());

        let result = page
            .correlator_to(ContextId::Background)
            .request(MessageType::Connect, None)
            .await;
        assert_eq!(
            result,
            Err(MessagingError::TransportUnavailable("background".into()))
        );
        assert_eq!(page.pending().pending_count(), 0);
    }
}
