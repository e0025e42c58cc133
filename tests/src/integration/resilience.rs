//! # Resilience
//!
//! Malformed and foreign traffic is dropped locally; every other request
//! keeps being served and settles, even when nothing can answer it.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Wallet, DAPP_ORIGIN, DAPP_TAB, PATIENCE};
    use shared_bus::{BusConfig, Mailbox, RouterEndpoint, Transport};
    use shared_types::{status, ContextId, DomainValue, Envelope, MessageType, MessagingError};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use wb_provider::{EventKind, OutboundRequest, ProviderError};

    const RAW_TAB: u32 = 2;

    /// A second tab that writes raw frames.
    fn raw_page(wallet: &Wallet) -> (RouterEndpoint, Mailbox) {
        wallet
            .router
            .attach(ContextId::page(RAW_TAB), Some(DAPP_ORIGIN.into()))
    }

    async fn next(mailbox: &mut Mailbox) -> Envelope {
        timeout(PATIENCE, mailbox.recv())
            .await
            .expect("no answer")
            .expect("mailbox closed")
            .envelope
    }

    async fn quiet(mailbox: &mut Mailbox) -> bool {
        timeout(Duration::from_millis(50), mailbox.recv()).await.is_err()
    }

    #[tokio::test]
    async fn test_garbage_frames_do_not_stop_background() {
        let wallet = Wallet::start();
        let (raw, _raw_box) = raw_page(&wallet);

        raw.send_raw(&ContextId::Background, "not json").unwrap();
        raw.send_raw(&ContextId::Background, r#"{"type":"NoSuchMessage"}"#).unwrap();
        raw.send_raw(&ContextId::Background, r#"{"kind":"response","type":"Connect"}"#)
            .unwrap();

        assert_eq!(wallet.provider.get_most_recently_selected_account().await, Ok(None));
    }

    #[tokio::test]
    async fn test_future_version_dropped_legacy_served() {
        let wallet = Wallet::start();
        let (raw, mut raw_box) = raw_page(&wallet);

        raw.send_raw(
            &ContextId::Background,
            r#"{"version":2,"kind":"request","type":"Connect","correlationId":"future"}"#,
        )
        .unwrap();
        assert!(quiet(&mut raw_box).await);
        assert_eq!(wallet.prompts.open_prompts(), 0);

        raw.send_raw(
            &ContextId::Background,
            r#"{"type":"GetMostRecentlySelectedAccount","correlationId":"legacy"}"#,
        )
        .unwrap();
        let answer = next(&mut raw_box).await;
        assert!(answer.is_response());
        assert_eq!(answer.correlation_id().unwrap().as_str(), "legacy");
        assert_eq!(answer.decoded_payload().unwrap(), DomainValue::Null);
    }

    #[tokio::test]
    async fn test_undecodable_payload_answered_with_rejection() {
        let wallet = Wallet::start();
        let (raw, mut raw_box) = raw_page(&wallet);

        raw.send_raw(
            &ContextId::Background,
            r#"{"kind":"request","type":"SignMessage","correlationId":"bad","payload":{"@type":"BigInt","value":"12x"}}"#,
        )
        .unwrap();

        let answer = next(&mut raw_box).await;
        assert_eq!(answer.message_type(), MessageType::Result);
        assert!(matches!(
            status::classify(answer.decoded_payload().unwrap()),
            Err(MessagingError::ConnectionRejected(_))
        ));

        // Still serving
        assert_eq!(wallet.provider.get_most_recently_selected_account().await, Ok(None));
    }

    #[tokio::test]
    async fn test_closed_tab_is_skipped_by_events() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;

        let (raw, mut raw_box) = raw_page(&wallet);
        raw.send_raw(
            &ContextId::Background,
            r#"{"kind":"request","type":"GetMostRecentlySelectedAccount","correlationId":"hi"}"#,
        )
        .unwrap();
        // Wait until the background answered, so the tab is recorded
        next(&mut raw_box).await;
        drop(raw_box);

        assert_eq!(wallet.background.notify_account_changed("acc1").await, Ok(1));
    }

    #[tokio::test]
    async fn test_request_without_handler_settles() {
        let wallet = Wallet::start();

        let result = timeout(
            PATIENCE,
            wallet.provider.request(OutboundRequest {
                message_type: MessageType::Result,
                payload: None,
            }),
        )
        .await
        .expect("request never settled");

        assert!(
            matches!(&result, Err(MessagingError::ConnectionRejected(reason)) if reason.starts_with("Not accessible")),
            "{result:?}"
        );
        assert_eq!(wallet.provider.node().pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_popup_gone_mid_prompt_settles_connect() {
        let wallet = Wallet::start_with(
            BusConfig::default().with_sweep_interval(Duration::from_millis(20)),
        );

        let (connected, _prompt) = tokio::join!(
            timeout(PATIENCE, wallet.provider.connect()),
            async {
                let (_, prompt) = wallet.next_prompt().await;
                wallet.router.detach(&ContextId::Popup);
                prompt
            }
        );

        let connected = connected.expect("connect never settled");
        assert_eq!(
            connected,
            Err(ProviderError::Messaging(MessagingError::ConnectionRejected(
                "Not accessible: popup".into()
            )))
        );
        assert_eq!(wallet.background.node().pending().pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_events_reach_page_in_send_order() {
        let wallet = Wallet::start();
        let (tx, mut rx) = mpsc::unbounded_channel();
        wallet.provider.on(EventKind::AccountChanged, move |value| {
            let _ = tx.send(value.clone());
        });

        let background = wallet.background.node().transport();
        for i in 0..500u32 {
            let event = Envelope::event(MessageType::AccountChanged, Some(&i.into()));
            background.send(&ContextId::page(DAPP_TAB), event).unwrap();
        }

        for i in 0..500u32 {
            let value = timeout(PATIENCE, rx.recv())
                .await
                .expect("no event")
                .expect("listener gone");
            assert_eq!(value, DomainValue::from(i));
        }
    }
}
