//! # Provider Events
//!
//! Background state changes reaching page listeners registered with `on`.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Wallet, DAPP_ORIGIN, PATIENCE};
    use shared_types::DomainValue;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use wb_provider::EventKind;

    fn listen(wallet: &Wallet, kind: EventKind) -> mpsc::UnboundedReceiver<DomainValue> {
        let (tx, rx) = mpsc::unbounded_channel();
        wallet.provider.on(kind, move |value| {
            let _ = tx.send(value.clone());
        });
        rx
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<DomainValue>) -> DomainValue {
        timeout(PATIENCE, rx.recv())
            .await
            .expect("no event")
            .expect("listener gone")
    }

    #[tokio::test]
    async fn test_selecting_connected_account_notifies_page() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;
        let mut changed = listen(&wallet, EventKind::AccountChanged);

        wallet.background.select_account("acc1").await.unwrap();
        assert_eq!(next(&mut changed).await, "acc1".into());
    }

    #[tokio::test]
    async fn test_unrelated_account_is_not_announced() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;
        let mut changed = listen(&wallet, EventKind::AccountChanged);

        assert_eq!(wallet.background.notify_account_changed("acc2").await, Ok(0));
        assert_eq!(wallet.background.notify_account_changed("acc1").await, Ok(1));
        assert_eq!(next(&mut changed).await, "acc1".into());
    }

    #[tokio::test]
    async fn test_disconnect_notifies_and_revokes() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;
        wallet.background.select_account("acc1").await.unwrap();
        let mut disconnected = listen(&wallet, EventKind::AccountDisconnected);

        assert_eq!(wallet.background.disconnect(DAPP_ORIGIN).await, Ok(1));
        assert_eq!(next(&mut disconnected).await, "acc1".into());
        assert_eq!(wallet.provider.get_most_recently_selected_account().await, Ok(None));
    }

    #[tokio::test]
    async fn test_off_stops_delivery() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;

        let (tx, mut removed_rx) = mpsc::unbounded_channel::<DomainValue>();
        let removed = wallet.provider.on(EventKind::ChainChanged, move |value| {
            let _ = tx.send(value.clone());
        });
        let mut kept = listen(&wallet, EventKind::ChainChanged);
        assert!(wallet.provider.off(removed));

        wallet
            .background
            .notify_chain_changed("testnet".into())
            .await
            .unwrap();
        assert_eq!(next(&mut kept).await, "testnet".into());
        assert!(removed_rx.try_recv().is_err());

        assert_eq!(wallet.provider.remove_all_listeners(None), 1);
    }
}
