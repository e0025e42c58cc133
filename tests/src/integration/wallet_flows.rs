//! # Wallet Flows
//!
//! Page → background → popup → background → page, with the test acting as
//! the user in the popup.
//!
//! ## Flows Tested:
//!
//! 1. **Connect**: approval resolves to the account and allowlists the origin
//! 2. **Closure**: closing the popup rejects with exactly one response
//! 3. **Short-circuit**: an allowlisted origin connects without a prompt
//! 4. **Account requests**: sign, send and add-tokens need a connection and
//!    carry typed values both ways

#[cfg(test)]
mod tests {
    use crate::fixtures::{Wallet, DAPP_ORIGIN, PATIENCE};
    use shared_types::{keys, ContractAddress, DomainValue, MessagingError};
    use tokio::time::timeout;
    use wb_popup::{PromptError, PromptRoute};
    use wb_provider::{ProviderError, Transaction};

    fn rejection(result: &Result<impl std::fmt::Debug, ProviderError>) -> Option<&MessagingError> {
        match result {
            Err(ProviderError::Messaging(e)) if e.is_rejection() => Some(e),
            _ => None,
        }
    }

    // =============================================================================
    // CONNECT
    // =============================================================================

    #[tokio::test]
    async fn test_connect_resolves_to_approved_account() {
        let wallet = Wallet::start();

        let (connected, route) = tokio::join!(wallet.provider.connect(), async {
            let (route, prompt) = wallet.next_prompt().await;
            assert_eq!(prompt.origin(), Some(DAPP_ORIGIN));
            prompt.approve("acc1".into()).unwrap();
            route
        });

        assert_eq!(connected, Ok("acc1".to_string()));
        assert_eq!(route, PromptRoute::ConnectionRequest);
        let allowlist = wallet.background.allowlist().await.unwrap();
        assert!(allowlist.is_allowed(DAPP_ORIGIN, "acc1"));
    }

    #[tokio::test]
    async fn test_closing_popup_rejects_with_one_response() {
        let wallet = Wallet::start();

        let (connected, closed) = tokio::join!(wallet.provider.connect(), async {
            let _prompt = wallet.next_prompt().await;
            wallet.prompts.window_closed()
        });

        assert_eq!(closed, 1);
        assert!(rejection(&connected).is_some(), "{connected:?}");
        // Page request, popup request, popup response, page response
        assert_eq!(wallet.router.frames_routed(), 4);

        assert_eq!(wallet.prompts.window_closed(), 0);
        assert_eq!(wallet.router.frames_routed(), 4);
        assert!(wallet.background.allowlist().await.unwrap().accounts(DAPP_ORIGIN).is_empty());
    }

    #[tokio::test]
    async fn test_close_after_decision_sends_nothing_more() {
        let wallet = Wallet::start();

        let (connected, prompt) = tokio::join!(wallet.provider.connect(), async {
            let (_, prompt) = wallet.next_prompt().await;
            prompt.approve("acc1".into()).unwrap();
            prompt
        });
        assert_eq!(connected, Ok("acc1".to_string()));

        assert_eq!(wallet.prompts.window_closed(), 0);
        assert!(!prompt.abandon());
        assert_eq!(prompt.reject("late"), Err(PromptError::AlreadyAnswered));
        assert_eq!(wallet.router.frames_routed(), 4);
    }

    #[tokio::test]
    async fn test_allowlisted_origin_connects_without_prompt() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;
        wallet.background.select_account("acc1").await.unwrap();

        let connected = timeout(PATIENCE, wallet.provider.connect())
            .await
            .expect("connect waited for a prompt");
        assert_eq!(connected, Ok("acc1".to_string()));
        assert_eq!(wallet.prompts.open_prompts(), 0);
    }

    #[tokio::test]
    async fn test_selected_account_visible_only_when_connected() {
        let wallet = Wallet::start();
        wallet.background.select_account("acc1").await.unwrap();
        assert_eq!(wallet.provider.get_most_recently_selected_account().await, Ok(None));

        wallet.connect_as("acc1").await;
        assert_eq!(
            wallet.provider.get_most_recently_selected_account().await,
            Ok(Some("acc1".to_string()))
        );
    }

    // =============================================================================
    // ACCOUNT REQUESTS
    // =============================================================================

    #[tokio::test]
    async fn test_sign_message_round_trips_typed_values() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;

        let signature = DomainValue::Buffer(vec![0xde, 0xad, 0xbe, 0xef]);
        let (signed, ()) = tokio::join!(
            wallet.provider.sign_message("acc1", "hello".into()),
            async {
                let (route, prompt) = wallet.next_prompt().await;
                assert_eq!(route, PromptRoute::SignMessage);
                let request = prompt.payload().get(keys::REQUEST).unwrap();
                assert_eq!(request.get(keys::MESSAGE), Some(&"hello".into()));
                prompt.approve(signature.clone()).unwrap();
            }
        );

        assert_eq!(signed, Ok(signature));
    }

    #[tokio::test]
    async fn test_send_transaction_resolves_to_hash() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;

        let transaction = Transaction::new(
            "Transfer",
            DomainValue::object([("amount", DomainValue::BigInt(10u64.pow(18).into()))]),
        );
        let (hash, ()) = tokio::join!(
            wallet.provider.send_transaction("acc1", transaction),
            async {
                let (route, prompt) = wallet.next_prompt().await;
                assert_eq!(route, PromptRoute::SendTransaction);
                prompt.approve("0xhash".into()).unwrap();
            }
        );
        assert_eq!(hash, Ok("0xhash".to_string()));
    }

    #[tokio::test]
    async fn test_account_request_without_connection_is_rejected() {
        let wallet = Wallet::start();

        let result = wallet
            .provider
            .send_transaction("acc1", Transaction::new("Transfer", DomainValue::Null))
            .await;
        let error = rejection(&result).expect("not rejected");
        assert!(error.to_string().contains("not connected"), "{error}");
        assert_eq!(wallet.prompts.open_prompts(), 0);
    }

    #[tokio::test]
    async fn test_user_declines_tokens() {
        let wallet = Wallet::start();
        wallet.connect_as("acc1").await;

        let (added, ()) = tokio::join!(
            wallet
                .provider
                .add_cis2_tokens("acc1", ContractAddress::new(7, 0), vec!["00".into()]),
            async {
                let (route, prompt) = wallet.next_prompt().await;
                assert_eq!(route, PromptRoute::AddTokens);
                prompt.reject("User declined").unwrap();
            }
        );

        assert_eq!(
            added,
            Err(ProviderError::Messaging(MessagingError::ConnectionRejected(
                "User declined".into()
            )))
        );
    }
}
