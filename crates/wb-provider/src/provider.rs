//! # Wallet Provider
//!
//! The object a dApp talks to. Every method is one request to the
//! background; provider events arrive as event envelopes and are handed to
//! the listener list.

use crate::events::{EventKind, EventListeners, ListenerId};
use crate::requests::{self, OutboundRequest, Transaction};
use shared_bus::{ContextNode, Correlator, HandlerHandle, MessageFilter, RequestOptions};
use shared_types::{ContextId, ContractAddress, DomainValue, MessagingError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use wallet_telemetry::log_message_event;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    /// The wallet answered with a value of the wrong shape.
    #[error("Unexpected response to {request}: expected {expected}")]
    UnexpectedResponse {
        request: &'static str,
        expected: &'static str,
    },
}

/// In-page wallet provider.
pub struct WalletProvider {
    node: ContextNode,
    background: Correlator,
    listeners: Arc<EventListeners>,
    events: HandlerHandle,
}

impl WalletProvider {
    /// Create a provider on a page node and start listening for events.
    pub fn new(node: ContextNode) -> Self {
        let listeners = Arc::new(EventListeners::new());
        let events = {
            let listeners = Arc::clone(&listeners);
            let context = *node.context();
            let filter = MessageFilter::types(EventKind::ALL.map(EventKind::message_type)).events();
            node.dispatcher().handle(filter, move |incoming| {
                let listeners = Arc::clone(&listeners);
                async move {
                    let envelope = incoming.envelope();
                    let Some(kind) = EventKind::from_message_type(envelope.message_type()) else {
                        return;
                    };
                    match incoming.payload() {
                        Ok(value) => {
                            let called = listeners.emit(kind, &value);
                            log_message_event!(debug, context, envelope, "Provider event", listeners = called);
                        }
                        Err(e) => {
                            log_message_event!(warn, context, envelope, "Undecodable event dropped", error = %e);
                        }
                    }
                }
            })
        };

        Self {
            background: node.correlator_to(ContextId::Background),
            node,
            listeners,
            events,
        }
    }

    #[must_use]
    pub fn node(&self) -> &ContextNode {
        &self.node
    }

    /// Send any typed request.
    ///
    /// # Errors
    ///
    /// `MessagingError` as returned by the correlator.
    pub async fn request(&self, request: OutboundRequest) -> Result<DomainValue, MessagingError> {
        self.request_with(request, RequestOptions::default()).await
    }

    /// Send any typed request with explicit options.
    ///
    /// # Errors
    ///
    /// `MessagingError` as returned by the correlator.
    pub async fn request_with(
        &self,
        request: OutboundRequest,
        options: RequestOptions,
    ) -> Result<DomainValue, MessagingError> {
        self.background
            .request_with(request.message_type, request.payload, options)
            .await
    }

    /// Ask the user to connect this page. Resolves to the account address.
    ///
    /// # Errors
    ///
    /// `MessagingError::ConnectionRejected` if the user declined.
    pub async fn connect(&self) -> Result<String, ProviderError> {
        let value = self.request(requests::connect()).await?;
        expect_string(value, "Connect", "an account address")
    }

    /// Selected account, `None` if this page is not connected to it.
    ///
    /// # Errors
    ///
    /// `ProviderError` if the background cannot answer.
    pub async fn get_most_recently_selected_account(&self) -> Result<Option<String>, ProviderError> {
        match self
            .request(requests::get_most_recently_selected_account())
            .await?
        {
            DomainValue::Null => Ok(None),
            value => expect_string(value, "GetMostRecentlySelectedAccount", "an account address")
                .map(Some),
        }
    }

    /// Resolves to the transaction hash.
    ///
    /// # Errors
    ///
    /// `MessagingError::ConnectionRejected` if the user or wallet declined.
    pub async fn send_transaction(
        &self,
        account: &str,
        transaction: Transaction,
    ) -> Result<String, ProviderError> {
        let value = self
            .request(requests::send_transaction(account, transaction))
            .await?;
        expect_string(value, "SendTransaction", "a transaction hash")
    }

    /// Resolves to the signature as returned by the wallet.
    ///
    /// # Errors
    ///
    /// `MessagingError::ConnectionRejected` if the user or wallet declined.
    pub async fn sign_message(
        &self,
        account: &str,
        message: DomainValue,
    ) -> Result<DomainValue, ProviderError> {
        Ok(self.request(requests::sign_message(account, message)).await?)
    }

    /// Resolves to the token ids the wallet added.
    ///
    /// # Errors
    ///
    /// `MessagingError::ConnectionRejected` if the user or wallet declined.
    pub async fn add_cis2_tokens(
        &self,
        account: &str,
        contract: ContractAddress,
        token_ids: Vec<String>,
    ) -> Result<Vec<String>, ProviderError> {
        let value = self
            .request(requests::add_cis2_tokens(account, contract, token_ids))
            .await?;
        let unexpected = ProviderError::UnexpectedResponse {
            request: "AddCis2Tokens",
            expected: "a list of token ids",
        };
        value
            .as_array()
            .ok_or_else(|| unexpected.clone())?
            .iter()
            .map(|id| id.as_str().map(str::to_string).ok_or_else(|| unexpected.clone()))
            .collect()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&DomainValue) + Send + Sync + 'static,
    {
        self.listeners.on(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.listeners.off(id)
    }

    pub fn remove_all_listeners(&self, kind: Option<EventKind>) -> usize {
        self.listeners.remove_all_listeners(kind)
    }
}

impl Drop for WalletProvider {
    fn drop(&mut self) {
        self.events.unsubscribe();
    }
}

fn expect_string(
    value: DomainValue,
    request: &'static str,
    expected: &'static str,
) -> Result<String, ProviderError> {
    match value {
        DomainValue::String(s) => Ok(s),
        DomainValue::AccountAddress(address) => Ok(address.to_string()),
        _ => Err(ProviderError::UnexpectedResponse { request, expected }),
    }
}
