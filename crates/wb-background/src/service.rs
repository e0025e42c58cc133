//! # Background Service
//!
//! Request handlers of the background context. The background owns the
//! selected account and the per-origin allowlist; pages ask it, and it asks
//! the popup whenever the user has to decide.
//!
//! ```text
//! page ──Connect──► background ──(allowlisted?)──► answer directly
//!                        │
//!                        └──ensure_open──► popup ──decision──► background ──► page
//! ```
//!
//! State needed by a later message is always read back from `Storage`.

use crate::config::BackgroundConfig;
use crate::domain::{Allowlist, BackgroundError, ConnectedTabs};
use crate::ports::{PopupLauncher, Storage};
use futures::StreamExt;
use parking_lot::Mutex;
use shared_bus::{ContextNode, HandlerHandle, Incoming, MessageFilter, RequestOptions};
use shared_types::status::{self, REJECTION_SENTINEL};
use shared_types::{keys, ContextId, DomainValue, Envelope, MessageType, MessagingError};
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wallet_telemetry::{log_event, log_message_event};

/// Storage key of the account last selected in the wallet.
pub const SELECTED_ACCOUNT_KEY: &str = "selectedAccount";
/// Storage key of the per-origin allowlist.
pub const CONNECTED_SITES_KEY: &str = "connectedSites";
/// Storage key of the tabs that talked to the background.
pub const CONNECTED_TABS_KEY: &str = "connectedTabs";

/// Request types answered after a prompt for an allowlisted account.
pub const ACCOUNT_REQUEST_TYPES: [MessageType; 3] = [
    MessageType::SendTransaction,
    MessageType::SignMessage,
    MessageType::AddCis2Tokens,
];

pub struct BackgroundService {
    node: ContextNode,
    storage: Arc<dyn Storage>,
    launcher: Arc<dyn PopupLauncher>,
    config: BackgroundConfig,
    handles: Mutex<Vec<HandlerHandle>>,
    /// Serializes read-modify-write of stored state
    writes: tokio::sync::Mutex<()>,
}

impl BackgroundService {
    pub fn new(
        node: ContextNode,
        storage: Arc<dyn Storage>,
        launcher: Arc<dyn PopupLauncher>,
        config: BackgroundConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            node,
            storage,
            launcher,
            config,
            handles: Mutex::new(Vec::new()),
            writes: tokio::sync::Mutex::new(()),
        })
    }

    #[must_use]
    pub fn node(&self) -> &ContextNode {
        &self.node
    }

    #[must_use]
    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }

    /// Register the request handlers on the background dispatcher.
    ///
    /// Handlers hold the service weakly; once the service is dropped they
    /// ignore further requests.
    pub fn attach(self: &Arc<Self>) {
        let handles = vec![
            self.register(
                MessageFilter::message_type(MessageType::Connect).requests(),
                Self::on_connect,
            ),
            self.register(
                MessageFilter::message_type(MessageType::GetMostRecentlySelectedAccount)
                    .requests(),
                Self::on_get_selected_account,
            ),
            self.register(
                MessageFilter::types(ACCOUNT_REQUEST_TYPES).requests(),
                Self::on_account_request,
            ),
        ];
        self.handles.lock().extend(handles);
        info!(handlers = self.handles.lock().len(), "Background handlers attached");
    }

    /// Remove every handler registered by `attach`.
    pub fn detach(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.unsubscribe();
        }
    }

    fn register<F, Fut>(self: &Arc<Self>, filter: MessageFilter, handler: F) -> HandlerHandle
    where
        F: Fn(Arc<Self>, Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let service: Weak<Self> = Arc::downgrade(self);
        self.node.dispatcher().handle(filter, move |incoming| {
            let call = service.upgrade().map(|service| handler(service, incoming));
            async move {
                match call {
                    Some(call) => call.await,
                    None => debug!("Background service gone, request ignored"),
                }
            }
        })
    }

    async fn on_connect(self: Arc<Self>, mut incoming: Incoming) {
        let Some(responder) = incoming.take_responder() else {
            return;
        };
        log_message_event!(debug, self.node.context(), incoming.envelope(), "Connect request");
        self.track_tab(&incoming).await;

        let sent = match self.connect(&incoming).await {
            Ok(account) => responder.respond(account.into()),
            Err(BackgroundError::Messaging(e)) if e.is_rejection() => {
                debug!(reason = %e, "Connection rejected");
                responder.respond(REJECTION_SENTINEL)
            }
            Err(e) => {
                log_message_event!(warn, self.node.context(), incoming.envelope(), "Connect failed", error = %e);
                responder.reject(e.to_string())
            }
        };
        if let Err(e) = sent {
            warn!(error = %e, "Connect response not delivered");
        }
    }

    async fn connect(&self, incoming: &Incoming) -> Result<String, BackgroundError> {
        let origin = incoming.origin().ok_or(BackgroundError::MissingOrigin)?;

        if let Some(selected) = self.selected_account().await? {
            if self.allowlist().await?.is_allowed(origin, &selected) {
                log_event!(debug, self.node.context(), "Origin already connected", origin = %origin);
                return Ok(selected);
            }
        }

        let payload = incoming.payload().map_err(MessagingError::from)?;
        let approved = self.prompt(MessageType::Connect, origin, payload).await?;
        let account = account_string(&approved).ok_or(BackgroundError::MissingField("account"))?;

        self.allow(origin, &account).await?;
        log_event!(info, self.node.context(), "Origin connected", origin = %origin, account = %account);
        Ok(account)
    }

    async fn on_get_selected_account(self: Arc<Self>, mut incoming: Incoming) {
        let Some(responder) = incoming.take_responder() else {
            return;
        };
        self.track_tab(&incoming).await;

        let sent = match self.connected_selected_account(incoming.origin()).await {
            Ok(account) => responder.respond(account.map_or(DomainValue::Null, DomainValue::from)),
            Err(e) => responder.reject(e.to_string()),
        };
        if let Err(e) = sent {
            warn!(error = %e, "Selected account response not delivered");
        }
    }

    /// The selected account, if `origin` is connected to it.
    ///
    /// # Errors
    ///
    /// `BackgroundError::Storage` if the state cannot be read.
    pub async fn connected_selected_account(
        &self,
        origin: Option<&str>,
    ) -> Result<Option<String>, BackgroundError> {
        let Some(origin) = origin else {
            return Ok(None);
        };
        let Some(selected) = self.selected_account().await? else {
            return Ok(None);
        };
        let allowed = self.allowlist().await?.is_allowed(origin, &selected);
        Ok(allowed.then_some(selected))
    }

    async fn on_account_request(self: Arc<Self>, mut incoming: Incoming) {
        let Some(responder) = incoming.take_responder() else {
            return;
        };
        let request_type = responder.request_type();
        log_message_event!(debug, self.node.context(), incoming.envelope(), "Account request");
        self.track_tab(&incoming).await;

        let payload = match self.account_request(request_type, &incoming).await {
            Ok(result) => status::approved(result),
            Err(e) => {
                log_message_event!(debug, self.node.context(), incoming.envelope(), "Account request declined", error = %e);
                status::rejected(e.to_string())
            }
        };
        if let Err(e) = responder.respond_with_type(MessageType::Result, payload) {
            warn!(error = %e, message_type = ?request_type, "Result not delivered");
        }
    }

    async fn account_request(
        &self,
        request_type: MessageType,
        incoming: &Incoming,
    ) -> Result<DomainValue, BackgroundError> {
        let origin = incoming.origin().ok_or(BackgroundError::MissingOrigin)?;
        let payload = incoming.payload().map_err(MessagingError::from)?;
        let account = payload
            .get(keys::ACCOUNT_ADDRESS)
            .and_then(account_string)
            .ok_or(BackgroundError::MissingField(keys::ACCOUNT_ADDRESS))?;

        if !self.allowlist().await?.is_allowed(origin, &account) {
            return Err(BackgroundError::NotConnected {
                origin: origin.to_string(),
                account,
            });
        }

        self.prompt(request_type, origin, payload).await
    }

    /// Open the popup and forward a request to it.
    async fn prompt(
        &self,
        request_type: MessageType,
        origin: &str,
        request: DomainValue,
    ) -> Result<DomainValue, BackgroundError> {
        let launch_timeout = self.config.popup_launch_timeout;
        tokio::time::timeout(launch_timeout, self.launcher.ensure_open())
            .await
            .map_err(|_| BackgroundError::LaunchTimeout {
                after_ms: u64::try_from(launch_timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        let forwarded = DomainValue::object([
            (keys::ORIGIN, DomainValue::from(origin)),
            (keys::REQUEST, request),
        ]);
        let options = RequestOptions {
            timeout: self.config.bus.prompt_timeout,
        };
        let result = self
            .node
            .correlator_to(ContextId::Popup)
            .request_with(request_type, Some(forwarded), options)
            .await?;
        Ok(result)
    }

    /// Make `account` the selected account.
    ///
    /// Connected pages learn about it through `watch_selected_account`.
    ///
    /// # Errors
    ///
    /// `BackgroundError::Storage` if the write fails.
    pub async fn select_account(&self, account: &str) -> Result<(), BackgroundError> {
        self.storage
            .set(SELECTED_ACCOUNT_KEY, DomainValue::from(account))
            .await
    }

    /// Emit `AccountChanged` whenever the selected account is written to
    /// storage, by this service or anyone else.
    pub fn watch_selected_account(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.storage.subscribe(SELECTED_ACCOUNT_KEY);
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(value) = changes.next().await {
                let Some(service) = service.upgrade() else {
                    break;
                };
                let Some(account) = account_string(&value) else {
                    continue;
                };
                if let Err(e) = service.notify_account_changed(&account).await {
                    warn!(error = %e, "Account change not announced");
                }
            }
            debug!("Selected account watcher stopped");
        })
    }

    /// Send `AccountChanged` to every tab whose origin is connected to
    /// `account`.
    ///
    /// Returns the number of tabs notified.
    ///
    /// # Errors
    ///
    /// `BackgroundError::Storage` if the state cannot be read.
    pub async fn notify_account_changed(&self, account: &str) -> Result<usize, BackgroundError> {
        let allowlist = self.allowlist().await?;
        let tabs = self.connected_tabs().await?;
        let targets: Vec<_> = allowlist
            .origins_for(account)
            .flat_map(|origin| tabs.tabs_for(origin))
            .collect();

        let event = Envelope::event(MessageType::AccountChanged, Some(&account.into()));
        self.broadcast(targets, &event).await
    }

    /// Forget `origin`: remove it from the allowlist and send
    /// `AccountDisconnected` to its tabs, once per account it held.
    ///
    /// Returns the number of events sent.
    ///
    /// # Errors
    ///
    /// `BackgroundError::Storage` if the state cannot be read or written.
    pub async fn disconnect(&self, origin: &str) -> Result<usize, BackgroundError> {
        let removed = {
            let _write = self.writes.lock().await;
            let mut allowlist = self.allowlist().await?;
            let removed = allowlist.remove_origin(origin).unwrap_or_default();
            self.storage
                .set(CONNECTED_SITES_KEY, allowlist.to_value())
                .await?;
            removed
        };
        log_event!(info, self.node.context(), "Origin disconnected", origin = %origin, accounts = removed.len());

        let targets: Vec<_> = self.connected_tabs().await?.tabs_for(origin).collect();
        let mut sent = 0;
        for account in removed {
            let event = Envelope::event(MessageType::AccountDisconnected, Some(&account.into()));
            sent += self.broadcast(targets.clone(), &event).await?;
        }
        Ok(sent)
    }

    /// Send `ChainChanged` to every known tab.
    ///
    /// # Errors
    ///
    /// `BackgroundError::Storage` if the state cannot be read.
    pub async fn notify_chain_changed(&self, chain: DomainValue) -> Result<usize, BackgroundError> {
        let targets: Vec<_> = self
            .connected_tabs()
            .await?
            .all()
            .map(|(tab, _)| tab)
            .collect();
        let event = Envelope::event(MessageType::ChainChanged, Some(&chain));
        self.broadcast(targets, &event).await
    }

    /// Send one event to several tabs. Tabs that are gone are forgotten.
    async fn broadcast(
        &self,
        tabs: Vec<shared_types::TabId>,
        event: &Envelope,
    ) -> Result<usize, BackgroundError> {
        let mut delivered = 0;
        let mut gone = Vec::new();
        for tab in tabs {
            match self.node.transport().send(&ContextId::page(tab), event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(tab = tab, error = %e, "Tab unreachable");
                    gone.push(tab);
                }
            }
        }

        if !gone.is_empty() {
            let _write = self.writes.lock().await;
            let mut tabs = self.connected_tabs().await?;
            for tab in gone {
                tabs.remove(tab);
            }
            self.storage.set(CONNECTED_TABS_KEY, tabs.to_value()).await?;
        }

        log_message_event!(debug, self.node.context(), event, "Event broadcast", delivered = delivered);
        Ok(delivered)
    }

    /// Remember which origin a page tab shows.
    async fn track_tab(&self, incoming: &Incoming) {
        let (ContextId::Page { tab }, Some(origin)) = (incoming.from(), incoming.origin()) else {
            return;
        };
        let result = async {
            let _write = self.writes.lock().await;
            let mut tabs = self.connected_tabs().await?;
            if tabs.record(*tab, origin) {
                self.storage.set(CONNECTED_TABS_KEY, tabs.to_value()).await?;
            }
            Ok::<_, BackgroundError>(())
        }
        .await;
        if let Err(e) = result {
            warn!(tab = tab, error = %e, "Tab not recorded");
        }
    }

    async fn allow(&self, origin: &str, account: &str) -> Result<(), BackgroundError> {
        let _write = self.writes.lock().await;
        let mut allowlist = self.allowlist().await?;
        if allowlist.allow(origin, account) {
            self.storage
                .set(CONNECTED_SITES_KEY, allowlist.to_value())
                .await?;
        }
        Ok(())
    }

    /// Currently selected account.
    ///
    /// # Errors
    ///
    /// `BackgroundError::Storage` if the state cannot be read.
    pub async fn selected_account(&self) -> Result<Option<String>, BackgroundError> {
        Ok(self
            .storage
            .get(SELECTED_ACCOUNT_KEY)
            .await?
            .as_ref()
            .and_then(account_string))
    }

    /// Stored allowlist.
    ///
    /// # Errors
    ///
    /// `BackgroundError::Storage` if the state cannot be read.
    pub async fn allowlist(&self) -> Result<Allowlist, BackgroundError> {
        let stored = self.storage.get(CONNECTED_SITES_KEY).await?;
        Ok(Allowlist::from_value(stored.as_ref()))
    }

    async fn connected_tabs(&self) -> Result<ConnectedTabs, BackgroundError> {
        let stored = self.storage.get(CONNECTED_TABS_KEY).await?;
        Ok(ConnectedTabs::from_value(stored.as_ref()))
    }
}

impl Drop for BackgroundService {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Account address as a string, whether sent plain or typed.
fn account_string(value: &DomainValue) -> Option<String> {
    value
        .as_str()
        .map(str::to_string)
        .or_else(|| value.as_account_address().map(|address| address.to_string()))
}
