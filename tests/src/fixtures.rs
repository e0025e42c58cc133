//! # Test Fixtures
//!
//! A complete wallet wired on one `InMemoryRouter`: a page with the
//! provider, the background service and the popup with its prompt manager.
//! Prompts opened in the popup are handed to the test through a channel, so
//! the test plays the user.

use shared_bus::{BusConfig, ContextNode, InMemoryRouter};
use shared_types::{ContextId, TabId};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wb_background::{BackgroundConfig, BackgroundService, MemoryStorage, RouterPopupLauncher};
use wb_popup::{PromptHandle, PromptManager, PromptNavigator, PromptRoute};
use wallet_telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
use wb_provider::WalletProvider;

pub const DAPP_ORIGIN: &str = "https://dapp.example";
pub const DAPP_TAB: TabId = 1;

/// How long a test waits for something that should happen.
pub const PATIENCE: Duration = Duration::from_secs(2);

static LOGGING: OnceLock<Option<TelemetryGuard>> = OnceLock::new();

/// Install log output once per test binary when `WB_LOG_LEVEL` is set.
pub fn init_test_logging() {
    LOGGING.get_or_init(|| {
        std::env::var("WB_LOG_LEVEL").ok()?;
        init_telemetry(TelemetryConfig::for_context("tests")).ok()
    });
}

/// Navigator that hands every prompt to the test.
pub struct ChannelNavigator {
    prompts: mpsc::UnboundedSender<(PromptRoute, PromptHandle)>,
}

impl PromptNavigator for ChannelNavigator {
    fn navigate(&self, route: PromptRoute, prompt: PromptHandle) {
        let _ = self.prompts.send((route, prompt));
    }
}

pub struct Wallet {
    pub router: Arc<InMemoryRouter>,
    pub provider: WalletProvider,
    pub background: Arc<BackgroundService>,
    pub storage: Arc<MemoryStorage>,
    pub prompts: Arc<PromptManager>,
    prompt_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(PromptRoute, PromptHandle)>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Wallet {
    pub fn start() -> Self {
        Self::start_with(BusConfig::default())
    }

    /// Start every context with the same bus configuration.
    pub fn start_with(bus: BusConfig) -> Self {
        init_test_logging();
        let router = InMemoryRouter::new();
        let mut tasks = Vec::new();

        // Popup
        let (popup_endpoint, popup_box) = router.attach(ContextId::Popup, None);
        let popup = ContextNode::new(Arc::new(popup_endpoint), bus.clone());
        let (tx, prompt_rx) = mpsc::unbounded_channel();
        let prompts = PromptManager::new(Arc::new(ChannelNavigator { prompts: tx }));
        prompts.attach(popup.dispatcher());
        tasks.push(popup.spawn(popup_box));

        // Background
        let (background_endpoint, background_box) = router.attach(ContextId::Background, None);
        let background_node = ContextNode::new(Arc::new(background_endpoint), bus.clone());
        let storage = Arc::new(MemoryStorage::new());
        let launcher = RouterPopupLauncher::new(Arc::clone(&router), || Ok(()));
        let background = BackgroundService::new(
            background_node.clone(),
            storage.clone(),
            Arc::new(launcher),
            BackgroundConfig {
                bus: bus.clone(),
                ..BackgroundConfig::default()
            },
        );
        background.attach();
        tasks.push(background.watch_selected_account());
        tasks.push(background_node.spawn(background_box));

        // Page
        let (page_endpoint, page_box) =
            router.attach(ContextId::page(DAPP_TAB), Some(DAPP_ORIGIN.to_string()));
        let page = ContextNode::new(Arc::new(page_endpoint), bus);
        tasks.push(page.spawn(page_box));
        let provider = WalletProvider::new(page);

        Self {
            router,
            provider,
            background,
            storage,
            prompts,
            prompt_rx: tokio::sync::Mutex::new(prompt_rx),
            tasks,
        }
    }

    /// Next prompt the popup opened.
    pub async fn next_prompt(&self) -> (PromptRoute, PromptHandle) {
        let mut prompts = self.prompt_rx.lock().await;
        tokio::time::timeout(PATIENCE, prompts.recv())
            .await
            .expect("no prompt opened")
            .expect("popup navigator gone")
    }

    /// Run the connect flow with the user approving `account`.
    pub async fn connect_as(&self, account: &str) -> String {
        let (connected, ()) = tokio::join!(self.provider.connect(), async {
            let (_, prompt) = self.next_prompt().await;
            prompt.approve(account.into()).expect("prompt already answered");
        });
        connected.expect("connect failed")
    }
}

impl Drop for Wallet {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
