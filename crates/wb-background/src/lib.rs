//! # Wallet Background - Service Worker
//!
//! Owns the wallet state pages are allowed to see: the selected account and
//! which origins are connected to which accounts. Answers page requests
//! directly when it can and forwards them to the popup when the user has to
//! decide.
//!
//! ## Architecture
//!
//! - `domain/`: allowlist and connected tabs, errors
//! - `ports/`: `Storage` and `PopupLauncher`
//! - `adapters/`: in-memory storage, router-backed popup launcher
//! - `service`: handlers registered on the background dispatcher
//!
//! ## Wiring
//!
//! ```rust,ignore
//! let config = BackgroundConfig::from_env();
//! config.validate()?;
//! let node = ContextNode::new(Arc::new(background_endpoint), config.bus.clone());
//! let service = BackgroundService::new(node.clone(), storage, launcher, config);
//! service.attach();
//! service.watch_selected_account();
//! node.spawn(background_mailbox);
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{MemoryStorage, RouterPopupLauncher};
pub use config::BackgroundConfig;
pub use domain::{Allowlist, BackgroundError, ConnectedTabs};
pub use ports::{PopupLauncher, Storage};
pub use service::BackgroundService;
