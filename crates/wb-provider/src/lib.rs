//! # Wallet Provider - In-page API
//!
//! What a dApp sees of the wallet. Each operation is an explicit typed
//! request to the background context; events are delivered through
//! `on`/`off` listeners.
//!
//! ```rust,ignore
//! let node = ContextNode::new(Arc::new(page_endpoint), BusConfig::from_env());
//! node.spawn(page_mailbox);
//! let provider = WalletProvider::new(node);
//! provider.on(EventKind::AccountChanged, |account| println!("{account:?}"));
//! let account = provider.connect().await?;
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod provider;
pub mod requests;

pub use events::{EventKind, EventListeners, ListenerId};
pub use provider::{ProviderError, WalletProvider};
pub use requests::{OutboundRequest, Transaction};
