//! # Wallet Bridge Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # A full wallet on one in-memory router
//! └── integration/      # Cross-context flows
//!     ├── correlation.rs
//!     ├── wallet_flows.rs
//!     ├── provider_events.rs
//!     └── resilience.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p wb-tests
//! cargo test -p wb-tests integration::wallet_flows
//! ```

#![allow(unused_variables)]
#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
