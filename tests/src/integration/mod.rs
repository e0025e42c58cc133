//! Cross-context integration flows.

mod correlation;
mod provider_events;
mod resilience;
mod wallet_flows;
