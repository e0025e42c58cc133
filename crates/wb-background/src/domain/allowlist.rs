//! # Connection State
//!
//! Which origins may use which accounts, and which tabs belong to which
//! origin. Both live in storage and are read on every message; nothing here
//! is assumed to survive in memory between messages.

use shared_types::{DomainValue, TabId, ValueMap};
use std::collections::BTreeMap;

/// Per-origin list of connected accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    origins: BTreeMap<String, Vec<String>>,
}

impl Allowlist {
    /// Read from the stored form. Entries of the wrong shape are skipped.
    #[must_use]
    pub fn from_value(value: Option<&DomainValue>) -> Self {
        let origins = value
            .and_then(DomainValue::as_object)
            .map(|map| {
                map.iter()
                    .map(|(origin, accounts)| {
                        let accounts = accounts
                            .as_array()
                            .unwrap_or_default()
                            .iter()
                            .filter_map(DomainValue::as_str)
                            .map(str::to_string)
                            .collect();
                        (origin.clone(), accounts)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { origins }
    }

    /// Stored form: `{ origin: [account, ...] }`.
    #[must_use]
    pub fn to_value(&self) -> DomainValue {
        DomainValue::Object(
            self.origins
                .iter()
                .map(|(origin, accounts)| (origin.clone(), accounts.clone().into()))
                .collect::<ValueMap>(),
        )
    }

    #[must_use]
    pub fn is_allowed(&self, origin: &str, account: &str) -> bool {
        self.origins
            .get(origin)
            .is_some_and(|accounts| accounts.iter().any(|a| a == account))
    }

    /// Add an account for an origin. Returns false if it was already there.
    pub fn allow(&mut self, origin: &str, account: &str) -> bool {
        let accounts = self.origins.entry(origin.to_string()).or_default();
        if accounts.iter().any(|a| a == account) {
            return false;
        }
        accounts.push(account.to_string());
        true
    }

    /// Forget an origin entirely.
    pub fn remove_origin(&mut self, origin: &str) -> Option<Vec<String>> {
        self.origins.remove(origin)
    }

    #[must_use]
    pub fn accounts(&self, origin: &str) -> &[String] {
        self.origins.get(origin).map_or(&[], Vec::as_slice)
    }

    /// Origins connected to `account`.
    pub fn origins_for<'a>(&'a self, account: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.origins
            .iter()
            .filter(move |(_, accounts)| accounts.iter().any(|a| a == account))
            .map(|(origin, _)| origin.as_str())
    }
}

/// Tabs that talked to the background, with their origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectedTabs {
    tabs: BTreeMap<TabId, String>,
}

impl ConnectedTabs {
    #[must_use]
    pub fn from_value(value: Option<&DomainValue>) -> Self {
        let tabs = value
            .and_then(DomainValue::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(tab, origin)| {
                        Some((tab.parse::<TabId>().ok()?, origin.as_str()?.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { tabs }
    }

    /// Stored form: `{ "<tab id>": origin }`.
    #[must_use]
    pub fn to_value(&self) -> DomainValue {
        DomainValue::object(
            self.tabs
                .iter()
                .map(|(tab, origin)| (tab.to_string(), DomainValue::from(origin.as_str()))),
        )
    }

    /// Record a tab's origin. Returns true if anything changed.
    pub fn record(&mut self, tab: TabId, origin: &str) -> bool {
        if self.tabs.get(&tab).is_some_and(|o| o == origin) {
            return false;
        }
        self.tabs.insert(tab, origin.to_string());
        true
    }

    pub fn remove(&mut self, tab: TabId) -> bool {
        self.tabs.remove(&tab).is_some()
    }

    /// Tabs currently showing `origin`.
    pub fn tabs_for<'a>(&'a self, origin: &'a str) -> impl Iterator<Item = TabId> + 'a {
        self.tabs
            .iter()
            .filter(move |(_, o)| o.as_str() == origin)
            .map(|(tab, _)| *tab)
    }

    pub fn all(&self) -> impl Iterator<Item = (TabId, &str)> + '_ {
        self.tabs.iter().map(|(tab, origin)| (*tab, origin.as_str()))
    }
}
