//! # Domain Values
//!
//! The in-memory value graph exchanged between contexts. It is a superset of
//! JSON: besides the JSON kinds it carries big integers, dates, byte buffers
//! and chain entities, which the codec tags on the way out.

use crate::entities::{AccountAddress, CcdAmount, ContractAddress, ModuleReference};
use chrono::{DateTime, Utc};
use num::BigInt;
use std::collections::BTreeMap;

/// Object map used for payload objects.
pub type ValueMap = BTreeMap<String, DomainValue>;

/// A value that can cross a context boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DomainValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<DomainValue>),
    Object(ValueMap),
    /// Arbitrary-precision integer.
    BigInt(BigInt),
    Date(DateTime<Utc>),
    Buffer(Vec<u8>),
    AccountAddress(AccountAddress),
    ContractAddress(ContractAddress),
    ModuleReference(ModuleReference),
    CcdAmount(CcdAmount),
}

impl DomainValue {
    /// Build an object from key/value pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, DomainValue)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[DomainValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Field lookup on objects; `None` for every other kind.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DomainValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Account address, either typed or in its base58 string form.
    #[must_use]
    pub fn as_account_address(&self) -> Option<AccountAddress> {
        match self {
            Self::AccountAddress(address) => Some(*address),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl From<bool> for DomainValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for DomainValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for DomainValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u32> for DomainValue {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for DomainValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<BigInt> for DomainValue {
    fn from(value: BigInt) -> Self {
        Self::BigInt(value)
    }
}

impl From<DateTime<Utc>> for DomainValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<Vec<u8>> for DomainValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Buffer(value)
    }
}

impl From<AccountAddress> for DomainValue {
    fn from(value: AccountAddress) -> Self {
        Self::AccountAddress(value)
    }
}

impl From<ContractAddress> for DomainValue {
    fn from(value: ContractAddress) -> Self {
        Self::ContractAddress(value)
    }
}

impl From<ModuleReference> for DomainValue {
    fn from(value: ModuleReference) -> Self {
        Self::ModuleReference(value)
    }
}

impl From<CcdAmount> for DomainValue {
    fn from(value: CcdAmount) -> Self {
        Self::CcdAmount(value)
    }
}

impl<T: Into<DomainValue>> From<Option<T>> for DomainValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Vec<DomainValue>> for DomainValue {
    fn from(value: Vec<DomainValue>) -> Self {
        Self::Array(value)
    }
}

impl From<Vec<String>> for DomainValue {
    fn from(value: Vec<String>) -> Self {
        Self::Array(value.into_iter().map(Self::String).collect())
    }
}
