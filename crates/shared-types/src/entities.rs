//! # Domain Entities
//!
//! Chain values that travel inside payloads but are not JSON-native. Each one
//! has exactly one canonical string form, which is what the codec puts in the
//! `value` field of its typed wrapper.
//!
//! | Entity | String form |
//! |--------|-------------|
//! | `AccountAddress` | base58check, version byte `1`, 32-byte body |
//! | `ContractAddress` | `<index,subindex>` |
//! | `ModuleReference` | 64 lowercase hex characters |
//! | `CcdAmount` | micro-CCD as a decimal integer |

use crate::errors::ParseError;
use std::fmt;
use std::str::FromStr;

/// Version byte prefixed to account addresses before base58check encoding.
pub const ACCOUNT_ADDRESS_VERSION: u8 = 1;

/// Length of raw account addresses and module references.
pub const HASH_LENGTH: usize = 32;

/// A 32-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress(pub [u8; HASH_LENGTH]);

impl AccountAddress {
    /// Wrap raw address bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bs58::encode(self.0)
            .with_check_version(ACCOUNT_ADDRESS_VERSION)
            .into_string();
        f.write_str(&encoded)
    }
}

impl FromStr for AccountAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s)
            .with_check(Some(ACCOUNT_ADDRESS_VERSION))
            .into_vec()
            .map_err(|e| ParseError::AccountAddress(e.to_string()))?;

        // The decoded buffer still carries the version byte.
        let body = decoded
            .get(1..)
            .ok_or_else(|| ParseError::AccountAddress("empty address".into()))?;
        let bytes: [u8; HASH_LENGTH] = body.try_into().map_err(|_| {
            ParseError::AccountAddress(format!(
                "expected {} bytes, found {}",
                HASH_LENGTH,
                body.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Address of a smart contract instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContractAddress {
    /// Instance index.
    pub index: u64,
    /// Instance subindex.
    pub subindex: u64,
}

impl ContractAddress {
    #[must_use]
    pub fn new(index: u64, subindex: u64) -> Self {
        Self { index, subindex }
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}>", self.index, self.subindex)
    }
}

impl FromStr for ContractAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(|| ParseError::ContractAddress(format!("{s} is not <index,subindex>")))?;
        let (index, subindex) = inner
            .split_once(',')
            .ok_or_else(|| ParseError::ContractAddress(format!("{s} is missing a comma")))?;

        let parse = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|e| ParseError::ContractAddress(format!("{part}: {e}")))
        };
        Ok(Self {
            index: parse(index)?,
            subindex: parse(subindex)?,
        })
    }
}

/// Reference to a deployed smart contract module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleReference(pub [u8; HASH_LENGTH]);

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ModuleReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; HASH_LENGTH];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| ParseError::ModuleReference(e.to_string()))?;
        Ok(Self(bytes))
    }
}

/// An amount of CCD, held in micro-CCD.
///
/// Carried as a string on the wire: a `u64` does not fit the 53-bit
/// integers a page script can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CcdAmount(u64);

impl CcdAmount {
    /// Micro-CCD per CCD.
    pub const MICRO_PER_CCD: u64 = 1_000_000;

    #[must_use]
    pub fn from_micro_ccd(micro_ccd: u64) -> Self {
        Self(micro_ccd)
    }

    /// Whole CCD; `None` on overflow.
    #[must_use]
    pub fn from_ccd(ccd: u64) -> Option<Self> {
        ccd.checked_mul(Self::MICRO_PER_CCD).map(Self)
    }

    #[must_use]
    pub fn micro_ccd(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CcdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CcdAmount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| ParseError::CcdAmount(format!("{s}: {e}")))
    }
}
