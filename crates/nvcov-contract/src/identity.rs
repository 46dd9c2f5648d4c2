// SPDX-License-Identifier: AGPL-3.0

//! Contract identity (script hash)

use nvcov_exceptions::{FormatError, FormatResult};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Size of a contract identity in bytes
pub const IDENTITY_LENGTH: usize = 20;

/// A 20-byte contract script hash stored as three little-endian words
///
/// The textual form is `0x` followed by the bytes in reverse order, which is
/// how execution hosts and debug info print it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContractIdentity {
    value1: u64,
    value2: u64,
    value3: u32,
}

impl ContractIdentity {
    pub const ZERO: Self = Self {
        value1: 0,
        value2: 0,
        value3: 0,
    };

    /// Build from the raw little-endian byte layout
    pub fn from_bytes(bytes: [u8; IDENTITY_LENGTH]) -> Self {
        let mut v1 = [0u8; 8];
        let mut v2 = [0u8; 8];
        let mut v3 = [0u8; 4];
        v1.copy_from_slice(&bytes[0..8]);
        v2.copy_from_slice(&bytes[8..16]);
        v3.copy_from_slice(&bytes[16..20]);

        Self {
            value1: u64::from_le_bytes(v1),
            value2: u64::from_le_bytes(v2),
            value3: u32::from_le_bytes(v3),
        }
    }

    /// Build from a slice that must be exactly 20 bytes long
    pub fn from_slice(bytes: &[u8]) -> FormatResult<Self> {
        let array: [u8; IDENTITY_LENGTH] = bytes.try_into().map_err(|_| {
            FormatError::InvalidHash(format!("expected 20 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_bytes(array))
    }

    /// Raw little-endian byte layout
    pub fn to_bytes(&self) -> [u8; IDENTITY_LENGTH] {
        let mut bytes = [0u8; IDENTITY_LENGTH];
        bytes[0..8].copy_from_slice(&self.value1.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.value2.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.value3.to_le_bytes());
        bytes
    }

    /// Parse the `0x`-prefixed (or bare) 40 digit hex form
    pub fn parse(text: &str) -> FormatResult<Self> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != IDENTITY_LENGTH * 2 {
            return Err(FormatError::InvalidHash(text.to_string()));
        }

        let mut bytes =
            hex::decode(digits).map_err(|_| FormatError::InvalidHash(text.to_string()))?;
        bytes.reverse();
        Self::from_slice(&bytes)
    }
}

impl Ord for ContractIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value3
            .cmp(&other.value3)
            .then_with(|| self.value2.cmp(&other.value2))
            .then_with(|| self.value1.cmp(&other.value1))
    }
}

impl PartialOrd for ContractIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ContractIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.to_bytes();
        bytes.reverse();
        write!(f, "0x{}", hex::encode(bytes))
    }
}

impl FromStr for ContractIdentity {
    type Err = FormatError;

    fn from_str(s: &str) -> FormatResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for ContractIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
