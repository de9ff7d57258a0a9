//! Program hash type (21 bytes)
//!
//! A `Uint168` is a one-byte script prefix followed by the 20-byte hash of
//! the redeem script. It identifies both watched wallet addresses and
//! decentralized identities.

use std::fmt;
use thiserror::Error;

/// Address parsing error
#[derive(Debug, Error)]
pub enum AddressError {
    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Invalid length
    #[error("invalid program hash length: expected 21 bytes, got {0}")]
    InvalidLength(usize),
}

/// 21-byte program hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uint168([u8; 21]);

impl Uint168 {
    /// Size of a program hash in bytes
    pub const LEN: usize = 21;

    /// Zero program hash
    pub const ZERO: Uint168 = Uint168([0u8; 21]);

    /// Create from bytes
    pub const fn from_bytes(bytes: [u8; 21]) -> Self {
        Uint168(bytes)
    }

    /// Create from slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        if slice.len() != Self::LEN {
            return Err(AddressError::InvalidLength(slice.len()));
        }
        let mut bytes = [0u8; 21];
        bytes.copy_from_slice(slice);
        Ok(Uint168(bytes))
    }

    /// Parse from hex string (with or without 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    /// Script prefix byte (first byte of the program hash)
    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    /// Check if this is the zero program hash
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 21]
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Uint168 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint168({})", self.to_hex())
    }
}

impl fmt::Display for Uint168 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 21]> for Uint168 {
    fn from(bytes: [u8; 21]) -> Self {
        Uint168(bytes)
    }
}

impl AsRef<[u8]> for Uint168 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Uint168 {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for Uint168 {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Uint168::from_hex(&s).map_err(de::Error::custom)
        }
    }

}
