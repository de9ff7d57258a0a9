//! 256-bit hash type

use std::fmt;
use thiserror::Error;

/// Hash parsing error
#[derive(Debug, Error)]
pub enum HashError {
    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Invalid length
    #[error("invalid hash length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Supplied length
        got: usize,
    },
}

/// 256-bit hash (32 bytes), used for transaction ids and block hashes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uint256([u8; 32]);

impl Uint256 {
    /// Size in bytes
    pub const LEN: usize = 32;

    /// Zero hash
    pub const ZERO: Uint256 = Uint256([0u8; 32]);

    /// Create from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Uint256(bytes)
    }

    /// Create from slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, HashError> {
        if slice.len() != Self::LEN {
            return Err(HashError::InvalidLength {
                expected: Self::LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Uint256(bytes))
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Hash with its byte order flipped
    pub fn reversed(&self) -> Self {
        let mut bytes = self.0;
        bytes.reverse();
        Uint256(bytes)
    }

    /// Byte-reversed hex without prefix, the form block explorers and peers
    /// print tx ids and block hashes in
    pub fn to_reversed_hex(&self) -> String {
        hex::encode(self.reversed().0)
    }

    /// Parse the byte-reversed hex form produced by [`Self::to_reversed_hex`]
    pub fn from_reversed_hex(s: &str) -> Result<Self, HashError> {
        Ok(Self::from_hex(s)?.reversed())
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256({})", self.to_hex())
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Uint256 {
    fn from(bytes: [u8; 32]) -> Self {
        Uint256(bytes)
    }
}

impl AsRef<[u8]> for Uint256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Uint256 {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for Uint256 {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Uint256::from_hex(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        let hash = Uint256::from_hex(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert!(!hash.is_zero());
        assert_eq!(hash.as_bytes()[31], 1);
    }

    #[test]
    fn test_zero() {
        assert!(Uint256::ZERO.is_zero());
        assert_eq!(Uint256::default(), Uint256::ZERO);
    }

    #[test]
    fn test_from_hex_mixed_case() {
        let lower = Uint256::from_hex(
            "0xabcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789",
        )
        .unwrap();
        let upper = Uint256::from_hex(
            "0xABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789",
        )
        .unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_from_hex_invalid_chars() {
        match Uint256::from_hex(
            "0xgggggggggggggggggggggggggggggggggggggggggggggggggggggggggggggggg",
        ) {
            Err(HashError::InvalidHex(_)) => {}
            other => panic!("Expected InvalidHex, got {:?}", other),
        }
    }

    #[test]
    fn test_from_hex_only_prefix() {
        match Uint256::from_hex("0x") {
            Err(HashError::InvalidLength { expected: 32, got: 0 }) => {}
            other => panic!("Expected InvalidLength, got {:?}", other),
        }
    }

    #[test]
    fn test_from_slice_too_short() {
        match Uint256::from_slice(&[0u8; 31]) {
            Err(HashError::InvalidLength { expected: 32, got: 31 }) => {}
            other => panic!("Expected InvalidLength, got {:?}", other),
        }
    }

    #[test]
    fn test_reversed_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        bytes[31] = 0xff;
        let hash = Uint256::from_bytes(bytes);

        let shown = hash.to_reversed_hex();
        assert!(shown.starts_with("ff00"));
        assert!(shown.ends_with("0001"));
        assert_eq!(Uint256::from_reversed_hex(&shown).unwrap(), hash);
        assert_eq!(hash.reversed().reversed(), hash);
        assert!(matches!(
            Uint256::from_reversed_hex("abcd"),
            Err(HashError::InvalidLength { expected: 32, got: 2 })
        ));
    }

    #[test]
    fn test_display() {
        let hash = Uint256::from_bytes([0xab; 32]);
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(32)));
        assert!(format!("{:?}", hash).starts_with("Uint256(0xabab"));
    }
}
