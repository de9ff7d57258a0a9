//! Block headers kept by the header chain

use bytes::Bytes;
use spv_primitives::{Height, Uint256};

/// A block header with its position in the chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Block hash
    pub hash: Uint256,
    /// Hash of the previous block
    pub previous: Uint256,
    /// Height in the chain
    pub height: Height,
    /// Block timestamp (Unix seconds)
    pub timestamp: u32,
    /// Serialized header as received from the network
    pub raw: Bytes,
}

impl Header {
    /// Create a header
    pub fn new(
        hash: Uint256,
        previous: Uint256,
        height: Height,
        timestamp: u32,
        raw: impl Into<Bytes>,
    ) -> Self {
        Self {
            hash,
            previous,
            height,
            timestamp,
            raw: raw.into(),
        }
    }

    /// Whether `other` directly extends this header
    pub fn is_parent_of(&self, other: &Header) -> bool {
        other.previous == self.hash && other.height == self.height.wrapping_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_parent_of() {
        let genesis = Header::new(Uint256::from_bytes([1; 32]), Uint256::ZERO, 0, 0, Bytes::new());
        let child = Header::new(Uint256::from_bytes([2; 32]), genesis.hash, 1, 10, Bytes::new());
        let orphan = Header::new(Uint256::from_bytes([3; 32]), Uint256::from_bytes([9; 32]), 1, 10, Bytes::new());
        assert!(genesis.is_parent_of(&child));
        assert!(!genesis.is_parent_of(&orphan));
        assert!(!child.is_parent_of(&genesis));
    }
}
