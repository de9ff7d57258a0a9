//! Tracked transactions and output references

use bytes::Bytes;
use spv_primitives::{Height, Uint256};
use std::fmt;

/// A transaction the wallet tracks.
///
/// `height` is `None` while the transaction is unconfirmed. Only confirmed
/// transactions may enter the main-chain index; unconfirmed ones can still be
/// archived as fork transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    /// Transaction hash
    pub hash: Uint256,
    /// Height of the block that included it
    pub height: Option<Height>,
    /// Unix timestamp (seconds) of the including block, or first-seen time
    pub timestamp: u64,
    /// Serialized transaction as received from the network
    pub raw: Bytes,
}

impl Tx {
    /// Create a confirmed transaction
    pub fn new(hash: Uint256, height: Height, timestamp: u64, raw: impl Into<Bytes>) -> Self {
        Self {
            hash,
            height: Some(height),
            timestamp,
            raw: raw.into(),
        }
    }

    /// Create a transaction not yet included in a block
    pub fn unconfirmed(hash: Uint256, timestamp: u64, raw: impl Into<Bytes>) -> Self {
        Self {
            hash,
            height: None,
            timestamp,
            raw: raw.into(),
        }
    }

    /// Whether the transaction carries a block height
    pub fn is_confirmed(&self) -> bool {
        self.height.is_some()
    }

    /// Reference to output `index` of this transaction
    pub fn outpoint(&self, index: u16) -> OutPoint {
        OutPoint::new(self.hash, index)
    }
}

/// Reference to a specific output of a prior transaction
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct OutPoint {
    /// Id of the transaction holding the output
    pub tx_id: Uint256,
    /// Output index
    pub index: u16,
}

impl OutPoint {
    /// Encoded size: tx id followed by big-endian index
    pub const LEN: usize = Uint256::LEN + 2;

    /// Create an outpoint
    pub fn new(tx_id: Uint256, index: u16) -> Self {
        Self { tx_id, index }
    }

    /// Fixed-width key bytes, ordered by tx id then index
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..32].copy_from_slice(self.tx_id.as_bytes());
        out[32..].copy_from_slice(&self.index.to_be_bytes());
        out
    }

    /// Decode from [`OutPoint::to_bytes`] output
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        let tx_id = Uint256::from_slice(&bytes[..32]).ok()?;
        let index = u16::from_be_bytes([bytes[32], bytes[33]]);
        Some(Self { tx_id, index })
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutPoint({}:{})", self.tx_id.to_hex(), self.index)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id.to_reversed_hex(), self.index)
    }
}
