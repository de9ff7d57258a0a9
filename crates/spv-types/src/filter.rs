//! Membership filter over the watched address set
//!
//! [`AddrFilter`] answers exact membership locally and carries an
//! [`AddrBloom`] whose bytes are handed to peers so they only relay
//! transactions that may touch one of our addresses.

use sha3::{Digest, Keccak256};
use spv_primitives::Uint168;
use std::collections::HashSet;

/// Bloom filter keyed by program hash
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddrBloom {
    bits: Vec<u8>,
}

impl AddrBloom {
    /// Smallest filter size in bytes (2048 bits)
    pub const MIN_BYTES: usize = 256;

    /// Bits set per inserted address
    pub const HASH_COUNT: usize = 3;

    /// Empty filter sized for `expected` addresses
    pub fn with_capacity(expected: usize, bits_per_addr: usize) -> Self {
        let wanted = expected.saturating_mul(bits_per_addr).div_ceil(8);
        Self {
            bits: vec![0u8; wanted.max(Self::MIN_BYTES)],
        }
    }

    /// Wrap filter bytes received from elsewhere
    pub fn from_bytes(bits: Vec<u8>) -> Option<Self> {
        if bits.is_empty() {
            return None;
        }
        Some(Self { bits })
    }

    /// Add an address to the filter
    pub fn accrue(&mut self, addr: &Uint168) {
        for bit in bit_positions(addr, self.size_bits()) {
            self.bits[bit / 8] |= 1 << (bit % 8);
        }
    }

    /// Check if the filter might contain the address
    pub fn contains(&self, addr: &Uint168) -> bool {
        bit_positions(addr, self.size_bits())
            .iter()
            .all(|&bit| self.bits[bit / 8] & (1 << (bit % 8)) != 0)
    }

    /// Check if no bit is set
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Filter size in bits
    pub fn size_bits(&self) -> usize {
        self.bits.len() * 8
    }

    /// Raw filter bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

fn bit_positions(addr: &Uint168, size_bits: usize) -> [usize; AddrBloom::HASH_COUNT] {
    let digest = Keccak256::digest(addr.as_bytes());
    let mut out = [0usize; AddrBloom::HASH_COUNT];
    for (i, slot) in out.iter_mut().enumerate() {
        let chunk = [
            digest[i * 4],
            digest[i * 4 + 1],
            digest[i * 4 + 2],
            digest[i * 4 + 3],
        ];
        *slot = u32::from_be_bytes(chunk) as usize % size_bits;
    }
    out
}

/// Snapshot of the watched address set
#[derive(Clone, Debug)]
pub struct AddrFilter {
    addrs: HashSet<Uint168>,
    bloom: AddrBloom,
}

impl AddrFilter {
    /// Default bloom sizing
    pub const DEFAULT_BITS_PER_ADDR: usize = 16;

    /// Build a filter over `addrs`
    pub fn new(addrs: impl IntoIterator<Item = Uint168>, bits_per_addr: usize) -> Self {
        let addrs: HashSet<Uint168> = addrs.into_iter().collect();
        let mut bloom = AddrBloom::with_capacity(addrs.len(), bits_per_addr);
        for addr in &addrs {
            bloom.accrue(addr);
        }
        Self { addrs, bloom }
    }

    /// Exact membership test
    pub fn contains_addr(&self, addr: &Uint168) -> bool {
        self.addrs.contains(addr)
    }

    /// Probabilistic membership test, as a peer holding the bloom would see it
    pub fn may_contain(&self, addr: &Uint168) -> bool {
        self.bloom.contains(addr)
    }

    /// Bloom filter to hand to peers
    pub fn bloom(&self) -> &AddrBloom {
        &self.bloom
    }

    /// Watched addresses, unordered
    pub fn addrs(&self) -> impl Iterator<Item = &Uint168> {
        self.addrs.iter()
    }

    /// Number of watched addresses
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// Check if no address is watched
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

impl Default for AddrFilter {
    fn default() -> Self {
        Self::new(std::iter::empty(), Self::DEFAULT_BITS_PER_ADDR)
    }
}
