//! Binary encoding/decoding for stored records.
//!
//! Deterministic little-endian layouts used by the storage layer for record
//! values. Keys are built by the storage layer itself (big-endian, so that
//! byte order matches numeric order). Decoders return `None` on truncated or
//! trailing input.

use crate::header::Header;
use crate::queue::QueItem;
use crate::transaction::Tx;
use bytes::Bytes;
use spv_primitives::Uint256;

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.buf.len() {
            return None;
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Some(out)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn hash(&mut self) -> Option<Uint256> {
        Uint256::from_slice(self.take(32)?).ok()
    }

    fn var_bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn finish<T>(self, value: T) -> Option<T> {
        (self.pos == self.buf.len()).then_some(value)
    }
}

fn put_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
}

// ============================================================================
// Transactions
// ============================================================================

fn write_tx(buf: &mut Vec<u8>, tx: &Tx) {
    buf.extend_from_slice(tx.hash.as_bytes()); // 32
    match tx.height {
        Some(height) => {
            buf.push(1);
            buf.extend_from_slice(&height.to_le_bytes()); // 4
        }
        None => buf.push(0),
    }
    buf.extend_from_slice(&tx.timestamp.to_le_bytes()); // 8
    put_var_bytes(buf, &tx.raw);
}

fn read_tx(r: &mut Reader<'_>) -> Option<Tx> {
    let hash = r.hash()?;
    let height = match r.u8()? {
        0 => None,
        1 => Some(r.u32()?),
        _ => return None,
    };
    let timestamp = r.u64()?;
    let raw = Bytes::copy_from_slice(r.var_bytes()?);
    Some(Tx {
        hash,
        height,
        timestamp,
        raw,
    })
}

/// Encode a transaction to bytes.
pub fn encode_tx(tx: &Tx) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 5 + 8 + 4 + tx.raw.len());
    write_tx(&mut buf, tx);
    buf
}

/// Decode a transaction from bytes.
pub fn decode_tx(bytes: &[u8]) -> Option<Tx> {
    let mut r = Reader::new(bytes);
    let tx = read_tx(&mut r)?;
    r.finish(tx)
}

/// Encode a list of transactions (fork archives).
pub fn encode_txs(txs: &[Tx]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(txs.len() as u32).to_le_bytes());
    for tx in txs {
        write_tx(&mut buf, tx);
    }
    buf
}

/// Decode a list of transactions.
pub fn decode_txs(bytes: &[u8]) -> Option<Vec<Tx>> {
    let mut r = Reader::new(bytes);
    let count = r.u32()? as usize;
    let mut txs = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        txs.push(read_tx(&mut r)?);
    }
    r.finish(txs)
}

// ============================================================================
// Notify queue
// ============================================================================

/// Encode a queue item to bytes.
pub fn encode_que_item(item: &QueItem) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 32 + 4 + 8);
    buf.extend_from_slice(item.notify_id.as_bytes());
    buf.extend_from_slice(item.tx_id.as_bytes());
    buf.extend_from_slice(&item.height.to_le_bytes());
    buf.extend_from_slice(&item.last_notify.to_le_bytes());
    buf
}

/// Decode a queue item from bytes.
pub fn decode_que_item(bytes: &[u8]) -> Option<QueItem> {
    let mut r = Reader::new(bytes);
    let item = QueItem {
        notify_id: r.hash()?,
        tx_id: r.hash()?,
        height: r.u32()?,
        last_notify: r.u64()?,
    };
    r.finish(item)
}

// ============================================================================
// Arbiters
// ============================================================================

fn write_byte_lists(buf: &mut Vec<u8>, items: &[Vec<u8>]) {
    buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
    for item in items {
        put_var_bytes(buf, item);
    }
}

fn read_byte_lists(r: &mut Reader<'_>) -> Option<Vec<Vec<u8>>> {
    let count = r.u32()? as usize;
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        items.push(r.var_bytes()?.to_vec());
    }
    Some(items)
}

/// Encode an arbiter snapshot (CRC arbiters, then normal arbiters).
pub fn encode_arbiters(crc: &[Vec<u8>], normal: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_byte_lists(&mut buf, crc);
    write_byte_lists(&mut buf, normal);
    buf
}

/// Decode an arbiter snapshot.
pub fn decode_arbiters(bytes: &[u8]) -> Option<(Vec<Vec<u8>>, Vec<Vec<u8>>)> {
    let mut r = Reader::new(bytes);
    let crc = read_byte_lists(&mut r)?;
    let normal = read_byte_lists(&mut r)?;
    r.finish((crc, normal))
}

// ============================================================================
// Custom IDs
// ============================================================================

/// Encode a list of identifiers.
pub fn encode_strings<S: AsRef<str>>(items: &[S]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
    for item in items {
        put_var_bytes(&mut buf, item.as_ref().as_bytes());
    }
    buf
}

/// Decode a list of identifiers. Invalid UTF-8 fails the whole decode.
pub fn decode_strings(bytes: &[u8]) -> Option<Vec<String>> {
    let mut r = Reader::new(bytes);
    let count = r.u32()? as usize;
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let s = std::str::from_utf8(r.var_bytes()?).ok()?;
        items.push(s.to_string());
    }
    r.finish(items)
}

// ============================================================================
// Headers
// ============================================================================

/// Encode a block header to bytes.
pub fn encode_header(header: &Header) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 32 + 4 + 4 + 4 + header.raw.len());
    buf.extend_from_slice(header.hash.as_bytes());
    buf.extend_from_slice(header.previous.as_bytes());
    buf.extend_from_slice(&header.height.to_le_bytes());
    buf.extend_from_slice(&header.timestamp.to_le_bytes());
    put_var_bytes(&mut buf, &header.raw);
    buf
}

/// Decode a block header from bytes.
pub fn decode_header(bytes: &[u8]) -> Option<Header> {
    let mut r = Reader::new(bytes);
    let header = Header {
        hash: r.hash()?,
        previous: r.hash()?,
        height: r.u32()?,
        timestamp: r.u32()?,
        raw: Bytes::copy_from_slice(r.var_bytes()?),
    };
    r.finish(header)
}
