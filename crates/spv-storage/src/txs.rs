//! Transactions, indexed by height and by hash, plus fork archives

use crate::db::{Database, WriteBatchWrapper};
use crate::error::{ResultExt, StorageError, StorageResult};
use crate::keys::{height_key, prefix, read_height, Bucket, HeightIndex};
use crate::traits::BatchedCollection;
use spv_primitives::{Height, Uint256};
use spv_types::codec::{decode_tx, decode_txs, encode_tx, encode_txs};
use spv_types::Tx;

const COLLECTION: &str = "txs";

/// Transaction store
///
/// Main-chain transactions live in the `(height, hash)` index with the
/// encoded tx as value; the hash index maps each hash to its height. Fork
/// transactions are archived per fork block hash and never height-indexed.
pub struct Txs {
    db: Database,
    hashes: Bucket,
    heights: HeightIndex,
    forks: Bucket,
}

impl Txs {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            hashes: Bucket::new(db.clone(), &[prefix::TX_HASH], COLLECTION),
            heights: HeightIndex::new(Bucket::new(db.clone(), &[prefix::TX_HEIGHT], COLLECTION)),
            forks: Bucket::new(db.clone(), &[prefix::FORK_TXS], "fork_txs"),
            db,
        }
    }

    /// Store a confirmed transaction
    pub fn put(&self, tx: &Tx) -> StorageResult<()> {
        let mut batch = self.db.batch();
        self.stage_put(tx, &mut batch)?;
        self.db.write_batch(batch).in_collection(COLLECTION)
    }

    /// Transaction by hash
    pub fn get(&self, hash: &Uint256) -> StorageResult<Tx> {
        let height = self
            .height_of(hash)?
            .ok_or_else(|| StorageError::NotFound(format!("tx {}", hash)))?;

        let bytes = match self.heights.get(height, hash.as_bytes())? {
            Some(bytes) => bytes,
            None => {
                tracing::warn!(tx = %hash, height, "hash index points at missing tx record");
                return Err(StorageError::NotFound(format!("tx {}", hash)));
            }
        };
        decode(&bytes)
    }

    /// Every main-chain transaction, ordered by height then hash
    pub fn get_all(&self) -> StorageResult<Vec<Tx>> {
        self.heights
            .all()?
            .into_iter()
            .map(|(_, _, bytes)| decode(&bytes))
            .collect()
    }

    /// Hashes of the transactions at `height`
    pub fn get_ids(&self, height: Height) -> StorageResult<Vec<Uint256>> {
        self.heights
            .entries_at(height)?
            .into_iter()
            .map(|(hash, _)| {
                Uint256::from_slice(&hash)
                    .map_err(|e| StorageError::Deserialization(format!("{}: {}", COLLECTION, e)))
            })
            .collect()
    }

    /// Archive the transactions of a fork block, replacing any previous
    /// archive for the same block
    pub fn put_fork_txs(&self, txs: &[Tx], fork_hash: &Uint256) -> StorageResult<()> {
        self.forks.put(fork_hash.as_bytes(), &encode_txs(txs))?;
        tracing::debug!(fork = %fork_hash, count = txs.len(), "fork txs archived");
        Ok(())
    }

    /// Archived transactions of a fork block
    pub fn get_fork_txs(&self, fork_hash: &Uint256) -> StorageResult<Vec<Tx>> {
        let bytes = self
            .forks
            .get(fork_hash.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("fork txs {}", fork_hash)))?;
        decode_txs(&bytes)
            .ok_or_else(|| StorageError::Deserialization(format!("fork txs {}", fork_hash)))
    }

    /// Remove a main-chain transaction; absent hashes are ignored
    pub fn del(&self, hash: &Uint256) -> StorageResult<()> {
        let mut batch = self.db.batch();
        if !self.stage_del(hash, &mut batch)? {
            return Ok(());
        }
        self.db.write_batch(batch).in_collection(COLLECTION)
    }

    /// Remove every transaction and fork archive
    pub fn clear(&self) -> StorageResult<()> {
        let mut batch = self.db.batch();
        self.hashes.stage_clear(&mut batch)?;
        self.heights.bucket().stage_clear(&mut batch)?;
        self.forks.stage_clear(&mut batch)?;
        self.db.write_batch(batch).in_collection(COLLECTION)
    }

    /// Batch adapter staging into `batch`
    pub fn stage<'b>(&'b self, batch: &'b mut WriteBatchWrapper) -> TxsBatch<'b> {
        TxsBatch { txs: self, batch }
    }

    fn height_of(&self, hash: &Uint256) -> StorageResult<Option<Height>> {
        decode_height(self.hashes.get(hash.as_bytes())?)
    }

    /// Height of `hash` with the writes staged in `batch` applied
    fn staged_height_of(
        &self,
        hash: &[u8],
        batch: &WriteBatchWrapper,
    ) -> StorageResult<Option<Height>> {
        decode_height(self.hashes.get_staged(batch, hash)?)
    }

    fn stage_put(&self, tx: &Tx, batch: &mut WriteBatchWrapper) -> StorageResult<()> {
        let height = tx.height.ok_or_else(|| {
            StorageError::InvalidArgument(format!("tx {} has no height", tx.hash))
        })?;

        if let Some(old) = self.staged_height_of(tx.hash.as_bytes(), batch)? {
            if old != height {
                tracing::warn!(tx = %tx.hash, old, new = height, "tx moved height, dropping stale record");
                self.heights.stage_delete(batch, old, tx.hash.as_bytes());
            }
        }

        self.heights
            .stage_put(batch, height, tx.hash.as_bytes(), &encode_tx(tx));
        self.hashes
            .stage_put(batch, tx.hash.as_bytes(), &height_key(height));
        tracing::debug!(tx = %tx.hash, height, "tx staged");
        Ok(())
    }

    fn stage_del(&self, hash: &Uint256, batch: &mut WriteBatchWrapper) -> StorageResult<bool> {
        let Some(height) = self.staged_height_of(hash.as_bytes(), batch)? else {
            return Ok(false);
        };
        self.heights.stage_delete(batch, height, hash.as_bytes());
        self.hashes.stage_delete(batch, hash.as_bytes());
        tracing::debug!(tx = %hash, height, "tx delete staged");
        Ok(true)
    }
}

fn decode_height(bytes: Option<Vec<u8>>) -> StorageResult<Option<Height>> {
    match bytes {
        Some(bytes) => read_height(&bytes)
            .map(Some)
            .ok_or_else(|| StorageError::Deserialization(format!("{} hash index", COLLECTION))),
        None => Ok(None),
    }
}

fn decode(bytes: &[u8]) -> StorageResult<Tx> {
    decode_tx(bytes).ok_or_else(|| StorageError::Deserialization(format!("{} record", COLLECTION)))
}

/// Transaction writes bound to a shared batch
pub struct TxsBatch<'a> {
    txs: &'a Txs,
    batch: &'a mut WriteBatchWrapper,
}

impl TxsBatch<'_> {
    /// Stage a confirmed transaction
    pub fn put(&mut self, tx: &Tx) -> StorageResult<()> {
        self.txs.stage_put(tx, self.batch)
    }

    /// Stage removal of a transaction, including one staged earlier in this
    /// batch; returns false when there is nothing to remove
    pub fn del(&mut self, hash: &Uint256) -> StorageResult<bool> {
        self.txs.stage_del(hash, self.batch)
    }
}

impl BatchedCollection for TxsBatch<'_> {
    fn del_all(&mut self, height: Height) -> StorageResult<usize> {
        let removed = self.txs.heights.stage_delete_height(self.batch, height)?;
        for hash in &removed {
            // re-put at another height earlier in this batch
            match self.txs.staged_height_of(hash, self.batch)? {
                Some(staged) if staged != height => continue,
                _ => self.txs.hashes.stage_delete(self.batch, hash),
            }
        }
        Ok(removed.len())
    }
}
