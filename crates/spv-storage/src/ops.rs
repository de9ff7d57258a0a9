//! Outpoint ownership index

use crate::db::{Database, WriteBatchWrapper};
use crate::error::{StorageError, StorageResult};
use crate::keys::{prefix, Bucket, HeightIndex};
use crate::traits::BatchedCollection;
use spv_primitives::{Height, Uint168};
use spv_types::OutPoint;

const COLLECTION: &str = "ops";

/// Maps outpoints to the watched address that owns them
pub struct Ops {
    bucket: Bucket,
    tx_heights: HeightIndex,
}

impl Ops {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            bucket: Bucket::new(db.clone(), &[prefix::OPS], COLLECTION),
            tx_heights: HeightIndex::new(Bucket::new(db, &[prefix::TX_HEIGHT], COLLECTION)),
        }
    }

    /// Record the owner of an outpoint, overwriting any previous owner
    pub fn put(&self, op: &OutPoint, owner: &Uint168) -> StorageResult<()> {
        self.bucket.put(&op.to_bytes(), owner.as_bytes())
    }

    /// Owner of `op`, if it is tracked
    pub fn have_op(&self, op: &OutPoint) -> StorageResult<Option<Uint168>> {
        match self.bucket.get(&op.to_bytes())? {
            Some(bytes) => Ok(Some(decode_owner(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every tracked outpoint, ordered by tx id then index
    pub fn get_all(&self) -> StorageResult<Vec<OutPoint>> {
        self.bucket
            .scan(&[])?
            .into_iter()
            .map(|(key, _)| {
                OutPoint::from_bytes(&key)
                    .ok_or_else(|| StorageError::Deserialization(format!("{} key", COLLECTION)))
            })
            .collect()
    }

    /// Remove every outpoint
    pub fn clear(&self) -> StorageResult<()> {
        self.bucket.clear()
    }

    /// Batch adapter staging into `batch`
    pub fn stage<'b>(&'b self, batch: &'b mut WriteBatchWrapper) -> OpsBatch<'b> {
        OpsBatch { ops: self, batch }
    }
}

fn decode_owner(bytes: &[u8]) -> StorageResult<Uint168> {
    Uint168::from_slice(bytes)
        .map_err(|e| StorageError::Deserialization(format!("{} owner: {}", COLLECTION, e)))
}

/// Outpoint writes bound to a shared batch
pub struct OpsBatch<'a> {
    ops: &'a Ops,
    batch: &'a mut WriteBatchWrapper,
}

impl OpsBatch<'_> {
    /// Stage an outpoint owner
    pub fn put(&mut self, op: &OutPoint, owner: &Uint168) -> StorageResult<()> {
        self.ops
            .bucket
            .stage_put(self.batch, &op.to_bytes(), owner.as_bytes());
        tracing::debug!(op = %op, owner = %owner, "outpoint staged");
        Ok(())
    }

    /// Stage removal of an outpoint
    pub fn del(&mut self, op: &OutPoint) -> StorageResult<()> {
        self.ops.bucket.stage_delete(self.batch, &op.to_bytes());
        Ok(())
    }
}

impl BatchedCollection for OpsBatch<'_> {
    /// Outpoints of the main-chain transactions at `height`
    fn del_all(&mut self, height: Height) -> StorageResult<usize> {
        let mut removed = 0;
        for (tx_id, _) in self.ops.tx_heights.entries_at(height)? {
            for (key, _) in self.ops.bucket.scan(&tx_id)? {
                self.ops.bucket.stage_delete(self.batch, &key);
                removed += 1;
            }
        }
        Ok(removed)
    }
}
