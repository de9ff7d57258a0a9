//! Cross-collection write batch
//!
//! A [`DataBatch`] holds the store's writer lock and one
//! [`WriteBatchWrapper`] that every collection adapter stages into. Nothing
//! is visible to readers until [`DataBatch::commit`] applies the whole batch
//! in one engine write. Dropping the batch without committing discards it.

use crate::custom_id::CustomIdRecord;
use crate::db::WriteBatchWrapper;
use crate::error::StorageResult;
use crate::ops::OpsBatch;
use crate::que::QueBatch;
use crate::store::DataStore;
use crate::traits::{BatchedCollection, StageableWrite};
use crate::txs::TxsBatch;
use parking_lot::MutexGuard;
use spv_primitives::Height;
use std::time::Instant;

/// Atomic multi-collection write
pub struct DataBatch<'a> {
    store: &'a DataStore,
    batch: WriteBatchWrapper,
    height_deletions: u64,
    finished: bool,
    _writer: MutexGuard<'a, ()>,
}

impl<'a> DataBatch<'a> {
    pub(crate) fn new(store: &'a DataStore, writer: MutexGuard<'a, ()>) -> Self {
        Self {
            store,
            batch: WriteBatchWrapper::new(),
            height_deletions: 0,
            finished: false,
            _writer: writer,
        }
    }

    /// Transaction adapter
    pub fn txs(&mut self) -> TxsBatch<'_> {
        self.store.txs().stage(&mut self.batch)
    }

    /// Outpoint adapter
    pub fn ops(&mut self) -> OpsBatch<'_> {
        self.store.ops().stage(&mut self.batch)
    }

    /// Notify queue adapter
    pub fn que(&mut self) -> QueBatch<'_> {
        self.store.que().stage(&mut self.batch)
    }

    /// Stage an arbiter snapshot
    pub fn put_arbiters(
        &mut self,
        height: Height,
        crc: &[Vec<u8>],
        normal: &[Vec<u8>],
    ) -> StorageResult<()> {
        self.store
            .arbiters()
            .batch_put(height, crc, normal, &mut self.batch)
    }

    /// Stage a custom ID record
    pub fn put_custom_id(&mut self, record: CustomIdRecord) -> StorageResult<()> {
        let store = self.store;
        self.stage_write(store.cid(), record)
    }

    /// Stage a record into any collection that supports staged writes
    pub fn stage_write<W: StageableWrite>(&mut self, target: &W, record: W::Record) -> StorageResult<()> {
        target.batch_put(record, &mut self.batch)
    }

    /// Raw write batch, for collections staging on their own (e.g. headers)
    pub fn naked_batch(&mut self) -> &mut WriteBatchWrapper {
        &mut self.batch
    }

    /// Stage deletion of every transaction, outpoint and queue item at
    /// `height`
    ///
    /// Records are found in committed state; a tx or queue item moved to
    /// another height earlier in this batch keeps its new position. On error
    /// the batch should be dropped.
    pub fn del_all(&mut self, height: Height) -> StorageResult<usize> {
        let ops = self.ops().del_all(height)?;
        let txs = self.txs().del_all(height)?;
        let que = self.que().del_all(height)?;
        self.height_deletions += 1;
        tracing::info!(height, txs, ops, que, "height deletion staged");
        Ok(txs + ops + que)
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    /// Whether nothing has been staged
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Apply every staged write in one engine call
    ///
    /// Engine failures are returned unchanged and leave the store as it was.
    pub fn commit(mut self) -> StorageResult<()> {
        let batch = std::mem::take(&mut self.batch);
        self.finished = true;

        let staged = batch.len();
        let start = Instant::now();
        match self.store.database().write_batch(batch) {
            Ok(()) => {
                self.store.metrics().record_commit(start.elapsed());
                self.store
                    .metrics()
                    .record_height_deletions(self.height_deletions);
                tracing::info!(ops = staged, "batch committed");
                Ok(())
            }
            Err(e) => {
                self.store.metrics().record_failed_commit();
                tracing::warn!(ops = staged, error = %e, "batch commit failed");
                Err(e)
            }
        }
    }

    /// Discard every staged write
    pub fn rollback(mut self) {
        self.finished = true;
        self.discard();
    }

    fn discard(&mut self) {
        let staged = self.batch.len();
        self.batch.clear();
        self.store.metrics().record_rollback();
        tracing::info!(ops = staged, "batch rolled back");
    }
}

impl Drop for DataBatch<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}
