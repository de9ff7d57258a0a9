//! Pending notification queue

use crate::db::{Database, WriteBatchWrapper};
use crate::error::{ResultExt, StorageError, StorageResult};
use crate::keys::{prefix, Bucket, HeightIndex};
use crate::traits::BatchedCollection;
use spv_primitives::{Height, Uint256};
use spv_types::codec::{decode_que_item, encode_que_item};
use spv_types::QueItem;

const COLLECTION: &str = "que";

/// Queue of notifications keyed by `(notify_id, tx_id)`, indexed by height
pub struct Que {
    db: Database,
    items: Bucket,
    heights: HeightIndex,
}

impl Que {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            items: Bucket::new(db.clone(), &[prefix::QUE], COLLECTION),
            heights: HeightIndex::new(Bucket::new(db.clone(), &[prefix::QUE_HEIGHT], COLLECTION)),
            db,
        }
    }

    /// Insert or refresh an entry
    pub fn put(&self, item: &QueItem) -> StorageResult<()> {
        let mut batch = self.db.batch();
        self.stage_put(item, &mut batch)?;
        self.db.write_batch(batch).in_collection(COLLECTION)
    }

    /// Entry for a `(notify_id, tx_id)` pair
    pub fn get(&self, notify_id: &Uint256, tx_id: &Uint256) -> StorageResult<Option<QueItem>> {
        self.read(&QueItem::key_of(notify_id, tx_id))
    }

    /// Every entry, ordered by height
    pub fn get_all(&self) -> StorageResult<Vec<QueItem>> {
        let mut out = Vec::new();
        for (height, key, _) in self.heights.all()? {
            match self.read(&key)? {
                Some(item) => out.push(item),
                None => tracing::warn!(height, "queue height index points at missing item"),
            }
        }
        Ok(out)
    }

    /// Remove an entry; absent pairs are ignored
    pub fn del(&self, notify_id: &Uint256, tx_id: &Uint256) -> StorageResult<()> {
        let mut batch = self.db.batch();
        if !self.stage_del(&QueItem::key_of(notify_id, tx_id), &mut batch)? {
            return Ok(());
        }
        self.db.write_batch(batch).in_collection(COLLECTION)
    }

    /// Remove every entry
    pub fn clear(&self) -> StorageResult<()> {
        let mut batch = self.db.batch();
        self.items.stage_clear(&mut batch)?;
        self.heights.bucket().stage_clear(&mut batch)?;
        self.db.write_batch(batch).in_collection(COLLECTION)
    }

    /// Batch adapter staging into `batch`
    pub fn stage<'b>(&'b self, batch: &'b mut WriteBatchWrapper) -> QueBatch<'b> {
        QueBatch { que: self, batch }
    }

    fn read(&self, key: &[u8]) -> StorageResult<Option<QueItem>> {
        decode(self.items.get(key)?)
    }

    /// Entry for `key` with the writes staged in `batch` applied
    fn read_staged(&self, key: &[u8], batch: &WriteBatchWrapper) -> StorageResult<Option<QueItem>> {
        decode(self.items.get_staged(batch, key)?)
    }

    fn stage_put(&self, item: &QueItem, batch: &mut WriteBatchWrapper) -> StorageResult<()> {
        let key = item.key();
        if let Some(old) = self.read_staged(&key, batch)? {
            if old.height != item.height {
                self.heights.stage_delete(batch, old.height, &key);
            }
        }
        self.items.stage_put(batch, &key, &encode_que_item(item));
        self.heights.stage_put(batch, item.height, &key, &[]);
        tracing::debug!(notify = %item.notify_id, tx = %item.tx_id, height = item.height, "queue item staged");
        Ok(())
    }

    fn stage_del(&self, key: &[u8], batch: &mut WriteBatchWrapper) -> StorageResult<bool> {
        let Some(old) = self.read_staged(key, batch)? else {
            return Ok(false);
        };
        self.heights.stage_delete(batch, old.height, key);
        self.items.stage_delete(batch, key);
        Ok(true)
    }
}

fn decode(bytes: Option<Vec<u8>>) -> StorageResult<Option<QueItem>> {
    match bytes {
        Some(bytes) => decode_que_item(&bytes)
            .map(Some)
            .ok_or_else(|| StorageError::Deserialization(format!("{} item", COLLECTION))),
        None => Ok(None),
    }
}

/// Queue writes bound to a shared batch
pub struct QueBatch<'a> {
    que: &'a Que,
    batch: &'a mut WriteBatchWrapper,
}

impl QueBatch<'_> {
    /// Stage an entry
    pub fn put(&mut self, item: &QueItem) -> StorageResult<()> {
        self.que.stage_put(item, self.batch)
    }

    /// Stage removal of an entry, including one staged earlier in this batch;
    /// returns false when there is nothing to remove
    pub fn del(&mut self, notify_id: &Uint256, tx_id: &Uint256) -> StorageResult<bool> {
        self.que
            .stage_del(&QueItem::key_of(notify_id, tx_id), self.batch)
    }
}

impl BatchedCollection for QueBatch<'_> {
    fn del_all(&mut self, height: Height) -> StorageResult<usize> {
        let removed = self.que.heights.stage_delete_height(self.batch, height)?;
        for key in &removed {
            // moved to another height earlier in this batch
            match self.que.read_staged(key, self.batch)? {
                Some(item) if item.height != height => continue,
                _ => self.que.items.stage_delete(self.batch, key),
            }
        }
        Ok(removed.len())
    }
}
