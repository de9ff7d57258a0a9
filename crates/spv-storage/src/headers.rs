//! Header chain storage

use crate::db::{Database, WriteBatchWrapper};
use crate::error::{ResultExt, StorageError, StorageResult};
use crate::keys::{height_key, prefix, Bucket};
use crate::traits::{HeaderStore, Headers};
use spv_primitives::{Height, Uint256};
use spv_types::codec::{decode_header, encode_header};
use spv_types::Header;

const COLLECTION: &str = "headers";

/// Header database: headers by hash, main-chain hashes by height, and the
/// best header hash
pub struct HeaderDb {
    db: Database,
    headers: Bucket,
    heights: Bucket,
    tip: Bucket,
}

impl HeaderDb {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            headers: Bucket::new(db.clone(), &[prefix::HEADERS], COLLECTION),
            heights: Bucket::new(db.clone(), &[prefix::HEADER_HEIGHT], COLLECTION),
            tip: Bucket::new(db.clone(), &[prefix::HEADER_TIP], COLLECTION),
            db,
        }
    }

    /// Stage a header; a new tip also claims its height in the main chain
    pub fn stage_put(&self, header: &Header, new_tip: bool, batch: &mut WriteBatchWrapper) {
        self.headers
            .stage_put(batch, header.hash.as_bytes(), &encode_header(header));
        if new_tip {
            self.heights
                .stage_put(batch, &height_key(header.height), header.hash.as_bytes());
            self.tip.stage_put(batch, &[], header.hash.as_bytes());
        }
        tracing::debug!(hash = %header.hash, height = header.height, new_tip, "header staged");
    }

    /// Stage removal of the best header at `height`, moving the tip to its
    /// parent. Returns the header that becomes best, if any.
    pub fn stage_rollback(
        &self,
        height: Height,
        batch: &mut WriteBatchWrapper,
    ) -> StorageResult<Option<Header>> {
        let best = self.get_best()?;
        if best.height != height {
            return Err(StorageError::InvalidArgument(format!(
                "rollback of height {} but best header is at {}",
                height, best.height
            )));
        }

        self.headers.stage_delete(batch, best.hash.as_bytes());
        self.heights.stage_delete(batch, &height_key(height));

        let parent = match self.get(&best.previous) {
            Ok(parent) => Some(parent),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        match &parent {
            Some(parent) => self.tip.stage_put(batch, &[], parent.hash.as_bytes()),
            None => self.tip.stage_delete(batch, &[]),
        }
        tracing::info!(height, hash = %best.hash, "header rollback staged");
        Ok(parent)
    }

    fn hash_at(&self, bucket: &Bucket, key: &[u8], what: &str) -> StorageResult<Uint256> {
        let bytes = bucket
            .get(key)?
            .ok_or_else(|| StorageError::NotFound(what.to_string()))?;
        Uint256::from_slice(&bytes)
            .map_err(|e| StorageError::Deserialization(format!("{}: {}", what, e)))
    }
}

impl Headers for HeaderDb {
    fn put(&self, header: &Header, new_tip: bool) -> StorageResult<()> {
        let mut batch = self.db.batch();
        self.stage_put(header, new_tip, &mut batch);
        self.db.write_batch(batch).in_collection(COLLECTION)
    }

    fn get(&self, hash: &Uint256) -> StorageResult<Header> {
        let bytes = self
            .headers
            .get(hash.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("header {}", hash)))?;
        decode_header(&bytes).ok_or_else(|| StorageError::Deserialization(format!("header {}", hash)))
    }

    fn get_best(&self) -> StorageResult<Header> {
        let hash = self.hash_at(&self.tip, &[], "best header")?;
        self.get(&hash)
    }

    fn clear(&self) -> StorageResult<()> {
        let mut batch = self.db.batch();
        self.headers.stage_clear(&mut batch)?;
        self.heights.stage_clear(&mut batch)?;
        self.tip.stage_clear(&mut batch)?;
        self.db.write_batch(batch).in_collection(COLLECTION)
    }
}

impl HeaderStore for HeaderDb {
    fn get_by_height(&self, height: Height) -> StorageResult<Header> {
        let hash = self.hash_at(
            &self.heights,
            &height_key(height),
            &format!("header at height {}", height),
        )?;
        self.get(&hash)
    }
}
