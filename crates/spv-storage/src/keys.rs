//! Key layout
//!
//! Every collection lives under its own single-byte prefix. Heights inside
//! keys are big-endian so byte order matches numeric order and a prefix scan
//! over `(prefix, height)` yields exactly the records at that height.

use crate::db::{Database, WriteBatchWrapper};
use crate::error::{ResultExt, StorageResult};
use spv_primitives::Height;

/// Collection prefixes
pub mod prefix {
    /// Watched addresses
    pub const ADDRS: u8 = 0x01;
    /// Tx hash -> height
    pub const TX_HASH: u8 = 0x02;
    /// (height, hash) -> encoded tx
    pub const TX_HEIGHT: u8 = 0x03;
    /// Fork block hash -> encoded tx list
    pub const FORK_TXS: u8 = 0x04;
    /// Outpoint -> owner
    pub const OPS: u8 = 0x05;
    /// (notify id, tx id) -> encoded queue item
    pub const QUE: u8 = 0x06;
    /// (height, notify id, tx id) -> empty
    pub const QUE_HEIGHT: u8 = 0x07;
    /// Height -> encoded arbiter snapshot
    pub const ARBITERS: u8 = 0x08;
    /// Custom id records
    pub const CUSTOM_ID: u8 = 0x09;
    /// Header hash -> encoded header
    pub const HEADERS: u8 = 0x0a;
    /// Height -> header hash
    pub const HEADER_HEIGHT: u8 = 0x0b;
    /// Best header hash
    pub const HEADER_TIP: u8 = 0x0c;

    /// Every data collection cleared by `DataStore::clear`
    pub const DATA: [u8; 9] = [
        ADDRS, TX_HASH, TX_HEIGHT, FORK_TXS, OPS, QUE, QUE_HEIGHT, ARBITERS, CUSTOM_ID,
    ];
}

/// Height as key bytes
pub fn height_key(height: Height) -> [u8; 4] {
    height.to_be_bytes()
}

/// Height from the first four bytes of a key suffix
pub fn read_height(suffix: &[u8]) -> Option<Height> {
    let bytes: [u8; 4] = suffix.get(..4)?.try_into().ok()?;
    Some(Height::from_be_bytes(bytes))
}

/// Prefixed view over the shared database
#[derive(Clone)]
pub struct Bucket {
    db: Database,
    prefix: Vec<u8>,
    name: &'static str,
}

impl Bucket {
    /// Create a bucket under `prefix`
    pub fn new(db: Database, prefix: &[u8], name: &'static str) -> Self {
        Self {
            db,
            prefix: prefix.to_vec(),
            name,
        }
    }

    /// Collection name used in errors and logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Full key for `suffix`
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.prefix.len() + suffix.len());
        key.extend_from_slice(&self.prefix);
        key.extend_from_slice(suffix);
        key
    }

    /// Get a value
    pub fn get(&self, suffix: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.db.get(&self.key(suffix)).in_collection(self.name)
    }

    /// Get a value as `batch` would leave it once written
    pub fn get_staged(
        &self,
        batch: &WriteBatchWrapper,
        suffix: &[u8],
    ) -> StorageResult<Option<Vec<u8>>> {
        let key = self.key(suffix);
        match batch.staged(&key) {
            Some(value) => Ok(value.map(<[u8]>::to_vec)),
            None => self.db.get(&key).in_collection(self.name),
        }
    }

    /// Put a value
    pub fn put(&self, suffix: &[u8], value: &[u8]) -> StorageResult<()> {
        self.db.put(&self.key(suffix), value).in_collection(self.name)
    }

    /// Delete a value
    pub fn delete(&self, suffix: &[u8]) -> StorageResult<()> {
        self.db.delete(&self.key(suffix)).in_collection(self.name)
    }

    /// Entries under `sub`, keys returned without the bucket prefix
    pub fn scan(&self, sub: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let strip = self.prefix.len();
        let entries = self.db.scan_prefix(&self.key(sub)).in_collection(self.name)?;
        Ok(entries
            .into_iter()
            .map(|(mut k, v)| (k.split_off(strip), v))
            .collect())
    }

    /// Entry with the greatest suffix `<= upper`
    pub fn seek_last(&self, upper: &[u8]) -> StorageResult<Option<(Vec<u8>, Vec<u8>)>> {
        let strip = self.prefix.len();
        let hit = self
            .db
            .seek_last(&self.prefix, &self.key(upper))
            .in_collection(self.name)?;
        Ok(hit.map(|(mut k, v)| (k.split_off(strip), v)))
    }

    /// Stage a put
    pub fn stage_put(&self, batch: &mut WriteBatchWrapper, suffix: &[u8], value: &[u8]) {
        batch.put(&self.key(suffix), value);
    }

    /// Stage a delete
    pub fn stage_delete(&self, batch: &mut WriteBatchWrapper, suffix: &[u8]) {
        batch.delete(&self.key(suffix));
    }

    /// Stage deletion of every committed entry, returning how many
    pub fn stage_clear(&self, batch: &mut WriteBatchWrapper) -> StorageResult<usize> {
        let entries = self.db.scan_prefix(&self.prefix).in_collection(self.name)?;
        for (key, _) in &entries {
            batch.delete(key);
        }
        Ok(entries.len())
    }

    /// Delete every entry in one write
    pub fn clear(&self) -> StorageResult<()> {
        let mut batch = self.db.batch();
        let removed = self.stage_clear(&mut batch)?;
        self.db.write_batch(batch).in_collection(self.name)?;
        tracing::debug!(collection = self.name, removed, "collection cleared");
        Ok(())
    }
}

/// `(height, discriminator)` keyed index
#[derive(Clone)]
pub struct HeightIndex {
    bucket: Bucket,
}

impl HeightIndex {
    /// Index stored in `bucket`
    pub fn new(bucket: Bucket) -> Self {
        Self { bucket }
    }

    /// Underlying bucket
    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Key suffix for an entry
    pub fn suffix(height: Height, discriminator: &[u8]) -> Vec<u8> {
        let mut suffix = Vec::with_capacity(4 + discriminator.len());
        suffix.extend_from_slice(&height_key(height));
        suffix.extend_from_slice(discriminator);
        suffix
    }

    /// Get one entry
    pub fn get(&self, height: Height, discriminator: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.bucket.get(&Self::suffix(height, discriminator))
    }

    /// `(discriminator, value)` pairs at `height`, in discriminator order
    pub fn entries_at(&self, height: Height) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self.bucket.scan(&height_key(height))?;
        Ok(entries
            .into_iter()
            .map(|(mut suffix, value)| (suffix.split_off(4), value))
            .collect())
    }

    /// Every `(height, discriminator, value)`, ordered by height
    pub fn all(&self) -> StorageResult<Vec<(Height, Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        for (mut suffix, value) in self.bucket.scan(&[])? {
            match read_height(&suffix) {
                Some(height) => out.push((height, suffix.split_off(4), value)),
                None => tracing::warn!(
                    collection = self.bucket.name(),
                    "skipping index key without height"
                ),
            }
        }
        Ok(out)
    }

    /// Stage an entry
    pub fn stage_put(
        &self,
        batch: &mut WriteBatchWrapper,
        height: Height,
        discriminator: &[u8],
        value: &[u8],
    ) {
        self.bucket
            .stage_put(batch, &Self::suffix(height, discriminator), value);
    }

    /// Stage removal of one entry
    pub fn stage_delete(&self, batch: &mut WriteBatchWrapper, height: Height, discriminator: &[u8]) {
        self.bucket
            .stage_delete(batch, &Self::suffix(height, discriminator));
    }

    /// Stage removal of every committed entry at `height`; returns the
    /// removed discriminators
    pub fn stage_delete_height(
        &self,
        batch: &mut WriteBatchWrapper,
        height: Height,
    ) -> StorageResult<Vec<Vec<u8>>> {
        let entries = self.entries_at(height)?;
        let mut removed = Vec::with_capacity(entries.len());
        for (discriminator, _) in entries {
            self.stage_delete(batch, height, &discriminator);
            removed.push(discriminator);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn open_temp() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.open_with_config(&StoreConfig::for_testing()).unwrap();
        (db, dir)
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let mut all = prefix::DATA.to_vec();
        all.extend([prefix::HEADERS, prefix::HEADER_HEIGHT, prefix::HEADER_TIP]);
        let mut dedup = all.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(all.len(), dedup.len());
    }

    #[test]
    fn test_bucket_isolation() {
        let (db, _dir) = open_temp();
        let a = Bucket::new(db.clone(), &[0x01], "a");
        let b = Bucket::new(db, &[0x02], "b");

        a.put(b"k", b"1").unwrap();
        b.put(b"k", b"2").unwrap();
        assert_eq!(a.get(b"k").unwrap(), Some(b"1".to_vec()));
        assert_eq!(b.get(b"k").unwrap(), Some(b"2".to_vec()));

        a.clear().unwrap();
        assert!(a.get(b"k").unwrap().is_none());
        assert_eq!(b.get(b"k").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_bucket_get_staged_overlays_engine() {
        let (db, _dir) = open_temp();
        let bucket = Bucket::new(db.clone(), &[0x04], "overlay");
        bucket.put(b"a", b"committed").unwrap();
        bucket.put(b"b", b"committed").unwrap();

        let mut batch = db.batch();
        bucket.stage_put(&mut batch, b"a", b"staged");
        bucket.stage_delete(&mut batch, b"b");
        bucket.stage_put(&mut batch, b"c", b"new");

        assert_eq!(bucket.get_staged(&batch, b"a").unwrap(), Some(b"staged".to_vec()));
        assert_eq!(bucket.get_staged(&batch, b"b").unwrap(), None);
        assert_eq!(bucket.get_staged(&batch, b"c").unwrap(), Some(b"new".to_vec()));

        // untouched keys and plain reads still see the engine
        assert_eq!(bucket.get(b"a").unwrap(), Some(b"committed".to_vec()));
        assert!(bucket.get_staged(&batch, b"d").unwrap().is_none());
    }

    #[test]
    fn test_bucket_scan_strips_prefix() {
        let (db, _dir) = open_temp();
        let bucket = Bucket::new(db, &[0x09, 0x02], "nested");
        bucket.put(&[7, 1], b"x").unwrap();
        bucket.put(&[7, 2], b"y").unwrap();
        bucket.put(&[8], b"z").unwrap();

        let under_seven = bucket.scan(&[7]).unwrap();
        assert_eq!(
            under_seven,
            vec![(vec![7, 1], b"x".to_vec()), (vec![7, 2], b"y".to_vec())]
        );
        assert_eq!(bucket.scan(&[]).unwrap().len(), 3);
    }

    #[test]
    fn test_height_index_entries_at() {
        let (db, _dir) = open_temp();
        let index = HeightIndex::new(Bucket::new(db.clone(), &[0x03], "idx"));

        let mut batch = db.batch();
        index.stage_put(&mut batch, 99, b"a", b"");
        index.stage_put(&mut batch, 100, b"b", b"1");
        index.stage_put(&mut batch, 100, b"c", b"2");
        index.stage_put(&mut batch, 101, b"d", b"");
        db.write_batch(batch).unwrap();

        let at = index.entries_at(100).unwrap();
        assert_eq!(
            at,
            vec![(b"b".to_vec(), b"1".to_vec()), (b"c".to_vec(), b"2".to_vec())]
        );

        let mut batch = db.batch();
        let removed = index.stage_delete_height(&mut batch, 100).unwrap();
        assert_eq!(removed.len(), 2);
        db.write_batch(batch).unwrap();

        assert!(index.entries_at(100).unwrap().is_empty());
        let heights: Vec<Height> = index.all().unwrap().into_iter().map(|e| e.0).collect();
        assert_eq!(heights, vec![99, 101]);
    }

    #[test]
    fn test_read_height() {
        assert_eq!(read_height(&[0, 0, 1, 0, 9]), Some(256));
        assert_eq!(read_height(&[0, 1]), None);
    }

    proptest! {
        #[test]
        fn height_keys_sort_numerically(a in any::<u32>(), b in any::<u32>()) {
            prop_assert_eq!(a.cmp(&b), height_key(a).cmp(&height_key(b)));
        }
    }
}
