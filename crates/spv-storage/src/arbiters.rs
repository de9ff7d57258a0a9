//! Arbiter set history

use crate::db::{Database, WriteBatchWrapper};
use crate::error::{StorageError, StorageResult};
use crate::keys::{height_key, prefix, read_height, Bucket};
use crate::traits::StageableWrite;
use spv_primitives::Height;
use spv_types::codec::{decode_arbiters, encode_arbiters};

const COLLECTION: &str = "arbiters";

/// Arbiter public keys effective from `height`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArbiterSnapshot {
    /// First height the snapshot applies to
    pub height: Height,
    /// CRC arbiters
    pub crc: Vec<Vec<u8>>,
    /// Elected arbiters
    pub normal: Vec<Vec<u8>>,
}

/// Append-only, height-keyed arbiter snapshots
pub struct Arbiters {
    bucket: Bucket,
}

impl Arbiters {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            bucket: Bucket::new(db, &[prefix::ARBITERS], COLLECTION),
        }
    }

    /// Store the snapshot for `height`; a height can only be written once
    pub fn put(&self, height: Height, crc: &[Vec<u8>], normal: &[Vec<u8>]) -> StorageResult<()> {
        self.ensure_free(height)?;
        self.bucket
            .put(&height_key(height), &encode_arbiters(crc, normal))?;
        tracing::debug!(height, crc = crc.len(), normal = normal.len(), "arbiters stored");
        Ok(())
    }

    /// Stage the snapshot for `height` into `batch`
    ///
    /// Only committed heights are checked, so staging the same height twice
    /// in one batch is not detected.
    pub fn batch_put(
        &self,
        height: Height,
        crc: &[Vec<u8>],
        normal: &[Vec<u8>],
        batch: &mut WriteBatchWrapper,
    ) -> StorageResult<()> {
        self.ensure_free(height)?;
        self.bucket
            .stage_put(batch, &height_key(height), &encode_arbiters(crc, normal));
        Ok(())
    }

    /// Latest snapshot as `(crc, normal)`
    pub fn get(&self) -> StorageResult<(Vec<Vec<u8>>, Vec<Vec<u8>>)> {
        let snapshot = self.latest_at(Height::MAX)?;
        Ok((snapshot.crc, snapshot.normal))
    }

    /// Snapshot in force at `height`: the one with the greatest height
    /// not above it
    pub fn get_by_height(&self, height: Height) -> StorageResult<(Vec<Vec<u8>>, Vec<Vec<u8>>)> {
        let snapshot = self.latest_at(height)?;
        Ok((snapshot.crc, snapshot.normal))
    }

    /// Full snapshot in force at `height`
    pub fn snapshot_at(&self, height: Height) -> StorageResult<ArbiterSnapshot> {
        self.latest_at(height)
    }

    /// Remove every snapshot
    pub fn clear(&self) -> StorageResult<()> {
        self.bucket.clear()
    }

    fn ensure_free(&self, height: Height) -> StorageResult<()> {
        if self.bucket.get(&height_key(height))?.is_some() {
            tracing::warn!(height, "arbiters already stored at height");
            return Err(StorageError::Conflict(format!(
                "arbiters at height {} already stored",
                height
            )));
        }
        Ok(())
    }

    fn latest_at(&self, height: Height) -> StorageResult<ArbiterSnapshot> {
        let (key, bytes) = self
            .bucket
            .seek_last(&height_key(height))?
            .ok_or_else(|| StorageError::NotFound(format!("arbiters at or below {}", height)))?;
        let found = read_height(&key)
            .ok_or_else(|| StorageError::Deserialization(format!("{} key", COLLECTION)))?;
        let (crc, normal) = decode_arbiters(&bytes)
            .ok_or_else(|| StorageError::Deserialization(format!("arbiters at {}", found)))?;
        Ok(ArbiterSnapshot {
            height: found,
            crc,
            normal,
        })
    }
}

impl StageableWrite for Arbiters {
    type Record = ArbiterSnapshot;

    fn batch_put(&self, record: ArbiterSnapshot, batch: &mut WriteBatchWrapper) -> StorageResult<()> {
        Arbiters::batch_put(self, record.height, &record.crc, &record.normal, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use tempfile::TempDir;

    fn open_temp() -> (Database, Arbiters, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.open_with_config(&StoreConfig::for_testing()).unwrap();
        let arbiters = Arbiters::new(db.clone());
        (db, arbiters, dir)
    }

    fn keys(n: u8) -> Vec<Vec<u8>> {
        vec![vec![n; 33]]
    }

    #[test]
    fn test_empty_is_not_found() {
        let (_db, arbiters, _dir) = open_temp();
        assert!(arbiters.get().unwrap_err().is_not_found());
        assert!(arbiters.get_by_height(100).unwrap_err().is_not_found());
    }

    #[test]
    fn test_monotonic_lookup() {
        let (_db, arbiters, _dir) = open_temp();
        arbiters.put(100, &keys(1), &keys(2)).unwrap();
        arbiters.put(200, &keys(3), &keys(4)).unwrap();

        assert_eq!(arbiters.get_by_height(150).unwrap(), (keys(1), keys(2)));
        assert_eq!(arbiters.get_by_height(200).unwrap(), (keys(3), keys(4)));
        assert_eq!(arbiters.get_by_height(u32::MAX).unwrap(), (keys(3), keys(4)));
        assert!(arbiters.get_by_height(99).unwrap_err().is_not_found());
        assert_eq!(arbiters.get().unwrap(), (keys(3), keys(4)));
        assert_eq!(arbiters.snapshot_at(150).unwrap().height, 100);
    }

    #[test]
    fn test_duplicate_height_conflicts() {
        let (db, arbiters, _dir) = open_temp();
        arbiters.put(100, &keys(1), &keys(2)).unwrap();
        assert!(matches!(
            arbiters.put(100, &keys(5), &keys(6)),
            Err(StorageError::Conflict(_))
        ));

        let mut batch = db.batch();
        assert!(matches!(
            arbiters.batch_put(100, &keys(5), &keys(6), &mut batch),
            Err(StorageError::Conflict(_))
        ));
        assert!(batch.is_empty());
        assert_eq!(arbiters.get().unwrap(), (keys(1), keys(2)));
    }

    #[test]
    fn test_stageable_write() {
        let (db, arbiters, _dir) = open_temp();
        let mut batch = db.batch();
        let snapshot = ArbiterSnapshot {
            height: 7,
            crc: keys(1),
            normal: vec![],
        };
        StageableWrite::batch_put(&arbiters, snapshot.clone(), &mut batch).unwrap();
        assert!(arbiters.get().unwrap_err().is_not_found());

        db.write_batch(batch).unwrap();
        assert_eq!(arbiters.snapshot_at(7).unwrap(), snapshot);
    }

    #[test]
    fn test_clear() {
        let (_db, arbiters, _dir) = open_temp();
        arbiters.put(1, &keys(1), &keys(1)).unwrap();
        arbiters.clear().unwrap();
        assert!(arbiters.get().unwrap_err().is_not_found());
    }
}
