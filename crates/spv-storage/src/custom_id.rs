//! Controversial custom ID records and the change fee rate
//!
//! Sub-keys under the collection prefix:
//! `0x01` reserved ids, `0x02 ++ did` ids received by one DID, `0x03` fee.

use crate::db::{Database, WriteBatchWrapper};
use crate::error::{ResultExt, StorageError, StorageResult};
use crate::keys::{prefix, Bucket};
use crate::traits::StageableWrite;
use spv_primitives::{Fixed64, Uint168};
use spv_types::codec::{decode_strings, encode_strings};
use std::collections::{HashMap, HashSet};

const COLLECTION: &str = "custom_id";

const RESERVED: u8 = 0x01;
const RECEIVED: u8 = 0x02;
const FEE: u8 = 0x03;

/// A custom ID write
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomIdRecord {
    /// Replace the reserved set
    Reserved(Vec<String>),
    /// Replace the set received by `did`
    Received {
        /// Custom ids
        ids: Vec<String>,
        /// Owning DID
        did: Uint168,
    },
    /// Change the custom ID fee rate
    ChangeFee(Fixed64),
}

/// Custom ID store
pub struct CustomId {
    db: Database,
    bucket: Bucket,
}

impl CustomId {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            bucket: Bucket::new(db.clone(), &[prefix::CUSTOM_ID], COLLECTION),
            db,
        }
    }

    /// Replace the reserved custom ID set
    pub fn put_controversial_reserved_custom_ids(&self, ids: &[String]) -> StorageResult<()> {
        self.write(CustomIdRecord::Reserved(ids.to_vec()))
    }

    /// Stage replacement of the reserved custom ID set
    pub fn batch_put_controversial_reserved_custom_ids(
        &self,
        ids: &[String],
        batch: &mut WriteBatchWrapper,
    ) -> StorageResult<()> {
        self.bucket.stage_put(batch, &[RESERVED], &encode_strings(ids));
        Ok(())
    }

    /// Replace the custom IDs received by `did`
    pub fn put_controversial_received_custom_ids(
        &self,
        ids: &[String],
        did: &Uint168,
    ) -> StorageResult<()> {
        self.write(CustomIdRecord::Received {
            ids: ids.to_vec(),
            did: *did,
        })
    }

    /// Stage replacement of the custom IDs received by `did`
    pub fn batch_put_controversial_received_custom_ids(
        &self,
        ids: &[String],
        did: &Uint168,
        batch: &mut WriteBatchWrapper,
    ) -> StorageResult<()> {
        self.bucket
            .stage_put(batch, &received_key(did), &encode_strings(ids));
        Ok(())
    }

    /// Set the custom ID fee rate
    pub fn put_change_custom_id_fee(&self, rate: Fixed64) -> StorageResult<()> {
        self.write(CustomIdRecord::ChangeFee(rate))
    }

    /// Stage a fee rate change
    pub fn batch_put_change_custom_id_fee(
        &self,
        rate: Fixed64,
        batch: &mut WriteBatchWrapper,
    ) -> StorageResult<()> {
        self.bucket.stage_put(batch, &[FEE], &rate.to_be_bytes());
        Ok(())
    }

    /// Reserved custom IDs
    pub fn get_controversial_reserved_custom_ids(&self) -> StorageResult<HashSet<String>> {
        let bytes = self
            .bucket
            .get(&[RESERVED])?
            .ok_or_else(|| StorageError::NotFound("reserved custom ids".into()))?;
        Ok(decode_ids(&bytes)?.into_iter().collect())
    }

    /// Every received custom ID mapped to the DID that received it
    pub fn get_controversial_received_custom_ids(&self) -> StorageResult<HashMap<String, Uint168>> {
        let entries = self.bucket.scan(&[RECEIVED])?;
        if entries.is_empty() {
            return Err(StorageError::NotFound("received custom ids".into()));
        }

        let mut out = HashMap::new();
        for (key, bytes) in entries {
            let did = Uint168::from_slice(&key[1..])
                .map_err(|e| StorageError::Deserialization(format!("{} did: {}", COLLECTION, e)))?;
            for id in decode_ids(&bytes)? {
                out.insert(id, did);
            }
        }
        Ok(out)
    }

    /// Custom IDs received by one DID
    pub fn get_received_custom_ids(&self, did: &Uint168) -> StorageResult<HashSet<String>> {
        let bytes = self
            .bucket
            .get(&received_key(did))?
            .ok_or_else(|| StorageError::NotFound(format!("custom ids received by {}", did)))?;
        Ok(decode_ids(&bytes)?.into_iter().collect())
    }

    /// Current custom ID fee rate
    pub fn get_custom_id_fee_rate(&self) -> StorageResult<Fixed64> {
        let bytes = self
            .bucket
            .get(&[FEE])?
            .ok_or_else(|| StorageError::NotFound("custom id fee rate".into()))?;
        let raw: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| StorageError::Deserialization("custom id fee rate".into()))?;
        Ok(Fixed64::from_be_bytes(raw))
    }

    /// Remove every record
    pub fn clear(&self) -> StorageResult<()> {
        self.bucket.clear()
    }

    fn write(&self, record: CustomIdRecord) -> StorageResult<()> {
        let mut batch = self.db.batch();
        StageableWrite::batch_put(self, record, &mut batch)?;
        self.db.write_batch(batch).in_collection(COLLECTION)
    }
}

impl StageableWrite for CustomId {
    type Record = CustomIdRecord;

    fn batch_put(&self, record: CustomIdRecord, batch: &mut WriteBatchWrapper) -> StorageResult<()> {
        match record {
            CustomIdRecord::Reserved(ids) => {
                self.batch_put_controversial_reserved_custom_ids(&ids, batch)
            }
            CustomIdRecord::Received { ids, did } => {
                self.batch_put_controversial_received_custom_ids(&ids, &did, batch)
            }
            CustomIdRecord::ChangeFee(rate) => self.batch_put_change_custom_id_fee(rate, batch),
        }
    }
}

fn received_key(did: &Uint168) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + Uint168::LEN);
    key.push(RECEIVED);
    key.extend_from_slice(did.as_bytes());
    key
}

fn decode_ids(bytes: &[u8]) -> StorageResult<Vec<String>> {
    decode_strings(bytes).ok_or_else(|| StorageError::Deserialization(format!("{} list", COLLECTION)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use tempfile::TempDir;

    fn open_temp() -> (Database, CustomId, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.open_with_config(&StoreConfig::for_testing()).unwrap();
        let cid = CustomId::new(db.clone());
        (db, cid, dir)
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_never_written_is_not_found() {
        let (_db, cid, _dir) = open_temp();
        assert!(cid.get_controversial_reserved_custom_ids().unwrap_err().is_not_found());
        assert!(cid.get_controversial_received_custom_ids().unwrap_err().is_not_found());
        assert!(cid
            .get_received_custom_ids(&Uint168::ZERO)
            .unwrap_err()
            .is_not_found());
        assert!(cid.get_custom_id_fee_rate().unwrap_err().is_not_found());
    }

    #[test]
    fn test_reserved_replaces_set() {
        let (_db, cid, _dir) = open_temp();
        cid.put_controversial_reserved_custom_ids(&ids(&["a", "b"])).unwrap();
        cid.put_controversial_reserved_custom_ids(&ids(&["c"])).unwrap();

        let reserved = cid.get_controversial_reserved_custom_ids().unwrap();
        let expected: HashSet<String> = ["c".to_string()].into_iter().collect();
        assert_eq!(reserved, expected);
    }

    #[test]
    fn test_received_per_did() {
        let (_db, cid, _dir) = open_temp();
        let alice = Uint168::from_bytes([0x67; 21]);
        let bob = Uint168::from_bytes([0x68; 21]);
        cid.put_controversial_received_custom_ids(&ids(&["x", "y"]), &alice)
            .unwrap();
        cid.put_controversial_received_custom_ids(&ids(&["z"]), &bob)
            .unwrap();

        let all = cid.get_controversial_received_custom_ids().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all["x"], alice);
        assert_eq!(all["z"], bob);

        let for_alice = cid.get_received_custom_ids(&alice).unwrap();
        assert!(for_alice.contains("x") && for_alice.contains("y"));
    }

    #[test]
    fn test_fee_rate() {
        let (_db, cid, _dir) = open_temp();
        let rate: Fixed64 = "0.5".parse().unwrap();
        cid.put_change_custom_id_fee(rate).unwrap();
        assert_eq!(cid.get_custom_id_fee_rate().unwrap(), rate);
    }

    #[test]
    fn test_batch_variants() {
        let (db, cid, _dir) = open_temp();
        let mut batch = db.batch();
        cid.batch_put_controversial_reserved_custom_ids(&ids(&["r"]), &mut batch)
            .unwrap();
        StageableWrite::batch_put(&cid, CustomIdRecord::ChangeFee(Fixed64::from_raw(10)), &mut batch)
            .unwrap();
        assert!(cid.get_custom_id_fee_rate().unwrap_err().is_not_found());

        db.write_batch(batch).unwrap();
        assert!(cid.get_controversial_reserved_custom_ids().unwrap().contains("r"));
        assert_eq!(cid.get_custom_id_fee_rate().unwrap(), Fixed64::from_raw(10));
    }

    #[test]
    fn test_clear() {
        let (_db, cid, _dir) = open_temp();
        cid.put_change_custom_id_fee(Fixed64::from_raw(1)).unwrap();
        cid.clear().unwrap();
        assert!(cid.get_custom_id_fee_rate().unwrap_err().is_not_found());
    }
}
