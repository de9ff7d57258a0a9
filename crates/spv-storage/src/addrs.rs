//! Watched addresses

use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::keys::{prefix, Bucket};
use parking_lot::RwLock;
use spv_primitives::Uint168;
use spv_types::AddrFilter;
use std::sync::Arc;

/// Address set plus a lazily rebuilt membership filter
pub struct Addrs {
    bucket: Bucket,
    filter: RwLock<Option<Arc<AddrFilter>>>,
    bits_per_addr: usize,
}

impl Addrs {
    pub(crate) fn new(db: Database, bits_per_addr: usize) -> Self {
        Self {
            bucket: Bucket::new(db, &[prefix::ADDRS], "addrs"),
            filter: RwLock::new(None),
            bits_per_addr,
        }
    }

    /// Add an address; adding one already present is a no-op
    pub fn put(&self, addr: &Uint168) -> StorageResult<()> {
        if self.bucket.get(addr.as_bytes())?.is_some() {
            return Ok(());
        }
        self.bucket.put(addr.as_bytes(), &[])?;
        *self.filter.write() = None;
        tracing::debug!(addr = %addr, "address added");
        Ok(())
    }

    /// Every watched address, ordered by address bytes
    pub fn get_all(&self) -> StorageResult<Vec<Uint168>> {
        self.bucket
            .scan(&[])?
            .into_iter()
            .map(|(key, _)| {
                Uint168::from_slice(&key)
                    .map_err(|e| StorageError::Deserialization(format!("addrs: {}", e)))
            })
            .collect()
    }

    /// Filter over the current address set
    pub fn get_filter(&self) -> StorageResult<Arc<AddrFilter>> {
        if let Some(filter) = self.filter.read().as_ref() {
            return Ok(Arc::clone(filter));
        }

        let mut slot = self.filter.write();
        // another reader may have rebuilt it while we waited
        if let Some(filter) = slot.as_ref() {
            return Ok(Arc::clone(filter));
        }
        let filter = Arc::new(AddrFilter::new(self.get_all()?, self.bits_per_addr));
        tracing::debug!(addrs = filter.len(), "address filter rebuilt");
        *slot = Some(Arc::clone(&filter));
        Ok(filter)
    }

    /// Remove every address
    pub fn clear(&self) -> StorageResult<()> {
        self.bucket.clear()?;
        self.invalidate();
        Ok(())
    }

    pub(crate) fn invalidate(&self) {
        *self.filter.write() = None;
    }
}
