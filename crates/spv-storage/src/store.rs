//! The data store: every collection over one database

use crate::addrs::Addrs;
use crate::arbiters::Arbiters;
use crate::batch::DataBatch;
use crate::config::StoreConfig;
use crate::custom_id::CustomId;
use crate::db::Database;
use crate::error::StorageResult;
use crate::headers::HeaderDb;
use crate::keys::{prefix, Bucket};
use crate::metrics::StoreMetrics;
use crate::ops::Ops;
use crate::que::Que;
use crate::txs::Txs;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Wallet state store
///
/// Reads and direct writes may come from any thread. Writes that must land
/// together go through [`DataStore::batch`]; only one batch is open at a
/// time and a second caller blocks until the first commits, rolls back or
/// is dropped.
pub struct DataStore {
    db: Database,
    addrs: Addrs,
    txs: Txs,
    ops: Ops,
    que: Que,
    arbiters: Arbiters,
    cid: CustomId,
    headers: HeaderDb,
    writer: Mutex<()>,
    metrics: Arc<StoreMetrics>,
    config: StoreConfig,
}

impl DataStore {
    /// Open (creating if needed) a store with default settings
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open a store with custom settings
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> StorageResult<Self> {
        config.validate()?;
        let db = Database::new(path);
        db.open_with_config(&config)?;

        Ok(Self {
            addrs: Addrs::new(db.clone(), config.filter_bits_per_addr),
            txs: Txs::new(db.clone()),
            ops: Ops::new(db.clone()),
            que: Que::new(db.clone()),
            arbiters: Arbiters::new(db.clone()),
            cid: CustomId::new(db.clone()),
            headers: HeaderDb::new(db.clone()),
            db,
            writer: Mutex::new(()),
            metrics: Arc::new(StoreMetrics::new()),
            config,
        })
    }

    /// Watched addresses
    pub fn addrs(&self) -> &Addrs {
        &self.addrs
    }

    /// Transactions
    pub fn txs(&self) -> &Txs {
        &self.txs
    }

    /// Outpoints
    pub fn ops(&self) -> &Ops {
        &self.ops
    }

    /// Notify queue
    pub fn que(&self) -> &Que {
        &self.que
    }

    /// Arbiter snapshots
    pub fn arbiters(&self) -> &Arbiters {
        &self.arbiters
    }

    /// Custom ID records
    pub fn cid(&self) -> &CustomId {
        &self.cid
    }

    /// Header chain
    pub fn headers(&self) -> &HeaderDb {
        &self.headers
    }

    /// Start an atomic batch, waiting for any open one to finish
    pub fn batch(&self) -> DataBatch<'_> {
        let writer = self.writer.lock();
        tracing::debug!("batch opened");
        DataBatch::new(self, writer)
    }

    /// Remove every record of every data collection in one write.
    /// Headers are kept; use [`crate::Headers::clear`] for those.
    pub fn clear(&self) -> StorageResult<()> {
        let mut batch = self.db.batch();
        let mut removed = 0;
        for p in prefix::DATA {
            removed += Bucket::new(self.db.clone(), &[p], "store").stage_clear(&mut batch)?;
        }
        self.db.write_batch(batch)?;
        self.addrs.invalidate();
        tracing::info!(removed, "store cleared");
        Ok(())
    }

    /// Close the underlying database; later calls fail with `NotOpen`
    pub fn close(&self) {
        self.db.close();
    }

    /// Underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Batch statistics
    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    /// Settings the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
