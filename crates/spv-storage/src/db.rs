//! RocksDB wrapper
//!
//! One keyspace, partitioned by single-byte collection prefixes (see
//! [`crate::keys::prefix`]). Writes that must land together go through a
//! [`WriteBatchWrapper`] applied with [`Database::write_batch`].

use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use rocksdb::{
    DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch, WriteOptions,
};
use std::path::Path;
use std::sync::Arc;

type RocksDB = DBWithThreadMode<MultiThreaded>;

struct Engine {
    db: RocksDB,
    sync_writes: bool,
}

impl Engine {
    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }
}

/// RocksDB handle shared by every collection of a store
pub struct Database {
    engine: Arc<RwLock<Option<Engine>>>,
    path: String,
}

impl Database {
    /// Create a new database instance (not yet opened)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            engine: Arc::new(RwLock::new(None)),
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Open the database with default config
    pub fn open(&self) -> StorageResult<()> {
        self.open_with_config(&StoreConfig::default())
    }

    /// Open the database with custom config
    pub fn open_with_config(&self, config: &StoreConfig) -> StorageResult<()> {
        let mut guard = self.engine.write();
        if guard.is_some() {
            return Err(StorageError::AlreadyOpen);
        }

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        let db = RocksDB::open(&opts, &self.path)?;
        *guard = Some(Engine {
            db,
            sync_writes: config.sync_writes,
        });
        tracing::info!(path = %self.path, "database opened");
        Ok(())
    }

    /// Close the database
    pub fn close(&self) {
        let mut guard = self.engine.write();
        if guard.take().is_some() {
            tracing::info!(path = %self.path, "database closed");
        }
    }

    /// Check if database is open
    pub fn is_open(&self) -> bool {
        self.engine.read().is_some()
    }

    /// Get a value
    pub fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(StorageError::NotOpen)?;
        Ok(engine.db.get(key)?)
    }

    /// Put a value
    pub fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(StorageError::NotOpen)?;
        engine.db.put_opt(key, value, &engine.write_opts())?;
        Ok(())
    }

    /// Delete a value
    pub fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(StorageError::NotOpen)?;
        engine.db.delete_opt(key, &engine.write_opts())?;
        Ok(())
    }

    /// All entries whose key starts with `prefix`, in key order
    pub fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(StorageError::NotOpen)?;

        let mut out = Vec::new();
        for item in engine
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.into_vec(), value.into_vec()));
        }
        Ok(out)
    }

    /// Entry with the greatest key `<= upper` that still starts with `prefix`
    pub fn seek_last(
        &self,
        prefix: &[u8],
        upper: &[u8],
    ) -> StorageResult<Option<(Vec<u8>, Vec<u8>)>> {
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(StorageError::NotOpen)?;

        let mut iter = engine
            .db
            .iterator(IteratorMode::From(upper, Direction::Reverse));
        match iter.next() {
            Some(item) => {
                let (key, value) = item?;
                if key.starts_with(prefix) {
                    Ok(Some((key.into_vec(), value.into_vec())))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Create a write batch
    pub fn batch(&self) -> WriteBatchWrapper {
        WriteBatchWrapper::new()
    }

    /// Apply a write batch as one atomic, durable unit
    pub fn write_batch(&self, batch: WriteBatchWrapper) -> StorageResult<()> {
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(StorageError::NotOpen)?;

        let mut rocks_batch = WriteBatch::default();
        for op in batch.operations {
            match op {
                BatchOp::Put { key, value } => rocks_batch.put(&key, &value),
                BatchOp::Delete { key } => rocks_batch.delete(&key),
            }
        }

        engine.db.write_opt(rocks_batch, &engine.write_opts())?;
        Ok(())
    }

    /// Get database path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            path: self.path.clone(),
        }
    }
}

/// Batch operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    /// Stage a put
    Put {
        /// Full key, collection prefix included
        key: Vec<u8>,
        /// Value bytes
        value: Vec<u8>,
    },
    /// Stage a delete
    Delete {
        /// Full key, collection prefix included
        key: Vec<u8>,
    },
}

/// Staged put/delete operations, applied by [`Database::write_batch`]
#[derive(Clone, Debug, Default)]
pub struct WriteBatchWrapper {
    operations: Vec<BatchOp>,
}

impl WriteBatchWrapper {
    /// Create a new write batch
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Add a put operation
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.operations.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Add a delete operation
    pub fn delete(&mut self, key: &[u8]) {
        self.operations.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Drop every staged operation
    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Latest staged state of `key`
    ///
    /// `None` when nothing touched the key, `Some(None)` when its last staged
    /// operation is a delete, `Some(Some(value))` when it is a put.
    pub fn staged(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.operations.iter().rev().find_map(|op| match op {
            BatchOp::Put { key: k, value } if k.as_slice() == key => Some(Some(value.as_slice())),
            BatchOp::Delete { key: k } if k.as_slice() == key => Some(None),
            _ => None,
        })
    }

    /// Staged operations, in order
    pub fn operations(&self) -> &[BatchOp] {
        &self.operations
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
