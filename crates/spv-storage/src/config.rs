//! Store configuration

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine and store configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Create database if missing
    pub create_if_missing: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size
    pub write_buffer_size: usize,
    /// Maximum write buffers
    pub max_write_buffer_number: i32,
    /// fsync the WAL on every write
    pub sync_writes: bool,
    /// Bloom filter bits per watched address
    pub filter_bits_per_addr: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
            sync_writes: true,
            filter_bits_per_addr: 16,
        }
    }
}

impl StoreConfig {
    /// Small buffers, no fsync
    pub fn for_testing() -> Self {
        Self {
            max_open_files: 64,
            write_buffer_size: 4 * 1024 * 1024, // 4MB
            max_write_buffer_number: 2,
            sync_writes: false,
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: StoreConfig =
            serde_json::from_str(&content).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values RocksDB or the address filter cannot work with
    pub fn validate(&self) -> StorageResult<()> {
        if self.max_write_buffer_number < 1 {
            return Err(StorageError::Config(
                "max_write_buffer_number must be at least 1".into(),
            ));
        }
        if self.write_buffer_size == 0 {
            return Err(StorageError::Config("write_buffer_size must be non-zero".into()));
        }
        if self.filter_bits_per_addr == 0 {
            return Err(StorageError::Config(
                "filter_bits_per_addr must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
