//! Storage error types

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB error surfaced as-is (batch commits)
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// RocksDB error raised while serving one collection
    #[error("{collection}: rocksdb error: {source}")]
    Engine {
        /// Collection being accessed
        collection: &'static str,
        /// Underlying engine error
        source: rocksdb::Error,
    },

    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Write would replace a record that must stay unique
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed record or key material
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored bytes could not be decoded
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Database not open
    #[error("database not open")]
    NotOpen,

    /// Database already open
    #[error("database already open")]
    AlreadyOpen,

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this is a read miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Attach collection context to raw engine errors
pub(crate) trait ResultExt<T> {
    fn in_collection(self, collection: &'static str) -> StorageResult<T>;
}

impl<T> ResultExt<T> for StorageResult<T> {
    fn in_collection(self, collection: &'static str) -> StorageResult<T> {
        self.map_err(|e| match e {
            StorageError::RocksDb(source) => StorageError::Engine { collection, source },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_collection_keeps_logical_errors() {
        let res: StorageResult<()> = Err(StorageError::NotFound("tx".into()));
        match res.in_collection("txs") {
            Err(StorageError::NotFound(what)) => assert_eq!(what, "tx"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_is_not_found() {
        assert!(StorageError::NotFound("x".into()).is_not_found());
        assert!(!StorageError::NotOpen.is_not_found());
        assert!(!StorageError::Conflict("x".into()).is_not_found());
    }
}
