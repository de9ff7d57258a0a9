//! # spv-storage
//!
//! Persistent wallet state for SPV clients on RocksDB.
//!
//! - Watched addresses with a membership filter for peers
//! - Transactions indexed by height and hash, plus fork archives
//! - Outpoint ownership, notify queue, arbiter history, custom IDs
//! - Header chain
//!
//! Every collection shares one database. [`DataStore::batch`] stages writes
//! across collections and commits them in a single engine write, which is
//! how a chain reorganisation removes everything recorded at a height.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod addrs;
mod arbiters;
mod batch;
mod config;
mod custom_id;
mod db;
mod error;
mod headers;
pub mod keys;
mod metrics;
mod ops;
mod que;
mod store;
mod traits;
mod txs;

pub use addrs::Addrs;
pub use arbiters::{ArbiterSnapshot, Arbiters};
pub use batch::DataBatch;
pub use config::StoreConfig;
pub use custom_id::{CustomId, CustomIdRecord};
pub use db::{BatchOp, Database, WriteBatchWrapper};
pub use error::{StorageError, StorageResult};
pub use headers::HeaderDb;
pub use metrics::{Histogram, HistogramSummary, MetricsSnapshot, StoreMetrics};
pub use ops::{Ops, OpsBatch};
pub use que::{Que, QueBatch};
pub use store::DataStore;
pub use traits::{BatchedCollection, HeaderStore, Headers, StageableWrite};
pub use txs::{Txs, TxsBatch};
