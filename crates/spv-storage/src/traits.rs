//! Capability traits shared by the collections

use crate::db::WriteBatchWrapper;
use crate::error::StorageResult;
use spv_primitives::{Height, Uint256};
use spv_types::Header;

/// A batch adapter that can drop everything recorded at one height
pub trait BatchedCollection {
    /// Stage deletion of every committed record at `height`; returns how
    /// many records were staged for removal
    fn del_all(&mut self, height: Height) -> StorageResult<usize>;
}

/// A collection whose writes can be staged into a shared batch
pub trait StageableWrite {
    /// Record type accepted by the collection
    type Record;

    /// Validate `record` against committed state and stage it
    fn batch_put(&self, record: Self::Record, batch: &mut WriteBatchWrapper) -> StorageResult<()>;
}

/// Header chain storage
pub trait Headers {
    /// Store a header, optionally making it the best header
    fn put(&self, header: &Header, new_tip: bool) -> StorageResult<()>;

    /// Header by hash
    fn get(&self, hash: &Uint256) -> StorageResult<Header>;

    /// Parent of `header`
    fn get_previous(&self, header: &Header) -> StorageResult<Header> {
        self.get(&header.previous)
    }

    /// Current best header
    fn get_best(&self) -> StorageResult<Header>;

    /// Remove every header
    fn clear(&self) -> StorageResult<()>;
}

/// Header storage with a height index
pub trait HeaderStore: Headers {
    /// Main-chain header at `height`
    fn get_by_height(&self, height: Height) -> StorageResult<Header>;
}
