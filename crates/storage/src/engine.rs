//! Storage engine abstraction
//!
//! One engine instance owns one database directory. The registry never
//! looks inside the directory; it only asks the engine to open it.
//!
//! Closing is `Drop`: an engine is closed exactly once, when the value that
//! owns it goes away.

use crate::batch::WriteBatch;
use kvdb_core::StorageResult;
use std::path::Path;

/// Persistent ordered key-value store rooted at a directory
///
/// Implementations must be safe to call from many threads at once through
/// a shared reference.
pub trait StorageEngine: Send + Sync + Sized + 'static {
    /// Open the store at `path`
    ///
    /// With `create_if_missing`, an empty store is created when none exists.
    /// Without it, a directory that holds no store is reported as corrupt.
    fn open(path: &Path, create_if_missing: bool) -> StorageResult<Self>;

    /// Read a value
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Insert or overwrite a value
    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Remove a key; removing an absent key succeeds
    fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Apply every operation of `batch` atomically
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;

    /// All entries in key order
    fn scan(&self) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;
}
