//! Database struct and open/close logic
//!
//! A `Database` owns one storage engine instance together with the name and
//! directory it was opened from. It is always shared through a
//! `DatabaseHandle`; the engine closes when the last handle is dropped,
//! whether or not the registry still tracks the name.

pub mod config;
mod handle;
mod registry;

pub use config::{ImportConfig, RegistryConfig, CONFIG_FILE_NAME, DEFAULT_SEPARATOR};
pub use handle::DatabaseHandle;
pub(crate) use registry::OpenTable;
use registry::{CloseNotifier, CloseSignal};

use kvdb_core::{KvdbError, KvdbResult};
use kvdb_storage::{RedbEngine, StorageEngine, WriteBatch};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One named key-value database
///
/// Reads and writes go straight to the engine; nothing here takes a
/// registry lock.
pub struct Database<E: StorageEngine = RedbEngine> {
    name: String,
    root_path: PathBuf,
    engine: E,
    // Declared after `engine`: signals only once the engine is dropped
    closed: CloseNotifier,
}

impl<E: StorageEngine> Database<E> {
    /// Open (or create) the engine rooted at `root_path`.
    pub(crate) fn open(name: &str, root_path: PathBuf, create_if_missing: bool) -> KvdbResult<Self> {
        let engine = E::open(&root_path, create_if_missing)
            .map_err(|e| KvdbError::storage_open(name, e))?;
        Ok(Database {
            name: name.to_string(),
            root_path,
            engine,
            closed: CloseNotifier::default(),
        })
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the engine was opened on
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub(crate) fn close_signal(&self) -> CloseSignal {
        self.closed.signal()
    }

    /// Read a value
    pub fn get(&self, key: impl AsRef<[u8]>) -> KvdbResult<Option<Vec<u8>>> {
        self.engine
            .get(key.as_ref())
            .map_err(|e| KvdbError::storage(&self.name, e))
    }

    /// Check whether a key is present
    pub fn contains(&self, key: impl AsRef<[u8]>) -> KvdbResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Insert or overwrite a value
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> KvdbResult<()> {
        self.engine
            .put(key.as_ref(), value.as_ref())
            .map_err(|e| KvdbError::storage(&self.name, e))
    }

    /// Remove a key
    pub fn delete(&self, key: impl AsRef<[u8]>) -> KvdbResult<()> {
        self.engine
            .delete(key.as_ref())
            .map_err(|e| KvdbError::storage(&self.name, e))
    }

    /// Apply a batch atomically
    pub fn write_batch(&self, batch: WriteBatch) -> KvdbResult<()> {
        self.engine
            .write_batch(batch)
            .map_err(|e| KvdbError::storage(&self.name, e))
    }

    /// Every entry in key order
    pub fn entries(&self) -> KvdbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.engine
            .scan()
            .map_err(|e| KvdbError::storage(&self.name, e))
    }
}

impl<E: StorageEngine> std::fmt::Debug for Database<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("root_path", &self.root_path)
            .finish()
    }
}

impl<E: StorageEngine> Drop for Database<E> {
    fn drop(&mut self) {
        debug!(target: "kvdb::registry", name = %self.name, "Last handle released, closing database");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kvdb_core::ErrorKind;
    use tempfile::TempDir;

    fn open_temp(create: bool) -> (TempDir, KvdbResult<Database>) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("ips");
        let db = Database::open("ips", root, create);
        (temp_dir, db)
    }

    #[test]
    fn test_open_create() {
        let (_dir, db) = open_temp(true);
        let db = db.unwrap();
        assert_eq!(db.name(), "ips");
        assert!(db.root_path().ends_with("ips"));
    }

    #[test]
    fn test_open_missing_without_create_is_storage_open() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("empty");
        std::fs::create_dir_all(&root).unwrap();

        let err = Database::<RedbEngine>::open("empty", root, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageOpen);
        assert!(err.to_string().contains("'empty'"));
    }

    #[test]
    fn test_get_put_delete() {
        let (_dir, db) = open_temp(true);
        let db = db.unwrap();

        db.put("10.0.0.1", "allow").unwrap();
        assert_eq!(db.get("10.0.0.1").unwrap(), Some(b"allow".to_vec()));
        assert!(db.contains("10.0.0.1").unwrap());

        db.delete("10.0.0.1").unwrap();
        assert!(!db.contains("10.0.0.1").unwrap());
    }

    #[test]
    fn test_entries_ordered() {
        let (_dir, db) = open_temp(true);
        let db = db.unwrap();

        let mut batch = WriteBatch::new();
        batch.put("b", "2").put("a", "1");
        db.write_batch(batch).unwrap();

        assert_eq!(
            db.entries().unwrap(),
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec())
            ]
        );
    }
}
