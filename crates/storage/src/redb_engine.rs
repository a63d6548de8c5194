//! `StorageEngine` backed by redb
//!
//! Each database directory holds a single redb file with a single table.
//! Every write (including a whole `WriteBatch`) is one redb write
//! transaction, so a failure before commit leaves the file untouched.

use crate::batch::{BatchOp, WriteBatch};
use crate::engine::StorageEngine;
use kvdb_core::{StorageError, StorageResult};
use redb::{ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the redb store inside a database directory
pub const DATA_FILE_NAME: &str = "data.redb";

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("kvdb");

/// Engine over one redb file
pub struct RedbEngine {
    db: redb::Database,
    root: PathBuf,
}

impl RedbEngine {
    /// Directory this engine was opened on
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for RedbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbEngine")
            .field("root", &self.root)
            .finish()
    }
}

impl StorageEngine for RedbEngine {
    fn open(path: &Path, create_if_missing: bool) -> StorageResult<Self> {
        let file = path.join(DATA_FILE_NAME);

        let db = if create_if_missing {
            std::fs::create_dir_all(path)?;
            redb::Database::create(&file).map_err(from_redb)?
        } else {
            if !file.is_file() {
                return Err(StorageError::corruption(format!(
                    "missing data file '{}'",
                    file.display()
                )));
            }
            redb::Database::open(&file).map_err(from_redb)?
        };

        // Readers must never observe a missing table
        let txn = db.begin_write().map_err(from_redb)?;
        txn.open_table(TABLE).map_err(from_redb)?;
        txn.commit().map_err(from_redb)?;

        debug!(target: "kvdb::storage", path = ?path, "Engine opened");

        Ok(RedbEngine {
            db,
            root: path.to_path_buf(),
        })
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(from_redb)?;
        let table = txn.open_table(TABLE).map_err(from_redb)?;
        let value = table
            .get(key)
            .map_err(from_redb)?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(from_redb)?;
        {
            let mut table = txn.open_table(TABLE).map_err(from_redb)?;
            table.insert(key, value).map_err(from_redb)?;
        }
        txn.commit().map_err(from_redb)
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(from_redb)?;
        {
            let mut table = txn.open_table(TABLE).map_err(from_redb)?;
            table.remove(key).map_err(from_redb)?;
        }
        txn.commit().map_err(from_redb)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        // Returning early drops the transaction, which aborts it
        let txn = self.db.begin_write().map_err(from_redb)?;
        {
            let mut table = txn.open_table(TABLE).map_err(from_redb)?;
            for op in &batch {
                match op {
                    BatchOp::Put { key, value } => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(from_redb)?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice()).map_err(from_redb)?;
                    }
                }
            }
        }
        txn.commit().map_err(from_redb)
    }

    fn scan(&self) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let txn = self.db.begin_read().map_err(from_redb)?;
        let table = txn.open_table(TABLE).map_err(from_redb)?;
        let mut entries = Vec::new();
        for item in table.iter().map_err(from_redb)? {
            let (key, value) = item.map_err(from_redb)?;
            entries.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(entries)
    }
}

impl Drop for RedbEngine {
    fn drop(&mut self) {
        debug!(target: "kvdb::storage", path = ?self.root, "Engine closed");
    }
}

fn from_redb<E: Into<redb::Error>>(e: E) -> StorageError {
    match e.into() {
        redb::Error::DatabaseAlreadyOpen => {
            StorageError::locked("database file is already open")
        }
        redb::Error::Corrupted(msg) => StorageError::Corruption(msg),
        redb::Error::Io(e) => StorageError::Io(e),
        other => StorageError::backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("db");

        let engine = RedbEngine::open(&root, true).unwrap();
        assert_eq!(engine.root(), root.as_path());
        assert!(root.join(DATA_FILE_NAME).is_file());
    }

    #[test]
    fn test_open_without_create_on_empty_dir_is_corruption() {
        let temp_dir = TempDir::new().unwrap();

        let err = RedbEngine::open(temp_dir.path(), false).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }

    #[test]
    fn test_delete_absent_key_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let engine = RedbEngine::open(temp_dir.path(), true).unwrap();

        engine.delete(b"never-written").unwrap();
        assert_eq!(engine.get(b"never-written").unwrap(), None);
    }

    #[test]
    fn test_from_redb_maps_already_open() {
        let err = from_redb(redb::Error::DatabaseAlreadyOpen);
        assert!(matches!(err, StorageError::Locked(_)));
    }
}
