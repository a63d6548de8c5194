//! Core types for the KVDB registry
//!
//! This crate defines the foundational types shared by the storage and
//! engine layers:
//! - Error: `StorageError` (engine level) and `KvdbError` (registry level)
//! - ErrorKind: discriminant callers branch on
//! - Database name validation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod db_name;
pub mod error;

pub use db_name::{validate_db_name, DbNameError, MAX_DB_NAME_LENGTH};
pub use error::{ErrorKind, KvdbError, KvdbResult, StorageError, StorageResult};
