//! Storage layer for the KVDB registry
//!
//! This crate defines the storage engine seam and its default backend:
//! - StorageEngine: trait every per-database engine implements
//! - WriteBatch: staged mutations applied atomically
//! - RedbEngine: redb-backed engine, one file per database directory

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod engine;
pub mod redb_engine;

pub use batch::{BatchOp, WriteBatch};
pub use engine::StorageEngine;
pub use redb_engine::{RedbEngine, DATA_FILE_NAME};
