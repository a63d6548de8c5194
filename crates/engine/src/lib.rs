//! Database registry for the KVDB subsystem
//!
//! This crate sits on top of the storage layer:
//! - Database / DatabaseHandle: one open engine, shared by every holder
//! - KvdbManager: name -> handle registry with create, lookup, unload,
//!   delete, enumeration and bulk import
//! - Import codecs: line and JSON dump formats
//! - RegistryConfig: `kvdb.toml` settings
//!
//! Lookups go through `KvdbManager::get_db` and never block on
//! administrative work; the returned handle is then queried directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod import;
pub mod manager;

pub use database::{
    Database, DatabaseHandle, ImportConfig, RegistryConfig, CONFIG_FILE_NAME, DEFAULT_SEPARATOR,
};
pub use import::{
    DecodeError, ImportCodec, ImportFormat, ImportSummary, JsonCodec, LineCodec, Record,
};
pub use manager::KvdbManager;
