//! KVDB - Registry of embedded key-value lookup databases
//!
//! Enrichment tables (allow-lists, threat intel, mappings) are stored as
//! independent embedded databases under one root folder. Event-processing
//! workers look them up by name without contending with each other, while
//! administrative operations (create, import, delete) are serialized.
//!
//! # Quick Start
//!
//! ```ignore
//! use kvdb::KvdbManager;
//!
//! let registry: KvdbManager = KvdbManager::new("/var/lib/engine/kvdb")?;
//!
//! // Administrative path: open or create
//! let ips = registry.add_db("ips", true)?;
//! ips.put("10.0.0.1", "allow")?;
//!
//! // Hot path: lookup only, "not loaded" is a normal outcome
//! if let Some(db) = registry.get_db("ips") {
//!     let verdict = db.get("10.0.0.1")?;
//! }
//! ```

pub use kvdb_core::{ErrorKind, KvdbError, KvdbResult, StorageError, StorageResult};
pub use kvdb_engine::*;
pub use kvdb_storage::{RedbEngine, StorageEngine, WriteBatch};
