//! Shared-ownership handle to a `Database`

use super::Database;
use kvdb_storage::{RedbEngine, StorageEngine};
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Shared reference to an open `Database`
///
/// Cloning shares the same engine instance; it never opens files. A handle
/// stays usable for as long as it is held, even after the registry has
/// unloaded or deleted the name.
pub struct DatabaseHandle<E: StorageEngine = RedbEngine> {
    inner: Arc<Database<E>>,
}

impl<E: StorageEngine> DatabaseHandle<E> {
    pub(crate) fn new(db: Database<E>) -> Self {
        DatabaseHandle {
            inner: Arc::new(db),
        }
    }

    pub(crate) fn from_arc(inner: Arc<Database<E>>) -> Self {
        DatabaseHandle { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<Database<E>> {
        Arc::downgrade(&self.inner)
    }

    /// Whether both handles refer to the same open database
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this database, the registry's included
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<E: StorageEngine> Clone for DatabaseHandle<E> {
    fn clone(&self) -> Self {
        DatabaseHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: StorageEngine> Deref for DatabaseHandle<E> {
    type Target = Database<E>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<E: StorageEngine> std::fmt::Debug for DatabaseHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("name", &self.inner.name())
            .field("shares", &self.share_count())
            .finish()
    }
}
