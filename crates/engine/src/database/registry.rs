//! Table of open engine instances
//!
//! Ensures only one Database instance exists per directory within a
//! registry. Uses weak references so an entry never keeps a database alive:
//! once the last handle is dropped the entry is dead and is pruned.
//!
//! The table also covers databases that are open but not registered (after
//! an unload, or via `get_unloaded_db`), so loading such a name again adopts
//! the live instance instead of opening the files a second time.
//!
//! A weak reference stops upgrading as soon as the last handle starts
//! dropping, which is before the engine has released its files. Each entry
//! therefore carries a `CloseSignal` and reopening a dead entry waits for it.

use super::{Database, DatabaseHandle};
use kvdb_storage::StorageEngine;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

// ============================================================================
// Close signalling
// ============================================================================

/// Set once a database's engine has been dropped
#[derive(Clone, Default)]
pub(crate) struct CloseSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CloseSignal {
    pub(crate) fn is_closed(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block until the engine is closed
    pub(crate) fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut closed = lock.lock();
        while !*closed {
            cvar.wait(&mut closed);
        }
    }

    fn notify(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }
}

/// Fires its signal when dropped
///
/// Must be declared after the engine in `Database`: fields drop in
/// declaration order.
#[derive(Default)]
pub(crate) struct CloseNotifier {
    signal: CloseSignal,
}

impl CloseNotifier {
    pub(crate) fn signal(&self) -> CloseSignal {
        self.signal.clone()
    }
}

impl Drop for CloseNotifier {
    fn drop(&mut self) {
        self.signal.notify();
    }
}

// ============================================================================
// Open table
// ============================================================================

struct Entry<E: StorageEngine> {
    db: Weak<Database<E>>,
    closed: CloseSignal,
}

impl<E: StorageEngine> Entry<E> {
    fn is_gone(&self) -> bool {
        self.db.strong_count() == 0 && self.closed.is_closed()
    }
}

/// Directory -> weak reference to the engine opened on it
pub(crate) struct OpenTable<E: StorageEngine> {
    entries: HashMap<PathBuf, Entry<E>>,
}

impl<E: StorageEngine> OpenTable<E> {
    pub(crate) fn new() -> Self {
        OpenTable {
            entries: HashMap::new(),
        }
    }

    /// Live instance for `path`, if any
    ///
    /// When the instance is dead, waits for its engine to finish closing so
    /// the caller can safely open the files again.
    pub(crate) fn live(&mut self, path: &Path) -> Option<DatabaseHandle<E>> {
        let entry = self.entries.get(path)?;
        if let Some(db) = entry.db.upgrade() {
            return Some(DatabaseHandle::from_arc(db));
        }

        let closed = entry.closed.clone();
        self.entries.remove(path);
        closed.wait();
        None
    }

    /// Record a freshly opened instance
    pub(crate) fn insert(&mut self, path: PathBuf, handle: &DatabaseHandle<E>) {
        self.entries.retain(|_, entry| !entry.is_gone());
        self.entries.insert(
            path,
            Entry {
                db: handle.downgrade(),
                closed: handle.close_signal(),
            },
        );
    }

    /// Stop tracking `path`; a live instance keeps running untracked
    pub(crate) fn forget(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdb_storage::RedbEngine;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open(dir: &TempDir, name: &str) -> (PathBuf, DatabaseHandle<RedbEngine>) {
        let root = dir.path().join(name);
        let db = Database::open(name, root.clone(), true).unwrap();
        (root, DatabaseHandle::new(db))
    }

    #[test]
    fn test_live_returns_same_instance() {
        let dir = TempDir::new().unwrap();
        let mut table = OpenTable::new();
        let (root, handle) = open(&dir, "a");
        table.insert(root.clone(), &handle);

        let again = table.live(&root).unwrap();
        assert!(again.ptr_eq(&handle));
    }

    #[test]
    fn test_dead_entry_is_pruned() {
        let dir = TempDir::new().unwrap();
        let mut table = OpenTable::new();
        let (root, handle) = open(&dir, "a");
        table.insert(root.clone(), &handle);
        drop(handle);

        assert!(table.live(&root).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_insert_prunes_other_dead_entries() {
        let dir = TempDir::new().unwrap();
        let mut table = OpenTable::new();
        let (root_a, a) = open(&dir, "a");
        table.insert(root_a, &a);
        drop(a);

        let (root_b, b) = open(&dir, "b");
        table.insert(root_b, &b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_forget_leaves_instance_running() {
        let dir = TempDir::new().unwrap();
        let mut table = OpenTable::new();
        let (root, handle) = open(&dir, "a");
        table.insert(root.clone(), &handle);

        table.forget(&root);
        assert!(table.live(&root).is_none());
        handle.put("k", "v").unwrap();
    }

    #[test]
    fn test_close_signal_fires_on_drop() {
        let dir = TempDir::new().unwrap();
        let (_root, handle) = open(&dir, "a");
        let signal = handle.close_signal();
        assert!(!signal.is_closed());

        let dropper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            drop(handle);
        });
        signal.wait();
        assert!(signal.is_closed());
        dropper.join().unwrap();
    }

    #[test]
    fn test_reopen_after_last_drop_on_other_thread() {
        let dir = TempDir::new().unwrap();
        let mut table = OpenTable::new();
        for _ in 0..20 {
            let (root, handle) = open(&dir, "a");
            table.insert(root.clone(), &handle);
            let dropper = thread::spawn(move || drop(handle));

            // Either adopts the live one or waits for it to close
            if table.live(&root).is_none() {
                let db = Database::<RedbEngine>::open("a", root.clone(), false).unwrap();
                drop(db);
            }
            dropper.join().unwrap();
        }
    }
}
