//! Registry of loaded databases
//!
//! `KvdbManager` is the single authority over which databases are loaded.
//!
//! ## Locking
//!
//! - `loaded` (RwLock): name -> handle. Lookups take it shared. Writers take
//!   it exclusive only to insert or remove an entry, never across I/O.
//! - `admin` (Mutex): held for the whole of every administrative operation
//!   (open, create, unload, delete, clear, import), disk I/O included. It
//!   also guards the table of open engine instances.
//!
//! Lock order is `admin` then `loaded`. Lookups only ever take `loaded`, so a
//! slow open or delete of one database never stalls lookups of another.

use crate::database::{Database, DatabaseHandle, OpenTable, RegistryConfig};
use crate::import::{self, ImportCodec, ImportSummary};
use kvdb_core::{validate_db_name, KvdbError, KvdbResult};
use kvdb_storage::{RedbEngine, StorageEngine, WriteBatch};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Registry of named key-value databases under one root folder
pub struct KvdbManager<E: StorageEngine = RedbEngine> {
    db_folder: PathBuf,
    config: RegistryConfig,
    loaded: RwLock<HashMap<String, DatabaseHandle<E>>>,
    admin: Mutex<OpenTable<E>>,
}

impl<E: StorageEngine> KvdbManager<E> {
    /// Registry rooted at `db_folder` with default settings
    pub fn new(db_folder: impl AsRef<Path>) -> KvdbResult<Self> {
        Self::with_config(RegistryConfig::new(db_folder))
    }

    /// Registry built from `config`; the root folder is created if missing
    pub fn with_config(config: RegistryConfig) -> KvdbResult<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.db_folder).map_err(|e| {
            KvdbError::io(
                format!("creating db folder '{}'", config.db_folder.display()),
                e,
            )
        })?;
        // Canonicalize so every root path derived from it is stable
        let db_folder = config.db_folder.canonicalize().map_err(|e| {
            KvdbError::io(
                format!("resolving db folder '{}'", config.db_folder.display()),
                e,
            )
        })?;

        info!(target: "kvdb::registry", path = ?db_folder, "Registry opened");

        Ok(KvdbManager {
            db_folder,
            config,
            loaded: RwLock::new(HashMap::new()),
            admin: Mutex::new(OpenTable::new()),
        })
    }

    /// Root folder (canonical)
    pub fn db_folder(&self) -> &Path {
        &self.db_folder
    }

    /// Settings this registry was built with
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn root_path(&self, name: &str) -> PathBuf {
        self.db_folder.join(name)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Handle to a loaded database, or `None` when it is not loaded
    ///
    /// Never opens anything.
    pub fn get_db(&self, name: &str) -> Option<DatabaseHandle<E>> {
        self.loaded.read().get(name).cloned()
    }

    /// Whether `name` is loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.read().contains_key(name)
    }

    /// Number of loaded databases
    pub fn loaded_count(&self) -> usize {
        self.loaded.read().len()
    }

    /// Loaded names, or with `only_loaded == false` also every database
    /// directory on disk. Sorted, without duplicates.
    pub fn available_kvdbs(&self, only_loaded: bool) -> KvdbResult<Vec<String>> {
        let mut names: BTreeSet<String> = self.loaded.read().keys().cloned().collect();
        if only_loaded {
            return Ok(names.into_iter().collect());
        }

        let listing_err = |e| {
            KvdbError::io(
                format!("listing db folder '{}'", self.db_folder.display()),
                e,
            )
        };
        for entry in std::fs::read_dir(&self.db_folder).map_err(listing_err)? {
            let entry = entry.map_err(listing_err)?;
            if !entry.file_type().map_err(listing_err)?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_db_name(&name).is_ok() {
                names.insert(name);
            }
        }
        Ok(names.into_iter().collect())
    }

    // ========================================================================
    // Open / create
    // ========================================================================

    /// Handle to `name`, loading it first if needed
    ///
    /// Idempotent: every caller gets the same underlying database.
    ///
    /// # Errors
    ///
    /// - `NotFound` if missing on disk and `create_if_missing` is false
    /// - `StorageOpen` if the engine cannot open the directory
    /// - `InvalidArgument` for a bad name
    pub fn add_db(&self, name: &str, create_if_missing: bool) -> KvdbResult<DatabaseHandle<E>> {
        validate_db_name(name)?;

        if let Some(handle) = self.get_db(name) {
            debug!(target: "kvdb::registry", name, "Database already loaded");
            return Ok(handle);
        }

        let mut open = self.admin.lock();
        self.add_db_locked(&mut open, name, create_if_missing)
    }

    /// `add_db` with the configured `create_if_missing`
    pub fn open_default(&self, name: &str) -> KvdbResult<DatabaseHandle<E>> {
        self.add_db(name, self.config.create_if_missing)
    }

    /// Create a brand new database
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if `name` is loaded or present on disk.
    pub fn create_db(&self, name: &str) -> KvdbResult<DatabaseHandle<E>> {
        validate_db_name(name)?;

        let mut open = self.admin.lock();
        if self.is_loaded(name) || self.root_path(name).exists() {
            return Err(KvdbError::already_exists(name));
        }
        self.add_db_locked(&mut open, name, true)
    }

    /// Open a database that is on disk but not loaded, without loading it
    ///
    /// The registry keeps no strong reference to the result; it lives as
    /// long as the caller holds it.
    ///
    /// # Errors
    ///
    /// - `AlreadyLoaded` if `name` is loaded (use `get_db` instead)
    /// - `NotFound` if `name` is not on disk
    pub fn get_unloaded_db(&self, name: &str) -> KvdbResult<DatabaseHandle<E>> {
        validate_db_name(name)?;

        let mut open = self.admin.lock();
        if self.is_loaded(name) {
            return Err(KvdbError::already_loaded(name));
        }
        if !self.root_path(name).is_dir() {
            return Err(KvdbError::not_found(name));
        }

        let handle = self.open_locked(&mut open, name, false)?;
        info!(target: "kvdb::registry", name, "Opened database outside the registry");
        Ok(handle)
    }

    /// Second half of the double-checked load; caller holds `admin`.
    fn add_db_locked(
        &self,
        open: &mut OpenTable<E>,
        name: &str,
        create_if_missing: bool,
    ) -> KvdbResult<DatabaseHandle<E>> {
        // Another admin may have loaded it between the fast path and the lock
        if let Some(handle) = self.get_db(name) {
            return Ok(handle);
        }

        let handle = self.open_locked(open, name, create_if_missing)?;
        self.loaded.write().insert(name.to_string(), handle.clone());

        info!(target: "kvdb::registry", name, path = ?handle.root_path(), "Database loaded");
        Ok(handle)
    }

    /// Live instance for `name`, or a freshly opened one; caller holds `admin`.
    fn open_locked(
        &self,
        open: &mut OpenTable<E>,
        name: &str,
        create_if_missing: bool,
    ) -> KvdbResult<DatabaseHandle<E>> {
        let root = self.root_path(name);

        if let Some(handle) = open.live(&root) {
            debug!(target: "kvdb::registry", name, "Adopting database that is still open");
            return Ok(handle);
        }

        if !create_if_missing && !root.is_dir() {
            return Err(KvdbError::not_found(name));
        }

        let db = Database::open(name, root.clone(), create_if_missing).map_err(|e| {
            warn!(target: "kvdb::registry", name, error = %e, "Failed to open database");
            e
        })?;
        let handle = DatabaseHandle::new(db);
        open.insert(root, &handle);
        Ok(handle)
    }

    // ========================================================================
    // Unload / delete
    // ========================================================================

    /// Unregister `name`, and with `only_from_mem == false` remove its files
    ///
    /// Handles already given out keep working until dropped. Physical removal
    /// happens under the admin lock, so nothing can reopen the name midway.
    ///
    /// # Errors
    ///
    /// - `NotFound` if there is nothing to remove
    /// - `Io` if the directory cannot be removed (the registry is unchanged)
    pub fn delete_db(&self, name: &str, only_from_mem: bool) -> KvdbResult<()> {
        validate_db_name(name)?;

        let mut open = self.admin.lock();

        if only_from_mem {
            // Bind so the handle drops after the write guard is released
            let removed = self.loaded.write().remove(name);
            return match removed {
                Some(_) => {
                    info!(target: "kvdb::registry", name, "Database unloaded");
                    Ok(())
                }
                None => Err(KvdbError::not_found(name)),
            };
        }

        let root = self.root_path(name);
        let on_disk = root.exists();
        if !on_disk && !self.is_loaded(name) {
            return Err(KvdbError::not_found(name));
        }

        if on_disk {
            std::fs::remove_dir_all(&root).map_err(|e| {
                warn!(target: "kvdb::registry", name, error = %e, "Failed to delete database files");
                KvdbError::io(format!("deleting database '{}'", name), e)
            })?;
        }

        let removed = self.loaded.write().remove(name);
        // A later create must open fresh files, not adopt the unlinked ones
        open.forget(&root);
        drop(removed);

        info!(target: "kvdb::registry", name, path = ?root, "Database deleted");
        Ok(())
    }

    /// Unregister every database; nothing is removed from disk
    pub fn clear(&self) {
        let _open = self.admin.lock();
        let dropped = std::mem::take(&mut *self.loaded.write());
        info!(target: "kvdb::registry", count = dropped.len(), "Registry cleared");
    }

    // ========================================================================
    // Bulk import
    // ========================================================================

    /// Import a dump file into `db_name` (default: the file stem)
    ///
    /// The file is fully decoded before the database is opened, and applied
    /// in one engine write, so on failure the database is as it was before
    /// (and a missing one is not created).
    ///
    /// # Errors
    ///
    /// `Io`, `Parse`, `InvalidArgument`, or any `add_db` error.
    pub fn create_kvdb_from_file(
        &self,
        path: &Path,
        create_if_missing: bool,
        db_name: Option<&str>,
    ) -> KvdbResult<ImportSummary> {
        let codec = self.config.import.format.codec(path, self.config.import.separator);
        self.create_kvdb_from_file_with(path, create_if_missing, db_name, codec.as_ref())
    }

    /// `create_kvdb_from_file` with an explicit codec
    pub fn create_kvdb_from_file_with(
        &self,
        path: &Path,
        create_if_missing: bool,
        db_name: Option<&str>,
        codec: &dyn ImportCodec,
    ) -> KvdbResult<ImportSummary> {
        let name = import::resolve_db_name(path, db_name)?;
        let batch = import::stage_file_with(path, codec).map_err(|e| {
            warn!(target: "kvdb::import", name = %name, error = %e, "Import file rejected");
            e
        })?;

        let mut open = self.admin.lock();
        let handle = self.add_db_locked(&mut open, &name, create_if_missing)?;
        Self::apply_import(&handle, path, batch)
    }

    /// Load or create `db_name`, then fill it from `path` when given
    ///
    /// A failed import does not undo the creation: the empty database stays
    /// loaded and callers wanting a full rollback call `delete_db`.
    pub fn create_and_fill_kvdb_from_file(
        &self,
        db_name: &str,
        path: Option<&Path>,
    ) -> KvdbResult<ImportSummary> {
        validate_db_name(db_name)?;

        let mut open = self.admin.lock();
        let handle = self.add_db_locked(&mut open, db_name, true)?;

        let Some(path) = path else {
            return Ok(ImportSummary {
                name: db_name.to_string(),
                records: 0,
            });
        };

        let batch = import::stage_file(path, &self.config.import).map_err(|e| {
            warn!(target: "kvdb::import", name = db_name, error = %e, "Import file rejected");
            e
        })?;
        Self::apply_import(&handle, path, batch)
    }

    fn apply_import(
        handle: &DatabaseHandle<E>,
        path: &Path,
        batch: WriteBatch,
    ) -> KvdbResult<ImportSummary> {
        let records = batch.len();
        handle.write_batch(batch)?;

        info!(target: "kvdb::import", name = handle.name(), records, path = ?path, "Import complete");
        Ok(ImportSummary {
            name: handle.name().to_string(),
            records,
        })
    }
}

impl<E: StorageEngine> std::fmt::Debug for KvdbManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvdbManager")
            .field("db_folder", &self.db_folder)
            .field("loaded", &self.loaded_count())
            .finish()
    }
}
