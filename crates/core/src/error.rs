//! Error types for the KVDB registry
//!
//! Two layers of errors are defined here:
//! - `StorageError`: failures reported by a storage engine instance
//! - `KvdbError`: failures reported by the registry and its operations
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for storage engine operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for registry operations
pub type KvdbResult<T> = std::result::Result<T, KvdbError>;

// ============================================================================
// Storage Errors
// ============================================================================

/// Errors raised by an embedded storage engine
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while touching the engine's files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// On-disk data is damaged or incomplete
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// The files are held open by another engine instance or process
    #[error("Storage locked: {0}")]
    Locked(String),

    /// Any other failure reported by the engine backend
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a new corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        StorageError::Corruption(msg.into())
    }

    /// Create a new locked error
    pub fn locked(msg: impl Into<String>) -> Self {
        StorageError::Locked(msg.into())
    }

    /// Create a new backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        StorageError::Backend(msg.into())
    }
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Discriminant of a [`KvdbError`], for callers that branch on the kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Name absent where presence is required
    NotFound,
    /// Name present where absence is required
    AlreadyExists,
    /// Name already tracked by the registry
    AlreadyLoaded,
    /// Engine failed to open
    StorageOpen,
    /// Engine failed after opening
    Storage,
    /// Malformed import file
    Parse,
    /// Filesystem failure
    Io,
    /// Bad caller input
    InvalidArgument,
    /// Bad configuration
    Config,
}

/// Errors raised by registry operations
///
/// Every administrative failure names the database it concerns so the
/// message can be reported to an operator verbatim.
#[derive(Debug, Error)]
pub enum KvdbError {
    /// Database is not loaded or not present on disk
    #[error("Database '{name}' not found")]
    NotFound {
        /// Database name
        name: String,
    },

    /// Database already exists on disk or in memory
    #[error("Database '{name}' already exists")]
    AlreadyExists {
        /// Database name
        name: String,
    },

    /// Database is already tracked by the registry
    #[error("Database '{name}' is already loaded")]
    AlreadyLoaded {
        /// Database name
        name: String,
    },

    /// Storage engine could not be opened
    #[error("Failed to open database '{name}': {source}")]
    StorageOpen {
        /// Database name
        name: String,
        /// Underlying engine failure
        #[source]
        source: StorageError,
    },

    /// Storage engine failed while serving a request
    #[error("Storage failure in database '{name}': {source}")]
    Storage {
        /// Database name
        name: String,
        /// Underlying engine failure
        #[source]
        source: StorageError,
    },

    /// Import file is malformed
    #[error("Parse error in '{}' at record {line}: {reason}", .path.display())]
    Parse {
        /// File being imported
        path: PathBuf,
        /// 1-based line (or record) number, 0 when the whole document is bad
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// Filesystem failure outside the storage engine
    #[error("I/O error ({context}): {source}")]
    Io {
        /// What the registry was doing
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Invalid caller input (empty name, empty path, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid registry configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvdbError {
    /// Create a new not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        KvdbError::NotFound { name: name.into() }
    }

    /// Create a new already-exists error
    pub fn already_exists(name: impl Into<String>) -> Self {
        KvdbError::AlreadyExists { name: name.into() }
    }

    /// Create a new already-loaded error
    pub fn already_loaded(name: impl Into<String>) -> Self {
        KvdbError::AlreadyLoaded { name: name.into() }
    }

    /// Create a new storage-open error
    pub fn storage_open(name: impl Into<String>, source: StorageError) -> Self {
        KvdbError::StorageOpen {
            name: name.into(),
            source,
        }
    }

    /// Create a new storage error
    pub fn storage(name: impl Into<String>, source: StorageError) -> Self {
        KvdbError::Storage {
            name: name.into(),
            source,
        }
    }

    /// Create a new parse error
    pub fn parse(path: &Path, line: usize, reason: impl Into<String>) -> Self {
        KvdbError::Parse {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a new I/O error with context
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        KvdbError::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a new invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        KvdbError::InvalidArgument(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        KvdbError::Config(msg.into())
    }

    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvdbError::NotFound { .. } => ErrorKind::NotFound,
            KvdbError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            KvdbError::AlreadyLoaded { .. } => ErrorKind::AlreadyLoaded,
            KvdbError::StorageOpen { .. } => ErrorKind::StorageOpen,
            KvdbError::Storage { .. } => ErrorKind::Storage,
            KvdbError::Parse { .. } => ErrorKind::Parse,
            KvdbError::Io { .. } => ErrorKind::Io,
            KvdbError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            KvdbError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether an idempotent caller may treat this error as success
    pub fn is_benign(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AlreadyLoaded | ErrorKind::AlreadyExists
        )
    }
}
