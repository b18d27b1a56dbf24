//! Error types for the engine adapter.

use thiserror::Error;

/// Engine-level errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB returned non-OK.
    #[error("Engine error: {0}")]
    Database(#[from] rocksdb::Error),

    /// Column family handle missing from an open database.
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(&'static str),

    /// I/O error outside the engine itself.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type StorageResult<T> = Result<T, StorageError>;
