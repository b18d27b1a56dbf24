//! Error types for the token store.

use thiserror::Error;

/// Token store errors.
#[derive(Error, Debug)]
pub enum StateError {
    /// Engine error.
    #[error("Storage error: {0}")]
    Storage(#[from] ledger_storage::StorageError),

    /// Primitive type error.
    #[error("Type error: {0}")]
    Types(#[from] ledger_types::TypesError),

    /// Token record not found.
    #[error("Cannot find token: {0}")]
    TokenNotFound(String),

    /// Asset record not found.
    #[error("Cannot find asset: {0}")]
    AssetNotFound(String),

    /// `Add` on a key that already exists.
    #[error("Token already exists: {0}")]
    TokenExists(String),

    /// Persistence file present but its dirty flag is set.
    #[error("Savepoint file is dirty; a previous persist did not complete")]
    DirtyFlag,

    /// New savepoint sequence not greater than the current top.
    #[error("Savepoint seq is not valid, prev: {prev}, curr: {curr}")]
    SeqNotValid { prev: i64, curr: i64 },

    /// Rollback or pop with an empty stack.
    #[error("There are no savepoints")]
    NoSavepoint,

    /// Squash without two runtime savepoints on top.
    #[error("Squash requires two runtime savepoints on top of the stack")]
    SquashPrecondition,

    /// Mutation while the top savepoint is in persistent (restored)
    /// form.
    #[error("Top savepoint was restored from disk and cannot record mutations")]
    SavepointReadOnly,

    /// Operation not valid for this entry point.
    #[error("Operation `{0}` is not valid here")]
    InvalidOp(&'static str),

    /// Cache handle typed differently than the stored entry.
    #[error("Cache type mismatch: stored {stored}, requested {requested}")]
    TypeMismatch {
        stored: &'static str,
        requested: &'static str,
    },

    /// Typed record failed to encode or decode.
    #[error("Record codec error: {0}")]
    RecordCodec(String),

    /// Savepoint file failed to decode.
    #[error("Savepoint file corrupt: {0}")]
    PersistDecode(String),
}

/// Result type for token store operations.
pub type StateResult<T> = Result<T, StateError>;
