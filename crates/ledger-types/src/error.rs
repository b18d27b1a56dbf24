//! Error types for the primitive layer.

use thiserror::Error;

/// Errors raised while parsing or encoding primitive types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// Invalid 64-bit name.
    #[error("Invalid name `{0}`: {1}")]
    InvalidName(String, String),

    /// Invalid 128-bit name.
    #[error("Invalid name `{0}`: {1}")]
    InvalidName128(String, String),

    /// Invalid symbol string.
    #[error("Invalid symbol `{0}`")]
    InvalidSymbol(String),

    /// Invalid asset string.
    #[error("Invalid asset `{0}`: {1}")]
    InvalidAsset(String, String),

    /// Invalid address encoding.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Byte slice has the wrong length for a fixed-width type.
    #[error("Expected {expected} bytes, got {actual}")]
    BadLength { expected: usize, actual: usize },

    /// Invalid hex input.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// A token key was requested for a type that needs a domain,
    /// or for the asset family.
    #[error("Token type `{0}` cannot form a token key here")]
    BadKeyType(&'static str),
}

/// Result type for primitive parsing and encoding.
pub type TypesResult<T> = Result<T, TypesError>;
