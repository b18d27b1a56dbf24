//! Error types for the serializer.

use thiserror::Error;

/// Errors raised while registering, validating, or using an ABI.
#[derive(Error, Debug)]
pub enum AbiError {
    /// A type expression does not resolve to a builtin, typedef, or struct.
    #[error("Unknown type `{0}`")]
    UnknownType(String),

    /// A typedef chain or struct base chain is circular.
    #[error("Circular reference in type `{0}`")]
    TypeCycle(String),

    /// No action registered under this name.
    #[error("Unknown action `{0}`")]
    UnknownAction(String),

    /// A struct field is missing from the structured value being encoded.
    #[error("Missing field `{field}` in `{type_name}`")]
    MissingField {
        type_name: String,
        field: String,
    },

    /// A structured value carries a field the struct does not declare.
    #[error("Unknown field `{field}` in `{type_name}`")]
    UnknownField {
        type_name: String,
        field: String,
    },

    /// The ABI definition contains duplicate entries.
    #[error("Duplicate {0} entries in ABI definition")]
    DuplicateEntry(&'static str),

    /// The structured value does not fit the expected wire type.
    #[error("Cannot encode value as `{expected}`: {reason}")]
    BadValue {
        expected: String,
        reason: String,
    },

    /// The binary stream ended before the value was complete.
    #[error("Stream underflow: needed {needed} more bytes")]
    StreamUnderflow { needed: usize },

    /// Bytes remain after a complete top-level decode.
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    /// `uintN`/`intN` with an unsupported width.
    #[error("Unrecognized integer width in `{0}`")]
    IntegerWidth(String),

    /// Primitive-type parsing failure.
    #[error(transparent)]
    Types(#[from] ledger_types::TypesError),
}

/// Result type for serializer operations.
pub type AbiResult<T> = Result<T, AbiError>;
