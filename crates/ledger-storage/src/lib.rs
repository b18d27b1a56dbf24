//! # ledger-storage
//!
//! RocksDB engine adapter for the ledger state store.
//!
//! The engine maintains two column families with different fixed-width
//! key layouts and prefix extractors:
//! - `Tokens` (the default family): 32-byte keys, 16-byte prefix
//! - `Assets`: 41-byte keys, 33-byte address prefix
//!
//! Two storage profiles are exposed: a block-based on-disk profile and a
//! plain-table in-memory profile. All normal writes take the
//! non-synchronous path; callers opt into fsync per batch.

mod batch;
mod config;
mod engine;
mod error;

pub use batch::{BatchOperation, OperationKind, WriteBatch};
pub use config::{Profile, StoreConfig};
pub use engine::{Engine, EngineSnapshot};
pub use error::{StorageError, StorageResult};

use ledger_types::{ASSET_KEY_LEN, TOKEN_KEY_LEN};

/// The two record namespaces of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFamily {
    /// Typed token records; the engine's default family.
    Tokens,
    /// Per-address balance records.
    Assets,
}

impl ColumnFamily {
    /// The RocksDB column family name.
    pub const fn name(&self) -> &'static str {
        match self {
            // The token family rides on the default family so a fresh
            // database needs only one explicit creation.
            ColumnFamily::Tokens => "default",
            ColumnFamily::Assets => "Assets",
        }
    }

    /// Both column families.
    pub const fn all() -> &'static [ColumnFamily] {
        &[ColumnFamily::Tokens, ColumnFamily::Assets]
    }

    /// Fixed key width within this family.
    pub const fn key_len(&self) -> usize {
        match self {
            ColumnFamily::Tokens => TOKEN_KEY_LEN,
            ColumnFamily::Assets => ASSET_KEY_LEN,
        }
    }

    /// Fixed prefix width the family's extractor uses.
    pub const fn prefix_len(&self) -> usize {
        match self {
            ColumnFamily::Tokens => 16,
            ColumnFamily::Assets => 33,
        }
    }
}
