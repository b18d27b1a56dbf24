//! # ledger-state
//!
//! The transactional token store: a typed record/asset API over the
//! ordered-KV engine, a savepoint stack that can reverse every mutation
//! issued while a savepoint is live, sessions that guarantee
//! commit-or-rollback, a persistence codec that carries the in-flight
//! savepoint chain across restarts, and an LRU read cache over
//! deserialized records.
//!
//! ## Savepoints
//!
//! A live (runtime) savepoint holds an engine snapshot plus a log of
//! compact mutation descriptors; rollback rebuilds each key and restores
//! its pre-image from the held snapshot. On shutdown the stack is
//! materialized into pre-image pairs and written atomically behind a
//! dirty flag, so the chain survives restarts in persistent form.
//!
//! ## Concurrency
//!
//! The store is single-writer: all mutating operations serialize on the
//! savepoint stack, which is the single critical section. Reads may run
//! concurrently.

mod actions;
mod cache;
mod error;
mod persist;
mod savepoints;
mod session;
mod store;

pub use actions::{ActionKey, PersistentAction, RuntimeAction};
pub use cache::{Record, TokenCache};
pub use error::{StateError, StateResult};
pub use session::SavepointSession;
pub use store::TokenStore;

pub use ledger_storage::{Profile, StoreConfig};
pub use ledger_types::{ActionOp, TokenType};
