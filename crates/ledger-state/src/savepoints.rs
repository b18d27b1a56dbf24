//! Savepoint representation.

use crate::{PersistentAction, RuntimeAction};
use ledger_storage::EngineSnapshot;

/// Payload of a savepoint: live against an engine snapshot, or restored
/// pre-image pairs.
pub(crate) enum SavepointPayload {
    /// A live savepoint. Owns exactly one engine snapshot; dropping the
    /// payload releases it.
    Runtime {
        snapshot: EngineSnapshot,
        actions: Vec<RuntimeAction>,
    },
    /// A savepoint restored from disk (or materialized at shutdown).
    Persistent { actions: Vec<PersistentAction> },
}

/// One entry of the savepoint stack.
pub(crate) struct Savepoint {
    /// Strictly increasing across the stack.
    pub seq: i64,
    pub payload: SavepointPayload,
}

impl Savepoint {
    pub fn is_runtime(&self) -> bool {
        matches!(self.payload, SavepointPayload::Runtime { .. })
    }

    pub fn action_count(&self) -> usize {
        match &self.payload {
            SavepointPayload::Runtime { actions, .. } => actions.len(),
            SavepointPayload::Persistent { actions } => actions.len(),
        }
    }
}
