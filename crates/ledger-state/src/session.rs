//! Scoped read/write sessions.

use crate::TokenStore;
use tracing::warn;

/// A scoped savepoint: rolls back on drop unless accepted.
///
/// Construction pushes a new savepoint; [`accept`](Self::accept) leaves
/// it on the stack for a later `pop_savepoints` to promote, and
/// dropping an unaccepted session reverses every mutation recorded
/// since it opened. Sessions nest freely because sequences are strictly
/// increasing.
pub struct SavepointSession<'a> {
    store: &'a TokenStore,
    seq: i64,
    accepted: bool,
}

impl<'a> SavepointSession<'a> {
    pub(crate) fn new(store: &'a TokenStore, seq: i64) -> Self {
        SavepointSession {
            store,
            seq,
            accepted: false,
        }
    }

    /// This session's savepoint sequence.
    pub fn seq(&self) -> i64 {
        self.seq
    }

    /// Commit: keep the savepoint (and its mutations) on the stack.
    pub fn accept(mut self) {
        self.accepted = true;
    }

    /// Merge this session's savepoint into the enclosing one.
    pub fn squash(mut self) -> crate::StateResult<()> {
        self.accepted = true;
        self.store.squash()
    }
}

impl Drop for SavepointSession<'_> {
    fn drop(&mut self) {
        if self.accepted {
            return;
        }
        // Unwind this savepoint and anything still stacked above it, so
        // an abandoned outer session also reverses inner savepoints that
        // were accepted inside it.
        while self
            .store
            .latest_savepoint_seq()
            .is_some_and(|seq| seq >= self.seq)
        {
            if let Err(e) = self.store.rollback_to_latest_savepoint() {
                warn!(seq = self.seq, error = %e, "Session rollback failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ActionOp, StoreConfig, TokenStore, TokenType};
    use ledger_types::Name128;
    use tempfile::TempDir;

    fn open_store() -> (TokenStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = TokenStore::open(&StoreConfig::new(tmp.path())).unwrap();
        (store, tmp)
    }

    fn name(s: &str) -> Name128 {
        s.parse().unwrap()
    }

    #[test]
    fn test_drop_rolls_back() {
        let (store, _tmp) = open_store();
        {
            let _session = store.new_session().unwrap();
            store
                .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), b"v")
                .unwrap();
        }
        assert!(!store.exists_token(TokenType::Domain, None, name("d1")).unwrap());
        assert_eq!(store.savepoint_count(), 0);
    }

    #[test]
    fn test_accept_keeps_changes() {
        let (store, _tmp) = open_store();
        {
            let session = store.new_session().unwrap();
            store
                .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), b"v")
                .unwrap();
            session.accept();
        }
        assert!(store.exists_token(TokenType::Domain, None, name("d1")).unwrap());
        assert_eq!(store.savepoint_count(), 1);
    }

    #[test]
    fn test_nested_commit_then_outer_rollback() {
        let (store, _tmp) = open_store();
        {
            let outer = store.new_session().unwrap();
            store
                .put_token(TokenType::Domain, ActionOp::Add, None, name("outer"), b"v")
                .unwrap();
            {
                let inner = store.new_session().unwrap();
                assert!(inner.seq() > outer.seq());
                store
                    .put_token(TokenType::Domain, ActionOp::Add, None, name("inner"), b"v")
                    .unwrap();
                inner.accept();
            }
            // Outer drops unaccepted: it unwinds the accepted inner
            // savepoint too, restoring its own start state.
        }
        assert!(!store.exists_token(TokenType::Domain, None, name("outer")).unwrap());
        assert!(!store.exists_token(TokenType::Domain, None, name("inner")).unwrap());
        assert_eq!(store.savepoint_count(), 0);
    }

    #[test]
    fn test_session_squash() {
        let (store, _tmp) = open_store();
        let outer = store.new_session().unwrap();
        store
            .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), b"v")
            .unwrap();
        let inner = store.new_session().unwrap();
        store
            .put_token(TokenType::Domain, ActionOp::Add, None, name("d2"), b"v")
            .unwrap();
        inner.squash().unwrap();
        assert_eq!(store.savepoint_count(), 1);

        drop(outer);
        assert!(!store.exists_token(TokenType::Domain, None, name("d1")).unwrap());
        assert!(!store.exists_token(TokenType::Domain, None, name("d2")).unwrap());
    }

    #[test]
    fn test_explicit_sequence_session() {
        let (store, _tmp) = open_store();
        let session = store.new_savepoint_session(42).unwrap();
        assert_eq!(session.seq(), 42);
        assert!(store.new_savepoint_session(42).is_err());
        session.accept();
        assert_eq!(store.next_session_seq(), 43);
    }
}
