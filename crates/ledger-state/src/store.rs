//! The token store.

use crate::actions::KeyEntry;
use crate::persist;
use crate::savepoints::{Savepoint, SavepointPayload};
use crate::{
    ActionKey, PersistentAction, RuntimeAction, SavepointSession, StateError, StateResult,
};
use ledger_storage::{ColumnFamily, Engine, EngineSnapshot, StoreConfig, WriteBatch};
use ledger_types::{ActionOp, Address, AssetKey, Name128, Symbol, TokenKey, TokenType};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// A cache-invalidation callback: `(type, domain?, key)`.
pub type TokenEventFn = Box<dyn Fn(TokenType, Option<Name128>, Name128) + Send + Sync>;

type TokenEvent = (TokenType, Option<Name128>, Name128);

/// The transactional token store.
///
/// Values are opaque bytes at this layer; meaning comes from the
/// serializer above. All mutations serialize on the savepoint stack,
/// the single critical section of the store. Forward writes take the
/// engine's non-sync path; only rollback writes are fsynced, so after a
/// crash the layer above is expected to re-apply its block journal.
pub struct TokenStore {
    engine: Engine,
    persist_path: PathBuf,
    savepoints: Mutex<VecDeque<Savepoint>>,
    rollback_subs: Mutex<Vec<TokenEventFn>>,
    remove_subs: Mutex<Vec<TokenEventFn>>,
}

impl TokenStore {
    /// Open the store, reloading a persisted savepoint stack if one is
    /// present.
    ///
    /// A persistence file with its dirty flag set fails with
    /// [`StateError::DirtyFlag`]; clearing it is an operator decision.
    pub fn open(config: &StoreConfig) -> StateResult<Self> {
        let engine = Engine::open(config)?;
        let persist_path = config.persist_path();

        let mut stack = VecDeque::new();
        if persist_path.exists() {
            let restored = persist::load_file(&persist_path)?;
            info!(
                savepoints = restored.len(),
                path = %persist_path.display(),
                "Restored savepoint stack"
            );
            stack = restored
                .into_iter()
                .map(|(seq, actions)| Savepoint {
                    seq,
                    payload: SavepointPayload::Persistent { actions },
                })
                .collect();
            // The file's contents now live in memory; a clean shutdown
            // rewrites it.
            std::fs::remove_file(&persist_path).map_err(ledger_storage::StorageError::Io)?;
        }

        Ok(TokenStore {
            engine,
            persist_path,
            savepoints: Mutex::new(stack),
            rollback_subs: Mutex::new(Vec::new()),
            remove_subs: Mutex::new(Vec::new()),
        })
    }

    /// Flush the engine and optionally persist the savepoint stack.
    ///
    /// Persistence is best-effort: on failure the dirty flag stays set
    /// and the next open refuses to auto-load.
    pub fn close(self, persist: bool) {
        if persist {
            if let Err(e) = self.persist_savepoints() {
                warn!(error = %e, "Failed to persist savepoints on close");
            }
        }
        if let Err(e) = self.engine.flush() {
            warn!(error = %e, "Failed to flush engine on close");
        }
        info!("Token store closed");
    }

    // ---- typed namespace -------------------------------------------------

    fn token_key_for(
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> StateResult<(TokenKey, ActionKey)> {
        if ty == TokenType::Token {
            let domain = domain.ok_or(ledger_types::TypesError::BadKeyType("token"))?;
            Ok((
                TokenKey::new(domain, key),
                ActionKey::TokenFull { domain, key },
            ))
        } else {
            Ok((
                TokenKey::for_type(ty, None, key)?,
                ActionKey::Token { ty, key },
            ))
        }
    }

    fn describe(ty: TokenType, domain: Option<Name128>, key: Name128) -> String {
        match domain {
            Some(domain) => format!("{}:{}/{}", ty.name(), domain, key),
            None => format!("{}:{}", ty.name(), key),
        }
    }

    fn check_recordable(stack: &VecDeque<Savepoint>) -> StateResult<()> {
        match stack.back() {
            Some(top) if !top.is_runtime() => Err(StateError::SavepointReadOnly),
            _ => Ok(()),
        }
    }

    /// Write a token record.
    ///
    /// `Add` requires the key to be absent, `Update` requires it to be
    /// present, `Put` accepts either. For [`TokenType::Token`] the
    /// domain must be supplied; other types have fixed prefixes.
    #[instrument(skip(self, value), fields(ty = ty.name(), op = op.name(), key = %key))]
    pub fn put_token(
        &self,
        ty: TokenType,
        op: ActionOp,
        domain: Option<Name128>,
        key: Name128,
        value: &[u8],
    ) -> StateResult<()> {
        let (token_key, action_key) = Self::token_key_for(ty, domain, key)?;
        let mut stack = self.savepoints.lock();
        Self::check_recordable(&stack)?;

        let exists = self.engine.contains(ColumnFamily::Tokens, token_key.as_bytes())?;
        match op {
            ActionOp::Add if exists => {
                return Err(StateError::TokenExists(Self::describe(ty, domain, key)));
            }
            ActionOp::Update if !exists => {
                return Err(StateError::TokenNotFound(Self::describe(ty, domain, key)));
            }
            ActionOp::Delete => {
                return Err(StateError::InvalidOp("delete"));
            }
            _ => {}
        }

        self.engine
            .put(ColumnFamily::Tokens, token_key.as_bytes(), value)?;
        if let Some(Savepoint {
            payload: SavepointPayload::Runtime { actions, .. },
            ..
        }) = stack.back_mut()
        {
            actions.push(RuntimeAction {
                op,
                key: action_key,
            });
        }
        Ok(())
    }

    /// Write several token records under one domain in a single batch,
    /// recorded as one mutation.
    #[instrument(skip(self, entries), fields(op = op.name(), domain = %domain, count = entries.len()))]
    pub fn put_tokens(
        &self,
        op: ActionOp,
        domain: Name128,
        entries: &[(Name128, Vec<u8>)],
    ) -> StateResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        if op == ActionOp::Delete {
            return Err(StateError::InvalidOp("delete"));
        }
        let mut stack = self.savepoints.lock();
        Self::check_recordable(&stack)?;

        let mut batch = WriteBatch::with_capacity(entries.len());
        let mut keys = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let token_key = TokenKey::new(domain, *key);
            let exists = self.engine.contains(ColumnFamily::Tokens, token_key.as_bytes())?;
            match op {
                ActionOp::Add if exists => {
                    return Err(StateError::TokenExists(Self::describe(
                        TokenType::Token,
                        Some(domain),
                        *key,
                    )));
                }
                ActionOp::Update if !exists => {
                    return Err(StateError::TokenNotFound(Self::describe(
                        TokenType::Token,
                        Some(domain),
                        *key,
                    )));
                }
                _ => {}
            }
            batch.put(ColumnFamily::Tokens, token_key.as_bytes().to_vec(), value.clone());
            keys.push(*key);
        }
        self.engine.write_batch(batch, false)?;

        if let Some(Savepoint {
            payload: SavepointPayload::Runtime { actions, .. },
            ..
        }) = stack.back_mut()
        {
            actions.push(RuntimeAction {
                op,
                key: ActionKey::TokenKeys { domain, keys },
            });
        }
        Ok(())
    }

    /// Delete a token record. Publishes a remove event so caches drop
    /// the key.
    #[instrument(skip(self), fields(ty = ty.name(), key = %key))]
    pub fn delete_token(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> StateResult<()> {
        let (token_key, action_key) = Self::token_key_for(ty, domain, key)?;
        let mut stack = self.savepoints.lock();
        Self::check_recordable(&stack)?;

        if !self.engine.contains(ColumnFamily::Tokens, token_key.as_bytes())? {
            return Err(StateError::TokenNotFound(Self::describe(ty, domain, key)));
        }
        self.engine
            .delete(ColumnFamily::Tokens, token_key.as_bytes())?;
        if let Some(Savepoint {
            payload: SavepointPayload::Runtime { actions, .. },
            ..
        }) = stack.back_mut()
        {
            actions.push(RuntimeAction {
                op: ActionOp::Delete,
                key: action_key,
            });
        }
        drop(stack);

        for sub in self.remove_subs.lock().iter() {
            sub(ty, domain, key);
        }
        Ok(())
    }

    /// Write a balance record.
    #[instrument(skip(self, value), fields(address = %address, symbol = %symbol))]
    pub fn put_asset(&self, address: &Address, symbol: Symbol, value: &[u8]) -> StateResult<()> {
        let asset_key = AssetKey::new(address, symbol);
        let mut stack = self.savepoints.lock();
        Self::check_recordable(&stack)?;

        self.engine
            .put(ColumnFamily::Assets, asset_key.as_bytes(), value)?;
        if let Some(Savepoint {
            payload: SavepointPayload::Runtime { actions, .. },
            ..
        }) = stack.back_mut()
        {
            actions.push(RuntimeAction {
                op: ActionOp::Put,
                key: ActionKey::Asset { key: asset_key },
            });
        }
        Ok(())
    }

    /// Read a token record, `None` when absent.
    pub fn read_token_opt(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> StateResult<Option<Vec<u8>>> {
        let (token_key, _) = Self::token_key_for(ty, domain, key)?;
        Ok(self.engine.get(ColumnFamily::Tokens, token_key.as_bytes())?)
    }

    /// Read a token record, failing when absent.
    pub fn read_token(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> StateResult<Vec<u8>> {
        self.read_token_opt(ty, domain, key)?
            .ok_or_else(|| StateError::TokenNotFound(Self::describe(ty, domain, key)))
    }

    /// Whether a token record exists.
    pub fn exists_token(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> StateResult<bool> {
        Ok(self.read_token_opt(ty, domain, key)?.is_some())
    }

    /// Read a balance record, `None` when absent.
    pub fn read_asset_opt(
        &self,
        address: &Address,
        symbol: Symbol,
    ) -> StateResult<Option<Vec<u8>>> {
        let asset_key = AssetKey::new(address, symbol);
        Ok(self.engine.get(ColumnFamily::Assets, asset_key.as_bytes())?)
    }

    /// Read a balance record, failing when absent.
    pub fn read_asset(&self, address: &Address, symbol: Symbol) -> StateResult<Vec<u8>> {
        self.read_asset_opt(address, symbol)?
            .ok_or_else(|| StateError::AssetNotFound(format!("{} at {}", symbol, address)))
    }

    /// Whether a balance record exists.
    pub fn exists_asset(&self, address: &Address, symbol: Symbol) -> StateResult<bool> {
        Ok(self.read_asset_opt(address, symbol)?.is_some())
    }

    /// Whether the address holds any balance at all.
    pub fn exists_any_asset(&self, address: &Address) -> StateResult<bool> {
        let prefix = AssetKey::address_prefix(address);
        Ok(self
            .engine
            .iter_prefix(ColumnFamily::Assets, &prefix)?
            .next()
            .is_some())
    }

    /// Visit every balance of an address in symbol order. The callback
    /// returns `false` to stop early.
    pub fn read_all_assets(
        &self,
        address: &Address,
        mut f: impl FnMut(Symbol, Vec<u8>) -> bool,
    ) -> StateResult<()> {
        let prefix = AssetKey::address_prefix(address);
        for (key, value) in self.engine.iter_prefix(ColumnFamily::Assets, &prefix)? {
            let symbol = AssetKey::from_slice(&key)?.symbol()?;
            if !f(symbol, value) {
                break;
            }
        }
        Ok(())
    }

    // ---- savepoint stack -------------------------------------------------

    /// Push a new empty runtime savepoint over a fresh snapshot.
    /// `seq` must be greater than every sequence already on the stack.
    pub fn add_savepoint(&self, seq: i64) -> StateResult<()> {
        let mut stack = self.savepoints.lock();
        if let Some(top) = stack.back() {
            if top.seq >= seq {
                return Err(StateError::SeqNotValid {
                    prev: top.seq,
                    curr: seq,
                });
            }
        }
        stack.push_back(Savepoint {
            seq,
            payload: SavepointPayload::Runtime {
                snapshot: self.engine.snapshot(),
                actions: Vec::new(),
            },
        });
        debug!(seq, depth = stack.len(), "Savepoint added");
        Ok(())
    }

    /// Reverse every mutation recorded in the top savepoint and pop it.
    ///
    /// Actions replay in a forward scan with per-key dedup, so the
    /// earliest action on a key decides its restoration. The restoring
    /// batch is the one write the store fsyncs.
    #[instrument(skip(self))]
    pub fn rollback_to_latest_savepoint(&self) -> StateResult<()> {
        let mut stack = self.savepoints.lock();
        let savepoint = stack.pop_back().ok_or(StateError::NoSavepoint)?;
        debug!(
            seq = savepoint.seq,
            actions = savepoint.action_count(),
            "Rolling back savepoint"
        );

        let events = match savepoint.payload {
            SavepointPayload::Runtime { snapshot, actions } => {
                self.rollback_runtime(&snapshot, &actions)?
                // snapshot released here
            }
            SavepointPayload::Persistent { actions } => self.rollback_persistent(&actions)?,
        };
        drop(stack);

        let subs = self.rollback_subs.lock();
        for (ty, domain, key) in &events {
            for sub in subs.iter() {
                sub(*ty, *domain, *key);
            }
        }
        Ok(())
    }

    fn rollback_runtime(
        &self,
        snapshot: &EngineSnapshot,
        actions: &[RuntimeAction],
    ) -> StateResult<Vec<TokenEvent>> {
        let mut batch = WriteBatch::new();
        let mut seen: HashSet<(ColumnFamily, Vec<u8>)> = HashSet::new();
        let mut events = Vec::new();

        for action in actions {
            for entry in action.entries()? {
                let KeyEntry {
                    cf, bytes, event, ..
                } = entry;
                if !seen.insert((cf, bytes.clone())) {
                    continue;
                }
                match action.op {
                    ActionOp::Add => batch.delete(cf, bytes),
                    ActionOp::Update | ActionOp::Put => match snapshot.get(cf, &bytes)? {
                        Some(old) => batch.put(cf, bytes, old),
                        None => batch.delete(cf, bytes),
                    },
                    ActionOp::Delete => {
                        if let Some(old) = snapshot.get(cf, &bytes)? {
                            batch.put(cf, bytes, old);
                        }
                    }
                }
                if let Some(event) = event {
                    events.push(event);
                }
            }
        }

        if !batch.is_empty() {
            self.engine.write_batch(batch, true)?;
        }
        Ok(events)
    }

    fn rollback_persistent(
        &self,
        actions: &[PersistentAction],
    ) -> StateResult<Vec<TokenEvent>> {
        let mut batch = WriteBatch::new();
        let mut seen: HashSet<(ColumnFamily, Vec<u8>)> = HashSet::new();
        let mut events = Vec::new();

        for action in actions {
            let cf = action.cf();
            if !seen.insert((cf, action.key.clone())) {
                continue;
            }
            match action.op {
                ActionOp::Add => batch.delete(cf, action.key.clone()),
                ActionOp::Update | ActionOp::Put => {
                    if action.value.is_empty() {
                        batch.delete(cf, action.key.clone());
                    } else {
                        batch.put(cf, action.key.clone(), action.value.clone());
                    }
                }
                ActionOp::Delete => {
                    if !action.value.is_empty() {
                        batch.put(cf, action.key.clone(), action.value.clone());
                    }
                }
            }
            if let Some(event) = action.event()? {
                events.push(event);
            }
        }

        if !batch.is_empty() {
            self.engine.write_batch(batch, true)?;
        }
        Ok(events)
    }

    /// Discard every savepoint with `seq < until` without applying it;
    /// the changes below become permanent.
    pub fn pop_savepoints(&self, until: i64) -> StateResult<()> {
        let mut stack = self.savepoints.lock();
        if stack.is_empty() {
            return Err(StateError::NoSavepoint);
        }
        while stack.front().is_some_and(|sp| sp.seq < until) {
            let savepoint = stack.pop_front();
            if let Some(sp) = savepoint {
                debug!(seq = sp.seq, "Savepoint promoted to permanent");
            }
        }
        Ok(())
    }

    /// Remove the top savepoint, keeping its changes.
    pub fn pop_back_savepoint(&self) -> StateResult<()> {
        let mut stack = self.savepoints.lock();
        let savepoint = stack.pop_back().ok_or(StateError::NoSavepoint)?;
        debug!(seq = savepoint.seq, "Savepoint popped");
        Ok(())
    }

    /// Merge the top savepoint into the one below it.
    ///
    /// Requires two runtime savepoints on top. The lower savepoint keeps
    /// its snapshot; the top's actions are appended in order and its
    /// snapshot is released. Engine contents are untouched.
    pub fn squash(&self) -> StateResult<()> {
        let mut stack = self.savepoints.lock();
        let len = stack.len();
        if len < 2 || !stack[len - 1].is_runtime() || !stack[len - 2].is_runtime() {
            return Err(StateError::SquashPrecondition);
        }

        let Some(top) = stack.pop_back() else {
            return Err(StateError::SquashPrecondition);
        };
        let top_seq = top.seq;
        let top_actions = match top.payload {
            SavepointPayload::Runtime { actions, .. } => actions,
            SavepointPayload::Persistent { .. } => return Err(StateError::SquashPrecondition),
        };
        if let Some(Savepoint {
            seq,
            payload: SavepointPayload::Runtime { actions, .. },
        }) = stack.back_mut()
        {
            debug!(top = top_seq, into = *seq, "Savepoints squashed");
            actions.extend(top_actions);
        }
        Ok(())
    }

    /// Sequence number of the top savepoint, if any.
    pub fn latest_savepoint_seq(&self) -> Option<i64> {
        self.savepoints.lock().back().map(|sp| sp.seq)
    }

    /// The next valid session sequence number.
    pub fn next_session_seq(&self) -> i64 {
        self.latest_savepoint_seq().map_or(1, |seq| seq + 1)
    }

    /// Current stack depth.
    pub fn savepoint_count(&self) -> usize {
        self.savepoints.lock().len()
    }

    // ---- sessions --------------------------------------------------------

    /// Open a session over a new savepoint with an explicit sequence.
    pub fn new_savepoint_session(&self, seq: i64) -> StateResult<SavepointSession<'_>> {
        self.add_savepoint(seq)?;
        Ok(SavepointSession::new(self, seq))
    }

    /// Open a session over a new savepoint at the next free sequence.
    pub fn new_session(&self) -> StateResult<SavepointSession<'_>> {
        self.new_savepoint_session(self.next_session_seq())
    }

    // ---- persistence -----------------------------------------------------

    /// Write the savepoint stack to disk behind a dirty flag and switch
    /// the in-memory stack to persistent form, releasing all snapshots.
    #[instrument(skip(self))]
    pub fn persist_savepoints(&self) -> StateResult<()> {
        let mut stack = self.savepoints.lock();
        let materialized = persist::materialize(&stack)?;
        persist::write_file(&self.persist_path, &materialized)?;

        *stack = materialized
            .into_iter()
            .map(|(seq, actions)| Savepoint {
                seq,
                payload: SavepointPayload::Persistent { actions },
            })
            .collect();
        info!(
            savepoints = stack.len(),
            path = %self.persist_path.display(),
            "Savepoint stack persisted"
        );
        Ok(())
    }

    // ---- events ----------------------------------------------------------

    /// Register a callback fired for every token key restored by a
    /// rollback.
    pub fn subscribe_rollback(
        &self,
        f: impl Fn(TokenType, Option<Name128>, Name128) + Send + Sync + 'static,
    ) {
        self.rollback_subs.lock().push(Box::new(f));
    }

    /// Register a callback fired for every explicit token delete.
    pub fn subscribe_remove(
        &self,
        f: impl Fn(TokenType, Option<Name128>, Name128) + Send + Sync + 'static,
    ) {
        self.remove_subs.lock().push(Box::new(f));
    }
}
