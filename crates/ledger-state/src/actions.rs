//! Mutation descriptors recorded in savepoints.

use crate::{StateError, StateResult};
use ledger_storage::ColumnFamily;
use ledger_types::{ActionOp, AssetKey, Name128, TokenKey, TokenType};

/// Key material for a recorded mutation.
///
/// Descriptors are compact: they carry names, not engine keys, and never
/// the new value (it is already in the engine). The concrete key bytes
/// are rebuilt when the savepoint is rolled back or persisted.
#[derive(Debug, Clone)]
pub enum ActionKey {
    /// A record of a fixed-prefix type.
    Token { ty: TokenType, key: Name128 },
    /// A token record under an explicit domain.
    TokenFull { domain: Name128, key: Name128 },
    /// A balance record.
    Asset { key: AssetKey },
    /// Several token records under one domain, recorded as one action.
    TokenKeys { domain: Name128, keys: Vec<Name128> },
}

/// A mutation recorded against a live savepoint.
#[derive(Debug, Clone)]
pub struct RuntimeAction {
    /// The operation that was applied.
    pub op: ActionOp,
    /// What it was applied to.
    pub key: ActionKey,
}

/// A mutation materialized with its pre-image, as stored in the
/// persistence file.
///
/// `value` is the pre-image: empty for `Add` (and for keys that did not
/// exist in the savepoint snapshot), the old value otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentAction {
    /// The operation that was applied.
    pub op: ActionOp,
    /// Record family the key belongs to.
    pub ty: TokenType,
    /// Concrete engine key bytes.
    pub key: Vec<u8>,
    /// Pre-image bytes, empty meaning "did not exist".
    pub value: Vec<u8>,
}

/// One concrete engine key affected by an action, with enough context
/// to publish the matching cache-invalidation event.
#[derive(Debug, Clone)]
pub(crate) struct KeyEntry {
    pub cf: ColumnFamily,
    pub ty: TokenType,
    pub bytes: Vec<u8>,
    pub event: Option<(TokenType, Option<Name128>, Name128)>,
}

impl RuntimeAction {
    /// Expand the descriptor into concrete engine keys.
    pub(crate) fn entries(&self) -> StateResult<Vec<KeyEntry>> {
        match &self.key {
            ActionKey::Token { ty, key } => {
                let token_key = TokenKey::for_type(*ty, None, *key)?;
                Ok(vec![KeyEntry {
                    cf: ColumnFamily::Tokens,
                    ty: *ty,
                    bytes: token_key.as_bytes().to_vec(),
                    event: Some((*ty, None, *key)),
                }])
            }
            ActionKey::TokenFull { domain, key } => {
                let token_key = TokenKey::new(*domain, *key);
                Ok(vec![KeyEntry {
                    cf: ColumnFamily::Tokens,
                    ty: TokenType::Token,
                    bytes: token_key.as_bytes().to_vec(),
                    event: Some((TokenType::Token, Some(*domain), *key)),
                }])
            }
            ActionKey::Asset { key } => Ok(vec![KeyEntry {
                cf: ColumnFamily::Assets,
                ty: TokenType::Asset,
                bytes: key.as_bytes().to_vec(),
                event: None,
            }]),
            ActionKey::TokenKeys { domain, keys } => Ok(keys
                .iter()
                .map(|key| KeyEntry {
                    cf: ColumnFamily::Tokens,
                    ty: TokenType::Token,
                    bytes: TokenKey::new(*domain, *key).as_bytes().to_vec(),
                    event: Some((TokenType::Token, Some(*domain), *key)),
                })
                .collect()),
        }
    }
}

impl PersistentAction {
    /// Column family the key belongs to.
    pub(crate) fn cf(&self) -> ColumnFamily {
        if self.ty == TokenType::Asset {
            ColumnFamily::Assets
        } else {
            ColumnFamily::Tokens
        }
    }

    /// Cache-invalidation event for token keys; assets are not cached.
    pub(crate) fn event(&self) -> StateResult<Option<(TokenType, Option<Name128>, Name128)>> {
        if self.ty == TokenType::Asset {
            return Ok(None);
        }
        let token_key = TokenKey::from_slice(&self.key).map_err(StateError::Types)?;
        let domain = if self.ty == TokenType::Token {
            Some(token_key.prefix())
        } else {
            None
        };
        Ok(Some((self.ty, domain, token_key.key())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_entry_uses_fixed_prefix() {
        let action = RuntimeAction {
            op: ActionOp::Add,
            key: ActionKey::Token {
                ty: TokenType::Domain,
                key: "d1".parse().unwrap(),
            },
        };
        let entries = action.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cf, ColumnFamily::Tokens);
        assert_eq!(&entries[0].bytes[..7], b".domain");
    }

    #[test]
    fn test_token_keys_expand() {
        let action = RuntimeAction {
            op: ActionOp::Add,
            key: ActionKey::TokenKeys {
                domain: "evt".parse().unwrap(),
                keys: vec!["a".parse().unwrap(), "b".parse().unwrap()],
            },
        };
        let entries = action.entries().unwrap();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.ty, TokenType::Token);
            assert!(entry.event.is_some());
        }
    }

    #[test]
    fn test_persistent_event_decodes_key() {
        let token_key = TokenKey::new("evt".parse().unwrap(), "a".parse().unwrap());
        let action = PersistentAction {
            op: ActionOp::Update,
            ty: TokenType::Token,
            key: token_key.as_bytes().to_vec(),
            value: b"old".to_vec(),
        };
        let (ty, domain, key) = action.event().unwrap().unwrap();
        assert_eq!(ty, TokenType::Token);
        assert_eq!(domain, Some("evt".parse().unwrap()));
        assert_eq!(key, "a".parse().unwrap());
    }
}
