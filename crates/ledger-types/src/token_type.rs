//! The record-type and mutation-op enumerations that cross the store
//! interface.

use crate::Name128;
use serde::{Deserialize, Serialize};

/// Logical record families in the store.
///
/// The discriminants are wire values: they appear in the persistence
/// file and in cache keys, never in on-disk record keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum TokenType {
    /// Balance records in the asset column family.
    Asset = 0,
    /// Domain definitions.
    Domain = 1,
    /// Non-fungible tokens, keyed under their domain.
    Token = 2,
    /// Permission groups.
    Group = 3,
    /// Suspended (deferred) transactions.
    Suspend = 4,
    /// Asset locks.
    Lock = 5,
    /// Fungible definitions.
    Fungible = 6,
    /// Producer votes.
    Prodvote = 7,
    /// Token-linked identifiers.
    Evtlink = 8,
}

const DOMAIN_PREFIX: Name128 = Name128::reserved(".domain");
const GROUP_PREFIX: Name128 = Name128::reserved(".group");
const SUSPEND_PREFIX: Name128 = Name128::reserved(".suspend");
const LOCK_PREFIX: Name128 = Name128::reserved(".lock");
const FUNGIBLE_PREFIX: Name128 = Name128::reserved(".fungible");
const PRODVOTE_PREFIX: Name128 = Name128::reserved(".prodvote");
const EVTLINK_PREFIX: Name128 = Name128::reserved(".evtlink");

impl TokenType {
    /// Every record type, in wire order.
    pub const fn all() -> &'static [TokenType] {
        &[
            TokenType::Asset,
            TokenType::Domain,
            TokenType::Token,
            TokenType::Group,
            TokenType::Suspend,
            TokenType::Lock,
            TokenType::Fungible,
            TokenType::Prodvote,
            TokenType::Evtlink,
        ]
    }

    /// Short name for logs and errors.
    pub const fn name(&self) -> &'static str {
        match self {
            TokenType::Asset => "asset",
            TokenType::Domain => "domain",
            TokenType::Token => "token",
            TokenType::Group => "group",
            TokenType::Suspend => "suspend",
            TokenType::Lock => "lock",
            TokenType::Fungible => "fungible",
            TokenType::Prodvote => "prodvote",
            TokenType::Evtlink => "evtlink",
        }
    }

    /// The fixed key prefix for this type.
    ///
    /// `None` for [`TokenType::Token`] (the prefix is the caller-supplied
    /// domain) and [`TokenType::Asset`] (separate column family, no
    /// name prefix).
    pub const fn prefix(&self) -> Option<Name128> {
        match self {
            TokenType::Asset | TokenType::Token => None,
            TokenType::Domain => Some(DOMAIN_PREFIX),
            TokenType::Group => Some(GROUP_PREFIX),
            TokenType::Suspend => Some(SUSPEND_PREFIX),
            TokenType::Lock => Some(LOCK_PREFIX),
            TokenType::Fungible => Some(FUNGIBLE_PREFIX),
            TokenType::Prodvote => Some(PRODVOTE_PREFIX),
            TokenType::Evtlink => Some(EVTLINK_PREFIX),
        }
    }

    /// Wire value.
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Decode a wire value.
    pub const fn from_u16(value: u16) -> Option<TokenType> {
        match value {
            0 => Some(TokenType::Asset),
            1 => Some(TokenType::Domain),
            2 => Some(TokenType::Token),
            3 => Some(TokenType::Group),
            4 => Some(TokenType::Suspend),
            5 => Some(TokenType::Lock),
            6 => Some(TokenType::Fungible),
            7 => Some(TokenType::Prodvote),
            8 => Some(TokenType::Evtlink),
            _ => None,
        }
    }
}

/// Mutation operations recorded in savepoints.
///
/// The discriminants are wire values used by the persistence file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum ActionOp {
    /// Insert a key that must not exist.
    Add = 0,
    /// Replace a key that must exist.
    Update = 1,
    /// Insert or replace.
    Put = 2,
    /// Remove a key.
    Delete = 3,
}

impl ActionOp {
    /// Short name for logs and errors.
    pub const fn name(&self) -> &'static str {
        match self {
            ActionOp::Add => "add",
            ActionOp::Update => "update",
            ActionOp::Put => "put",
            ActionOp::Delete => "delete",
        }
    }

    /// Wire value.
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Decode a wire value.
    pub const fn from_u16(value: u16) -> Option<ActionOp> {
        match value {
            0 => Some(ActionOp::Add),
            1 => Some(ActionOp::Update),
            2 => Some(ActionOp::Put),
            3 => Some(ActionOp::Delete),
            _ => None,
        }
    }
}
