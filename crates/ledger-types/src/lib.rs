//! # ledger-types
//!
//! Canonical primitive types shared across the ledger state store.
//!
//! This crate provides:
//! - Fixed-width canonical names ([`Name`], [`Name128`])
//! - Asset primitives ([`Symbol`], [`Asset`])
//! - The 33-byte [`Address`] encoding and crypto byte types
//! - The [`TokenType`] and [`ActionOp`] enumerations that cross the
//!   store interface
//! - The on-disk key layouts ([`TokenKey`], [`AssetKey`])
//!
//! All fixed-size types expose their exact on-disk byte layout; keys are
//! memcpy-stable across runs and place the prefix-seek side first.

mod address;
mod asset;
mod checksum;
mod error;
mod keys;
mod name;
mod name128;
mod time;
mod token_type;

pub use address::{Address, PublicKey, Signature, ADDRESS_LEN, PUBLIC_KEY_LEN, SIGNATURE_LEN};
pub use asset::{Asset, Symbol, SYMBOL_LEN};
pub use checksum::{Checksum160, Checksum256, Checksum512};
pub use error::{TypesError, TypesResult};
pub use keys::{AssetKey, TokenKey, ASSET_KEY_LEN, TOKEN_KEY_LEN};
pub use name::Name;
pub use name128::{Name128, NAME128_LEN};
pub use time::{BlockTimestamp, TimePoint, TimePointSec};
pub use token_type::{ActionOp, TokenType};
