//! Fungible symbols and asset amounts.

use crate::{TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of a [`Symbol`] in bytes; also its on-disk width inside asset keys.
pub const SYMBOL_LEN: usize = 8;

const MAX_PRECISION: u32 = 17;

/// A fungible symbol descriptor: numeric identifier plus decimal precision.
///
/// String form is `"<precision>,S#<id>"`. The byte layout inside asset
/// keys is precision then id, both little-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    precision: u32,
    id: u32,
}

impl Symbol {
    /// Build a symbol. Precision is capped at 17 decimal digits.
    pub fn new(precision: u32, id: u32) -> TypesResult<Self> {
        if precision > MAX_PRECISION {
            return Err(TypesError::InvalidSymbol(format!(
                "{},S#{}",
                precision, id
            )));
        }
        Ok(Symbol { precision, id })
    }

    /// The numeric identifier.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// The decimal precision.
    pub const fn precision(&self) -> u32 {
        self.precision
    }

    /// The on-disk byte layout.
    pub fn as_bytes(&self) -> [u8; SYMBOL_LEN] {
        let mut buf = [0u8; SYMBOL_LEN];
        buf[..4].copy_from_slice(&self.precision.to_le_bytes());
        buf[4..].copy_from_slice(&self.id.to_le_bytes());
        buf
    }

    /// Rebuild from the on-disk byte layout.
    pub fn from_bytes(bytes: [u8; SYMBOL_LEN]) -> TypesResult<Self> {
        let precision = u32::from_le_bytes(bytes[..4].try_into().unwrap_or([0; 4]));
        let id = u32::from_le_bytes(bytes[4..].try_into().unwrap_or([0; 4]));
        Symbol::new(precision, id)
    }
}

impl FromStr for Symbol {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        let err = || TypesError::InvalidSymbol(s.to_string());
        let (precision, rest) = s.split_once(',').ok_or_else(err)?;
        let precision: u32 = precision.parse().map_err(|_| err())?;
        let id: u32 = rest.strip_prefix("S#").ok_or_else(err)?.parse().map_err(|_| err())?;
        Symbol::new(precision, id)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},S#{}", self.precision, self.id)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An amount of a fungible symbol.
///
/// The amount is a signed integer scaled by the symbol precision; string
/// form is `"<int>.<frac> S#<id>"` with exactly `precision` fractional
/// digits (`"10.00500 S#1"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Asset {
    amount: i64,
    sym: Symbol,
}

impl Asset {
    /// Build an asset from a raw scaled amount.
    pub const fn new(amount: i64, sym: Symbol) -> Self {
        Asset { amount, sym }
    }

    /// The raw scaled amount.
    pub const fn amount(&self) -> i64 {
        self.amount
    }

    /// The symbol.
    pub const fn symbol(&self) -> Symbol {
        self.sym
    }
}

impl FromStr for Asset {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        let err = |why: &str| TypesError::InvalidAsset(s.to_string(), why.to_string());

        let (number, sym) = s.split_once(' ').ok_or_else(|| err("missing symbol"))?;
        let id: u32 = sym
            .strip_prefix("S#")
            .ok_or_else(|| err("missing S# tag"))?
            .parse()
            .map_err(|_| err("bad symbol id"))?;

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|c| c.is_ascii_digit()) {
            return Err(err("bad integer part"));
        }
        if !frac_part.bytes().all(|c| c.is_ascii_digit()) {
            return Err(err("bad fractional part"));
        }
        let precision = frac_part.len() as u32;
        let sym = Symbol::new(precision, id).map_err(|_| err("precision too large"))?;

        let scale = 10i64
            .checked_pow(precision)
            .ok_or_else(|| err("precision too large"))?;
        let int_value: i64 = int_part.parse().map_err(|_| err("amount overflow"))?;
        let frac_value: i64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| err("amount overflow"))?
        };
        let mut amount = int_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| err("amount overflow"))?;
        if negative {
            amount = -amount;
        }
        Ok(Asset::new(amount, sym))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.sym.precision();
        let scale = 10i64.pow(precision);
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let int_part = abs / scale.unsigned_abs();
        let frac_part = abs % scale.unsigned_abs();
        if precision == 0 {
            write!(f, "{}{} S#{}", sign, int_part, self.sym.id())
        } else {
            write!(
                f,
                "{}{}.{:0width$} S#{}",
                sign,
                int_part,
                frac_part,
                self.sym.id(),
                width = precision as usize
            )
        }
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
