//! 64-bit canonical names.

use crate::{TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 64-bit canonical name.
///
/// Names hold up to 13 characters from the charset `.12345a-z`, packed
/// five bits per character (the 13th character carries four bits). The
/// raw `u64` ordering is the canonical ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

const NAME_CHARS: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl Name {
    /// The empty name.
    pub const fn empty() -> Self {
        Name(0)
    }

    /// Construct from the raw packed value.
    pub const fn from_u64(value: u64) -> Self {
        Name(value)
    }

    /// The raw packed value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the empty name.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Little-endian byte layout, as stored inside generated addresses.
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Rebuild from the little-endian byte layout.
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Name(u64::from_le_bytes(bytes))
    }
}

impl FromStr for Name {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        if s.len() > 13 {
            return Err(TypesError::InvalidName(
                s.to_string(),
                "longer than 13 characters".to_string(),
            ));
        }
        let mut value = 0u64;
        for (i, c) in s.bytes().enumerate() {
            let sym = char_to_symbol(c).ok_or_else(|| {
                TypesError::InvalidName(s.to_string(), format!("invalid character `{}`", c as char))
            })?;
            if i < 12 {
                value |= (sym & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if sym > 0x0f {
                    return Err(TypesError::InvalidName(
                        s.to_string(),
                        "13th character out of range".to_string(),
                    ));
                }
                value |= sym & 0x0f;
            }
        }
        Ok(Name(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = [b'.'; 13];
        let mut tmp = self.0;
        for i in (0..13).rev() {
            let idx = if i == 12 { tmp & 0x0f } else { tmp & 0x1f };
            chars[i] = NAME_CHARS[idx as usize];
            tmp >>= if i == 12 { 4 } else { 5 };
        }
        let end = chars
            .iter()
            .rposition(|&c| c != b'.')
            .map_or(0, |p| p + 1);
        // chars is drawn from NAME_CHARS, always valid ASCII
        f.write_str(std::str::from_utf8(&chars[..end]).unwrap_or(""))
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
