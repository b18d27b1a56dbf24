//! 128-bit canonical names.

use crate::{TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of a [`Name128`] in bytes; also its on-disk width inside keys.
pub const NAME128_LEN: usize = 16;

/// A 16-byte canonical name used for domains, token keys, and the fixed
/// per-type prefixes.
///
/// The value is the on-disk layout: up to 16 bytes from the charset
/// `a-z0-9.-`, zero-padded on the right. Lexicographic byte order is the
/// canonical ordering, so keys built from names iterate in name order.
///
/// Names beginning with `.` are reserved for the fixed per-type prefixes
/// and are rejected by [`FromStr`]; use [`Name128::reserved`] to build
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name128([u8; NAME128_LEN]);

fn valid_char(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == b'.' || c == b'-'
}

impl Name128 {
    /// The empty name.
    pub const fn empty() -> Self {
        Name128([0; NAME128_LEN])
    }

    /// Build a reserved name at compile time.
    ///
    /// Reserved names may begin with `.`, which user-facing names cannot,
    /// so the per-type prefixes can never collide with a parsed domain.
    /// Panics (at compile time when used in a const) if `s` is longer
    /// than 16 bytes.
    pub const fn reserved(s: &str) -> Self {
        let src = s.as_bytes();
        assert!(src.len() <= NAME128_LEN);
        let mut buf = [0u8; NAME128_LEN];
        let mut i = 0;
        while i < src.len() {
            buf[i] = src[i];
            i += 1;
        }
        Name128(buf)
    }

    /// The on-disk byte layout.
    pub const fn as_bytes(&self) -> &[u8; NAME128_LEN] {
        &self.0
    }

    /// Rebuild from the on-disk byte layout.
    pub fn from_bytes(bytes: [u8; NAME128_LEN]) -> Self {
        Name128(bytes)
    }

    /// Rebuild from a slice of exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
        let arr: [u8; NAME128_LEN] = bytes.try_into().map_err(|_| TypesError::BadLength {
            expected: NAME128_LEN,
            actual: bytes.len(),
        })?;
        Ok(Name128(arr))
    }

    /// Whether this is the empty name.
    pub fn is_empty(&self) -> bool {
        self.0 == [0; NAME128_LEN]
    }

    fn str_len(&self) -> usize {
        self.0.iter().position(|&c| c == 0).unwrap_or(NAME128_LEN)
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0[..self.str_len()]).unwrap_or("")
    }
}

impl FromStr for Name128 {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        if s.is_empty() {
            return Err(TypesError::InvalidName128(
                s.to_string(),
                "empty".to_string(),
            ));
        }
        if s.len() > NAME128_LEN {
            return Err(TypesError::InvalidName128(
                s.to_string(),
                format!("longer than {} bytes", NAME128_LEN),
            ));
        }
        if s.starts_with('.') {
            return Err(TypesError::InvalidName128(
                s.to_string(),
                "leading `.` is reserved".to_string(),
            ));
        }
        for c in s.bytes() {
            if !valid_char(c) {
                return Err(TypesError::InvalidName128(
                    s.to_string(),
                    format!("invalid character `{}`", c as char),
                ));
            }
        }
        Ok(Name128::reserved(s))
    }
}

impl fmt::Display for Name128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Name128 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name128 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // Reserved names round-trip through serde as well.
        if s.starts_with('.') && s.len() <= NAME128_LEN && s.bytes().skip(1).all(valid_char) {
            return Ok(Name128::reserved(&s));
        }
        s.parse().map_err(serde::de::Error::custom)
    }
}
