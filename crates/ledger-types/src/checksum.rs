//! Fixed-length hash value types.

use crate::{TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! checksum_type {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width in bytes.
            pub const LEN: usize = $len;

            /// Rebuild from a slice of exactly `LEN` bytes.
            pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| TypesError::BadLength {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok($name(arr))
            }

            /// The raw hash bytes.
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name([0; $len])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> TypesResult<Self> {
                let bytes =
                    hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

checksum_type!(
    /// A 160-bit hash value.
    Checksum160,
    20
);
checksum_type!(
    /// A 256-bit hash value.
    Checksum256,
    32
);
checksum_type!(
    /// A 512-bit hash value.
    Checksum512,
    64
);
