//! The 33-byte address encoding and crypto byte types.

use crate::{Name, Name128, TypesError, TypesResult, NAME128_LEN};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of the binary address encoding.
pub const ADDRESS_LEN: usize = 33;
/// Width of a compressed public key.
pub const PUBLIC_KEY_LEN: usize = 33;
/// Width of a recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

const TAG_RESERVED: u8 = 0x00;
const TAG_GENERATED: u8 = 0x01;

/// A compressed public key. The store treats it as opaque bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Rebuild from a slice of exactly 33 bytes.
    pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
        let arr: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| TypesError::BadLength {
            expected: PUBLIC_KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(PublicKey(arr))
    }

    /// The raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for PublicKey {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
        PublicKey::from_slice(&bytes)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A recoverable signature. Opaque bytes at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    /// Rebuild from a slice of exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
        let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| TypesError::BadLength {
            expected: SIGNATURE_LEN,
            actual: bytes.len(),
        })?;
        Ok(Signature(arr))
    }

    /// The raw signature bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Signature {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
        Signature::from_slice(&bytes)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An account address: reserved, public-key, or generated form.
///
/// The 33-byte binary layout leans on compressed public keys starting
/// with `0x02`/`0x03`: key-form addresses store the key verbatim, the
/// reserved form is all zeros, and the generated form is tagged `0x01`
/// followed by an 8-byte prefix name and a 16-byte key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// The reserved (null) address.
    Reserved,
    /// A public-key address.
    PublicKey(PublicKey),
    /// A generated address derived from a prefix name and a key name.
    Generated {
        /// Namespace of the generator.
        prefix: Name,
        /// Key within the namespace.
        key: Name128,
    },
}

impl Address {
    /// The 33-byte binary encoding; the asset-key prefix.
    pub fn to_bytes(&self) -> [u8; ADDRESS_LEN] {
        let mut buf = [0u8; ADDRESS_LEN];
        match self {
            Address::Reserved => {}
            Address::PublicKey(key) => buf.copy_from_slice(key.as_bytes()),
            Address::Generated { prefix, key } => {
                buf[0] = TAG_GENERATED;
                buf[1..9].copy_from_slice(&prefix.to_le_bytes());
                buf[9..9 + NAME128_LEN].copy_from_slice(key.as_bytes());
            }
        }
        buf
    }

    /// Decode the 33-byte binary encoding.
    pub fn from_bytes(bytes: &[u8; ADDRESS_LEN]) -> TypesResult<Self> {
        match bytes[0] {
            TAG_RESERVED => {
                if bytes.iter().any(|&b| b != 0) {
                    return Err(TypesError::InvalidAddress(
                        "reserved address must be all zeros".to_string(),
                    ));
                }
                Ok(Address::Reserved)
            }
            TAG_GENERATED => {
                if bytes[9 + NAME128_LEN..].iter().any(|&b| b != 0) {
                    return Err(TypesError::InvalidAddress(
                        "trailing garbage in generated address".to_string(),
                    ));
                }
                let prefix = Name::from_le_bytes(bytes[1..9].try_into().unwrap_or([0; 8]));
                let key = Name128::from_slice(&bytes[9..9 + NAME128_LEN])?;
                Ok(Address::Generated { prefix, key })
            }
            0x02 | 0x03 => Ok(Address::PublicKey(PublicKey(*bytes))),
            tag => Err(TypesError::InvalidAddress(format!(
                "unknown address tag {:#04x}",
                tag
            ))),
        }
    }

    /// Decode from a slice of exactly 33 bytes.
    pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| TypesError::BadLength {
            expected: ADDRESS_LEN,
            actual: bytes.len(),
        })?;
        Address::from_bytes(&arr)
    }

    /// Whether this is the reserved address.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Address::Reserved)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::PublicKey(key) => f.write_str(&hex::encode(key.as_bytes())),
            other => write!(f, "LGR{}", hex::encode(other.to_bytes())),
        }
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        let hex_part = s.strip_prefix("LGR").unwrap_or(s);
        let bytes = hex::decode(hex_part).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
        Address::from_slice(&bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(first: u8, fill: u8) -> PublicKey {
        let mut bytes = [fill; PUBLIC_KEY_LEN];
        bytes[0] = first;
        PublicKey(bytes)
    }

    #[test]
    fn test_reserved_roundtrip() {
        let addr = Address::Reserved;
        let bytes = addr.to_bytes();
        assert_eq!(bytes, [0u8; ADDRESS_LEN]);
        assert_eq!(Address::from_bytes(&bytes).unwrap(), addr);
    }

    #[test]
    fn test_public_key_roundtrip() {
        let addr = Address::PublicKey(sample_key(0x02, 0xab));
        let bytes = addr.to_bytes();
        assert_eq!(Address::from_bytes(&bytes).unwrap(), addr);
    }

    #[test]
    fn test_generated_roundtrip() {
        let addr = Address::Generated {
            prefix: "fungible".parse().unwrap(),
            key: "s1".parse().unwrap(),
        };
        let bytes = addr.to_bytes();
        assert_eq!(bytes[0], TAG_GENERATED);
        assert_eq!(Address::from_bytes(&bytes).unwrap(), addr);
    }

    #[test]
    fn test_bad_tag_rejected() {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = 0x7f;
        assert!(Address::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_string_roundtrip() {
        let addr = Address::Generated {
            prefix: "fungible".parse().unwrap(),
            key: "s1".parse().unwrap(),
        };
        let s = addr.to_string();
        assert!(s.starts_with("LGR"));
        assert_eq!(s.parse::<Address>().unwrap(), addr);

        let key_addr = Address::PublicKey(sample_key(0x03, 0x11));
        assert_eq!(key_addr.to_string().parse::<Address>().unwrap(), key_addr);
    }
}
