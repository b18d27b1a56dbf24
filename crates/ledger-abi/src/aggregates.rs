//! Domain-specific aggregate builtins.

use crate::{AbiError, AbiResult, ByteReader, ByteWriter};
use ledger_types::{Name, Name128, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const REF_ACCOUNT: u64 = 0;
const REF_OWNER: u64 = 1;
const REF_GROUP: u64 = 2;

/// A reference to an authorizer: a concrete account key, the owner
/// placeholder, or a permission group.
///
/// String form: `"[A] <hex key>"`, `"[OWNER]"`, `"[G] <group name>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizerRef {
    /// A single account key.
    Account(PublicKey),
    /// The owner of the token being authorized.
    Owner,
    /// A named permission group.
    Group(Name128),
}

impl AuthorizerRef {
    pub(crate) fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        match r.read_varuint()? {
            REF_ACCOUNT => Ok(AuthorizerRef::Account(PublicKey::from_slice(
                r.read_bytes(33)?,
            )?)),
            REF_OWNER => Ok(AuthorizerRef::Owner),
            REF_GROUP => Ok(AuthorizerRef::Group(Name128::from_slice(
                r.read_bytes(16)?,
            )?)),
            tag => Err(AbiError::BadValue {
                expected: "authorizer_ref".to_string(),
                reason: format!("unknown variant tag {}", tag),
            }),
        }
    }

    pub(crate) fn write(&self, w: &mut ByteWriter) {
        match self {
            AuthorizerRef::Account(key) => {
                w.write_varuint(REF_ACCOUNT);
                w.write_bytes(key.as_bytes());
            }
            AuthorizerRef::Owner => w.write_varuint(REF_OWNER),
            AuthorizerRef::Group(name) => {
                w.write_varuint(REF_GROUP);
                w.write_bytes(name.as_bytes());
            }
        }
    }
}

impl fmt::Display for AuthorizerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizerRef::Account(key) => write!(f, "[A] {}", key),
            AuthorizerRef::Owner => f.write_str("[OWNER]"),
            AuthorizerRef::Group(name) => write!(f, "[G] {}", name),
        }
    }
}

impl FromStr for AuthorizerRef {
    type Err = AbiError;

    fn from_str(s: &str) -> AbiResult<Self> {
        if s == "[OWNER]" {
            return Ok(AuthorizerRef::Owner);
        }
        if let Some(key) = s.strip_prefix("[A] ") {
            return Ok(AuthorizerRef::Account(key.parse().map_err(AbiError::Types)?));
        }
        if let Some(name) = s.strip_prefix("[G] ") {
            return Ok(AuthorizerRef::Group(name.parse().map_err(AbiError::Types)?));
        }
        Err(AbiError::BadValue {
            expected: "authorizer_ref".to_string(),
            reason: format!("unrecognized reference `{}`", s),
        })
    }
}

impl Serialize for AuthorizerRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AuthorizerRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One producer slot in a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerKey {
    /// Producer account name.
    pub producer_name: Name,
    /// Key the producer signs blocks with.
    pub block_signing_key: PublicKey,
}

/// A versioned list of block producers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSchedule {
    /// Monotonic schedule version.
    pub version: u32,
    /// Producers in schedule order.
    pub producers: Vec<ProducerKey>,
}

impl ProducerSchedule {
    pub(crate) fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        let version = r.read_u32()?;
        let count = r.read_varuint()? as usize;
        let mut producers = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let producer_name = Name::from_le_bytes(
                r.read_bytes(8)?.try_into().expect("sized read"),
            );
            let block_signing_key = PublicKey::from_slice(r.read_bytes(33)?)?;
            producers.push(ProducerKey {
                producer_name,
                block_signing_key,
            });
        }
        Ok(ProducerSchedule { version, producers })
    }

    pub(crate) fn write(&self, w: &mut ByteWriter) {
        w.write_u32(self.version);
        w.write_varuint(self.producers.len() as u64);
        for producer in &self.producers {
            w.write_bytes(&producer.producer_name.to_le_bytes());
            w.write_bytes(producer.block_signing_key.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> PublicKey {
        let mut bytes = [0x22u8; 33];
        bytes[0] = 0x02;
        PublicKey(bytes)
    }

    #[test]
    fn test_authorizer_ref_strings() {
        let refs = [
            AuthorizerRef::Account(sample_key()),
            AuthorizerRef::Owner,
            AuthorizerRef::Group("managers".parse().unwrap()),
        ];
        for r in refs {
            let s = r.to_string();
            assert_eq!(s.parse::<AuthorizerRef>().unwrap(), r);
        }
    }

    #[test]
    fn test_authorizer_ref_binary_roundtrip() {
        let r = AuthorizerRef::Group("managers".parse().unwrap());
        let mut w = ByteWriter::new();
        r.write(&mut w);
        let bytes = w.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(AuthorizerRef::read(&mut reader).unwrap(), r);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_producer_schedule_roundtrip() {
        let schedule = ProducerSchedule {
            version: 3,
            producers: vec![ProducerKey {
                producer_name: "producer1".parse().unwrap(),
                block_signing_key: sample_key(),
            }],
        };
        let mut w = ByteWriter::new();
        schedule.write(&mut w);
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(ProducerSchedule::read(&mut r).unwrap(), schedule);
    }
}
