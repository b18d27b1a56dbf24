//! # ledger-abi
//!
//! Schema-driven binary serializer for ledger payloads.
//!
//! An ABI definition registers typedefs, structs (with single-base
//! inheritance), and action-name-to-type mappings on top of a fixed set
//! of built-in primitives. The serializer translates between the binary
//! wire format and structured [`serde_json::Value`]s in both directions:
//! on-chain payload decoding and external JSON ↔ binary conversion.
//!
//! The wire format uses little-endian fixed-width integers, LEB128
//! varuints for lengths and array counts, a flag byte for optionals, and
//! length-prefixed UTF-8 for strings.
//!
//! The type environment is validated for acyclicity at construction and
//! is immutable afterwards.

mod aggregates;
mod builtins;
mod datastream;
mod def;
mod error;
mod serializer;

pub use aggregates::{AuthorizerRef, ProducerKey, ProducerSchedule};
pub use datastream::{ByteReader, ByteWriter};
pub use def::{AbiDef, ActionDef, FieldDef, StructDef, TypeDef, TypeName};
pub use error::{AbiError, AbiResult};
pub use serializer::AbiSerializer;
