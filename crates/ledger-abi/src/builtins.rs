//! Built-in primitive types and their pack/unpack registry.

use crate::aggregates::{AuthorizerRef, ProducerSchedule};
use crate::{AbiError, AbiResult, ByteReader, ByteWriter};
use ledger_types::{
    Asset, BlockTimestamp, Checksum160, Checksum256, Checksum512, Name, Name128, PublicKey,
    Signature, Symbol, TimePoint, TimePointSec,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// A registered built-in: pack/unpack dispatched with the decorator
/// flags of the surrounding type expression.
pub(crate) struct Builtin {
    pub unpack: fn(&mut ByteReader<'_>, bool, bool) -> AbiResult<Value>,
    pub pack: fn(&Value, &mut ByteWriter, bool, bool) -> AbiResult<()>,
}

impl Builtin {
    fn of<T: AbiPrimitive>() -> Builtin {
        Builtin {
            unpack: unpack_any::<T>,
            pack: pack_any::<T>,
        }
    }
}

/// A primitive with a fixed wire codec and a JSON projection.
pub(crate) trait AbiPrimitive: Sized {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self>;
    fn write(&self, w: &mut ByteWriter);
    fn to_value(&self) -> AbiResult<Value>;
    fn from_value(v: &Value) -> AbiResult<Self>;
}

fn unpack_any<T: AbiPrimitive>(
    r: &mut ByteReader<'_>,
    is_array: bool,
    is_optional: bool,
) -> AbiResult<Value> {
    if is_array {
        let count = r.read_varuint()? as usize;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(T::read(r)?.to_value()?);
        }
        Ok(Value::Array(items))
    } else if is_optional {
        if r.read_u8()? != 0 {
            T::read(r)?.to_value()
        } else {
            Ok(Value::Null)
        }
    } else {
        T::read(r)?.to_value()
    }
}

fn pack_any<T: AbiPrimitive>(
    v: &Value,
    w: &mut ByteWriter,
    is_array: bool,
    is_optional: bool,
) -> AbiResult<()> {
    if is_array {
        let items = v.as_array().ok_or_else(|| AbiError::BadValue {
            expected: "array".to_string(),
            reason: format!("got {}", value_kind(v)),
        })?;
        w.write_varuint(items.len() as u64);
        for item in items {
            T::from_value(item)?.write(w);
        }
        Ok(())
    } else if is_optional {
        if v.is_null() {
            w.write_u8(0);
        } else {
            w.write_u8(1);
            T::from_value(v)?.write(w);
        }
        Ok(())
    } else {
        T::from_value(v)?.write(w);
        Ok(())
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn bad_value(expected: &str, v: &Value) -> AbiError {
    AbiError::BadValue {
        expected: expected.to_string(),
        reason: format!("got {}", value_kind(v)),
    }
}

fn to_json<T: Serialize>(value: &T, name: &str) -> AbiResult<Value> {
    serde_json::to_value(value).map_err(|e| AbiError::BadValue {
        expected: name.to_string(),
        reason: e.to_string(),
    })
}

fn from_json<T: DeserializeOwned>(v: &Value, name: &str) -> AbiResult<T> {
    serde_json::from_value(v.clone()).map_err(|e| AbiError::BadValue {
        expected: name.to_string(),
        reason: e.to_string(),
    })
}

impl AbiPrimitive for bool {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(r.read_u8()? != 0)
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_u8(u8::from(*self));
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::Bool(*self))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        v.as_bool().ok_or_else(|| bad_value("bool", v))
    }
}

macro_rules! signed_primitive {
    ($ty:ty, $read:ident, $write:ident) => {
        impl AbiPrimitive for $ty {
            fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
                r.$read()
            }
            fn write(&self, w: &mut ByteWriter) {
                w.$write(*self);
            }
            fn to_value(&self) -> AbiResult<Value> {
                Ok(Value::from(i64::from(*self)))
            }
            fn from_value(v: &Value) -> AbiResult<Self> {
                let n = v
                    .as_i64()
                    .ok_or_else(|| bad_value(stringify!($ty), v))?;
                <$ty>::try_from(n).map_err(|_| AbiError::BadValue {
                    expected: stringify!($ty).to_string(),
                    reason: format!("{} out of range", n),
                })
            }
        }
    };
}

macro_rules! unsigned_primitive {
    ($ty:ty, $read:ident, $write:ident) => {
        impl AbiPrimitive for $ty {
            fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
                r.$read()
            }
            fn write(&self, w: &mut ByteWriter) {
                w.$write(*self);
            }
            fn to_value(&self) -> AbiResult<Value> {
                Ok(Value::from(u64::from(*self)))
            }
            fn from_value(v: &Value) -> AbiResult<Self> {
                let n = v
                    .as_u64()
                    .ok_or_else(|| bad_value(stringify!($ty), v))?;
                <$ty>::try_from(n).map_err(|_| AbiError::BadValue {
                    expected: stringify!($ty).to_string(),
                    reason: format!("{} out of range", n),
                })
            }
        }
    };
}

signed_primitive!(i8, read_i8, write_i8);
signed_primitive!(i16, read_i16, write_i16);
signed_primitive!(i32, read_i32, write_i32);
unsigned_primitive!(u16, read_u16, write_u16);
unsigned_primitive!(u32, read_u32, write_u32);

impl AbiPrimitive for u8 {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        r.read_u8()
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_u8(*self);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(u64::from(*self)))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        let n = v.as_u64().ok_or_else(|| bad_value("u8", v))?;
        u8::try_from(n).map_err(|_| AbiError::BadValue {
            expected: "u8".to_string(),
            reason: format!("{} out of range", n),
        })
    }
}

impl AbiPrimitive for i64 {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        r.read_i64()
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_i64(*self);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(*self))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        v.as_i64().ok_or_else(|| bad_value("i64", v))
    }
}

impl AbiPrimitive for u64 {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        r.read_u64()
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_u64(*self);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(*self))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        v.as_u64().ok_or_else(|| bad_value("u64", v))
    }
}

// 128-bit integers do not fit JSON numbers; they travel as decimal
// strings.
macro_rules! wide_primitive {
    ($ty:ty, $read:ident, $write:ident) => {
        impl AbiPrimitive for $ty {
            fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
                r.$read()
            }
            fn write(&self, w: &mut ByteWriter) {
                w.$write(*self);
            }
            fn to_value(&self) -> AbiResult<Value> {
                Ok(Value::String(self.to_string()))
            }
            fn from_value(v: &Value) -> AbiResult<Self> {
                let s = v.as_str().ok_or_else(|| bad_value(stringify!($ty), v))?;
                s.parse().map_err(|_| AbiError::BadValue {
                    expected: stringify!($ty).to_string(),
                    reason: format!("`{}` is not a decimal integer", s),
                })
            }
        }
    };
}

wide_primitive!(i128, read_i128, write_i128);
wide_primitive!(u128, read_u128, write_u128);

impl AbiPrimitive for f32 {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        r.read_f32()
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_f32(*self);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(f64::from(*self)))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        Ok(v.as_f64().ok_or_else(|| bad_value("f32", v))? as f32)
    }
}

impl AbiPrimitive for f64 {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        r.read_f64()
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_f64(*self);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(*self))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        v.as_f64().ok_or_else(|| bad_value("f64", v))
    }
}

/// A 128-bit float carried as raw bits; JSON form is 32 hex digits.
struct Float128([u8; 16]);

impl AbiPrimitive for Float128 {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(Float128(
            r.read_bytes(16)?.try_into().expect("sized read"),
        ))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(&self.0);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(hex::encode(self.0)))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        let s = v.as_str().ok_or_else(|| bad_value("float128", v))?;
        let bytes = hex::decode(s).map_err(|e| AbiError::BadValue {
            expected: "float128".to_string(),
            reason: e.to_string(),
        })?;
        let arr: [u8; 16] = bytes.as_slice().try_into().map_err(|_| AbiError::BadValue {
            expected: "float128".to_string(),
            reason: format!("{} bytes, expected 16", bytes.len()),
        })?;
        Ok(Float128(arr))
    }
}

impl AbiPrimitive for String {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        r.read_string()
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_string(self);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(self.clone()))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        Ok(v.as_str().ok_or_else(|| bad_value("string", v))?.to_string())
    }
}

/// Raw byte strings; JSON form is hex.
struct Bytes(Vec<u8>);

impl AbiPrimitive for Bytes {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(Bytes(r.read_len_bytes()?.to_vec()))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_len_bytes(&self.0);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(hex::encode(&self.0)))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        let s = v.as_str().ok_or_else(|| bad_value("bytes", v))?;
        hex::decode(s).map(Bytes).map_err(|e| AbiError::BadValue {
            expected: "bytes".to_string(),
            reason: e.to_string(),
        })
    }
}

impl AbiPrimitive for TimePoint {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(TimePoint(r.read_i64()?))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_i64(self.0);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(self.0))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        Ok(TimePoint(v.as_i64().ok_or_else(|| bad_value("time_point", v))?))
    }
}

impl AbiPrimitive for TimePointSec {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(TimePointSec(r.read_u32()?))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_u32(self.0);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(u64::from(self.0)))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        u32::from_value(v).map(TimePointSec)
    }
}

impl AbiPrimitive for BlockTimestamp {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(BlockTimestamp(r.read_u32()?))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_u32(self.0);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(u64::from(self.0)))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        u32::from_value(v).map(BlockTimestamp)
    }
}

macro_rules! fixed_bytes_primitive {
    ($ty:ty, $name:literal, $len:expr) => {
        impl AbiPrimitive for $ty {
            fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
                Ok(<$ty>::from_slice(r.read_bytes($len)?)?)
            }
            fn write(&self, w: &mut ByteWriter) {
                w.write_bytes(self.as_bytes());
            }
            fn to_value(&self) -> AbiResult<Value> {
                Ok(Value::String(self.to_string()))
            }
            fn from_value(v: &Value) -> AbiResult<Self> {
                from_json(v, $name)
            }
        }
    };
}

fixed_bytes_primitive!(Checksum160, "checksum160", 20);
fixed_bytes_primitive!(Checksum256, "checksum256", 32);
fixed_bytes_primitive!(Checksum512, "checksum512", 64);
fixed_bytes_primitive!(PublicKey, "public_key", 33);
fixed_bytes_primitive!(Signature, "signature", 65);

impl AbiPrimitive for Name {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(Name::from_le_bytes(
            r.read_bytes(8)?.try_into().expect("sized read"),
        ))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(&self.to_le_bytes());
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(self.to_string()))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        from_json(v, "name")
    }
}

impl AbiPrimitive for Name128 {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(Name128::from_slice(r.read_bytes(16)?)?)
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(self.as_bytes());
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(self.to_string()))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        from_json(v, "name128")
    }
}

impl AbiPrimitive for Symbol {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(Symbol::from_bytes(
            r.read_bytes(8)?.try_into().expect("sized read"),
        )?)
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(&self.as_bytes());
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(self.to_string()))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        from_json(v, "symbol")
    }
}

/// The id half of a symbol, without precision.
struct SymbolCode(u32);

impl AbiPrimitive for SymbolCode {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        Ok(SymbolCode(r.read_u32()?))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_u32(self.0);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::from(u64::from(self.0)))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        u32::from_value(v).map(SymbolCode)
    }
}

impl AbiPrimitive for Asset {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        let amount = r.read_i64()?;
        let sym = Symbol::from_bytes(r.read_bytes(8)?.try_into().expect("sized read"))?;
        Ok(Asset::new(amount, sym))
    }
    fn write(&self, w: &mut ByteWriter) {
        w.write_i64(self.amount());
        w.write_bytes(&self.symbol().as_bytes());
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(self.to_string()))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        from_json(v, "asset")
    }
}

impl AbiPrimitive for AuthorizerRef {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        AuthorizerRef::read(r)
    }
    fn write(&self, w: &mut ByteWriter) {
        AuthorizerRef::write(self, w);
    }
    fn to_value(&self) -> AbiResult<Value> {
        Ok(Value::String(self.to_string()))
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        let s = v.as_str().ok_or_else(|| bad_value("authorizer_ref", v))?;
        s.parse()
    }
}

impl AbiPrimitive for ProducerSchedule {
    fn read(r: &mut ByteReader<'_>) -> AbiResult<Self> {
        ProducerSchedule::read(r)
    }
    fn write(&self, w: &mut ByteWriter) {
        ProducerSchedule::write(self, w);
    }
    fn to_value(&self) -> AbiResult<Value> {
        to_json(self, "producer_schedule")
    }
    fn from_value(v: &Value) -> AbiResult<Self> {
        from_json(v, "producer_schedule")
    }
}

/// The full built-in registry, keyed by wire type name.
pub(crate) fn built_in_types() -> HashMap<&'static str, Builtin> {
    let mut map = HashMap::new();

    map.insert("bool", Builtin::of::<bool>());
    map.insert("int8", Builtin::of::<i8>());
    map.insert("uint8", Builtin::of::<u8>());
    map.insert("int16", Builtin::of::<i16>());
    map.insert("uint16", Builtin::of::<u16>());
    map.insert("int32", Builtin::of::<i32>());
    map.insert("uint32", Builtin::of::<u32>());
    map.insert("int64", Builtin::of::<i64>());
    map.insert("uint64", Builtin::of::<u64>());
    map.insert("int128", Builtin::of::<i128>());
    map.insert("uint128", Builtin::of::<u128>());

    map.insert("float32", Builtin::of::<f32>());
    map.insert("float64", Builtin::of::<f64>());
    map.insert("float128", Builtin::of::<Float128>());

    map.insert("bytes", Builtin::of::<Bytes>());
    map.insert("string", Builtin::of::<String>());

    map.insert("time_point", Builtin::of::<TimePoint>());
    map.insert("time_point_sec", Builtin::of::<TimePointSec>());
    map.insert("block_timestamp_type", Builtin::of::<BlockTimestamp>());

    map.insert("checksum160", Builtin::of::<Checksum160>());
    map.insert("checksum256", Builtin::of::<Checksum256>());
    map.insert("checksum512", Builtin::of::<Checksum512>());

    map.insert("name", Builtin::of::<Name>());
    map.insert("name128", Builtin::of::<Name128>());
    map.insert("symbol", Builtin::of::<Symbol>());
    map.insert("symbol_code", Builtin::of::<SymbolCode>());
    map.insert("asset", Builtin::of::<Asset>());

    map.insert("public_key", Builtin::of::<PublicKey>());
    map.insert("signature", Builtin::of::<Signature>());

    map.insert("authorizer_ref", Builtin::of::<AuthorizerRef>());
    map.insert("producer_schedule", Builtin::of::<ProducerSchedule>());

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(name: &str, value: Value) -> Value {
        let registry = built_in_types();
        let builtin = registry.get(name).expect("registered builtin");
        let mut w = ByteWriter::new();
        (builtin.pack)(&value, &mut w, false, false).unwrap();
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        let out = (builtin.unpack)(&mut r, false, false).unwrap();
        assert_eq!(r.remaining(), 0, "{} left trailing bytes", name);
        out
    }

    #[test]
    fn test_scalar_roundtrips() {
        assert_eq!(roundtrip("bool", json!(true)), json!(true));
        assert_eq!(roundtrip("uint8", json!(200)), json!(200));
        assert_eq!(roundtrip("int32", json!(-5)), json!(-5));
        assert_eq!(roundtrip("uint64", json!(u64::MAX)), json!(u64::MAX));
        assert_eq!(
            roundtrip("uint128", json!("340282366920938463463374607431768211455")),
            json!("340282366920938463463374607431768211455")
        );
        assert_eq!(roundtrip("string", json!("hi")), json!("hi"));
        assert_eq!(roundtrip("bytes", json!("deadbeef")), json!("deadbeef"));
        assert_eq!(roundtrip("time_point", json!(-1)), json!(-1));
    }

    #[test]
    fn test_domain_roundtrips() {
        assert_eq!(roundtrip("name", json!("producer1")), json!("producer1"));
        assert_eq!(roundtrip("name128", json!("my-domain")), json!("my-domain"));
        assert_eq!(roundtrip("symbol", json!("5,S#1")), json!("5,S#1"));
        assert_eq!(
            roundtrip("asset", json!("12.00100 S#3")),
            json!("12.00100 S#3")
        );
        assert_eq!(roundtrip("authorizer_ref", json!("[OWNER]")), json!("[OWNER]"));
    }

    #[test]
    fn test_array_and_optional_dispatch() {
        let registry = built_in_types();
        let builtin = registry.get("uint16").unwrap();

        let mut w = ByteWriter::new();
        (builtin.pack)(&json!([1, 2, 3]), &mut w, true, false).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![3, 1, 0, 2, 0, 3, 0]);
        let mut r = ByteReader::new(&bytes);
        assert_eq!((builtin.unpack)(&mut r, true, false).unwrap(), json!([1, 2, 3]));

        let mut w = ByteWriter::new();
        (builtin.pack)(&Value::Null, &mut w, false, true).unwrap();
        assert_eq!(w.into_bytes(), vec![0]);
    }

    #[test]
    fn test_pack_type_errors() {
        let registry = built_in_types();
        let builtin = registry.get("uint8").unwrap();
        let mut w = ByteWriter::new();
        assert!((builtin.pack)(&json!("nope"), &mut w, false, false).is_err());
        assert!((builtin.pack)(&json!(256), &mut w, false, false).is_err());
    }
}
