//! The ABI serializer: type environment plus binary ↔ JSON conversion.

use crate::builtins::{built_in_types, Builtin};
use crate::{AbiDef, AbiError, AbiResult, ByteReader, ByteWriter, StructDef, TypeName};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A compiled, validated ABI.
///
/// Construction installs the definition over the built-in registry and
/// validates the whole environment; afterwards the serializer is
/// read-only and can be shared freely.
pub struct AbiSerializer {
    typedefs: HashMap<TypeName, TypeName>,
    structs: HashMap<TypeName, StructDef>,
    actions: HashMap<String, TypeName>,
    builtins: HashMap<&'static str, Builtin>,
}

impl AbiSerializer {
    /// Compile and validate an ABI definition.
    pub fn new(abi: &AbiDef) -> AbiResult<Self> {
        let mut serializer = AbiSerializer {
            typedefs: HashMap::new(),
            structs: HashMap::new(),
            actions: HashMap::new(),
            builtins: built_in_types(),
        };
        serializer.set_abi(abi)?;
        serializer.validate()?;
        debug!(
            typedefs = serializer.typedefs.len(),
            structs = serializer.structs.len(),
            actions = serializer.actions.len(),
            "ABI installed"
        );
        Ok(serializer)
    }

    fn set_abi(&mut self, abi: &AbiDef) -> AbiResult<()> {
        for st in &abi.structs {
            self.structs.insert(st.name.clone(), st.clone());
        }
        for td in &abi.types {
            self.typedefs
                .insert(td.new_type_name.clone(), td.type_.clone());
        }
        for action in &abi.actions {
            self.actions.insert(action.name.clone(), action.type_.clone());
        }

        // A definition with duplicates would silently drop entries.
        if self.typedefs.len() != abi.types.len() {
            return Err(AbiError::DuplicateEntry("typedef"));
        }
        if self.structs.len() != abi.structs.len() {
            return Err(AbiError::DuplicateEntry("struct"));
        }
        if self.actions.len() != abi.actions.len() {
            return Err(AbiError::DuplicateEntry("action"));
        }
        Ok(())
    }

    /// Whether `type_name` ends with the array decorator.
    pub fn is_array(type_name: &str) -> bool {
        type_name.ends_with("[]")
    }

    /// Whether `type_name` ends with the optional decorator.
    pub fn is_optional(type_name: &str) -> bool {
        type_name.ends_with('?')
    }

    /// Strip a single decorator, yielding the fundamental type.
    pub fn fundamental_type(type_name: &str) -> &str {
        if Self::is_array(type_name) {
            &type_name[..type_name.len() - 2]
        } else if Self::is_optional(type_name) {
            &type_name[..type_name.len() - 1]
        } else {
            type_name
        }
    }

    /// Whether `name` looks like an integer type (`uintN`/`intN`).
    pub fn is_integer(name: &str) -> bool {
        let digits = name.strip_prefix("uint").or_else(|| name.strip_prefix("int"));
        matches!(digits, Some(d) if !d.is_empty() && d.bytes().all(|c| c.is_ascii_digit()))
    }

    /// The bit width of an integer type name.
    pub fn integer_width(name: &str) -> AbiResult<u32> {
        let digits = name
            .strip_prefix("uint")
            .or_else(|| name.strip_prefix("int"))
            .ok_or_else(|| AbiError::IntegerWidth(name.to_string()))?;
        match digits.parse::<u32>() {
            Ok(width @ (8 | 16 | 32 | 64 | 128)) => Ok(width),
            _ => Err(AbiError::IntegerWidth(name.to_string())),
        }
    }

    /// Follow typedef indirections to a terminal name.
    ///
    /// Bounded by a seen-set so it terminates even on an environment
    /// that has not passed validation yet.
    pub fn resolve_type<'a>(&'a self, type_name: &'a str) -> &'a str {
        let mut current = type_name;
        let mut seen = HashSet::new();
        while let Some(next) = self.typedefs.get(current) {
            if !seen.insert(current) {
                break;
            }
            current = next;
        }
        current
    }

    /// Whether a type expression resolves within the environment.
    ///
    /// Decorators are stripped at every typedef hop, so a typedef whose
    /// target is itself decorated (`a -> b[]`, `b -> c?`) resolves.
    pub fn is_type(&self, type_name: &str) -> bool {
        let mut current = Self::fundamental_type(type_name);
        let mut seen = HashSet::new();
        loop {
            if self.builtins.contains_key(current) || self.structs.contains_key(current) {
                return true;
            }
            match self.typedefs.get(current) {
                Some(next) if seen.insert(current) => current = Self::fundamental_type(next),
                _ => return false,
            }
        }
    }

    fn get_struct(&self, type_name: &str) -> AbiResult<&StructDef> {
        self.structs
            .get(self.resolve_type(type_name))
            .ok_or_else(|| AbiError::UnknownType(type_name.to_string()))
    }

    /// The payload type of a registered action.
    pub fn action_type(&self, action: &str) -> AbiResult<&TypeName> {
        self.actions
            .get(action)
            .ok_or_else(|| AbiError::UnknownAction(action.to_string()))
    }

    fn validate(&self) -> AbiResult<()> {
        // Typedef graph must be acyclic and fully resolved.
        for (new_name, target) in &self.typedefs {
            let mut seen: HashSet<&str> = HashSet::from([new_name.as_str(), target.as_str()]);
            let mut current = target.as_str();
            while let Some(next) = self.typedefs.get(current) {
                if !seen.insert(next.as_str()) {
                    return Err(AbiError::TypeCycle(new_name.clone()));
                }
                current = next;
            }
            if !self.is_type(target) {
                return Err(AbiError::UnknownType(target.clone()));
            }
        }

        // Struct base chains must be acyclic, structs all the way up,
        // and every field type known.
        for st in self.structs.values() {
            if !st.base.is_empty() {
                let mut seen: HashSet<&str> = HashSet::from([st.name.as_str()]);
                let mut current = st.name.as_str();
                loop {
                    let def = &self.structs[current];
                    if def.base.is_empty() {
                        break;
                    }
                    let base = self.resolve_type(&def.base);
                    if !self.structs.contains_key(base) {
                        return Err(AbiError::UnknownType(def.base.clone()));
                    }
                    if !seen.insert(base) {
                        return Err(AbiError::TypeCycle(st.name.clone()));
                    }
                    current = base;
                }
            }
            for field in &st.fields {
                if !self.is_type(&field.type_) {
                    return Err(AbiError::UnknownType(field.type_.clone()));
                }
            }
        }

        for type_name in self.actions.values() {
            if !self.is_type(type_name) {
                return Err(AbiError::UnknownType(type_name.clone()));
            }
        }
        Ok(())
    }

    fn read_struct_fields(
        &self,
        type_name: &str,
        r: &mut ByteReader<'_>,
        obj: &mut Map<String, Value>,
    ) -> AbiResult<()> {
        let st = self.get_struct(type_name)?;
        if !st.base.is_empty() {
            self.read_struct_fields(self.resolve_type(&st.base), r, obj)?;
        }
        for field in &st.fields {
            let value = self.read_value(self.resolve_type(&field.type_), r)?;
            obj.insert(field.name.clone(), value);
        }
        Ok(())
    }

    fn read_value(&self, type_name: &str, r: &mut ByteReader<'_>) -> AbiResult<Value> {
        let rtype = self.resolve_type(type_name);
        let ftype = Self::fundamental_type(rtype);
        if let Some(builtin) = self.builtins.get(self.resolve_type(ftype)) {
            return (builtin.unpack)(r, Self::is_array(rtype), Self::is_optional(rtype));
        }
        if Self::is_array(rtype) {
            let count = r.read_varuint()? as usize;
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(self.read_value(ftype, r)?);
            }
            return Ok(Value::Array(items));
        }
        if Self::is_optional(rtype) {
            return if r.read_u8()? != 0 {
                self.read_value(ftype, r)
            } else {
                Ok(Value::Null)
            };
        }
        let mut obj = Map::new();
        self.read_struct_fields(rtype, r, &mut obj)?;
        Ok(Value::Object(obj))
    }

    /// Decode a binary payload of `type_name` into a structured value.
    ///
    /// Trailing bytes after the value are an error.
    pub fn binary_to_json(&self, type_name: &str, binary: &[u8]) -> AbiResult<Value> {
        if !self.is_type(type_name) {
            return Err(AbiError::UnknownType(type_name.to_string()));
        }
        let mut r = ByteReader::new(binary);
        let value = self.read_value(type_name, &mut r)?;
        if r.remaining() > 0 {
            return Err(AbiError::TrailingBytes(r.remaining()));
        }
        Ok(value)
    }

    fn write_struct_fields(
        &self,
        type_name: &str,
        value: &Value,
        w: &mut ByteWriter,
    ) -> AbiResult<()> {
        let st = self.get_struct(type_name)?;
        match value {
            Value::Object(obj) => {
                if !st.base.is_empty() {
                    self.write_struct_fields(self.resolve_type(&st.base), value, w)?;
                }
                for field in &st.fields {
                    let field_value =
                        obj.get(&field.name)
                            .ok_or_else(|| AbiError::MissingField {
                                type_name: st.name.clone(),
                                field: field.name.clone(),
                            })?;
                    self.write_value(&field.type_, field_value, w)?;
                }
                Ok(())
            }
            Value::Array(positional) => {
                if !st.base.is_empty() {
                    return Err(AbiError::BadValue {
                        expected: st.name.clone(),
                        reason: "positional form cannot carry a base struct".to_string(),
                    });
                }
                for (i, field) in st.fields.iter().enumerate() {
                    let field_value =
                        positional.get(i).ok_or_else(|| AbiError::MissingField {
                            type_name: st.name.clone(),
                            field: field.name.clone(),
                        })?;
                    self.write_value(&field.type_, field_value, w)?;
                }
                Ok(())
            }
            other => Err(AbiError::BadValue {
                expected: st.name.clone(),
                reason: format!(
                    "expected object or positional array, got {}",
                    if other.is_null() { "null" } else { "scalar" }
                ),
            }),
        }
    }

    fn chain_declares_field(&self, struct_name: &str, field: &str) -> AbiResult<bool> {
        let mut current = self.get_struct(struct_name)?;
        loop {
            if current.fields.iter().any(|f| f.name == field) {
                return Ok(true);
            }
            if current.base.is_empty() {
                return Ok(false);
            }
            current = self.get_struct(&current.base)?;
        }
    }

    fn write_value(&self, type_name: &str, value: &Value, w: &mut ByteWriter) -> AbiResult<()> {
        let rtype = self.resolve_type(type_name);
        let ftype = Self::fundamental_type(rtype);
        if let Some(builtin) = self.builtins.get(self.resolve_type(ftype)) {
            return (builtin.pack)(value, w, Self::is_array(rtype), Self::is_optional(rtype));
        }
        if Self::is_array(rtype) {
            let items = value.as_array().ok_or_else(|| AbiError::BadValue {
                expected: rtype.to_string(),
                reason: "expected array".to_string(),
            })?;
            w.write_varuint(items.len() as u64);
            for item in items {
                self.write_value(ftype, item, w)?;
            }
            return Ok(());
        }
        if Self::is_optional(rtype) {
            if value.is_null() {
                w.write_u8(0);
            } else {
                w.write_u8(1);
                self.write_value(ftype, value, w)?;
            }
            return Ok(());
        }
        // Base fields read from the same object, so the unknown-field
        // check runs once per value against the whole chain.
        if let Value::Object(obj) = value {
            for key in obj.keys() {
                if !self.chain_declares_field(rtype, key)? {
                    return Err(AbiError::UnknownField {
                        type_name: rtype.to_string(),
                        field: key.clone(),
                    });
                }
            }
        }
        self.write_struct_fields(rtype, value, w)
    }

    /// Encode a structured value of `type_name` into its binary form.
    pub fn json_to_binary(&self, type_name: &str, value: &Value) -> AbiResult<Vec<u8>> {
        if !self.is_type(type_name) {
            return Err(AbiError::UnknownType(type_name.to_string()));
        }
        let mut w = ByteWriter::new();
        self.write_value(type_name, value, &mut w)?;
        Ok(w.into_bytes())
    }
}
