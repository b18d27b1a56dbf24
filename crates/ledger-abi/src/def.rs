//! ABI definition types.
//!
//! These are the serde-visible shapes an ABI document loads from; the
//! serializer compiles them into its immutable type environment.

use serde::{Deserialize, Serialize};

/// A type expression: a name optionally decorated with `[]` or `?`.
pub type TypeName = String;

/// A typedef: `new_type_name` is an alias for `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// The alias being introduced.
    pub new_type_name: TypeName,
    /// The underlying type expression.
    #[serde(rename = "type")]
    pub type_: TypeName,
}

/// A single struct field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field type expression.
    #[serde(rename = "type")]
    pub type_: TypeName,
}

/// A struct definition with optional single-base inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    /// Struct name.
    pub name: TypeName,
    /// Base struct name, empty for none.
    #[serde(default)]
    pub base: TypeName,
    /// Fields in declaration (wire) order.
    pub fields: Vec<FieldDef>,
}

/// An action-name-to-payload-type mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    /// Action name.
    pub name: String,
    /// Payload type expression.
    #[serde(rename = "type")]
    pub type_: TypeName,
}

/// A complete ABI document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDef {
    /// Typedefs.
    #[serde(default)]
    pub types: Vec<TypeDef>,
    /// Structs.
    #[serde(default)]
    pub structs: Vec<StructDef>,
    /// Actions.
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

impl AbiDef {
    /// Convenience builder used heavily by tests.
    pub fn new(types: Vec<TypeDef>, structs: Vec<StructDef>, actions: Vec<ActionDef>) -> Self {
        AbiDef {
            types,
            structs,
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_def_loads_from_json() {
        let doc = r#"{
            "types": [{"new_type_name": "account_name", "type": "name128"}],
            "structs": [{
                "name": "transfer",
                "base": "",
                "fields": [
                    {"name": "from", "type": "address"},
                    {"name": "to", "type": "address[]"}
                ]
            }],
            "actions": [{"name": "transfer", "type": "transfer"}]
        }"#;
        let abi: AbiDef = serde_json::from_str(doc).unwrap();
        assert_eq!(abi.types.len(), 1);
        assert_eq!(abi.structs[0].fields[1].type_, "address[]");
        assert_eq!(abi.actions[0].name, "transfer");
    }

    #[test]
    fn test_base_defaults_to_empty() {
        let doc = r#"{"structs": [{"name": "s", "fields": []}]}"#;
        let abi: AbiDef = serde_json::from_str(doc).unwrap();
        assert!(abi.structs[0].base.is_empty());
    }
}
