//! Serializer scenarios: full ABI round trips and validation.

use ledger_abi::{AbiDef, AbiError, AbiSerializer};
use serde_json::json;

/// An ABI exercising typedefs, inheritance, decorators, and the domain
/// builtins together.
fn ledger_abi_doc() -> AbiDef {
    serde_json::from_value(json!({
        "types": [
            {"new_type_name": "user_id", "type": "public_key"},
            {"new_type_name": "user_list", "type": "user_id[]"},
            {"new_type_name": "domain_name", "type": "name128"}
        ],
        "structs": [
            {
                "name": "token_def",
                "base": "",
                "fields": [
                    {"name": "domain", "type": "domain_name"},
                    {"name": "name", "type": "name128"},
                    {"name": "owner", "type": "user_list"}
                ]
            },
            {
                "name": "issuetoken",
                "base": "",
                "fields": [
                    {"name": "domain", "type": "domain_name"},
                    {"name": "names", "type": "name128[]"},
                    {"name": "owner", "type": "user_list"}
                ]
            },
            {
                "name": "header",
                "base": "",
                "fields": [
                    {"name": "creator", "type": "user_id"},
                    {"name": "created_at", "type": "time_point_sec"}
                ]
            },
            {
                "name": "newfungible",
                "base": "header",
                "fields": [
                    {"name": "sym", "type": "symbol"},
                    {"name": "total_supply", "type": "asset"},
                    {"name": "memo", "type": "string?"},
                    {"name": "authorizers", "type": "authorizer_ref[]"}
                ]
            }
        ],
        "actions": [
            {"name": "issuetoken", "type": "issuetoken"},
            {"name": "newfungible", "type": "newfungible"}
        ]
    }))
    .unwrap()
}

fn key_hex(fill: u8) -> String {
    let mut bytes = [fill; 33];
    bytes[0] = 0x02;
    hex::encode(bytes)
}

#[test]
fn test_issuetoken_payload_roundtrip() {
    let abi = AbiSerializer::new(&ledger_abi_doc()).unwrap();
    let value = json!({
        "domain": "art",
        "names": ["piece1", "piece2"],
        "owner": [key_hex(0xab)],
    });

    let payload_type = abi.action_type("issuetoken").unwrap().clone();
    let bytes = abi.json_to_binary(&payload_type, &value).unwrap();
    assert_eq!(abi.binary_to_json(&payload_type, &bytes).unwrap(), value);
}

#[test]
fn test_inherited_struct_roundtrip() {
    let abi = AbiSerializer::new(&ledger_abi_doc()).unwrap();
    let value = json!({
        "creator": key_hex(0x01),
        "created_at": 1_700_000_000u32,
        "sym": "5,S#3",
        "total_supply": "100.00000 S#3",
        "memo": "genesis",
        "authorizers": ["[OWNER]", format!("[A] {}", key_hex(0x02))],
    });

    let bytes = abi.json_to_binary("newfungible", &value).unwrap();
    assert_eq!(abi.binary_to_json("newfungible", &bytes).unwrap(), value);
}

#[test]
fn test_optional_none_roundtrip() {
    let abi = AbiSerializer::new(&ledger_abi_doc()).unwrap();
    let value = json!({
        "creator": key_hex(0x01),
        "created_at": 0u32,
        "sym": "0,S#9",
        "total_supply": "1 S#9",
        "memo": null,
        "authorizers": [],
    });

    let bytes = abi.json_to_binary("newfungible", &value).unwrap();
    assert_eq!(abi.binary_to_json("newfungible", &bytes).unwrap(), value);
}

#[test]
fn test_binary_is_deterministic() {
    let abi = AbiSerializer::new(&ledger_abi_doc()).unwrap();
    let value = json!({
        "domain": "art",
        "names": ["piece1"],
        "owner": [],
    });
    let first = abi.json_to_binary("issuetoken", &value).unwrap();
    let second = abi.json_to_binary("issuetoken", &value).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_typedef_chain_resolves_through_decorators() {
    let abi = AbiSerializer::new(&ledger_abi_doc()).unwrap();
    // user_list -> user_id[] -> public_key[]
    assert!(abi.is_type("user_list"));
    assert_eq!(abi.resolve_type("user_id"), "public_key");
}

#[test]
fn test_validation_rejects_unknown_action_payload() {
    let mut doc = ledger_abi_doc();
    doc.actions.push(ledger_abi::ActionDef {
        name: "broken".to_string(),
        type_: "no_such_type".to_string(),
    });
    assert!(matches!(
        AbiSerializer::new(&doc),
        Err(AbiError::UnknownType(_))
    ));
}

#[test]
fn test_truncated_payload_fails_cleanly() {
    let abi = AbiSerializer::new(&ledger_abi_doc()).unwrap();
    let value = json!({
        "domain": "art",
        "names": ["piece1"],
        "owner": [key_hex(0xab)],
    });
    let bytes = abi.json_to_binary("issuetoken", &value).unwrap();

    for cut in [1, bytes.len() / 2, bytes.len() - 1] {
        assert!(abi.binary_to_json("issuetoken", &bytes[..cut]).is_err());
    }
}
