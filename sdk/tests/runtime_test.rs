use ktv::{compile_schema, KtvError, decode_value, encode_value, load_tree, value_from_json, value_to_json, Value};
use serde_json::json;

const SCHEMA: &str = "
#user
age byte
gender byte
job job
tasks *task
name *char

#job
title *char
type byte

#task
id int2
status byte
time *int4
";

#[test]
fn test_json_to_bytes_and_back() {
    let compiled = compile_schema(SCHEMA).expect("compile_schema failed");
    let tree = load_tree(&compiled.bytes).expect("load_tree failed");

    let input = json!({
        "age": 30,
        "gender": 1,
        "job": { "title": "Product Manager", "type": 2 },
        "tasks": [
            { "id": 10001, "status": 3 },
            { "id": -10002, "status": 2, "time": [1234567, -7654321] },
        ],
        "name": "Zhang Ji",
    });

    let user = value_from_json(&tree, "user", &input).unwrap();
    let bytes = encode_value(&tree, &user).unwrap();

    // age, gender, then a 2-byte size before the nested job
    assert_eq!(bytes[..4], [30, 1, 0, 18]);
    assert_eq!(bytes[bytes.len() - 10..], *b"\0\x08Zhang Ji");

    let decoded = decode_value(&tree, "user", &bytes).unwrap();
    assert_eq!(decoded, user);
    assert_eq!(value_to_json(&decoded), input);
}

#[test]
fn test_non_ascii_text_round_trips() {
    let compiled = compile_schema(SCHEMA).unwrap();
    let tree = load_tree(&compiled.bytes).unwrap();

    let input = json!({ "name": "Zoë", "job": { "title": "Gérant" } });
    let user = value_from_json(&tree, "user", &input).unwrap();
    let bytes = encode_value(&tree, &user).unwrap();
    assert_eq!(bytes[bytes.len() - 6..], [0, 4, b'Z', b'o', 0xC3, 0xAB]);

    let decoded = decode_value(&tree, "user", &bytes).unwrap();
    let output = value_to_json(&decoded);
    assert_eq!(output["name"], json!("Zoë"));
    assert_eq!(output["job"]["title"], json!("Gérant"));
}

#[test]
fn test_deep_nesting_is_rejected() {
    let compiled = compile_schema("#Node\nnext Node").unwrap();
    let tree = load_tree(&compiled.bytes).unwrap();

    // each level is just the 2-byte size of the node below it
    let mut bytes: Vec<u8> = Vec::new();
    for _ in 0..30000 {
        let mut outer = (bytes.len() as u16).to_be_bytes().to_vec();
        outer.extend_from_slice(&bytes);
        bytes = outer;
    }
    assert!(matches!(decode_value(&tree, "Node", &bytes), Err(KtvError::Decode(_))));
}

#[test]
fn test_missing_fields_decode_as_defaults() {
    let compiled = compile_schema(SCHEMA).unwrap();
    let tree = load_tree(&compiled.bytes).unwrap();

    let user = value_from_json(&tree, "user", &json!({ "age": 7 })).unwrap();
    let bytes = encode_value(&tree, &user).unwrap();
    assert_eq!(bytes, [7, 0, 0, 0, 0, 0, 0, 0]);

    let decoded = decode_value(&tree, "user", &bytes).unwrap();
    assert_eq!(decoded.get("gender"), Some(&Value::Byte(0)));
    assert_eq!(value_to_json(decoded.get("job").unwrap()), json!({}));
    assert_eq!(decoded.get("tasks"), None);
}

#[test]
fn test_decode_errors_are_reported() {
    let compiled = compile_schema(SCHEMA).unwrap();
    let tree = load_tree(&compiled.bytes).unwrap();
    assert!(decode_value(&tree, "task", &[0x27]).is_err());
    assert!(decode_value(&tree, "nobody", &[]).is_err());
    assert!(load_tree(&compiled.bytes[..3]).is_err());
}
