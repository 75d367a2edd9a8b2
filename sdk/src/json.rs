use ktv_compiler::{decode_binary_schema, error::KtvError};
use ktv_schema::{BasicKind, FieldKind, Tree, Value};
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

/// Decode a descriptor into a pretty-printed JSON string.
pub fn describe_to_json(buffer: &[u8]) -> Result<String, KtvError> {
    let schema = decode_binary_schema(buffer)?;
    serde_json::to_string_pretty(&schema).map_err(|e| KtvError::Json(e.to_string()))
}

/// Converts a value to JSON. Non-empty `char` arrays holding UTF-8 text
/// become strings; any other `char` array stays an array of numbers.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Char(c) => Json::from(*c),
        Value::Byte(b) => Json::from(*b),
        Value::Int2(i) => Json::from(*i),
        Value::Int4(i) => Json::from(*i),
        Value::Array(values) => match value.as_chars() {
            Some(text) if !values.is_empty() => Json::String(text),
            _ => Json::Array(values.iter().map(value_to_json).collect()),
        },
        Value::Object(_, fields) => Json::Object(
            fields
                .iter()
                .map(|(alias, value)| (alias.to_string(), value_to_json(value)))
                .collect::<Map<String, Json>>(),
        ),
    }
}

/// Builds an object of `model` from a JSON object.
///
/// Keys the model doesn't know are ignored, as are keys whose JSON shape
/// doesn't fit the field (a string for an `int4`, say) and empty arrays.
/// A `*char` field only takes a string; its UTF-8 bytes become the chars.
/// Numbers outside the range of their field are an error.
pub fn value_from_json<'a>(tree: &'a Tree, model: &str, json: &Json) -> Result<Value<'a>, KtvError> {
    let index = tree
        .model_index(model)
        .ok_or_else(|| KtvError::Json(format!("model {:?} is not defined", model)))?;
    object_from_json(tree, index, json)
}

fn object_from_json<'a>(tree: &'a Tree, index: usize, json: &Json) -> Result<Value<'a>, KtvError> {
    let model = &tree.models[index];
    let object = json.as_object().ok_or_else(|| {
        KtvError::Json(format!("expected an object for model {:?}", model.name))
    })?;

    let mut fields = HashMap::new();
    for field in &model.fields {
        let item = match object.get(&field.alias) {
            Some(item) => item,
            None => continue,
        };
        let value = match (field.kind, item) {
            (FieldKind::Basic(kind), Json::Number(_)) => basic_from_json(kind, &field.alias, item)?,

            (FieldKind::Array(BasicKind::Char), Json::String(text)) if !text.is_empty() => Value::chars(text),
            (FieldKind::Array(BasicKind::Char), _) => continue,

            (FieldKind::Array(kind), Json::Array(items)) if !items.is_empty() => Value::Array(
                items
                    .iter()
                    .map(|item| basic_from_json(kind, &field.alias, item))
                    .collect::<Result<_, _>>()?,
            ),

            (FieldKind::Model(i), Json::Object(_)) => object_from_json(tree, i as usize, item)?,

            (FieldKind::ModelArray(i), Json::Array(items)) if !items.is_empty() => Value::Array(
                items
                    .iter()
                    .map(|item| object_from_json(tree, i as usize, item))
                    .collect::<Result<_, _>>()?,
            ),

            _ => continue,
        };
        fields.insert(field.alias.as_str(), value);
    }
    Ok(Value::Object(model.name.as_str(), fields))
}

fn basic_from_json<'a>(kind: BasicKind, alias: &str, item: &Json) -> Result<Value<'a>, KtvError> {
    let out_of_range = || KtvError::Json(format!("field {:?} expects a {} but found {}", alias, kind, item));
    let number = item.as_i64().ok_or_else(out_of_range)?;
    Ok(match kind {
        BasicKind::Char => Value::Char(u8::try_from(number).map_err(|_| out_of_range())?),
        BasicKind::Byte => Value::Byte(i8::try_from(number).map_err(|_| out_of_range())?),
        BasicKind::Int2 => Value::Int2(i16::try_from(number).map_err(|_| out_of_range())?),
        BasicKind::Int4 => Value::Int4(i32::try_from(number).map_err(|_| out_of_range())?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Tree {
        let compiled = ktv_compiler::compile_schema("#Point\nx int2\ny int2\nlabel *char\n#Path\npoints *Point\nstart Point").unwrap();
        Tree::decode(&compiled.bytes).unwrap()
    }

    #[test]
    fn test_value_to_json() {
        let value = Value::Object("Point", [
            ("x", Value::Int2(-3)),
            ("label", Value::chars("origin")),
        ].into_iter().collect());
        assert_eq!(value_to_json(&value), json!({ "x": -3, "label": "origin" }));
        assert_eq!(value_to_json(&Value::Array(vec![])), json!([]));
        assert_eq!(value_to_json(&Value::Array(vec![Value::Int4(1)])), json!([1]));

        // chars that aren't UTF-8 fall back to their byte values
        let bytes = Value::Array(vec![Value::Char(b'a'), Value::Char(0xFF)]);
        assert_eq!(value_to_json(&bytes), json!([97, 255]));
    }

    #[test]
    fn test_value_from_json() {
        let tree = tree();
        let value = value_from_json(&tree, "Path", &json!({
            "points": [{ "x": 1, "y": 2 }, { "x": -1, "label": "b" }],
            "start": { "y": 9 },
            "unknown": 5,
        }))
        .unwrap();

        let points = value.get("points").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].get("y"), Some(&Value::Int2(2)));
        assert_eq!(points[1].get("label").and_then(Value::as_chars).as_deref(), Some("b"));
        assert_eq!(value.get("start").unwrap().get("y"), Some(&Value::Int2(9)));
        assert_eq!(value.get("unknown"), None);
    }

    #[test]
    fn test_value_from_json_skips_mismatched_shapes() {
        let tree = tree();
        let value = value_from_json(&tree, "Point", &json!({ "x": "one", "y": [], "label": "" })).unwrap();
        assert_eq!(value, Value::Object("Point", HashMap::new()));

        let value = value_from_json(&tree, "Point", &json!({ "label": [104, 105] })).unwrap();
        assert_eq!(value.get("label"), None);
    }

    #[test]
    fn test_value_from_json_errors() {
        let tree = tree();
        assert!(matches!(value_from_json(&tree, "Nope", &json!({})), Err(KtvError::Json(_))));
        assert!(matches!(value_from_json(&tree, "Point", &json!([])), Err(KtvError::Json(_))));
        assert!(matches!(value_from_json(&tree, "Point", &json!({ "x": 40000 })), Err(KtvError::Json(_))));
        assert!(matches!(value_from_json(&tree, "Point", &json!({ "x": 1.5 })), Err(KtvError::Json(_))));
    }

    #[test]
    fn test_describe_to_json() {
        let compiled = ktv_compiler::compile_schema("#A\nb *A").unwrap();
        let text = describe_to_json(&compiled.bytes).unwrap();
        let json: Json = serde_json::from_str(&text).unwrap();
        assert_eq!(json, json!({
            "models": [{ "name": "A", "fields": [{ "alias": "b", "is_array": true, "type": "A" }] }],
        }));
    }
}
