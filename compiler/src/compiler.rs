use std::collections::HashSet;
use ktv_schema::{BasicKind, ByteBufferMut, FieldKind, Tree};
use crate::{
    types::{FieldDecl, FieldType, ModelDecl, Schema},
    verifier::{verify_schema, ModelIndex},
    parser::{parse_lines, parse_schema},
    error::{KtvError, ValidationError},
    utils::is_valid_name,
};

/// Everything one compilation produces. `model_runs` holds the bytes of each
/// model in declaration order; `bytes` is the count byte followed by all runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub schema:     Schema,
    pub model_runs: Vec<Vec<u8>>,
    pub bytes:      Vec<u8>,
}

/// Compile schema text into a binary descriptor.
/// Returns `Err(KtvError)` if parsing or validation fails; nothing is encoded
/// in that case.
pub fn compile_schema(text: &str) -> Result<Compiled, KtvError> {
    compile(parse_schema(text)?)
}

/// Same as [`compile_schema`] for input that is already split into lines.
pub fn compile_lines<I, S>(lines: I) -> Result<Compiled, KtvError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    compile(parse_lines(lines)?)
}

fn compile(schema: Schema) -> Result<Compiled, KtvError> {
    let model_runs = encode_model_runs(&schema)?;
    let bytes = join_model_runs(&model_runs);
    Ok(Compiled { schema, model_runs, bytes })
}

/// Encode a `Schema` into descriptor bytes.
pub fn encode_binary_schema(schema: &Schema) -> Result<Vec<u8>, KtvError> {
    let model_runs = encode_model_runs(schema)?;
    Ok(join_model_runs(&model_runs))
}

fn join_model_runs(model_runs: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + model_runs.iter().map(Vec::len).sum::<usize>());
    // verify_schema caps the count at 255.
    bytes.push(model_runs.len() as u8);
    for run in model_runs {
        bytes.extend_from_slice(run);
    }
    bytes
}

/// Validate the schema and encode each model separately.
///
/// Runs in two passes: `verify_schema` first collects every model name, then
/// each field is resolved against that table. A reference to a model declared
/// later in the text is therefore as valid as one to an earlier model.
pub fn encode_model_runs(schema: &Schema) -> Result<Vec<Vec<u8>>, ValidationError> {
    let index = verify_schema(schema)?;
    schema
        .models
        .iter()
        .map(|model| encode_model(model, &index))
        .collect()
}

fn encode_model(model: &ModelDecl, index: &ModelIndex) -> Result<Vec<u8>, ValidationError> {
    let mut bb = ByteBufferMut::new();
    write_name(&mut bb, &model.name)?;
    // verify_schema caps the field count at 255.
    bb.write_byte(model.fields.len() as u8);

    let mut aliases = HashSet::new();
    for field in &model.fields {
        if !aliases.insert(field.alias.as_str()) {
            return Err(ValidationError::DuplicateAlias {
                model: model.name.clone(),
                alias: field.alias.clone(),
            });
        }
        write_name(&mut bb, &field.alias)?;
        bb.write_bytes(&resolve_field(model, field, index)?.to_bytes());
    }
    Ok(bb.data())
}

fn write_name(bb: &mut ByteBufferMut, name: &str) -> Result<(), ValidationError> {
    if !is_valid_name(name) {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    bb.write_short_bytes(name.as_bytes())
        .map_err(|_| ValidationError::InvalidName(name.to_string()))
}

/// What a field's type name points at once resolved.
enum Target {
    Basic(BasicKind),
    Model(u8),
}

fn resolve_field(model: &ModelDecl, field: &FieldDecl, index: &ModelIndex) -> Result<FieldKind, ValidationError> {
    let target = match &field.type_ {
        FieldType::Basic(kind) => Target::Basic(*kind),
        FieldType::ModelRef(name) => match index.get(name) {
            Some(i) => Target::Model(i),
            None => {
                return Err(ValidationError::UndefinedType {
                    model:     model.name.clone(),
                    alias:     field.alias.clone(),
                    type_name: name.clone(),
                })
            }
        },
    };

    Ok(match (target, field.is_array) {
        (Target::Basic(kind), false) => FieldKind::Basic(kind),
        (Target::Basic(kind), true)  => FieldKind::Array(kind),
        (Target::Model(i), false)    => FieldKind::Model(i),
        (Target::Model(i), true)     => FieldKind::ModelArray(i),
    })
}

/// Decode a binary descriptor back into a `Schema`, turning model indices back
/// into model names.
/// Returns `Err(KtvError::Decode)` on truncated or malformed input.
pub fn decode_binary_schema(buffer: &[u8]) -> Result<Schema, KtvError> {
    let tree = Tree::decode(buffer).map_err(|e| KtvError::Decode(e.to_string()))?;
    Ok(schema_from_tree(&tree))
}

/// Rebuild declarations from a runtime tree. The tree guarantees every model
/// index is in range.
pub fn schema_from_tree(tree: &Tree) -> Schema {
    let model_name = |i: u8| tree.models[i as usize].name.clone();
    let models = tree
        .models
        .iter()
        .map(|model| ModelDecl {
            name:   model.name.clone(),
            fields: model
                .fields
                .iter()
                .map(|field| {
                    let (is_array, type_) = match field.kind {
                        FieldKind::Basic(kind)   => (false, FieldType::Basic(kind)),
                        FieldKind::Array(kind)   => (true, FieldType::Basic(kind)),
                        FieldKind::Model(i)      => (false, FieldType::ModelRef(model_name(i))),
                        FieldKind::ModelArray(i) => (true, FieldType::ModelRef(model_name(i))),
                    };
                    FieldDecl { alias: field.alias.clone(), is_array, type_ }
                })
                .collect(),
        })
        .collect();
    Schema { models }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_GROUP: &str = "#User\nid int4\ntags *char\n#Group\nowner User\nmembers *User\n";

    fn validation_error(text: &str) -> ValidationError {
        match compile_schema(text) {
            Err(KtvError::Validation(err)) => err,
            other => panic!("expected a validation error but got {:?}", other),
        }
    }

    #[test]
    fn test_encode_user_group() {
        let compiled = compile_schema(USER_GROUP).unwrap();
        assert_eq!(compiled.bytes, [
            0x02,
            0x04, b'U', b's', b'e', b'r', 0x02,
            0x02, b'i', b'd', 0x04, 0x00,
            0x04, b't', b'a', b'g', b's', 0x10, 0x01,
            0x05, b'G', b'r', b'o', b'u', b'p', 0x02,
            0x05, b'o', b'w', b'n', b'e', b'r', 0x11, 0x00,
            0x07, b'm', b'e', b'm', b'b', b'e', b'r', b's', 0x12, 0x00,
        ]);
        assert_eq!(compiled.model_runs.len(), 2);
        assert_eq!(compiled.model_runs[1][..6], [0x05, b'G', b'r', b'o', b'u', b'p']);
    }

    #[test]
    fn test_encode_type_table() {
        let compiled = compile_schema(
            "#T\na char\nb byte\nc int2\nd int4\ne *byte\nf *int2\ng *int4\nh T\ni *T",
        )
        .unwrap();
        let index = verify_schema(&compiled.schema).unwrap();
        let model = &compiled.schema.models[0];
        let type_bytes: Vec<[u8; 2]> = model
            .fields
            .iter()
            .map(|field| resolve_field(model, field, &index).unwrap().to_bytes())
            .collect();
        assert_eq!(type_bytes, [
            [0x01, 0x00], [0x02, 0x00], [0x03, 0x00], [0x04, 0x00],
            [0x10, 0x02], [0x10, 0x03], [0x10, 0x04],
            [0x11, 0x00], [0x12, 0x00],
        ]);
    }

    #[test]
    fn test_encode_forward_reference() {
        let compiled = compile_schema("#A\nb B\nbs *B\n#B\nx byte").unwrap();
        // a model's run ends with the type bytes of its last field
        let run = &compiled.model_runs[0];
        assert_eq!(run[run.len() - 2..], [0x12, 0x01]);
        assert_eq!(run[..8], [0x01, b'A', 0x02, 0x01, b'b', 0x11, 0x01, 0x02]);
    }

    #[test]
    fn test_encode_self_reference() {
        let compiled = compile_schema("#Node\nvalue int4\nnext Node\nkids *Node").unwrap();
        assert_eq!(compiled.bytes[compiled.bytes.len() - 2..], [0x12, 0x00]);
    }

    #[test]
    fn test_encode_duplicate_alias() {
        assert_eq!(
            validation_error("#A\nx byte\n#B\ny byte\ny int4"),
            ValidationError::DuplicateAlias { model: "B".into(), alias: "y".into() }
        );
        // aliases only need to be unique within a model
        assert!(compile_schema("#A\nx byte\n#B\nx byte").is_ok());
    }

    #[test]
    fn test_encode_undefined_type() {
        assert_eq!(
            validation_error("#A\nx Missing"),
            ValidationError::UndefinedType {
                model:     "A".into(),
                alias:     "x".into(),
                type_name: "Missing".into(),
            }
        );
        assert_eq!(
            validation_error("#A\nx *"),
            ValidationError::UndefinedType { model: "A".into(), alias: "x".into(), type_name: "".into() }
        );
        // type names are case sensitive
        assert!(matches!(validation_error("#A\nx INT4"), ValidationError::UndefinedType { .. }));
    }

    #[test]
    fn test_encode_256th_model() {
        let mut text = String::new();
        for i in 0..256 {
            text.push_str(&format!("#M{}\nx byte\n", i));
        }
        assert_eq!(validation_error(&text), ValidationError::TooManyModels(256));
    }

    #[test]
    fn test_encode_empty_schema() {
        assert_eq!(compile_schema("// nothing here").unwrap().bytes, [0x00]);
    }

    #[test]
    fn test_encode_rejects_invalid_alias_in_built_schema() {
        let schema = Schema {
            models: vec![ModelDecl {
                name:   "A".into(),
                fields: vec![FieldDecl {
                    alias:    "naïve".into(),
                    is_array: false,
                    type_:    FieldType::Basic(BasicKind::Byte),
                }],
            }],
        };
        assert!(matches!(
            encode_binary_schema(&schema),
            Err(KtvError::Validation(ValidationError::InvalidName(name))) if name == "naïve"
        ));
    }

    #[test]
    fn test_syntax_errors_surface_from_compile() {
        assert!(matches!(compile_schema("#A\nx"), Err(KtvError::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_decode_round_trip() {
        let compiled = compile_schema(USER_GROUP).unwrap();
        let decoded = decode_binary_schema(&compiled.bytes).unwrap();
        assert_eq!(decoded, compiled.schema);
        assert_eq!(encode_binary_schema(&decoded).unwrap(), compiled.bytes);
    }

    #[test]
    fn test_decode_errors() {
        let compiled = compile_schema(USER_GROUP).unwrap();
        let truncated = &compiled.bytes[..compiled.bytes.len() - 1];
        assert!(matches!(decode_binary_schema(truncated), Err(KtvError::Decode(_))));
        assert!(matches!(decode_binary_schema(&[]), Err(KtvError::Decode(_))));

        // #A / x B  with index 5 out of range
        let bad_index = [0x01, 0x01, b'A', 0x01, 0x01, b'x', 0x11, 0x05];
        assert!(matches!(decode_binary_schema(&bad_index), Err(KtvError::Decode(_))));

        let bad_tag = [0x01, 0x01, b'A', 0x01, 0x01, b'x', 0x07, 0x00];
        assert!(matches!(decode_binary_schema(&bad_tag), Err(KtvError::Decode(_))));
    }
}
