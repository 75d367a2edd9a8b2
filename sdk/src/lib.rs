//! ktv
//!
//! This crate provides runtime support for working with KTV descriptors and
//! the data buffers they describe.
//!
//! - The compiler entry points (re-exported from `ktv-compiler`)
//! - The descriptor tree and dynamic `Value` codec (re-exported from `ktv-schema`)
//! - JSON conversion for descriptors and values

pub mod json;

pub use ktv_compiler::{compile_lines, compile_schema, decode_binary_schema, encode_binary_schema, Compiled};
pub use ktv_compiler::error::KtvError;
pub use ktv_schema::{Tree, Model, Field, FieldKind, BasicKind, Value};
pub use json::{describe_to_json, value_from_json, value_to_json};

/// Decode an object of `model` from a data buffer.
pub fn decode_value<'a>(tree: &'a Tree, model: &str, buffer: &[u8]) -> Result<Value<'a>, KtvError> {
    Value::decode(tree, model, buffer).map_err(|e| KtvError::Decode(e.to_string()))
}

/// Encode an object into a data buffer.
pub fn encode_value(tree: &Tree, value: &Value) -> Result<Vec<u8>, KtvError> {
    value.encode(tree).map_err(|e| KtvError::Encode(e.to_string()))
}

/// Build the runtime tree from a compiled descriptor.
pub fn load_tree(descriptor: &[u8]) -> Result<Tree, KtvError> {
    Tree::decode(descriptor).map_err(|e| KtvError::Decode(e.to_string()))
}

pub mod error {
    pub use ktv_compiler::error::{KtvError, SyntaxError, ValidationError};
}

pub mod schema {
    pub use ktv_schema::{Tree, Model, Field, FieldKind, BasicKind, Value};
}
