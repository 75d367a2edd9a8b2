use crate::{
    bb::{ByteBuffer, ByteBufferMut},
    schema::{BasicKind, DecodeError, Field, FieldKind, Tree},
    MAX_DEPTH,
};

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::ops::Index;

/// This type holds dynamic KTV data.
///
/// Values can represent anything described by a [Tree](struct.Tree.html) and
/// can be converted to and from byte arrays using that tree. Model names and
/// field aliases are stored using string slices from the tree, so a Value can
/// outlive the buffer it was parsed from but can't outlive the tree.
#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Char(u8),
    Byte(i8),
    Int2(i16),
    Int4(i32),
    Array(Vec<Value<'a>>),
    Object(&'a str, HashMap<&'a str, Value<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    UnknownModel(String),
    NotAnObject,
    Mismatch { alias: String, expected: String },
    TooLarge { alias: String, len: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeError::UnknownModel(name) => write!(f, "model {:?} is not defined", name),
            EncodeError::NotAnObject => write!(f, "only objects can be encoded"),
            EncodeError::Mismatch { alias, expected } => {
                write!(f, "field {:?} expects a value of type {}", alias, expected)
            }
            EncodeError::TooLarge { alias, len } => {
                write!(f, "field {:?} is too large to encode ({} > {})", alias, len, u16::MAX)
            }
        }
    }
}

impl Error for EncodeError {}

impl<'a> Value<'a> {
    /// Builds a `char` array from the bytes of `text`.
    pub fn chars(text: &str) -> Value<'a> {
        Value::Array(text.bytes().map(Value::Char).collect())
    }

    /// A convenience method to extract the value out of a [Char](#variant.Char).
    /// Returns `0` for other value kinds.
    pub fn as_char(&self) -> u8 {
        match *self {
            Value::Char(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Byte](#variant.Byte).
    /// Returns `0` for other value kinds.
    pub fn as_byte(&self) -> i8 {
        match *self {
            Value::Byte(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of an [Int2](#variant.Int2).
    /// Returns `0` for other value kinds.
    pub fn as_int2(&self) -> i16 {
        match *self {
            Value::Int2(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of an [Int4](#variant.Int4).
    /// Returns `0` for other value kinds.
    pub fn as_int4(&self) -> i32 {
        match *self {
            Value::Int4(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to get an array of values out of an [Array](#variant.Array).
    /// Returns an empty array for other value kinds.
    pub fn as_array(&self) -> &[Value<'a>] {
        match *self {
            Value::Array(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// Reads an array of [Char](#variant.Char) values back into a string.
    /// The chars are taken as UTF-8 bytes, the inverse of [chars](#method.chars).
    /// Returns `None` if this isn't an array made only of chars or if the bytes
    /// aren't valid UTF-8.
    pub fn as_chars(&self) -> Option<String> {
        let bytes = match *self {
            Value::Array(ref values) => values
                .iter()
                .map(|value| match *value {
                    Value::Char(c) => Some(c),
                    _ => None,
                })
                .collect::<Option<Vec<u8>>>()?,
            _ => return None,
        };
        String::from_utf8(bytes).ok()
    }

    /// A convenience method to extract the length out of an [Array](#variant.Array).
    /// Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::Array(ref values) => values.len(),
            _ => 0,
        }
    }

    /// Returns `true` for empty arrays and for every non-array value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to an [Array](#variant.Array). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value<'a>) {
        if let Value::Array(ref mut values) = *self {
            values.push(value);
        }
    }

    /// A convenience method to extract a field out of an [Object](#variant.Object).
    /// Returns `None` for other value kinds or if the field isn't present.
    pub fn get(&self, alias: &str) -> Option<&Value<'a>> {
        match *self {
            Value::Object(_, ref fields) => fields.get(alias),
            _ => None,
        }
    }

    /// A convenience method to update a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn set(&mut self, alias: &'a str, value: Value<'a>) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.insert(alias, value);
        }
    }

    /// A convenience method to remove a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn remove(&mut self, alias: &'a str) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.remove(alias);
        }
    }

    /// Decodes an object of the model called `model` from `bytes`.
    ///
    /// Nested models may be at most [MAX_DEPTH](../constant.MAX_DEPTH.html)
    /// levels below the top-level object.
    pub fn decode(tree: &'a Tree, model: &str, bytes: &[u8]) -> Result<Value<'a>, DecodeError> {
        let index = tree
            .model_index(model)
            .ok_or_else(|| DecodeError::UnknownModel(model.to_string()))?;
        Value::decode_object(tree, index, bytes, 0)
    }

    /// Decodes an object of the model at `index` from `bytes`. Fields are read
    /// in declaration order until the buffer runs out; fields past that point
    /// are left absent.
    fn decode_object(tree: &'a Tree, index: usize, bytes: &[u8], depth: usize) -> Result<Value<'a>, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        let model = tree.models.get(index).ok_or(DecodeError::ModelIndexOutOfRange {
            index,
            count: tree.models.len(),
        })?;
        let mut bb = ByteBuffer::new(bytes);
        let mut fields = HashMap::new();
        for field in &model.fields {
            if bb.is_exhausted() {
                break;
            }
            if let Some(value) = Value::decode_field_bb(tree, field, &mut bb, depth)? {
                fields.insert(field.alias.as_str(), value);
            }
        }
        Ok(Value::Object(model.name.as_str(), fields))
    }

    /// Decodes the field specified by `field` from `bb` starting at the current
    /// index. Empty arrays decode to `None`, matching an unset field.
    fn decode_field_bb(
        tree: &'a Tree,
        field: &Field,
        bb: &mut ByteBuffer,
        depth: usize,
    ) -> Result<Option<Value<'a>>, DecodeError> {
        let truncated = |_| DecodeError::Truncated("field value");
        match field.kind {
            FieldKind::Basic(kind) => Ok(Some(Value::decode_basic_bb(kind, bb)?)),

            FieldKind::Array(kind) => {
                let count = bb.read_uint2().map_err(truncated)? as usize;
                if count == 0 {
                    return Ok(None);
                }
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(Value::decode_basic_bb(kind, bb)?);
                }
                Ok(Some(Value::Array(values)))
            }

            FieldKind::Model(index) => {
                let size = bb.read_uint2().map_err(truncated)? as usize;
                let bytes = bb.read_bytes(size).map_err(truncated)?;
                Ok(Some(Value::decode_object(tree, index as usize, bytes, depth + 1)?))
            }

            FieldKind::ModelArray(index) => {
                let count = bb.read_uint2().map_err(truncated)? as usize;
                if count == 0 {
                    return Ok(None);
                }
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    let size = bb.read_uint2().map_err(truncated)? as usize;
                    let bytes = bb.read_bytes(size).map_err(truncated)?;
                    values.push(Value::decode_object(tree, index as usize, bytes, depth + 1)?);
                }
                Ok(Some(Value::Array(values)))
            }
        }
    }

    fn decode_basic_bb(kind: BasicKind, bb: &mut ByteBuffer) -> Result<Value<'a>, DecodeError> {
        let truncated = |_| DecodeError::Truncated("field value");
        Ok(match kind {
            BasicKind::Char => Value::Char(bb.read_byte().map_err(truncated)?),
            BasicKind::Byte => Value::Byte(bb.read_byte().map_err(truncated)? as i8),
            BasicKind::Int2 => Value::Int2(bb.read_int2().map_err(truncated)?),
            BasicKind::Int4 => Value::Int4(bb.read_int4().map_err(truncated)?),
        })
    }

    /// Encodes this object into an array of bytes using the provided `tree`.
    pub fn encode(&self, tree: &Tree) -> Result<Vec<u8>, EncodeError> {
        let mut bb = ByteBufferMut::new();
        self.encode_bb(tree, &mut bb)?;
        Ok(bb.data())
    }

    /// Encodes this object to the end of `bb`. Fields are written in the
    /// declaration order of the model; unset fields are written as zero, or as
    /// an empty count/size for arrays and nested models.
    pub fn encode_bb(&self, tree: &Tree, bb: &mut ByteBufferMut) -> Result<(), EncodeError> {
        let (name, fields) = match *self {
            Value::Object(name, ref fields) => (name, fields),
            _ => return Err(EncodeError::NotAnObject),
        };
        let model = tree
            .model(name)
            .ok_or_else(|| EncodeError::UnknownModel(name.to_string()))?;

        for field in &model.fields {
            let value = fields.get(field.alias.as_str());
            let mismatch = || EncodeError::Mismatch {
                alias: field.alias.clone(),
                expected: tree.describe_kind(field.kind),
            };

            match (field.kind, value) {
                (FieldKind::Basic(kind), None) => bb.write_bytes(&[0; 4][..kind.width()]),
                (FieldKind::Basic(kind), Some(value)) => {
                    value.encode_basic_bb(kind, bb).ok_or_else(mismatch)?
                }

                (FieldKind::Array(_), None)
                | (FieldKind::Model(_), None)
                | (FieldKind::ModelArray(_), None) => bb.write_uint2(0),

                (FieldKind::Array(kind), Some(Value::Array(values))) => {
                    write_len(bb, &field.alias, values.len())?;
                    for value in values {
                        value.encode_basic_bb(kind, bb).ok_or_else(mismatch)?;
                    }
                }

                (FieldKind::Model(index), Some(value)) => {
                    value.encode_nested_bb(tree, index, &field.alias, bb, mismatch)?;
                }

                (FieldKind::ModelArray(index), Some(Value::Array(values))) => {
                    write_len(bb, &field.alias, values.len())?;
                    for value in values {
                        value.encode_nested_bb(tree, index, &field.alias, bb, mismatch)?;
                    }
                }

                (FieldKind::Array(_), Some(_)) | (FieldKind::ModelArray(_), Some(_)) => {
                    return Err(mismatch())
                }
            }
        }
        Ok(())
    }

    fn encode_basic_bb(&self, kind: BasicKind, bb: &mut ByteBufferMut) -> Option<()> {
        match (kind, self) {
            (BasicKind::Char, &Value::Char(value)) => bb.write_byte(value),
            (BasicKind::Byte, &Value::Byte(value)) => bb.write_byte(value as u8),
            (BasicKind::Int2, &Value::Int2(value)) => bb.write_int2(value),
            (BasicKind::Int4, &Value::Int4(value)) => bb.write_int4(value),
            _ => return None,
        }
        Some(())
    }

    fn encode_nested_bb(
        &self,
        tree: &Tree,
        index: u8,
        alias: &str,
        bb: &mut ByteBufferMut,
        mismatch: impl Fn() -> EncodeError,
    ) -> Result<(), EncodeError> {
        match *self {
            Value::Object(name, _) if name == tree.models[index as usize].name => {
                let mut nested = ByteBufferMut::new();
                self.encode_bb(tree, &mut nested)?;
                let bytes = nested.data();
                write_len(bb, alias, bytes.len())?;
                bb.write_bytes(&bytes);
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }
}

fn write_len(bb: &mut ByteBufferMut, alias: &str, len: usize) -> Result<(), EncodeError> {
    let len = u16::try_from(len).map_err(|_| EncodeError::TooLarge {
        alias: alias.to_string(),
        len,
    })?;
    bb.write_uint2(len);
    Ok(())
}

impl<'a> Index<usize> for Value<'a> {
    type Output = Value<'a>;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't an [Array](#variant.Array) or if the
    /// provided index is out of bounds.
    fn index(&self, index: usize) -> &Value<'a> {
        match *self {
            Value::Array(ref values) => &values[index],
            _ => panic!(),
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Char(value) => (value as char).fmt(f),
            Value::Byte(value) => value.fmt(f),
            Value::Int2(value) => value.fmt(f),
            Value::Int4(value) => value.fmt(f),
            Value::Array(ref values) => values.fmt(f),

            Value::Object(name, ref fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                let mut first = true;
                keys.sort();
                write!(f, "{} {{", name)?;

                for key in keys {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, fields[key])?;
                }

                write!(f, "}}")
            }
        }
    }
}
