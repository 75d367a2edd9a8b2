use crate::{
    bb::ByteBuffer,
    TYPE_ARRAY, TYPE_BYTE, TYPE_CHAR, TYPE_INT2, TYPE_INT4, TYPE_MODEL, TYPE_MODEL_ARRAY,
};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// One of the four fixed primitive kinds. The keyword of each kind is
/// reserved and can never be used as a model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Char,
    Byte,
    Int2,
    Int4,
}

impl BasicKind {
    pub const ALL: [BasicKind; 4] = [BasicKind::Char, BasicKind::Byte, BasicKind::Int2, BasicKind::Int4];

    pub fn keyword(self) -> &'static str {
        match self {
            BasicKind::Char => "char",
            BasicKind::Byte => "byte",
            BasicKind::Int2 => "int2",
            BasicKind::Int4 => "int4",
        }
    }

    pub fn from_keyword(text: &str) -> Option<BasicKind> {
        BasicKind::ALL.iter().copied().find(|kind| kind.keyword() == text)
    }

    pub fn tag(self) -> u8 {
        match self {
            BasicKind::Char => TYPE_CHAR,
            BasicKind::Byte => TYPE_BYTE,
            BasicKind::Int2 => TYPE_INT2,
            BasicKind::Int4 => TYPE_INT4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<BasicKind> {
        BasicKind::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    /// Number of bytes a single value of this kind occupies in a data buffer.
    pub fn width(self) -> usize {
        match self {
            BasicKind::Char | BasicKind::Byte => 1,
            BasicKind::Int2 => 2,
            BasicKind::Int4 => 4,
        }
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The resolved type of a field, as stored in the two type bytes of a
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Basic(BasicKind),
    Array(BasicKind),
    Model(u8),
    ModelArray(u8),
}

impl FieldKind {
    /// Splits the kind into its `(tag, param)` byte pair.
    pub fn to_bytes(self) -> [u8; 2] {
        match self {
            FieldKind::Basic(kind) => [kind.tag(), 0x00],
            FieldKind::Array(kind) => [TYPE_ARRAY, kind.tag()],
            FieldKind::Model(index) => [TYPE_MODEL, index],
            FieldKind::ModelArray(index) => [TYPE_MODEL_ARRAY, index],
        }
    }

    /// Rebuilds a kind from its `(tag, param)` byte pair. Model indices are not
    /// range-checked here.
    pub fn from_bytes(tag: u8, param: u8) -> Result<FieldKind, DecodeError> {
        match tag {
            TYPE_ARRAY => BasicKind::from_tag(param)
                .map(FieldKind::Array)
                .ok_or(DecodeError::UnknownTag(param)),
            TYPE_MODEL => Ok(FieldKind::Model(param)),
            TYPE_MODEL_ARRAY => Ok(FieldKind::ModelArray(param)),
            _ => match BasicKind::from_tag(tag) {
                Some(kind) if param == 0 => Ok(FieldKind::Basic(kind)),
                Some(_) => Err(DecodeError::UnexpectedParam { tag, param }),
                None => Err(DecodeError::UnknownTag(tag)),
            },
        }
    }

    /// Index of the referenced model, if any.
    pub fn model_index(self) -> Option<usize> {
        match self {
            FieldKind::Model(index) | FieldKind::ModelArray(index) => Some(index as usize),
            FieldKind::Basic(_) | FieldKind::Array(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    Truncated(&'static str),
    UnknownTag(u8),
    UnexpectedParam { tag: u8, param: u8 },
    ModelIndexOutOfRange { index: usize, count: usize },
    NonAsciiName(Vec<u8>),
    TrailingBytes(usize),
    UnknownModel(String),
    DuplicateModel(String),
    TooDeep(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Truncated(what) => write!(f, "buffer ends while reading {}", what),
            DecodeError::UnknownTag(tag) => write!(f, "unknown type tag 0x{:02x}", tag),
            DecodeError::UnexpectedParam { tag, param } => {
                write!(f, "type tag 0x{:02x} does not take param 0x{:02x}", tag, param)
            }
            DecodeError::ModelIndexOutOfRange { index, count } => {
                write!(f, "model index {} out of range for {} models", index, count)
            }
            DecodeError::NonAsciiName(bytes) => write!(f, "identifier {:?} is not ASCII", bytes),
            DecodeError::TrailingBytes(count) => write!(f, "{} trailing bytes after last model", count),
            DecodeError::UnknownModel(name) => write!(f, "model {:?} is not defined", name),
            DecodeError::DuplicateModel(name) => write!(f, "model {:?} is defined more than once", name),
            DecodeError::TooDeep(limit) => write!(f, "models are nested more than {} levels deep", limit),
        }
    }
}

impl Error for DecodeError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub fields: Vec<Field>,
    alias_to_index: HashMap<String, usize>,
}

impl Model {
    pub fn new(name: String, fields: Vec<Field>) -> Model {
        let alias_to_index = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.alias.clone(), i))
            .collect();
        Model { name, fields, alias_to_index }
    }

    pub fn field_index(&self, alias: &str) -> Option<usize> {
        self.alias_to_index.get(alias).copied()
    }

    pub fn field(&self, alias: &str) -> Option<&Field> {
        self.field_index(alias).map(|i| &self.fields[i])
    }
}

/// The runtime model tree described by a compiled descriptor. Model order is
/// the declaration order of the schema, and model references are indices into
/// `models`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub models: Vec<Model>,
    name_to_index: HashMap<String, usize>,
}

impl Tree {
    /// Builds a tree and checks that model names are unique and every model
    /// reference resolves.
    pub fn new(models: Vec<Model>) -> Result<Tree, DecodeError> {
        let count = models.len();
        for field in models.iter().flat_map(|model| &model.fields) {
            if let Some(index) = field.kind.model_index() {
                if index >= count {
                    return Err(DecodeError::ModelIndexOutOfRange { index, count });
                }
            }
        }
        let mut name_to_index = HashMap::with_capacity(count);
        for (i, model) in models.iter().enumerate() {
            if name_to_index.insert(model.name.clone(), i).is_some() {
                return Err(DecodeError::DuplicateModel(model.name.clone()));
            }
        }
        Ok(Tree { models, name_to_index })
    }

    /// Parses a descriptor produced by the compiler.
    pub fn decode(bytes: &[u8]) -> Result<Tree, DecodeError> {
        let mut bb = ByteBuffer::new(bytes);
        let model_count = bb.read_byte().map_err(|_| DecodeError::Truncated("model count"))?;
        let mut models = Vec::with_capacity(model_count as usize);

        for _ in 0..model_count {
            let name = read_ascii(&mut bb, "model name")?;
            let field_count = bb.read_byte().map_err(|_| DecodeError::Truncated("field count"))?;
            let mut fields = Vec::with_capacity(field_count as usize);
            for _ in 0..field_count {
                let alias = read_ascii(&mut bb, "field alias")?;
                let tag = bb.read_byte().map_err(|_| DecodeError::Truncated("type tag"))?;
                let param = bb.read_byte().map_err(|_| DecodeError::Truncated("type param"))?;
                fields.push(Field { alias, kind: FieldKind::from_bytes(tag, param)? });
            }
            models.push(Model::new(name, fields));
        }

        if !bb.is_exhausted() {
            return Err(DecodeError::TrailingBytes(bytes.len() - bb.index()));
        }
        Tree::new(models)
    }

    pub fn model_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.model_index(name).map(|i| &self.models[i])
    }

    /// Renders a field kind using model names instead of indices.
    pub fn describe_kind(&self, kind: FieldKind) -> String {
        let model_name = |index: u8| {
            self.models
                .get(index as usize)
                .map(|model| model.name.as_str())
                .unwrap_or("?")
        };
        match kind {
            FieldKind::Basic(basic) => basic.to_string(),
            FieldKind::Array(basic) => format!("*{}", basic),
            FieldKind::Model(index) => model_name(index).to_string(),
            FieldKind::ModelArray(index) => format!("*{}", model_name(index)),
        }
    }
}

fn read_ascii(bb: &mut ByteBuffer, what: &'static str) -> Result<String, DecodeError> {
    let bytes = bb.read_short_bytes().map_err(|_| DecodeError::Truncated(what))?;
    if !bytes.is_ascii() {
        return Err(DecodeError::NonAsciiName(bytes.to_vec()));
    }
    Ok(bytes.iter().map(|&b| b as char).collect())
}

/// Prints the tree in schema syntax, one model header per block.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, model) in self.models.iter().enumerate() {
            writeln!(f, "#{} // [{}]", model.name, i)?;
            for field in &model.fields {
                let [tag, param] = field.kind.to_bytes();
                writeln!(
                    f,
                    "{} {} // 0x{:02x} 0x{:02x}",
                    field.alias,
                    self.describe_kind(field.kind),
                    tag,
                    param
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // #User / id int4 / tags *char / #Group / owner User / members *User
    const USER_GROUP: [u8; 45] = [
        0x02, 0x04, 0x55, 0x73, 0x65, 0x72, 0x02, 0x02, 0x69, 0x64, 0x04, 0x00, 0x04, 0x74, 0x61,
        0x67, 0x73, 0x10, 0x01, 0x05, 0x47, 0x72, 0x6f, 0x75, 0x70, 0x02, 0x05, 0x6f, 0x77, 0x6e,
        0x65, 0x72, 0x11, 0x00, 0x07, 0x6d, 0x65, 0x6d, 0x62, 0x65, 0x72, 0x73, 0x12, 0x00, 0x00,
    ];

    fn user_group() -> &'static [u8] {
        &USER_GROUP[..44]
    }

    #[test]
    fn decode_tree() {
        let tree = Tree::decode(user_group()).unwrap();
        assert_eq!(tree.models.len(), 2);
        assert_eq!(tree.model_index("Group"), Some(1));
        assert_eq!(tree.model_index("Nope"), None);

        let user = tree.model("User").unwrap();
        assert_eq!(user.fields[0], Field { alias: "id".into(), kind: FieldKind::Basic(BasicKind::Int4) });
        assert_eq!(user.fields[1].kind, FieldKind::Array(BasicKind::Char));

        let group = &tree.models[1];
        assert_eq!(group.field("owner").unwrap().kind, FieldKind::Model(0));
        assert_eq!(group.field_index("members"), Some(1));
        assert_eq!(group.fields[1].kind, FieldKind::ModelArray(0));
    }

    #[test]
    fn decode_tree_rejects_trailing_bytes() {
        assert_eq!(Tree::decode(&USER_GROUP), Err(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn decode_tree_rejects_truncation() {
        for len in 0..user_group().len() {
            let err = Tree::decode(&user_group()[..len]).unwrap_err();
            assert!(matches!(err, DecodeError::Truncated(_)), "len {}: {:?}", len, err);
        }
    }

    #[test]
    fn decode_tree_rejects_bad_reference() {
        // #A / b B  where index 1 does not exist
        let bytes = [1, 1, b'A', 1, 1, b'b', TYPE_MODEL, 1];
        assert_eq!(
            Tree::decode(&bytes),
            Err(DecodeError::ModelIndexOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn decode_tree_rejects_duplicate_model() {
        // #A / x byte / #A / y byte
        let bytes = [2, 1, b'A', 1, 1, b'x', 2, 0, 1, b'A', 1, 1, b'y', 2, 0];
        assert_eq!(Tree::decode(&bytes), Err(DecodeError::DuplicateModel("A".into())));
    }

    #[test]
    fn field_kind_bytes() {
        assert_eq!(FieldKind::from_bytes(0x04, 0x00), Ok(FieldKind::Basic(BasicKind::Int4)));
        assert_eq!(FieldKind::from_bytes(0x10, 0x03), Ok(FieldKind::Array(BasicKind::Int2)));
        assert_eq!(FieldKind::from_bytes(0x10, 0x11), Err(DecodeError::UnknownTag(0x11)));
        assert_eq!(
            FieldKind::from_bytes(0x02, 0x01),
            Err(DecodeError::UnexpectedParam { tag: 0x02, param: 0x01 })
        );
        assert_eq!(FieldKind::from_bytes(0x20, 0x00), Err(DecodeError::UnknownTag(0x20)));
        assert_eq!(FieldKind::ModelArray(7).to_bytes(), [0x12, 7]);
    }

    #[test]
    fn basic_keywords() {
        assert_eq!(BasicKind::from_keyword("int2"), Some(BasicKind::Int2));
        assert_eq!(BasicKind::from_keyword("Int2"), None);
        assert_eq!(BasicKind::Char.width(), 1);
        assert_eq!(BasicKind::Int4.width(), 4);
    }

    #[test]
    fn display_tree() {
        let tree = Tree::decode(user_group()).unwrap();
        let expected = "\
#User // [0]
id int4 // 0x04 0x00
tags *char // 0x10 0x01
#Group // [1]
owner User // 0x11 0x00
members *User // 0x12 0x00
";
        assert_eq!(tree.to_string(), expected);
    }
}
