use ktv_schema::BasicKind;
use serde::{Serialize, Serializer};
use std::fmt;

/// A parsed schema: models in declaration order. The position of a model in
/// `models` is the index other models use to reference it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub models: Vec<ModelDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDecl {
    pub name:   String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub alias:    String,
    pub is_array: bool,
    #[serde(rename = "type")]
    pub type_:    FieldType,
}

/// The element type of a field. Model references stay unresolved names until
/// encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Basic(BasicKind),
    ModelRef(String),
}

impl FieldType {
    /// Classifies a raw type name: basic keywords become `Basic`, anything
    /// else is taken to be a model name.
    pub fn from_name(name: &str) -> FieldType {
        match BasicKind::from_keyword(name) {
            Some(kind) => FieldType::Basic(kind),
            None       => FieldType::ModelRef(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldType::Basic(kind)    => kind.keyword(),
            FieldType::ModelRef(name) => name,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
