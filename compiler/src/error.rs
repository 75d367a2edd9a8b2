use thiserror::Error;

#[derive(Debug, Error)]
pub enum KtvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at line {line}: {cause}")]
    Syntax {
        line:  usize,
        cause: SyntaxError,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("JSON error: {0}")]
    Json(String),
}

/// Line-local problems found while parsing schema text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("model name is empty")]
    EmptyModelName,

    #[error("model name {0:?} should be alphanumeric")]
    InvalidModelName(String),

    #[error("field definition should be `alias type`, found {0} tokens")]
    FieldTokenCount(usize),

    #[error("field alias {0:?} should be alphanumeric")]
    InvalidAlias(String),
}

/// Schema-wide problems found while verifying and encoding. These carry no
/// line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name {0:?} should be ASCII alphanumeric, start with a letter and be shorter than 255")]
    InvalidName(String),

    #[error("model {0:?} is reserved")]
    ReservedName(String),

    #[error("model {0:?} is defined twice")]
    DuplicateModel(String),

    #[error("model {0:?} has no fields")]
    EmptyModel(String),

    #[error("model {model:?} has {count} fields (max 255)")]
    TooManyFields {
        model: String,
        count: usize,
    },

    #[error("schema has {0} models (max 255)")]
    TooManyModels(usize),

    #[error("model {model:?} defines field {alias:?} twice")]
    DuplicateAlias {
        model: String,
        alias: String,
    },

    #[error("model {model:?} field {alias:?} has undefined type {type_name:?}")]
    UndefinedType {
        model:     String,
        alias:     String,
        type_name: String,
    },
}
