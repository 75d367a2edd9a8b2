use std::collections::HashMap;
use ktv_schema::{BasicKind, MAX_COUNT};
use crate::{
    error::ValidationError,
    types::Schema,
    utils::is_valid_name,
};

/// Model name to declaration index, collected before any field type is
/// resolved so that forward references work.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelIndex<'s> {
    names:    Vec<&'s str>,
    by_name:  HashMap<&'s str, u8>,
}

impl<'s> ModelIndex<'s> {
    pub fn get(&self, name: &str) -> Option<u8> {
        self.by_name.get(name).copied()
    }

    /// Model names in declaration order.
    pub fn names(&self) -> &[&'s str] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Checks every model-level rule and returns the name table. Field-level rules
/// (alias uniqueness, type resolution) are checked by the encoder.
pub fn verify_schema(schema: &Schema) -> Result<ModelIndex<'_>, ValidationError> {
    let mut names: Vec<&str> = Vec::with_capacity(schema.models.len());

    for model in &schema.models {
        let name = model.name.as_str();
        if !is_valid_name(name) {
            return Err(ValidationError::InvalidName(name.to_string()));
        }
        if BasicKind::from_keyword(name).is_some() {
            return Err(ValidationError::ReservedName(name.to_string()));
        }
        if names.contains(&name) {
            return Err(ValidationError::DuplicateModel(name.to_string()));
        }
        if model.fields.is_empty() {
            return Err(ValidationError::EmptyModel(name.to_string()));
        }
        if model.fields.len() > MAX_COUNT {
            return Err(ValidationError::TooManyFields {
                model: name.to_string(),
                count: model.fields.len(),
            });
        }
        names.push(name);
    }

    if names.len() > MAX_COUNT {
        return Err(ValidationError::TooManyModels(names.len()));
    }

    let by_name = names
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, i as u8))
        .collect();
    Ok(ModelIndex { names, by_name })
}
