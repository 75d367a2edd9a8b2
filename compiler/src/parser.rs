use crate::{
    error::{KtvError, SyntaxError},
    types::{FieldDecl, FieldType, ModelDecl, Schema},
    utils::is_valid_name,
};

const PREFIX_MODEL:   char = '#';
const PREFIX_ARRAY:   char = '*';
const COMMENT_MARKER: &str = "//";

/// What a single non-blank line declares.
#[derive(Debug, PartialEq)]
enum Line {
    Model(String),
    Field(FieldDecl),
}

/// Parse schema text, one declaration per line.
pub fn parse_schema(text: &str) -> Result<Schema, KtvError> {
    parse_lines(text.lines())
}

/// Parse an ordered sequence of schema lines into models in encounter order.
///
/// Only syntax is checked here. Duplicate models, empty models and unknown
/// types are all left for `verify_schema`. Field lines seen before the first
/// model header are checked and then dropped.
pub fn parse_lines<I, S>(lines: I) -> Result<Schema, KtvError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut models  = Vec::new();
    let mut current: Option<ModelDecl> = None;

    for (line_no, line) in lines.into_iter().enumerate() {
        let parsed = parse_line(line.as_ref()).map_err(|cause| KtvError::Syntax {
            line: line_no,
            cause,
        })?;

        match parsed {
            None => continue,
            Some(Line::Model(name)) => {
                if let Some(model) = current.take() {
                    models.push(model);
                }
                current = Some(ModelDecl { name, fields: Vec::new() });
            }
            Some(Line::Field(field)) => {
                if let Some(model) = current.as_mut() {
                    model.fields.push(field);
                }
            }
        }
    }

    if let Some(model) = current {
        models.push(model);
    }
    Ok(Schema { models })
}

/// Removes a trailing `//` comment. A marker at the very start of the line is
/// left alone here; such lines are whole-line comments.
fn strip_comment(line: &str) -> &str {
    match line.find(COMMENT_MARKER) {
        Some(index) if index > 0 => &line[..index],
        _ => line,
    }
}

fn parse_line(raw: &str) -> Result<Option<Line>, SyntaxError> {
    let line = strip_comment(raw);
    if line.trim_start().starts_with(COMMENT_MARKER) {
        return Ok(None);
    }
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some(name) = line.strip_prefix(PREFIX_MODEL) {
        if name.is_empty() {
            return Err(SyntaxError::EmptyModelName);
        }
        if !is_valid_name(name) {
            return Err(SyntaxError::InvalidModelName(name.to_string()));
        }
        return Ok(Some(Line::Model(name.to_string())));
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (alias, type_spec) = match tokens.as_slice() {
        [alias, type_spec] => (*alias, *type_spec),
        _ => return Err(SyntaxError::FieldTokenCount(tokens.len())),
    };
    if !is_valid_name(alias) {
        return Err(SyntaxError::InvalidAlias(alias.to_string()));
    }

    let (is_array, type_name) = match type_spec.strip_prefix(PREFIX_ARRAY) {
        Some(rest) => (true, rest),
        None       => (false, type_spec),
    };

    Ok(Some(Line::Field(FieldDecl {
        alias: alias.to_string(),
        is_array,
        type_: FieldType::from_name(type_name),
    })))
}
