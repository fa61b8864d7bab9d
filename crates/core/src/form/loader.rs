use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::form::definition::{
    FieldCondition, FieldDefinition, FieldType, FormDefinition, FormError, Requirement,
};
use crate::form::preset;

#[derive(Debug, Error)]
pub enum FormLoadError {
    #[error("could not read form file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse form definition: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("field `{0}` sets both `required_when` and `required_unless`")]
    ConflictingRule(String),
    #[error(transparent)]
    Invalid(#[from] FormError),
}

/// Loads the form at `path`, or the built-in admissions form when unset.
pub fn load(path: Option<&Path>) -> Result<FormDefinition, FormLoadError> {
    match path {
        Some(path) => load_file(path),
        None => Ok(preset::admissions()),
    }
}

pub fn load_file(path: &Path) -> Result<FormDefinition, FormLoadError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| FormLoadError::ReadFile { path: path.to_path_buf(), source })?;
    parse_form_toml(&raw)
}

pub fn parse_form_toml(raw: &str) -> Result<FormDefinition, FormLoadError> {
    let document = toml::from_str::<FormDocument>(raw)?;
    let fields = document
        .fields
        .into_iter()
        .map(FieldEntry::into_definition)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FormDefinition::new(fields)?)
}

#[derive(Debug, Deserialize)]
struct FormDocument {
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type", default)]
    field_type: Option<String>,
    #[serde(default)]
    description: String,
    required_when: Option<FieldCondition>,
    required_unless: Option<FieldCondition>,
    skip_fill: Option<String>,
}

impl FieldEntry {
    fn into_definition(self) -> Result<FieldDefinition, FormLoadError> {
        let requirement = match (self.required_when, self.required_unless) {
            (Some(_), Some(_)) => return Err(FormLoadError::ConflictingRule(self.name)),
            (Some(condition), None) => Requirement::When(condition),
            (None, Some(condition)) => Requirement::Unless(condition),
            (None, None) => Requirement::Always,
        };

        Ok(FieldDefinition {
            name: self.name.trim().to_string(),
            field_type: self
                .field_type
                .as_deref()
                .map(FieldType::parse_lenient)
                .unwrap_or_default(),
            description: self.description,
            requirement,
            skip_fill: self.skip_fill,
        })
    }
}
