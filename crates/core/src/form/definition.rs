use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::form::record::DataRecord;

/// Semantic datatype tag. Used as a hint in prompts and listings, never enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Email,
    Url,
    Text,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Email => "email",
            Self::Url => "url",
            Self::Text => "text",
        }
    }

    /// Unknown or empty tags fall back to `string`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "email" => Self::Email,
            "url" => Self::Url,
            "text" => Self::Text,
            _ => Self::String,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: String,
    pub equals: String,
}

impl FieldCondition {
    pub fn new(field: impl Into<String>, equals: impl Into<String>) -> Self {
        Self { field: field.into(), equals: equals.into() }
    }

    /// Trimmed, case-insensitive comparison. An absent field never matches.
    pub fn matches(&self, record: &DataRecord) -> bool {
        record
            .get(&self.field)
            .map(|value| value.trim().eq_ignore_ascii_case(self.equals.trim()))
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    Always,
    When(FieldCondition),
    Unless(FieldCondition),
}

impl Requirement {
    pub fn is_required(&self, record: &DataRecord) -> bool {
        match self {
            Self::Always => true,
            Self::When(condition) => condition.matches(record),
            Self::Unless(condition) => !condition.matches(record),
        }
    }

    pub fn condition(&self) -> Option<&FieldCondition> {
        match self {
            Self::Always => None,
            Self::When(condition) | Self::Unless(condition) => Some(condition),
        }
    }

    /// Short human-readable rule, used in prompts and CLI output.
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Always => None,
            Self::When(condition) => {
                Some(format!("only when {} is '{}'", condition.field, condition.equals))
            }
            Self::Unless(condition) => {
                Some(format!("skip when {} is '{}'", condition.field, condition.equals))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
    pub requirement: Requirement,
    /// Written into the record when the requirement skips this field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_fill: Option<String>,
}

impl FieldDefinition {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: description.into(),
            requirement: Requirement::Always,
            skip_fill: None,
        }
    }

    pub fn required_when(mut self, field: impl Into<String>, equals: impl Into<String>) -> Self {
        self.requirement = Requirement::When(FieldCondition::new(field, equals));
        self
    }

    pub fn required_unless(mut self, field: impl Into<String>, equals: impl Into<String>) -> Self {
        self.requirement = Requirement::Unless(FieldCondition::new(field, equals));
        self
    }

    pub fn with_skip_fill(mut self, sentinel: impl Into<String>) -> Self {
        self.skip_fill = Some(sentinel.into());
        self
    }

    pub fn is_required(&self, record: &DataRecord) -> bool {
        self.requirement.is_required(record)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("a form needs at least one field")]
    Empty,
    #[error("field #{index} has an empty name")]
    EmptyName { index: usize },
    #[error("field `{0}` is defined more than once")]
    DuplicateName(String),
    #[error("field `{field}` depends on unknown field `{references}`")]
    UnknownConditionField { field: String, references: String },
    #[error("field `{0}` cannot depend on itself")]
    SelfReference(String),
}

/// Ordered, validated list of fields. Order is the asking priority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormDefinition {
    fields: Vec<FieldDefinition>,
}

impl FormDefinition {
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, FormError> {
        validate_fields(&fields)?;
        Ok(Self { fields })
    }

    pub(crate) fn from_trusted(fields: Vec<FieldDefinition>) -> Self {
        debug_assert!(validate_fields(&fields).is_ok());
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn validate_fields(fields: &[FieldDefinition]) -> Result<(), FormError> {
    if fields.is_empty() {
        return Err(FormError::Empty);
    }

    let mut seen = BTreeSet::new();
    for (index, field) in fields.iter().enumerate() {
        if field.name.trim().is_empty() {
            return Err(FormError::EmptyName { index });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(FormError::DuplicateName(field.name.clone()));
        }
    }

    for field in fields {
        let Some(condition) = field.requirement.condition() else {
            continue;
        };
        if condition.field == field.name {
            return Err(FormError::SelfReference(field.name.clone()));
        }
        if !seen.contains(condition.field.as_str()) {
            return Err(FormError::UnknownConditionField {
                field: field.name.clone(),
                references: condition.field.clone(),
            });
        }
    }

    Ok(())
}
