//! Per-type field configuration
//!
//! Configuration is optional metadata stored as JSON text next to the field.
//! Reads are fail-open: malformed or missing configuration degrades to the
//! type's default instead of raising an error.

use super::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// What an image field resolves to when its stored value is an object.
///
/// A missing `return_type` key means `url`. Any other tag is kept as
/// `Other`, and values of such fields resolve to their raw text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReturnType {
    #[default]
    Url,
    Array,
    Other(String),
}

impl ReturnType {
    pub fn as_str(&self) -> &str {
        match self {
            ReturnType::Url => "url",
            ReturnType::Array => "array",
            ReturnType::Other(tag) => tag,
        }
    }
}

impl From<&str> for ReturnType {
    fn from(tag: &str) -> Self {
        match tag {
            "url" => ReturnType::Url,
            "array" => ReturnType::Array,
            other => ReturnType::Other(other.to_string()),
        }
    }
}

impl Serialize for ReturnType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReturnType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(tag) => ReturnType::from(tag.as_str()),
            other => ReturnType::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub return_type: ReturnType,
}

/// One sub-field of a repeater row.
///
/// The type is kept as the raw tag so that definitions written by other
/// tools survive a round trip even when the tag is not a known kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
}

impl NestedField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type: field_type.as_str().to_string(),
            config: Value::Null,
        }
    }

    /// Attach a configuration to this nested field
    pub fn with_config(mut self, config: &FieldConfig) -> Self {
        self.config = config.to_value();
        self
    }

    /// The parsed kind, or `None` for an unrecognised tag
    pub fn kind(&self) -> Option<FieldType> {
        FieldType::from_str(&self.field_type).ok()
    }

    /// The nested configuration interpreted for this field's kind
    pub fn parsed_config(&self) -> FieldConfig {
        match self.kind() {
            Some(kind) => FieldConfig::from_value(kind, &self.config),
            None => FieldConfig::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RepeaterConfig {
    pub nested_fields: Vec<NestedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChoiceConfig {
    #[serde(default)]
    pub choices: Vec<String>,
}

/// Configuration variants, one per field kind that has any.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldConfig {
    #[default]
    None,
    Image(ImageConfig),
    Repeater(RepeaterConfig),
    Choices(ChoiceConfig),
}

impl FieldConfig {
    /// The configuration a new field of this kind starts with
    pub fn default_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Image => FieldConfig::Image(ImageConfig::default()),
            FieldType::Repeater => FieldConfig::Repeater(RepeaterConfig::default()),
            t if t.has_choices() => FieldConfig::Choices(ChoiceConfig::default()),
            _ => FieldConfig::None,
        }
    }

    /// Parse stored configuration text for a field of the given kind.
    pub fn parse(field_type: FieldType, text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default_for(field_type);
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(field_type, &value),
            Err(e) => {
                tracing::warn!("Ignoring malformed {} field configuration: {}", field_type, e);
                Self::default_for(field_type)
            }
        }
    }

    /// Interpret an already-decoded configuration document.
    pub fn from_value(field_type: FieldType, value: &Value) -> Self {
        match field_type {
            FieldType::Image => FieldConfig::Image(
                serde_json::from_value(value.clone()).unwrap_or_default(),
            ),
            FieldType::Repeater => FieldConfig::Repeater(RepeaterConfig {
                nested_fields: parse_nested_fields(value),
            }),
            t if t.has_choices() => FieldConfig::Choices(
                serde_json::from_value(value.clone()).unwrap_or_default(),
            ),
            _ => FieldConfig::None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            FieldConfig::None => Value::Object(Default::default()),
            FieldConfig::Image(c) => serde_json::to_value(c).unwrap_or(Value::Null),
            FieldConfig::Repeater(c) => serde_json::json!({ "nested_fields": c.nested_fields }),
            FieldConfig::Choices(c) => serde_json::to_value(c).unwrap_or(Value::Null),
        }
    }

    /// Serialized form stored in the `fields.config` column
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn return_type(&self) -> ReturnType {
        match self {
            FieldConfig::Image(c) => c.return_type.clone(),
            _ => ReturnType::default(),
        }
    }

    pub fn nested_fields(&self) -> &[NestedField] {
        match self {
            FieldConfig::Repeater(c) => &c.nested_fields,
            _ => &[],
        }
    }
}

impl Serialize for FieldConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

// Entries that do not describe a nested field are skipped one by one so a
// single bad definition does not hide its siblings.
fn parse_nested_fields(value: &Value) -> Vec<NestedField> {
    let Some(entries) = value.get("nested_fields").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<NestedField>(entry.clone()) {
            Ok(nested) => Some(nested),
            Err(e) => {
                tracing::warn!("Skipping malformed nested field definition: {}", e);
                None
            }
        })
        .collect()
}
