//! Fields - typed slots inside a component's schema
//!
//! Every field carries one of a fixed set of type tags:
//! - plain text kinds: `text`, `textarea`, `color`, `select`, `radio`
//! - `toggle` (boolean), `checkbox` (list of strings)
//! - `wysiwyg` (sanitized HTML)
//! - `page_link`, `taxonomy_term` (integer references)
//! - `image` (object or URL), `video`
//! - `repeater` (list of rows described by nested field definitions)

pub mod config;

pub use config::{ChoiceConfig, FieldConfig, ImageConfig, NestedField, RepeaterConfig, ReturnType};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Image,
    Repeater,
    Color,
    Select,
    Checkbox,
    Radio,
    Toggle,
    Wysiwyg,
    PageLink,
    TaxonomyTerm,
    Video,
}

impl FieldType {
    /// Get the stored tag for this field type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Image => "image",
            FieldType::Repeater => "repeater",
            FieldType::Color => "color",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Toggle => "toggle",
            FieldType::Wysiwyg => "wysiwyg",
            FieldType::PageLink => "page_link",
            FieldType::TaxonomyTerm => "taxonomy_term",
            FieldType::Video => "video",
        }
    }

    /// Get all field types
    pub fn all() -> &'static [FieldType] {
        &[
            FieldType::Text,
            FieldType::Textarea,
            FieldType::Image,
            FieldType::Repeater,
            FieldType::Color,
            FieldType::Select,
            FieldType::Checkbox,
            FieldType::Radio,
            FieldType::Toggle,
            FieldType::Wysiwyg,
            FieldType::PageLink,
            FieldType::TaxonomyTerm,
            FieldType::Video,
        ]
    }

    /// Whether the field offers a fixed list of choices
    pub fn has_choices(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Checkbox | FieldType::Radio)
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnsupportedType(s.to_string()))
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored field definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub id: i64,
    pub component_id: i64,
    /// Label shown to authors
    pub label: String,
    /// Machine name, unique within the component
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub config: FieldConfig,
    pub order: i64,
    pub created_at: String,
}

/// Input for creating a field.
#[derive(Debug, Clone)]
pub struct NewField {
    pub component_id: i64,
    pub label: String,
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub config: FieldConfig,
    pub order: i64,
}

impl NewField {
    pub fn new(
        component_id: i64,
        label: impl Into<String>,
        name: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        Self {
            component_id,
            label: label.into(),
            name: name.into(),
            field_type,
            required: false,
            placeholder: None,
            config: FieldConfig::default_for(field_type),
            order: 0,
        }
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Partial update for a field. The type tag is fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct FieldUpdate {
    pub label: Option<String>,
    pub name: Option<String>,
    pub required: Option<bool>,
    pub placeholder: Option<Option<String>>,
    pub config: Option<FieldConfig>,
    pub order: Option<i64>,
}
