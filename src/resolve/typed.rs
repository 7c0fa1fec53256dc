//! Resolved value shapes

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One resolved repeater row, or one component instance: field name to value
pub type Record = BTreeMap<String, TypedValue>;

/// A resolved field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    /// text, textarea, color, select, radio, video, wysiwyg, image URLs
    Text(String),
    /// toggle
    Bool(bool),
    /// checkbox
    List(Vec<String>),
    /// page_link, taxonomy_term
    Reference(i64),
    /// image objects, and undecodable values passed through as-is
    Json(Value),
    /// repeater
    Rows(Vec<Record>),
}

impl TypedValue {
    pub fn text(s: impl Into<String>) -> Self {
        TypedValue::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            TypedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<i64> {
        match self {
            TypedValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Record]> {
        match self {
            TypedValue::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Render as a JSON document
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Text(s.to_string())
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Bool(b)
    }
}

impl From<i64> for TypedValue {
    fn from(id: i64) -> Self {
        TypedValue::Reference(id)
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Text(s) => write!(f, "{}", s),
            TypedValue::Bool(b) => write!(f, "{}", b),
            TypedValue::List(items) => write!(f, "{}", items.join(", ")),
            TypedValue::Reference(id) => write!(f, "#{}", id),
            other => write!(f, "{}", other.to_json()),
        }
    }
}
