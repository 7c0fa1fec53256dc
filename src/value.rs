//! Field values - raw stored values per content item, field and instance

use serde::{Deserialize, Serialize};

/// One stored raw value row.
///
/// Several rows may exist for the same (content item, field, instance);
/// readers take the one with the highest `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub id: i64,
    pub content_item_id: i64,
    pub field_id: i64,
    /// Placement instance this value belongs to, if any
    pub instance_id: Option<String>,
    /// Untyped text, possibly JSON-encoded
    pub value: String,
    pub created_at: String,
}

/// A value to be written by a bulk save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewValue {
    pub field_id: i64,
    pub instance_id: Option<String>,
    pub value: String,
}

impl NewValue {
    pub fn new(field_id: i64, value: impl Into<String>) -> Self {
        Self {
            field_id,
            instance_id: None,
            value: value.into(),
        }
    }

    /// Scope this value to a placement instance
    pub fn in_instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }
}
