//! Type Resolution Engine
//!
//! Turns a raw stored value plus its field type and configuration into a
//! typed value. Resolution is pure: it reads no store and never fails.
//! Every type has an "absent" form used when nothing is stored, and every
//! malformed input has a fallback.
//!
//! Repeater fields resolve recursively through the nested field definitions
//! declared in their configuration, to any depth.

pub mod resolver;
pub mod sanitize;
pub mod typed;

pub use resolver::Resolver;
pub use sanitize::{AllowListSanitizer, Sanitizer};
pub use typed::{Record, TypedValue};

use crate::field::{FieldConfig, FieldType};

/// Resolve a stored value with the default sanitizer.
pub fn resolve(raw: Option<&str>, field_type: FieldType, config: &FieldConfig) -> TypedValue {
    Resolver::new().resolve(raw, field_type, config)
}
