//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - components(id, name, handle, instruction, hidden, sort_order, created_at)
//! - fields(id, component_id, label, name, type, required, placeholder, config, sort_order, created_at)
//! - field_values(id, content_item_id, field_id, value, instance_id, created_at)
//! - content_assignments(content_item_id, placements)
//! - schema_meta(key, value)

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, DbStats};
