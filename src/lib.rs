//! # Fieldstore - reusable content components
//!
//! Users define named components, each a bag of typed fields, place one or
//! more component instances on a content item, and fill in per-item values
//! that are resolved back into typed data at render time.
//!
//! Fieldstore provides:
//! - Schema store for components and their typed field definitions
//! - Value store with "latest row wins" lookup per content item, field and instance
//! - A pure type resolution engine, including recursive repeater fields
//! - An ordered placement ledger per content item
//! - SQLite-backed storage, a CLI and a read-only JSON render API

pub mod component;
pub mod field;
pub mod value;
pub mod placement;
pub mod storage;
pub mod resolve;
pub mod render;
pub mod scaffold;
pub mod authoring;
pub mod server;
pub mod ui;
pub mod output;
pub mod config;

// Re-exports for convenient access
pub use component::{Component, ComponentUpdate, NewComponent};
pub use field::{Field, FieldConfig, FieldType, FieldUpdate, NewField};
pub use value::{FieldValue, NewValue};
pub use placement::Placement;
pub use resolve::{resolve, Resolver, TypedValue};
pub use render::Renderer;
pub use storage::SqliteStore;

/// Result type alias for Fieldstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Fieldstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("A component with handle '{0}' already exists")]
    DuplicateHandle(String),

    #[error("Component {component_id} already has a field named '{name}'")]
    DuplicateFieldName { component_id: i64, name: String },

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Unknown field: {0}")]
    UnknownField(i64),

    #[error("Unsupported field type: {0}")]
    UnsupportedType(String),

    #[error("Invalid handle '{0}': use lowercase letters, digits, '_' or '-'")]
    InvalidHandle(String),

    #[error("Content item {content_item_id} has no placement '{instance_id}'")]
    UnknownPlacement {
        content_item_id: i64,
        instance_id: String,
    },

    #[error("Saving values for content item {content_item_id} failed; previous values were kept")]
    PartialBulkSave {
        content_item_id: i64,
        #[source]
        source: Box<Error>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
