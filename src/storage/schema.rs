//! Database schema definitions

/// Version recorded in `schema_meta` by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Key under which the schema version is stored
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Enforce the cascades declared below; SQLite leaves them off per connection
pub const ENABLE_FOREIGN_KEYS: &str = "PRAGMA foreign_keys = ON";

/// SQL to create the components table
pub const CREATE_COMPONENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    handle TEXT NOT NULL UNIQUE,
    instruction TEXT,
    hidden INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
)
"#;

/// SQL to create the fields table
pub const CREATE_FIELDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    component_id INTEGER NOT NULL REFERENCES components(id) ON DELETE CASCADE,
    label TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    placeholder TEXT,
    config TEXT NOT NULL DEFAULT '{}',
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    UNIQUE(name, component_id)
)
"#;

/// SQL to create the field_values table
/// AUTOINCREMENT keeps ids strictly increasing, which "latest wins" relies on
pub const CREATE_FIELD_VALUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS field_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_item_id INTEGER NOT NULL,
    field_id INTEGER NOT NULL REFERENCES fields(id) ON DELETE CASCADE,
    value TEXT NOT NULL,
    instance_id TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
)
"#;

/// SQL to create the content_assignments table
/// One JSON-encoded placement list per content item
pub const CREATE_CONTENT_ASSIGNMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS content_assignments (
    content_item_id INTEGER PRIMARY KEY,
    placements TEXT NOT NULL DEFAULT '[]'
)
"#;

/// SQL to create the schema_meta table
pub const CREATE_SCHEMA_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_values_item_field ON field_values(content_item_id, field_id)",
    "CREATE INDEX IF NOT EXISTS idx_values_field ON field_values(field_id)",
    "CREATE INDEX IF NOT EXISTS idx_fields_component ON fields(component_id)",
    "CREATE INDEX IF NOT EXISTS idx_components_handle ON components(handle)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_COMPONENTS_TABLE,
        CREATE_FIELDS_TABLE,
        CREATE_FIELD_VALUES_TABLE,
        CREATE_CONTENT_ASSIGNMENTS_TABLE,
        CREATE_SCHEMA_META_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
