//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params, OptionalExtension};
use crate::{Result, Error};
use crate::component::{Component, ComponentUpdate, NewComponent, validate_handle};
use crate::field::{Field, FieldConfig, FieldType, FieldUpdate, NewField};
use crate::placement::{self, Placement};
use crate::value::{FieldValue, NewValue};
use super::schema;

const COMPONENT_COLUMNS: &str = "id, name, handle, instruction, hidden, sort_order, created_at";
const FIELD_COLUMNS: &str =
    "id, component_id, label, name, type, required, placeholder, config, sort_order, created_at";
const VALUE_COLUMNS: &str = "id, content_item_id, field_id, value, instance_id, created_at";

/// SQLite-backed storage for component schemas, field values and placements
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::ENABLE_FOREIGN_KEYS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_meta (key, value) VALUES (?1, ?2)",
            params![schema::SCHEMA_VERSION_KEY, schema::SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Schema version recorded in the database, if any
    pub fn schema_version(&self) -> Result<Option<u32>> {
        let raw: Option<String> = self.conn
            .query_row(
                "SELECT value FROM schema_meta WHERE key = ?1",
                [schema::SCHEMA_VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|v| v.parse().ok()))
    }

    // ========== Component Operations ==========

    /// Create a component. Fails with `DuplicateHandle` if the handle is taken.
    pub fn insert_component(&self, new: &NewComponent) -> Result<Component> {
        let handle = new.resolved_handle()?;
        if self.get_component_by_handle(&handle)?.is_some() {
            return Err(Error::DuplicateHandle(handle));
        }

        self.conn
            .execute(
                r#"
                INSERT INTO components (name, handle, instruction, hidden, sort_order)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![new.name, handle, new.instruction, new.hidden, new.order],
            )
            .map_err(|e| unique_violation(e, || Error::DuplicateHandle(handle.clone())))?;

        let id = self.conn.last_insert_rowid();
        tracing::info!("Created component '{}' (id {})", handle, id);
        self.require_component(id)
    }

    /// Get a component by id
    pub fn get_component(&self, id: i64) -> Result<Option<Component>> {
        self.conn
            .query_row(
                &format!("SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?1"),
                [id],
                |row| self.row_to_component(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a component by its handle
    pub fn get_component_by_handle(&self, handle: &str) -> Result<Option<Component>> {
        self.conn
            .query_row(
                &format!("SELECT {COMPONENT_COLUMNS} FROM components WHERE handle = ?1"),
                [handle],
                |row| self.row_to_component(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a component by id, failing with `UnknownComponent`
    pub fn require_component(&self, id: i64) -> Result<Component> {
        self.get_component(id)?
            .ok_or_else(|| Error::UnknownComponent(id.to_string()))
    }

    /// List components by display order, then creation time
    pub fn list_components(&self) -> Result<Vec<Component>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components ORDER BY sort_order, created_at, id"
        ))?;

        let components = stmt
            .query_map([], |row| self.row_to_component(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(components)
    }

    /// Update a component in place
    pub fn update_component(&self, id: i64, update: &ComponentUpdate) -> Result<Component> {
        let mut component = self.require_component(id)?;

        if let Some(handle) = &update.handle {
            validate_handle(handle)?;
            if handle != &component.handle && self.get_component_by_handle(handle)?.is_some() {
                return Err(Error::DuplicateHandle(handle.clone()));
            }
            component.handle = handle.clone();
        }
        if let Some(name) = &update.name {
            component.name = name.clone();
        }
        if let Some(instruction) = &update.instruction {
            component.instruction = instruction.clone();
        }
        if let Some(hidden) = update.hidden {
            component.hidden = hidden;
        }
        if let Some(order) = update.order {
            component.order = order;
        }

        self.conn
            .execute(
                r#"
                UPDATE components
                SET name = ?2, handle = ?3, instruction = ?4, hidden = ?5, sort_order = ?6
                WHERE id = ?1
                "#,
                params![
                    id,
                    component.name,
                    component.handle,
                    component.instruction,
                    component.hidden,
                    component.order,
                ],
            )
            .map_err(|e| unique_violation(e, || Error::DuplicateHandle(component.handle.clone())))?;

        Ok(component)
    }

    /// Delete a component. Its fields, and their values, go with it.
    pub fn delete_component(&self, id: i64) -> Result<Component> {
        let component = self.require_component(id)?;
        self.conn.execute("DELETE FROM components WHERE id = ?1", [id])?;
        tracing::info!("Deleted component '{}' (id {})", component.handle, id);
        Ok(component)
    }

    /// Count all components
    pub fn count_components(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM components", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a Component
    fn row_to_component(&self, row: &rusqlite::Row) -> rusqlite::Result<Component> {
        Ok(Component {
            id: row.get(0)?,
            name: row.get(1)?,
            handle: row.get(2)?,
            instruction: row.get(3)?,
            hidden: row.get(4)?,
            order: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // ========== Field Operations ==========

    /// Create a field inside an existing component
    pub fn insert_field(&self, new: &NewField) -> Result<Field> {
        self.require_component(new.component_id)?;
        if self.find_field_by_name(new.component_id, &new.name)?.is_some() {
            return Err(Error::DuplicateFieldName {
                component_id: new.component_id,
                name: new.name.clone(),
            });
        }
        warn_unknown_nested_types(&new.name, &new.config);

        self.conn
            .execute(
                r#"
                INSERT INTO fields (component_id, label, name, type, required, placeholder, config, sort_order)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    new.component_id,
                    new.label,
                    new.name,
                    new.field_type.as_str(),
                    new.required,
                    new.placeholder,
                    new.config.to_json(),
                    new.order,
                ],
            )
            .map_err(|e| {
                unique_violation(e, || Error::DuplicateFieldName {
                    component_id: new.component_id,
                    name: new.name.clone(),
                })
            })?;

        let id = self.conn.last_insert_rowid();
        tracing::info!("Created {} field '{}' (id {}) on component {}", new.field_type, new.name, id, new.component_id);
        self.require_field(id)
    }

    /// Get a field by id
    pub fn get_field(&self, id: i64) -> Result<Option<Field>> {
        self.conn
            .query_row(
                &format!("SELECT {FIELD_COLUMNS} FROM fields WHERE id = ?1"),
                [id],
                |row| self.row_to_field(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a field by id, failing with `UnknownField`
    pub fn require_field(&self, id: i64) -> Result<Field> {
        self.get_field(id)?.ok_or(Error::UnknownField(id))
    }

    /// Find a field by machine name within a component
    pub fn find_field_by_name(&self, component_id: i64, name: &str) -> Result<Option<Field>> {
        self.conn
            .query_row(
                &format!("SELECT {FIELD_COLUMNS} FROM fields WHERE component_id = ?1 AND name = ?2"),
                params![component_id, name],
                |row| self.row_to_field(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Fields of a component, by field order then creation time.
    ///
    /// Rows carrying a type tag this build does not know are skipped.
    pub fn find_fields_of_component(&self, component_id: i64) -> Result<Vec<Field>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FIELD_COLUMNS} FROM fields WHERE component_id = ?1 ORDER BY sort_order, created_at, id"
        ))?;

        let fields = stmt
            .query_map([component_id], |row| self.row_to_field(row))?
            .filter_map(|r| match r {
                Ok(field) => Some(field),
                Err(e) => {
                    tracing::warn!("Skipping unreadable field on component {}: {}", component_id, e);
                    None
                }
            })
            .collect();

        Ok(fields)
    }

    /// Update a field in place
    pub fn update_field(&self, id: i64, update: &FieldUpdate) -> Result<Field> {
        let mut field = self.require_field(id)?;

        if let Some(name) = &update.name {
            if name != &field.name && self.find_field_by_name(field.component_id, name)?.is_some() {
                return Err(Error::DuplicateFieldName {
                    component_id: field.component_id,
                    name: name.clone(),
                });
            }
            field.name = name.clone();
        }
        if let Some(label) = &update.label {
            field.label = label.clone();
        }
        if let Some(required) = update.required {
            field.required = required;
        }
        if let Some(placeholder) = &update.placeholder {
            field.placeholder = placeholder.clone();
        }
        if let Some(config) = &update.config {
            warn_unknown_nested_types(&field.name, config);
            field.config = config.clone();
        }
        if let Some(order) = update.order {
            field.order = order;
        }

        self.conn
            .execute(
                r#"
                UPDATE fields
                SET label = ?2, name = ?3, required = ?4, placeholder = ?5, config = ?6, sort_order = ?7
                WHERE id = ?1
                "#,
                params![
                    id,
                    field.label,
                    field.name,
                    field.required,
                    field.placeholder,
                    field.config.to_json(),
                    field.order,
                ],
            )
            .map_err(|e| {
                unique_violation(e, || Error::DuplicateFieldName {
                    component_id: field.component_id,
                    name: field.name.clone(),
                })
            })?;

        Ok(field)
    }

    /// Delete a field. Its stored values are removed by the foreign key cascade.
    pub fn delete_field(&self, id: i64) -> Result<Field> {
        let field = self.require_field(id)?;
        self.conn.execute("DELETE FROM fields WHERE id = ?1", [id])?;
        tracing::info!("Deleted field '{}' (id {})", field.name, id);
        Ok(field)
    }

    /// Count all fields
    pub fn count_fields(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM fields", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a Field
    fn row_to_field(&self, row: &rusqlite::Row) -> rusqlite::Result<Field> {
        let type_str: String = row.get(4)?;
        let field_type: FieldType = type_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let config_str: String = row.get(7)?;

        Ok(Field {
            id: row.get(0)?,
            component_id: row.get(1)?,
            label: row.get(2)?,
            name: row.get(3)?,
            field_type,
            required: row.get(5)?,
            placeholder: row.get(6)?,
            config: FieldConfig::parse(field_type, &config_str),
            order: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    // ========== Value Operations ==========

    /// Replace every stored value of a content item with `values`.
    ///
    /// Runs in one transaction: if any insert fails, the previous values are
    /// kept and `PartialBulkSave` is returned. Empty values are dropped.
    /// Returns the number of rows written.
    pub fn save_values<I>(&self, content_item_id: i64, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = NewValue>,
    {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM field_values WHERE content_item_id = ?1", [content_item_id])?;
        let written = insert_values(&tx, content_item_id, values)?;
        tx.commit()?;

        tracing::info!("Saved {} values for content item {}", written, content_item_id);
        Ok(written)
    }

    /// Replace the values of one placement instance of a content item.
    ///
    /// Every value is scoped to `instance_id` (`None` addresses the unscoped
    /// rows). Rows of other instances are left untouched. Same transaction
    /// and error rules as [`SqliteStore::save_values`].
    pub fn save_instance_values<I>(
        &self,
        content_item_id: i64,
        instance_id: Option<&str>,
        values: I,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = NewValue>,
    {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM field_values WHERE content_item_id = ?1 AND instance_id IS ?2",
            params![content_item_id, instance_id],
        )?;
        let scoped = values.into_iter().map(|value| NewValue {
            instance_id: instance_id.map(str::to_string),
            ..value
        });
        let written = insert_values(&tx, content_item_id, scoped)?;
        tx.commit()?;

        tracing::info!(
            "Saved {} values for content item {} instance {}",
            written, content_item_id, instance_id.unwrap_or("-")
        );
        Ok(written)
    }

    /// Latest raw value for a content item and field.
    ///
    /// With `instance_id`, only rows of that instance are candidates. The row
    /// with the highest id wins.
    pub fn latest_value(
        &self,
        content_item_id: i64,
        field_id: i64,
        instance_id: Option<&str>,
    ) -> Result<Option<String>> {
        let result = match instance_id {
            Some(instance) => self.conn.query_row(
                r#"
                SELECT value FROM field_values
                WHERE content_item_id = ?1 AND field_id = ?2 AND instance_id = ?3
                ORDER BY id DESC LIMIT 1
                "#,
                params![content_item_id, field_id, instance],
                |row| row.get(0),
            ),
            None => self.conn.query_row(
                r#"
                SELECT value FROM field_values
                WHERE content_item_id = ?1 AND field_id = ?2
                ORDER BY id DESC LIMIT 1
                "#,
                params![content_item_id, field_id],
                |row| row.get(0),
            ),
        };

        result.optional().map_err(Into::into)
    }

    /// Append one value row without clearing anything
    pub fn insert_value(&self, content_item_id: i64, value: &NewValue) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO field_values (content_item_id, field_id, value, instance_id) VALUES (?1, ?2, ?3, ?4)",
            params![content_item_id, value.field_id, value.value, value.instance_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All stored rows of a content item, in insertion order
    pub fn values_of_content_item(&self, content_item_id: i64) -> Result<Vec<FieldValue>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VALUE_COLUMNS} FROM field_values WHERE content_item_id = ?1 ORDER BY id"
        ))?;

        let values = stmt
            .query_map([content_item_id], |row| self.row_to_value(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(values)
    }

    /// Remove every stored value of a content item
    pub fn delete_values_of_content_item(&self, content_item_id: i64) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM field_values WHERE content_item_id = ?1",
            [content_item_id],
        )?;
        Ok(removed)
    }

    /// Count stored values belonging to any field of a component
    pub fn count_values_of_component(&self, component_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM field_values v
            JOIN fields f ON f.id = v.field_id
            WHERE f.component_id = ?1
            "#,
            [component_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Count stored values referencing any of the given field ids
    pub fn count_values_of_fields(&self, field_ids: &[i64]) -> Result<usize> {
        if field_ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; field_ids.len()].join(", ");
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM field_values WHERE field_id IN ({placeholders})"),
            rusqlite::params_from_iter(field_ids),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Count all stored values
    pub fn count_values(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM field_values", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a FieldValue
    fn row_to_value(&self, row: &rusqlite::Row) -> rusqlite::Result<FieldValue> {
        Ok(FieldValue {
            id: row.get(0)?,
            content_item_id: row.get(1)?,
            field_id: row.get(2)?,
            value: row.get(3)?,
            instance_id: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    // ========== Placement Operations ==========

    /// Stored placement list of a content item, in list order.
    ///
    /// A list that cannot be decoded reads as empty.
    pub fn get_placements(&self, content_item_id: i64) -> Result<Vec<Placement>> {
        let raw: Option<String> = self.conn
            .query_row(
                "SELECT placements FROM content_assignments WHERE content_item_id = ?1",
                [content_item_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(list) => Ok(list),
            Err(e) => {
                tracing::warn!("Ignoring malformed placement list of content item {}: {}", content_item_id, e);
                Ok(Vec::new())
            }
        }
    }

    /// Replace the placement list of a content item
    pub fn set_placements(&self, content_item_id: i64, placements: &[Placement]) -> Result<()> {
        let encoded = serde_json::to_string(placements)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO content_assignments (content_item_id, placements) VALUES (?1, ?2)",
            params![content_item_id, encoded],
        )?;
        Ok(())
    }

    /// Placements of a content item sorted by `order`, ties in list order
    pub fn assigned_components(&self, content_item_id: i64) -> Result<Vec<Placement>> {
        let mut placements = self.get_placements(content_item_id)?;
        placement::sort_placements(&mut placements);
        Ok(placements)
    }

    /// Append a new instance of a component to a content item
    pub fn assign_component(&self, content_item_id: i64, component_id: i64, order: i64) -> Result<Placement> {
        self.require_component(component_id)?;

        let mut placements = self.get_placements(content_item_id)?;
        let instance_id = placement::new_instance_id(content_item_id, component_id, &placements);
        let entry = Placement::new(component_id, instance_id, order);
        placements.push(entry.clone());
        self.set_placements(content_item_id, &placements)?;

        tracing::debug!("Placed component {} on content item {} at order {}", component_id, content_item_id, order);
        Ok(entry)
    }

    /// Remove one placement. Values stored under its instance are left alone.
    pub fn unassign(&self, content_item_id: i64, instance_id: &str) -> Result<Placement> {
        let mut placements = self.get_placements(content_item_id)?;
        let index = placements
            .iter()
            .position(|p| p.instance_id.as_deref() == Some(instance_id))
            .ok_or_else(|| Error::UnknownPlacement {
                content_item_id,
                instance_id: instance_id.to_string(),
            })?;

        let removed = placements.remove(index);
        self.set_placements(content_item_id, &placements)?;
        Ok(removed)
    }

    /// Forget every placement of a content item
    pub fn clear_placements(&self, content_item_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM content_assignments WHERE content_item_id = ?1",
            [content_item_id],
        )?;
        Ok(())
    }

    // ========== Content Item Operations ==========

    /// Drop everything stored for a content item (values and placements)
    pub fn delete_content_item(&self, content_item_id: i64) -> Result<()> {
        let removed = self.delete_values_of_content_item(content_item_id)?;
        self.clear_placements(content_item_id)?;
        tracing::info!("Deleted content item {} ({} values)", content_item_id, removed);
        Ok(())
    }

    /// Count content items that have values or placements
    pub fn count_content_items(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT content_item_id FROM field_values
                UNION
                SELECT content_item_id FROM content_assignments
            )
            "#,
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            components: self.count_components()?,
            fields: self.count_fields()?,
            values: self.count_values()?,
            content_items: self.count_content_items()?,
        })
    }
}

// A racing writer can slip past the up-front duplicate check; the UNIQUE
// constraint still catches it and is reported as the same typed error.
fn unique_violation(err: rusqlite::Error, typed: impl FnOnce() -> Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            typed()
        }
        _ => err.into(),
    }
}

/// Insert `values` inside an open transaction, skipping empty ones.
fn insert_values<I>(conn: &Connection, content_item_id: i64, values: I) -> Result<usize>
where
    I: IntoIterator<Item = NewValue>,
{
    let mut stmt = conn.prepare(
        "INSERT INTO field_values (content_item_id, field_id, value, instance_id) VALUES (?1, ?2, ?3, ?4)",
    )?;

    let mut written = 0;
    for value in values {
        if value.value.is_empty() {
            continue;
        }
        stmt.execute(params![content_item_id, value.field_id, value.value, value.instance_id])
            .map_err(|e| Error::PartialBulkSave {
                content_item_id,
                source: Box::new(e.into()),
            })?;
        written += 1;
    }
    Ok(written)
}

fn warn_unknown_nested_types(field_name: &str, config: &FieldConfig) {
    for nested in config.nested_fields() {
        match nested.kind() {
            None => tracing::warn!(
                "Nested field '{}' of '{}' has unsupported type '{}'; its values will pass through unresolved",
                nested.name, field_name, nested.field_type
            ),
            Some(_) => warn_unknown_nested_types(&nested.name, &nested.parsed_config()),
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub components: usize,
    pub fields: usize,
    pub values: usize,
    pub content_items: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Components: {}", self.components)?;
        writeln!(f, "  Fields: {}", self.fields)?;
        writeln!(f, "  Values: {}", self.values)?;
        writeln!(f, "  Content items: {}", self.content_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_component(handle: &str) -> (SqliteStore, Component) {
        let store = SqliteStore::open_in_memory().unwrap();
        let component = store
            .insert_component(&NewComponent::new(handle).with_handle(handle))
            .unwrap();
        (store, component)
    }

    fn text_field(store: &SqliteStore, component_id: i64, name: &str) -> Field {
        store
            .insert_field(&NewField::new(component_id, name, name, FieldType::Text))
            .unwrap()
    }

    #[test]
    fn test_schema_version_recorded() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(schema::SCHEMA_VERSION));
    }

    #[test]
    fn test_component_crud() {
        let store = SqliteStore::open_in_memory().unwrap();

        let hero = store
            .insert_component(&NewComponent::new("Hero Banner").with_instruction("Top of page"))
            .unwrap();
        assert_eq!(hero.handle, "hero_banner");
        assert_eq!(hero.instruction.as_deref(), Some("Top of page"));

        let by_handle = store.get_component_by_handle("hero_banner").unwrap().unwrap();
        assert_eq!(by_handle, hero);

        let update = ComponentUpdate {
            name: Some("Hero".into()),
            hidden: Some(true),
            ..Default::default()
        };
        let updated = store.update_component(hero.id, &update).unwrap();
        assert_eq!(updated.name, "Hero");
        assert!(updated.hidden);
        assert_eq!(store.require_component(hero.id).unwrap(), updated);
    }

    #[test]
    fn test_duplicate_handle() {
        let (store, _) = store_with_component("hero");
        let err = store
            .insert_component(&NewComponent::new("Another").with_handle("hero"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateHandle(h) if h == "hero"));
        assert_eq!(store.count_components().unwrap(), 1);

        let other = store.insert_component(&NewComponent::new("cta")).unwrap();
        let rename = ComponentUpdate { handle: Some("hero".into()), ..Default::default() };
        assert!(matches!(store.update_component(other.id, &rename), Err(Error::DuplicateHandle(_))));
    }

    #[test]
    fn test_list_components_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_component(&NewComponent::new("c").with_order(2)).unwrap();
        store.insert_component(&NewComponent::new("a").with_order(1)).unwrap();
        store.insert_component(&NewComponent::new("b").with_order(1)).unwrap();

        let handles: Vec<_> = store.list_components().unwrap().into_iter().map(|c| c.handle).collect();
        assert_eq!(handles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_field_errors() {
        let (store, hero) = store_with_component("hero");
        text_field(&store, hero.id, "title");

        let dup = store.insert_field(&NewField::new(hero.id, "Title", "title", FieldType::Textarea));
        assert!(matches!(dup, Err(Error::DuplicateFieldName { name, .. }) if name == "title"));

        let orphan = store.insert_field(&NewField::new(999, "X", "x", FieldType::Text));
        assert!(matches!(orphan, Err(Error::UnknownComponent(id)) if id == "999"));

        assert!(matches!(store.delete_field(12345), Err(Error::UnknownField(12345))));

        // Same name is fine on another component
        let other = store.insert_component(&NewComponent::new("cta")).unwrap();
        text_field(&store, other.id, "title");
    }

    #[test]
    fn test_fields_ordered() {
        let (store, hero) = store_with_component("hero");
        store.insert_field(&NewField::new(hero.id, "B", "b", FieldType::Text).with_order(2)).unwrap();
        store.insert_field(&NewField::new(hero.id, "A", "a", FieldType::Text).with_order(1)).unwrap();
        store.insert_field(&NewField::new(hero.id, "C", "c", FieldType::Text).with_order(2)).unwrap();

        let names: Vec<_> = store.find_fields_of_component(hero.id).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_field_keeps_type() {
        let (store, hero) = store_with_component("hero");
        let field = text_field(&store, hero.id, "title");
        let update = FieldUpdate {
            label: Some("Headline".into()),
            required: Some(true),
            ..Default::default()
        };
        let updated = store.update_field(field.id, &update).unwrap();
        assert_eq!(updated.label, "Headline");
        assert!(updated.required);
        assert_eq!(updated.field_type, FieldType::Text);
    }

    #[test]
    fn test_latest_value_wins() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        let other = text_field(&store, hero.id, "subtitle");

        store.insert_value(42, &NewValue::new(title.id, "first")).unwrap();
        store.insert_value(42, &NewValue::new(other.id, "unrelated")).unwrap();
        store.insert_value(42, &NewValue::new(title.id, "second")).unwrap();
        store.insert_value(7, &NewValue::new(title.id, "other item")).unwrap();
        store.insert_value(42, &NewValue::new(other.id, "unrelated again")).unwrap();

        assert_eq!(store.latest_value(42, title.id, None).unwrap().as_deref(), Some("second"));
        assert_eq!(store.latest_value(7, title.id, None).unwrap().as_deref(), Some("other item"));
        assert_eq!(store.latest_value(8, title.id, None).unwrap(), None);
    }

    #[test]
    fn test_latest_value_scoped_to_instance() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");

        store.insert_value(42, &NewValue::new(title.id, "first a").in_instance("a")).unwrap();
        store.insert_value(42, &NewValue::new(title.id, "only b").in_instance("b")).unwrap();
        store.insert_value(42, &NewValue::new(title.id, "unscoped")).unwrap();

        assert_eq!(store.latest_value(42, title.id, Some("a")).unwrap().as_deref(), Some("first a"));
        assert_eq!(store.latest_value(42, title.id, Some("b")).unwrap().as_deref(), Some("only b"));
        assert_eq!(store.latest_value(42, title.id, Some("c")).unwrap(), None);
        assert_eq!(store.latest_value(42, title.id, None).unwrap().as_deref(), Some("unscoped"));
    }

    #[test]
    fn test_save_values_replaces_and_drops_empty() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        let subtitle = text_field(&store, hero.id, "subtitle");

        store.insert_value(42, &NewValue::new(subtitle.id, "stale")).unwrap();
        store.insert_value(43, &NewValue::new(title.id, "other item")).unwrap();

        let written = store
            .save_values(42, vec![NewValue::new(title.id, "Welcome"), NewValue::new(subtitle.id, "")])
            .unwrap();
        assert_eq!(written, 1);

        let rows = store.values_of_content_item(42).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "Welcome");
        assert_eq!(store.latest_value(42, subtitle.id, None).unwrap(), None);
        assert_eq!(store.values_of_content_item(43).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_save_keeps_previous_values() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        store.save_values(42, vec![NewValue::new(title.id, "kept")]).unwrap();

        // Field 9999 does not exist; the foreign key rejects the second row
        let err = store
            .save_values(42, vec![NewValue::new(title.id, "new"), NewValue::new(9999, "bad")])
            .unwrap_err();
        assert!(matches!(err, Error::PartialBulkSave { content_item_id: 42, .. }));

        let rows = store.values_of_content_item(42).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "kept");
    }

    #[test]
    fn test_save_instance_values_keeps_other_instances() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        store.save_values(42, vec![NewValue::new(title.id, "unscoped")]).unwrap();

        store.save_instance_values(42, Some("a"), vec![NewValue::new(title.id, "A")]).unwrap();
        store.save_instance_values(42, Some("b"), vec![NewValue::new(title.id, "B")]).unwrap();
        assert_eq!(store.latest_value(42, title.id, Some("a")).unwrap().as_deref(), Some("A"));
        assert_eq!(store.latest_value(42, title.id, Some("b")).unwrap().as_deref(), Some("B"));

        // Resaving one instance replaces only its rows
        store.save_instance_values(42, Some("a"), vec![NewValue::new(title.id, "A2")]).unwrap();
        assert_eq!(store.latest_value(42, title.id, Some("a")).unwrap().as_deref(), Some("A2"));
        assert_eq!(store.latest_value(42, title.id, Some("b")).unwrap().as_deref(), Some("B"));
        assert_eq!(store.values_of_content_item(42).unwrap().len(), 3);

        // The unscoped scope is its own instance
        store.save_instance_values(42, None, vec![NewValue::new(title.id, "plain").in_instance("ignored")]).unwrap();
        let unscoped: Vec<_> = store
            .values_of_content_item(42)
            .unwrap()
            .into_iter()
            .filter(|v| v.instance_id.is_none())
            .map(|v| v.value)
            .collect();
        assert_eq!(unscoped, vec!["plain".to_string()]);
        assert_eq!(store.values_of_content_item(42).unwrap().len(), 3);
    }

    #[test]
    fn test_failed_instance_save_keeps_previous_values() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        store.save_instance_values(42, Some("a"), vec![NewValue::new(title.id, "kept")]).unwrap();

        let err = store
            .save_instance_values(42, Some("a"), vec![NewValue::new(9999, "bad")])
            .unwrap_err();
        assert!(matches!(err, Error::PartialBulkSave { content_item_id: 42, .. }));
        assert_eq!(store.latest_value(42, title.id, Some("a")).unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_count_values_of_fields() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        let body = text_field(&store, hero.id, "body");
        let unused = text_field(&store, hero.id, "unused");

        store.save_values(1, vec![NewValue::new(title.id, "t"), NewValue::new(body.id, "b")]).unwrap();
        store.save_values(2, vec![NewValue::new(title.id, "t")]).unwrap();

        assert_eq!(store.count_values_of_fields(&[title.id, body.id]).unwrap(), 3);
        assert_eq!(store.count_values_of_fields(&[body.id, unused.id]).unwrap(), 1);
        assert_eq!(store.count_values_of_fields(&[]).unwrap(), 0);
    }

    #[test]
    fn test_delete_component_cascades() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        let body = text_field(&store, hero.id, "body");

        for item in [1, 2] {
            store
                .save_values(item, vec![NewValue::new(title.id, "t"), NewValue::new(body.id, "b")])
                .unwrap();
        }
        assert_eq!(store.count_values_of_component(hero.id).unwrap(), 4);

        store.delete_component(hero.id).unwrap();

        assert!(store.find_fields_of_component(hero.id).unwrap().is_empty());
        assert!(store.get_field(title.id).unwrap().is_none());
        assert_eq!(store.count_values_of_fields(&[title.id, body.id]).unwrap(), 0);
        assert!(matches!(store.delete_component(hero.id), Err(Error::UnknownComponent(_))));
    }

    #[test]
    fn test_delete_field_cascades_to_values() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        store.save_values(42, vec![NewValue::new(title.id, "x")]).unwrap();

        store.delete_field(title.id).unwrap();
        assert_eq!(store.count_values().unwrap(), 0);
    }

    #[test]
    fn test_placements() {
        let (store, hero) = store_with_component("hero");
        let cta = store.insert_component(&NewComponent::new("cta")).unwrap();

        let first = store.assign_component(42, hero.id, 10).unwrap();
        let second = store.assign_component(42, cta.id, 5).unwrap();
        let third = store.assign_component(42, hero.id, 10).unwrap();
        assert_ne!(first.instance_id, third.instance_id);

        let ordered = store.assigned_components(42).unwrap();
        assert_eq!(ordered, vec![second.clone(), first.clone(), third.clone()]);

        let removed = store.unassign(42, first.instance_id.as_deref().unwrap()).unwrap();
        assert_eq!(removed, first);
        assert_eq!(store.assigned_components(42).unwrap(), vec![second, third]);

        assert!(matches!(store.unassign(42, "missing"), Err(Error::UnknownPlacement { .. })));
        assert!(matches!(store.assign_component(42, 999, 0), Err(Error::UnknownComponent(_))));
    }

    #[test]
    fn test_malformed_placement_list_reads_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.conn
            .execute(
                "INSERT INTO content_assignments (content_item_id, placements) VALUES (1, 'not json')",
                [],
            )
            .unwrap();
        assert!(store.assigned_components(1).unwrap().is_empty());
    }

    #[test]
    fn test_delete_content_item() {
        let (store, hero) = store_with_component("hero");
        let title = text_field(&store, hero.id, "title");
        store.assign_component(42, hero.id, 0).unwrap();
        store.save_values(42, vec![NewValue::new(title.id, "x")]).unwrap();
        assert_eq!(store.stats().unwrap().content_items, 1);

        store.delete_content_item(42).unwrap();
        assert!(store.values_of_content_item(42).unwrap().is_empty());
        assert!(store.get_placements(42).unwrap().is_empty());
        assert_eq!(store.stats().unwrap().content_items, 0);
    }
}
