//! Authoring actions
//!
//! Schema mutations that carry side effects beyond the store: creating a
//! component scaffolds its template, deleting it removes the template.
//! Store errors are returned to the caller; scaffolding problems are logged
//! and do not undo the schema change.

use crate::Result;
use crate::component::{Component, ComponentUpdate, NewComponent};
use crate::field::{Field, FieldUpdate, NewField};
use crate::scaffold::Scaffolder;
use crate::storage::SqliteStore;

pub struct Authoring<'a> {
    store: &'a SqliteStore,
    scaffolder: &'a dyn Scaffolder,
}

impl<'a> Authoring<'a> {
    pub fn new(store: &'a SqliteStore, scaffolder: &'a dyn Scaffolder) -> Self {
        Self { store, scaffolder }
    }

    pub fn create_component(&self, new: &NewComponent) -> Result<Component> {
        let component = self.store.insert_component(new)?;
        if let Err(e) = self.scaffolder.create(&component) {
            tracing::warn!("Could not scaffold template for '{}': {}", component.handle, e);
        }
        Ok(component)
    }

    pub fn update_component(&self, id: i64, update: &ComponentUpdate) -> Result<Component> {
        let before = self.store.require_component(id)?;
        let after = self.store.update_component(id, update)?;
        if before.handle != after.handle {
            if let Err(e) = self.scaffolder.rename(&before.handle, &after.handle) {
                tracing::warn!("Could not move template '{}' to '{}': {}", before.handle, after.handle, e);
            }
        }
        Ok(after)
    }

    /// Delete a component with its fields and values, then its template
    pub fn delete_component(&self, id: i64) -> Result<Component> {
        let component = self.store.delete_component(id)?;
        if let Err(e) = self.scaffolder.remove(&component.handle) {
            tracing::warn!("Could not remove template for '{}': {}", component.handle, e);
        }
        Ok(component)
    }

    pub fn create_field(&self, new: &NewField) -> Result<Field> {
        self.store.insert_field(new)
    }

    pub fn update_field(&self, id: i64, update: &FieldUpdate) -> Result<Field> {
        self.store.update_field(id, update)
    }

    pub fn delete_field(&self, id: i64) -> Result<Field> {
        self.store.delete_field(id)
    }
}
