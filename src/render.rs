//! Render-time reads
//!
//! Joins a component's field list with the latest stored value of each field
//! and resolves every value into its typed form. Content item and instance are
//! always passed explicitly.

use serde::Serialize;
use crate::{Error, Result};
use crate::placement::Placement;
use crate::resolve::{Record, Resolver};
use crate::storage::SqliteStore;

/// One placed component instance with its resolved fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedComponent {
    pub component_id: i64,
    pub handle: String,
    pub name: String,
    pub instance_id: Option<String>,
    pub order: i64,
    pub fields: Record,
}

/// Read-side engine over a store
pub struct Renderer<'a> {
    store: &'a SqliteStore,
    resolver: Resolver<'a>,
}

impl<'a> Renderer<'a> {
    /// Create a renderer using the default resolver
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store, resolver: Resolver::new() }
    }

    /// Create a renderer with a custom resolver (e.g. another sanitizer)
    pub fn with_resolver(store: &'a SqliteStore, resolver: Resolver<'a>) -> Self {
        Self { store, resolver }
    }

    /// Placements of a content item in render order
    pub fn assigned_components(&self, content_item_id: i64) -> Result<Vec<Placement>> {
        self.store.assigned_components(content_item_id)
    }

    /// Resolve every field of a component for one content item.
    ///
    /// With `instance_id`, only values stored for that placement are used.
    /// Fields without a stored value resolve to their type's absent form.
    pub fn resolved_fields(
        &self,
        component_id: i64,
        content_item_id: i64,
        instance_id: Option<&str>,
    ) -> Result<Record> {
        self.store.require_component(component_id)?;
        self.resolve_component_fields(component_id, content_item_id, instance_id)
    }

    /// Same as [`Renderer::resolved_fields`], addressing the component by handle
    pub fn resolved_fields_by_handle(
        &self,
        handle: &str,
        content_item_id: i64,
        instance_id: Option<&str>,
    ) -> Result<Record> {
        let component = self
            .store
            .get_component_by_handle(handle)?
            .ok_or_else(|| Error::UnknownComponent(handle.to_string()))?;
        self.resolve_component_fields(component.id, content_item_id, instance_id)
    }

    /// Resolve every placement of a content item, in render order.
    ///
    /// Placements whose component has since been deleted are skipped.
    pub fn render(&self, content_item_id: i64) -> Result<Vec<RenderedComponent>> {
        let mut rendered = Vec::new();

        for placement in self.assigned_components(content_item_id)? {
            let Some(component) = self.store.get_component(placement.component_id)? else {
                tracing::warn!(
                    "Content item {} places missing component {}; skipping",
                    content_item_id, placement.component_id
                );
                continue;
            };

            let fields = self.resolve_component_fields(
                component.id,
                content_item_id,
                placement.instance_id.as_deref(),
            )?;

            rendered.push(RenderedComponent {
                component_id: component.id,
                handle: component.handle,
                name: component.name,
                instance_id: placement.instance_id,
                order: placement.order,
                fields,
            });
        }

        Ok(rendered)
    }

    fn resolve_component_fields(
        &self,
        component_id: i64,
        content_item_id: i64,
        instance_id: Option<&str>,
    ) -> Result<Record> {
        let mut record = Record::new();
        for field in self.store.find_fields_of_component(component_id)? {
            let raw = self.store.latest_value(content_item_id, field.id, instance_id)?;
            let value = self.resolver.resolve(raw.as_deref(), field.field_type, &field.config);
            record.insert(field.name, value);
        }
        tracing::debug!(
            "Resolved {} fields of component {} for content item {}",
            record.len(), component_id, content_item_id
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::NewComponent;
    use crate::field::{FieldConfig, FieldType, NestedField, NewField, RepeaterConfig};
    use crate::resolve::TypedValue;
    use crate::value::NewValue;

    struct Hero {
        store: SqliteStore,
        component_id: i64,
        title: i64,
        items: i64,
    }

    fn hero() -> Hero {
        let store = SqliteStore::open_in_memory().unwrap();
        let component = store.insert_component(&NewComponent::new("Hero").with_handle("hero")).unwrap();
        let title = store
            .insert_field(&NewField::new(component.id, "Title", "title", FieldType::Text))
            .unwrap();
        let items = store
            .insert_field(
                &NewField::new(component.id, "Items", "items", FieldType::Repeater).with_config(
                    FieldConfig::Repeater(RepeaterConfig {
                        nested_fields: vec![NestedField::new("label", FieldType::Text)],
                    }),
                ),
            )
            .unwrap();
        Hero { store, component_id: component.id, title: title.id, items: items.id }
    }

    fn label_rows(labels: &[&str]) -> TypedValue {
        TypedValue::Rows(
            labels
                .iter()
                .map(|l| Record::from([("label".to_string(), TypedValue::text(*l))]))
                .collect(),
        )
    }

    #[test]
    fn test_hero_scenario() {
        let h = hero();
        h.store
            .save_values(
                42,
                vec![
                    NewValue::new(h.title, "Welcome"),
                    NewValue::new(h.items, r#"[{"label":"A"},{"label":"B"}]"#),
                ],
            )
            .unwrap();

        let renderer = Renderer::new(&h.store);
        let fields = renderer.resolved_fields_by_handle("hero", 42, None).unwrap();

        let expected = Record::from([
            ("title".to_string(), TypedValue::text("Welcome")),
            ("items".to_string(), label_rows(&["A", "B"])),
        ]);
        assert_eq!(fields, expected);
    }

    #[test]
    fn test_missing_values_resolve_to_absent_forms() {
        let h = hero();
        let fields = Renderer::new(&h.store).resolved_fields(h.component_id, 99, None).unwrap();
        assert_eq!(fields["title"], TypedValue::text(""));
        assert_eq!(fields["items"], TypedValue::Rows(vec![]));
    }

    #[test]
    fn test_unknown_component() {
        let h = hero();
        let renderer = Renderer::new(&h.store);
        assert!(matches!(renderer.resolved_fields(999, 42, None), Err(Error::UnknownComponent(_))));
        assert!(matches!(
            renderer.resolved_fields_by_handle("nope", 42, None),
            Err(Error::UnknownComponent(handle)) if handle == "nope"
        ));
    }

    #[test]
    fn test_save_twice_is_idempotent() {
        let h = hero();
        let values = || {
            vec![
                NewValue::new(h.title, "Welcome"),
                NewValue::new(h.items, r#"[{"label":"A"}]"#),
            ]
        };
        let renderer = Renderer::new(&h.store);

        h.store.save_values(42, values()).unwrap();
        let first = renderer.resolved_fields(h.component_id, 42, None).unwrap();
        h.store.save_values(42, values()).unwrap();
        let second = renderer.resolved_fields(h.component_id, 42, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(h.store.values_of_content_item(42).unwrap().len(), 2);
    }

    #[test]
    fn test_render_instances_in_order() {
        let h = hero();
        let bottom = h.store.assign_component(42, h.component_id, 20).unwrap();
        let top = h.store.assign_component(42, h.component_id, 10).unwrap();
        let bottom_id = bottom.instance_id.clone().unwrap();
        let top_id = top.instance_id.clone().unwrap();

        h.store
            .save_values(
                42,
                vec![
                    NewValue::new(h.title, "Bottom").in_instance(&bottom_id),
                    NewValue::new(h.title, "Top").in_instance(&top_id),
                    NewValue::new(h.items, r#"[{"label":"only top"}]"#).in_instance(&top_id),
                ],
            )
            .unwrap();

        let rendered = Renderer::new(&h.store).render(42).unwrap();
        assert_eq!(rendered.len(), 2);

        assert_eq!(rendered[0].instance_id.as_deref(), Some(top_id.as_str()));
        assert_eq!(rendered[0].fields["title"], TypedValue::text("Top"));
        assert_eq!(rendered[0].fields["items"], label_rows(&["only top"]));

        assert_eq!(rendered[1].handle, "hero");
        assert_eq!(rendered[1].fields["title"], TypedValue::text("Bottom"));
        assert_eq!(rendered[1].fields["items"], TypedValue::Rows(vec![]));
    }

    #[test]
    fn test_custom_resolver() {
        struct Stripped;
        impl crate::resolve::Sanitizer for Stripped {
            fn sanitize(&self, _html: &str) -> String {
                "[removed]".to_string()
            }
        }

        let h = hero();
        let body = h
            .store
            .insert_field(&NewField::new(h.component_id, "Body", "body", FieldType::Wysiwyg))
            .unwrap();
        h.store
            .save_values(42, vec![NewValue::new(body.id, "<p>x</p>"), NewValue::new(h.title, "<p>x</p>")])
            .unwrap();

        let renderer = Renderer::with_resolver(&h.store, Resolver::with_sanitizer(&Stripped));
        let fields = renderer.resolved_fields(h.component_id, 42, None).unwrap();
        assert_eq!(fields["body"], TypedValue::text("[removed]"));
        assert_eq!(fields["title"], TypedValue::text("<p>x</p>"));
    }

    #[test]
    fn test_render_skips_deleted_components() {
        let h = hero();
        let cta = h.store.insert_component(&NewComponent::new("cta")).unwrap();
        h.store.assign_component(42, cta.id, 0).unwrap();
        h.store.assign_component(42, h.component_id, 1).unwrap();
        h.store.delete_component(cta.id).unwrap();

        let rendered = Renderer::new(&h.store).render(42).unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].handle, "hero");
    }
}
