//! Per-type resolution rules
//!
//! | type | stored | resolved | absent |
//! |---|---|---|---|
//! | text, textarea, color, select, radio, video | string | `Text` | `""` |
//! | toggle | `"1"` or anything else | `Bool` | `false` |
//! | checkbox | comma-joined string | `List` | `[]` |
//! | wysiwyg | HTML | sanitized `Text` | `""` |
//! | page_link, taxonomy_term | numeric string | `Reference` | `0` |
//! | image | JSON object or URL | object, URL or raw | `""` |
//! | repeater | JSON array of objects | `Rows` | `[]` |
//!
//! Stored text is lifted into a JSON value before dispatch so that the same
//! rules apply to top-level values (always strings) and to the values found
//! inside repeater rows (any JSON).

use super::sanitize::{AllowListSanitizer, Sanitizer};
use super::typed::{Record, TypedValue};
use crate::field::{FieldConfig, FieldType, NestedField, ReturnType};
use serde_json::Value;
use std::str::FromStr;

static DEFAULT_SANITIZER: AllowListSanitizer = AllowListSanitizer;

/// Resolves raw values into typed values.
///
/// Holds nothing but the sanitizer used for wysiwyg fields, so a resolver
/// can be shared freely between threads.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    sanitizer: &'a dyn Sanitizer,
}

impl Resolver<'static> {
    /// A resolver using the default allow-list sanitizer
    pub fn new() -> Self {
        Self { sanitizer: &DEFAULT_SANITIZER }
    }
}

impl Default for Resolver<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    /// A resolver delegating HTML cleaning to `sanitizer`
    pub fn with_sanitizer(sanitizer: &'a dyn Sanitizer) -> Self {
        Self { sanitizer }
    }

    /// Resolve a stored value for a field of a known type.
    pub fn resolve(&self, raw: Option<&str>, field_type: FieldType, config: &FieldConfig) -> TypedValue {
        let lifted = raw.map_or(Value::Null, |s| Value::String(s.to_string()));
        self.resolve_value(&lifted, field_type, config)
    }

    /// Resolve a stored value given the raw type tag and configuration text.
    ///
    /// Unknown tags pass the value through unchanged.
    pub fn resolve_tagged(&self, raw: Option<&str>, tag: &str, config: &str) -> TypedValue {
        match FieldType::from_str(tag) {
            Ok(field_type) => self.resolve(raw, field_type, &FieldConfig::parse(field_type, config)),
            Err(_) => {
                let lifted = raw.map_or(Value::Null, |s| Value::String(s.to_string()));
                passthrough(&lifted, tag)
            }
        }
    }

    fn resolve_value(&self, raw: &Value, field_type: FieldType, config: &FieldConfig) -> TypedValue {
        match field_type {
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Color
            | FieldType::Select
            | FieldType::Radio
            | FieldType::Video => TypedValue::Text(text_of(raw).unwrap_or_default()),
            FieldType::Toggle => TypedValue::Bool(text_of(raw).as_deref() == Some("1")),
            FieldType::Checkbox => TypedValue::List(checkbox_items(raw)),
            FieldType::Wysiwyg => {
                TypedValue::Text(self.sanitizer.sanitize(&text_of(raw).unwrap_or_default()))
            }
            FieldType::PageLink | FieldType::TaxonomyTerm => TypedValue::Reference(reference_id(raw)),
            FieldType::Image => resolve_image(raw, config.return_type()),
            FieldType::Repeater => TypedValue::Rows(self.resolve_rows(raw, config.nested_fields())),
        }
    }

    fn resolve_rows(&self, raw: &Value, nested_fields: &[NestedField]) -> Vec<Record> {
        let decoded;
        let items = match raw {
            Value::Array(items) => items,
            Value::String(s) => {
                decoded = serde_json::from_str::<Value>(s).unwrap_or(Value::Null);
                match &decoded {
                    Value::Array(items) => items,
                    _ => return Vec::new(),
                }
            }
            _ => return Vec::new(),
        };

        items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| {
                nested_fields
                    .iter()
                    .filter_map(|nested| {
                        let value = item.get(&nested.name)?;
                        Some((nested.name.clone(), self.resolve_nested(value, nested)))
                    })
                    .collect()
            })
            .collect()
    }

    fn resolve_nested(&self, raw: &Value, nested: &NestedField) -> TypedValue {
        match nested.kind() {
            Some(field_type) => self.resolve_value(raw, field_type, &nested.parsed_config()),
            None => passthrough(raw, &nested.field_type),
        }
    }
}

fn resolve_image(raw: &Value, return_type: ReturnType) -> TypedValue {
    let decoded = match raw {
        Value::Null => return TypedValue::Text(String::new()),
        Value::String(s) => serde_json::from_str::<Value>(s).ok(),
        Value::Object(_) => Some(raw.clone()),
        _ => None,
    };

    match (return_type, decoded) {
        (ReturnType::Array, Some(object @ Value::Object(_))) => TypedValue::Json(object),
        (ReturnType::Url, Some(Value::Object(map))) => match map.get("url") {
            Some(Value::String(url)) => TypedValue::Text(url.clone()),
            _ => as_is(raw),
        },
        _ => as_is(raw),
    }
}

fn checkbox_items(raw: &Value) -> Vec<String> {
    match raw {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        other => vec![other.to_string()],
    }
}

fn reference_id(raw: &Value) -> i64 {
    match raw {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Stringified form of a value; `None` for null
fn text_of(raw: &Value) -> Option<String> {
    match raw {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn as_is(raw: &Value) -> TypedValue {
    match raw {
        Value::String(s) => TypedValue::Text(s.clone()),
        Value::Null => TypedValue::Text(String::new()),
        other => TypedValue::Json(other.clone()),
    }
}

fn passthrough(raw: &Value, tag: &str) -> TypedValue {
    tracing::debug!("No resolver for field type '{}', passing value through", tag);
    as_is(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{ImageConfig, RepeaterConfig};
    use crate::resolve::resolve;
    use serde_json::json;

    fn repeater(nested: Vec<NestedField>) -> FieldConfig {
        FieldConfig::Repeater(RepeaterConfig { nested_fields: nested })
    }

    fn image(return_type: ReturnType) -> FieldConfig {
        FieldConfig::Image(ImageConfig { return_type })
    }

    #[test]
    fn test_absent_forms() {
        let expected = |t: FieldType| match t {
            FieldType::Toggle => TypedValue::Bool(false),
            FieldType::Checkbox => TypedValue::List(vec![]),
            FieldType::PageLink | FieldType::TaxonomyTerm => TypedValue::Reference(0),
            FieldType::Repeater => TypedValue::Rows(vec![]),
            _ => TypedValue::text(""),
        };

        for t in FieldType::all() {
            for config in [FieldConfig::None, FieldConfig::default_for(*t), image(ReturnType::Array)] {
                assert_eq!(resolve(None, *t, &config), expected(*t), "absent form of {}", t);
            }
        }
    }

    #[test]
    fn test_text_kinds() {
        for t in [FieldType::Text, FieldType::Textarea, FieldType::Color, FieldType::Select, FieldType::Radio] {
            assert_eq!(resolve(Some("#ff0000"), t, &FieldConfig::None), TypedValue::text("#ff0000"));
        }
    }

    #[test]
    fn test_toggle() {
        assert_eq!(resolve(Some("1"), FieldType::Toggle, &FieldConfig::None), TypedValue::Bool(true));
        for raw in ["0", "true", "yes", " 1", ""] {
            assert_eq!(resolve(Some(raw), FieldType::Toggle, &FieldConfig::None), TypedValue::Bool(false));
        }
    }

    #[test]
    fn test_checkbox_roundtrip() {
        let cases: Vec<Vec<String>> = vec![
            vec!["red".into()],
            vec!["red".into(), "green".into(), "blue".into()],
            vec!["a b".into(), "".into(), "c".into()],
        ];
        for items in cases {
            let joined = items.join(",");
            assert_eq!(
                resolve(Some(&joined), FieldType::Checkbox, &FieldConfig::None),
                TypedValue::List(items)
            );
        }
        assert_eq!(resolve(Some(""), FieldType::Checkbox, &FieldConfig::None), TypedValue::List(vec![]));
    }

    #[test]
    fn test_references() {
        assert_eq!(resolve(Some("12"), FieldType::PageLink, &FieldConfig::None), TypedValue::Reference(12));
        assert_eq!(resolve(Some(" 7 "), FieldType::TaxonomyTerm, &FieldConfig::None), TypedValue::Reference(7));
        assert_eq!(resolve(Some("abc"), FieldType::PageLink, &FieldConfig::None), TypedValue::Reference(0));
        assert_eq!(resolve(Some("1.5"), FieldType::PageLink, &FieldConfig::None), TypedValue::Reference(0));
    }

    #[test]
    fn test_wysiwyg_sanitized() {
        let raw = "<p>Hi</p><script>x()</script>";
        assert_eq!(resolve(Some(raw), FieldType::Wysiwyg, &FieldConfig::None), TypedValue::text("<p>Hi</p>"));
    }

    #[test]
    fn test_custom_sanitizer() {
        struct Upper;
        impl Sanitizer for Upper {
            fn sanitize(&self, html: &str) -> String {
                html.to_uppercase()
            }
        }
        let resolver = Resolver::with_sanitizer(&Upper);
        assert_eq!(resolver.resolve(Some("<b>x</b>"), FieldType::Wysiwyg, &FieldConfig::None), TypedValue::text("<B>X</B>"));
    }

    #[test]
    fn test_image() {
        let stored = r#"{"url":"https://cdn.example/a.png","alt":"A"}"#;

        assert_eq!(
            resolve(Some(stored), FieldType::Image, &image(ReturnType::Array)),
            TypedValue::Json(json!({"url": "https://cdn.example/a.png", "alt": "A"}))
        );
        assert_eq!(
            resolve(Some(stored), FieldType::Image, &image(ReturnType::Url)),
            TypedValue::text("https://cdn.example/a.png")
        );

        // Plain URL strings and objects without a url fall back to the raw text
        let url = "https://cdn.example/b.png";
        assert_eq!(resolve(Some(url), FieldType::Image, &image(ReturnType::Array)), TypedValue::text(url));
        assert_eq!(resolve(Some(url), FieldType::Image, &image(ReturnType::Url)), TypedValue::text(url));
        let no_url = r#"{"id":5}"#;
        assert_eq!(resolve(Some(no_url), FieldType::Image, &image(ReturnType::Url)), TypedValue::text(no_url));
    }

    #[test]
    fn test_image_unrecognised_return_type() {
        let stored = r#"{"url":"https://x/a.png","id":5}"#;
        let config = FieldConfig::parse(FieldType::Image, r#"{"return_type":"id"}"#);
        assert_eq!(resolve(Some(stored), FieldType::Image, &config), TypedValue::text(stored));

        let url = "https://x/b.png";
        assert_eq!(resolve(Some(url), FieldType::Image, &config), TypedValue::text(url));
    }

    #[test]
    fn test_repeater_single_level() {
        let config = repeater(vec![
            NestedField::new("label", FieldType::Text),
            NestedField::new("visible", FieldType::Toggle),
            NestedField::new("missing", FieldType::Text),
        ]);
        let raw = r#"[{"label":"A","visible":"1","extra":"dropped"},{"label":"B"},"not an object",{}]"#;

        let rows = resolve(Some(raw), FieldType::Repeater, &config);
        let rows = rows.as_rows().unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["label"], TypedValue::text("A"));
        assert_eq!(rows[0]["visible"], TypedValue::Bool(true));
        assert!(!rows[0].contains_key("extra"));
        assert!(!rows[0].contains_key("missing"));

        assert_eq!(rows[1].len(), 1);
        assert!(rows[2].is_empty());
    }

    #[test]
    fn test_repeater_nested_levels() {
        let level3 = repeater(vec![NestedField::new("page", FieldType::PageLink)]);
        let level2 = repeater(vec![
            NestedField::new("tags", FieldType::Checkbox),
            NestedField::new("deeper", FieldType::Repeater).with_config(&level3),
        ]);
        let level1 = repeater(vec![
            NestedField::new("title", FieldType::Text),
            NestedField::new("children", FieldType::Repeater).with_config(&level2),
        ]);

        let payload = json!([{
            "title": "Top",
            "children": [
                {"tags": "x,y", "deeper": [{"page": "9"}, {"page": 12}]},
                {"tags": ["z"], "deeper": "[{\"page\":\"3\"}]"}
            ]
        }]);

        let resolved = resolve(Some(&payload.to_string()), FieldType::Repeater, &level1);
        let top = &resolved.as_rows().unwrap()[0];
        assert_eq!(top["title"], TypedValue::text("Top"));

        let children = top["children"].as_rows().unwrap();
        assert_eq!(children[0]["tags"], TypedValue::List(vec!["x".into(), "y".into()]));
        assert_eq!(children[1]["tags"], TypedValue::List(vec!["z".into()]));

        let deeper = children[0]["deeper"].as_rows().unwrap();
        assert_eq!(deeper[0]["page"], TypedValue::Reference(9));
        assert_eq!(deeper[1]["page"], TypedValue::Reference(12));
        let encoded_deeper = children[1]["deeper"].as_rows().unwrap();
        assert_eq!(encoded_deeper[0]["page"], TypedValue::Reference(3));
    }

    #[test]
    fn test_repeater_malformed() {
        let config = repeater(vec![NestedField::new("label", FieldType::Text)]);
        for raw in ["not json", "{\"label\":\"A\"}", "42"] {
            assert_eq!(resolve(Some(raw), FieldType::Repeater, &config), TypedValue::Rows(vec![]));
        }
    }

    #[test]
    fn test_unknown_types_pass_through() {
        let resolver = Resolver::new();
        assert_eq!(resolver.resolve_tagged(Some("raw,1"), "gallery", "{}"), TypedValue::text("raw,1"));
        assert_eq!(resolver.resolve_tagged(None, "gallery", ""), TypedValue::text(""));
        assert_eq!(resolver.resolve_tagged(Some("1"), "toggle", ""), TypedValue::Bool(true));

        let nested = NestedField {
            name: "map".into(),
            label: None,
            field_type: "google_map".into(),
            config: Value::Null,
        };
        let config = repeater(vec![nested]);
        let raw = r#"[{"map":{"lat":1.5}},{"map":"plain"}]"#;
        let rows = resolve(Some(raw), FieldType::Repeater, &config);
        let rows = rows.as_rows().unwrap();
        assert_eq!(rows[0]["map"], TypedValue::Json(json!({"lat": 1.5})));
        assert_eq!(rows[1]["map"], TypedValue::text("plain"));
    }
}
