//! HTML sanitization for wysiwyg values
//!
//! The default sanitizer parses the value as an HTML fragment and rebuilds it
//! from a fixed allow-list of tags and attributes:
//! - blocks such as `<script>`, `<style>` and `<svg>` are removed with their content
//! - other unknown tags are removed, their text kept
//! - attributes outside the per-tag allow-list are dropped
//! - URL attributes must be relative or use an allowed scheme
//!
//! Attribute values are checked after entity decoding, the way a browser
//! would read them.

use scraper::{ElementRef, Html, Node};

/// Cleans author-supplied HTML. Implementations must be deterministic and
/// idempotent: sanitizing sanitized output changes nothing.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "figcaption", "figure", "h1", "h2", "h3",
    "h4", "h5", "h6", "hr", "i", "img", "li", "ol", "p", "pre", "s", "span", "strong", "sub",
    "sup", "table", "tbody", "td", "th", "thead", "tr", "u", "ul",
];

const DROPPED_BLOCKS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "svg", "math",
    "textarea", "title", "xmp",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "id", "title"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

const MAX_PASSES: usize = 8;

fn tag_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "target", "rel"],
        "img" => &["src", "alt", "width", "height"],
        "td" | "th" => &["colspan", "rowspan"],
        _ => &[],
    }
}

/// Default allow-list sanitizer
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowListSanitizer;

impl AllowListSanitizer {
    fn pass(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        self.write_children(fragment.root_element(), &mut out);
        out
    }

    fn write_children(&self, element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => push_escaped(out, text, false),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.write_element(child, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn write_element(&self, element: ElementRef<'_>, out: &mut String) {
        let name = element.value().name().to_ascii_lowercase();
        if DROPPED_BLOCKS.contains(&name.as_str()) {
            return;
        }
        if !ALLOWED_TAGS.contains(&name.as_str()) {
            self.write_children(element, out);
            return;
        }

        out.push('<');
        out.push_str(&name);
        self.write_attributes(&name, element, out);
        out.push('>');

        if VOID_TAGS.contains(&name.as_str()) {
            return;
        }
        self.write_children(element, out);
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }

    fn write_attributes(&self, tag: &str, element: ElementRef<'_>, out: &mut String) {
        let allowed = GLOBAL_ATTRIBUTES.iter().chain(tag_attributes(tag));
        for attribute in allowed {
            let Some(value) = element.value().attr(attribute) else {
                continue;
            };
            if URL_ATTRIBUTES.contains(attribute) && !is_safe_url(value) {
                continue;
            }
            out.push(' ');
            out.push_str(attribute);
            out.push_str("=\"");
            push_escaped(out, value, true);
            out.push('"');
        }
    }
}

impl Sanitizer for AllowListSanitizer {
    fn sanitize(&self, html: &str) -> String {
        // Reparsing can move nodes (e.g. table fixups); repeat until stable
        let mut current = self.pass(html);
        for _ in 1..MAX_PASSES {
            let next = self.pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

fn push_escaped(out: &mut String, text: &str, in_attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// Relative URLs pass; absolute ones need an allowed scheme.
/// `value` is the decoded attribute text.
fn is_safe_url(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let Some(colon) = normalized.find(':') else {
        return true;
    };
    if normalized[..colon].contains(['/', '?', '#']) {
        return true;
    }
    URL_SCHEMES.contains(&&normalized[..colon])
}
