//! Components - named, reusable schema groups
//!
//! A component owns an ordered list of fields and is identified by a stable
//! machine name (its handle). Handles double as file names for scaffolded
//! templates, so they are restricted to a filesystem-safe alphabet.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static HANDLE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn handle_pattern() -> &'static Regex {
    HANDLE_PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid handle regex"))
}

/// A stored component definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    /// Display name shown to authors
    pub name: String,
    /// Globally unique machine name
    pub handle: String,
    /// Optional guidance text shown while editing
    pub instruction: Option<String>,
    /// Hidden components are kept out of the placement picker
    pub hidden: bool,
    /// Display order (ascending)
    pub order: i64,
    pub created_at: String,
}

/// Input for creating a component.
#[derive(Debug, Clone, Default)]
pub struct NewComponent {
    pub name: String,
    /// Derived from `name` when absent
    pub handle: Option<String>,
    pub instruction: Option<String>,
    pub hidden: bool,
    pub order: i64,
}

impl NewComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// The handle this component will be stored under, validated.
    pub fn resolved_handle(&self) -> Result<String> {
        let handle = match &self.handle {
            Some(h) => h.trim().to_string(),
            None => slugify(&self.name),
        };
        validate_handle(&handle)?;
        Ok(handle)
    }
}

/// Partial update for a component; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ComponentUpdate {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub instruction: Option<Option<String>>,
    pub hidden: Option<bool>,
    pub order: Option<i64>,
}

/// Derive a handle from a display name.
///
/// Lowercases ASCII letters, collapses every run of other characters into a
/// single `_` and trims separators from both ends: `"Hero Banner!"` becomes
/// `"hero_banner"`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Check that a handle is non-empty and filesystem-safe.
pub fn validate_handle(handle: &str) -> Result<()> {
    if handle_pattern().is_match(handle) {
        Ok(())
    } else {
        Err(Error::InvalidHandle(handle.to_string()))
    }
}
