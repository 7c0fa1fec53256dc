//! Placements - ordered component instances attached to a content item
//!
//! The placement list lives with the content item as an ordered list rather
//! than a relational join: the same component may appear several times, and
//! each appearance keys its own field values through `instance_id`.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One entry of a content item's placement list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub component_id: i64,
    /// Disambiguates repeated placements of the same component.
    /// Lists written before instances existed may lack it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// User-assigned position; not necessarily contiguous
    #[serde(default)]
    pub order: i64,
}

impl Placement {
    pub fn new(component_id: i64, instance_id: impl Into<String>, order: i64) -> Self {
        Self {
            component_id,
            instance_id: Some(instance_id.into()),
            order,
        }
    }
}

/// Sort placements by `order` ascending. Ties keep their list order.
pub fn sort_placements(placements: &mut [Placement]) {
    // slice::sort_by_key is stable
    placements.sort_by_key(|p| p.order);
}

/// Generate an instance identifier that does not collide with `existing`.
pub fn new_instance_id(content_item_id: i64, component_id: i64, existing: &[Placement]) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut salt: u64 = 0;
    loop {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&content_item_id.to_le_bytes());
        hasher.update(&component_id.to_le_bytes());
        hasher.update(&(existing.len() as u64).to_le_bytes());
        hasher.update(&nanos.to_le_bytes());
        hasher.update(&salt.to_le_bytes());
        let candidate = hasher.finalize().to_hex()[..12].to_string();

        if !existing.iter().any(|p| p.instance_id.as_deref() == Some(candidate.as_str())) {
            return candidate;
        }
        salt += 1;
    }
}
