//! Resolve user-supplied tag strings to the ids the search API filters on.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use super::TagResponse;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TagError {
    #[error("No such tag found on server: {0}")]
    NotFound(String),
}

/// Map each requested tag to an id, in request order.
///
/// The full hierarchical value (`Trips/Vacation`) is matched first, then the
/// short name (`Vacation`). Short names can collide across branches, so a
/// short-name hit is logged as a warning. When the catalog itself holds
/// duplicates, the entry listed last wins.
pub fn resolve_tag_ids(
    requested: &[String],
    catalog: &[TagResponse],
) -> Result<Vec<Uuid>, TagError> {
    let by_value: HashMap<&str, Uuid> =
        catalog.iter().map(|t| (t.value.as_str(), t.id)).collect();
    let by_name: HashMap<&str, &TagResponse> =
        catalog.iter().map(|t| (t.name.as_str(), t)).collect();

    requested
        .iter()
        .map(|tag| {
            if let Some(id) = by_value.get(tag.as_str()) {
                return Ok(*id);
            }
            if let Some(found) = by_name.get(tag.as_str()) {
                tracing::warn!(
                    "Using short name match for tag: {} (full name: {})",
                    tag,
                    found.value
                );
                return Ok(found.id);
            }
            Err(TagError::NotFound(tag.clone()))
        })
        .collect()
}
