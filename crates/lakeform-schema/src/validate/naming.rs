use crate::{MAX_RESOURCE_ID_LEN, node::ConstructionError, prelude::*};
use std::collections::BTreeSet;

/// Ensure a resource id is non-empty, ASCII kebab-case and within the maximum length.
pub(crate) fn validate_resource_id(id: &str) -> Result<(), ConstructionError> {
    check_resource_id(id).map_err(|reason| ConstructionError::InvalidId {
        id: id.to_string(),
        reason,
    })
}

fn check_resource_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("id is empty".to_string());
    }
    if id.len() > MAX_RESOURCE_ID_LEN {
        return Err(format!("id exceeds max length {MAX_RESOURCE_ID_LEN}"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("id must be lowercase ASCII letters, digits and '-'".to_string());
    }
    if id.starts_with('-') || id.ends_with('-') || id.contains("--") {
        return Err("id must be kebab-case".to_string());
    }

    Ok(())
}

pub fn validate_unique_ids(topology: &Topology, errs: &mut ErrorTree) {
    let mut seen = BTreeSet::new();

    for resource in topology.resources() {
        if !seen.insert(resource.id()) {
            err!(errs, "duplicate resource id '{}'", resource.id());
        }
        if let Err(reason) = check_resource_id(resource.id()) {
            err!(errs, "invalid resource id '{}': {reason}", resource.id());
        }
    }
}
