use crate::prelude::*;
use std::collections::BTreeSet;

/// Characters that would turn a literal key prefix or filter into a pattern.
pub(crate) const WILDCARD_CHARS: [char; 2] = ['*', '?'];

///
/// Grant
///
/// Capability edge: `principal` may perform `actions()` on `resource`,
/// limited to keys starting with `key_prefix` when one is set.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Grant {
    principal: FunctionRef,
    resource: ResourceRef,
    access: BTreeSet<Access>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_prefix: Option<String>,
}

impl Grant {
    /// Build a grant edge. Endpoint existence is checked by the topology.
    pub fn new(
        principal: FunctionRef,
        resource: ResourceRef,
        access: &[Access],
        key_prefix: Option<&str>,
    ) -> Result<Self, ConstructionError> {
        if access.is_empty() {
            return Err(ConstructionError::EmptyAccess {
                principal: principal.to_string(),
            });
        }

        if let Some(prefix) = key_prefix {
            if let ResourceRef::Table(table) = &resource {
                return Err(ConstructionError::PrefixOnTable {
                    resource: table.to_string(),
                });
            }
            check_key_prefix(prefix)?;
        }

        Ok(Self {
            principal,
            resource,
            access: access.iter().copied().collect(),
            key_prefix: key_prefix.map(str::to_string),
        })
    }

    #[must_use]
    pub const fn principal(&self) -> &FunctionRef {
        &self.principal
    }

    #[must_use]
    pub const fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    #[must_use]
    pub const fn access(&self) -> &BTreeSet<Access> {
        &self.access
    }

    #[must_use]
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    /// Union of the concrete actions of every access level, sorted.
    #[must_use]
    pub fn actions(&self) -> BTreeSet<Action> {
        self.access
            .iter()
            .flat_map(|access| access.actions().iter().copied())
            .collect()
    }

    ///
    /// authorizes
    ///
    /// Does this grant let `principal` perform `action` on `key` within
    /// `resource`? A prefixed grant never covers resource-level access
    /// (`key == None`) nor keys outside the prefix.
    ///
    #[must_use]
    pub fn authorizes(
        &self,
        principal: &FunctionRef,
        resource: &ResourceRef,
        action: Action,
        key: Option<&str>,
    ) -> bool {
        if self.principal != *principal || self.resource != *resource {
            return false;
        }
        if !self.actions().contains(&action) {
            return false;
        }

        match (&self.key_prefix, key) {
            (None, _) => true,
            (Some(prefix), Some(key)) => key.starts_with(prefix.as_str()),
            (Some(_), None) => false,
        }
    }

    /// Resource patterns handed to the materialization layer.
    #[must_use]
    pub fn policy_resources(&self) -> Vec<String> {
        match (&self.resource, &self.key_prefix) {
            (ResourceRef::Bucket(bucket), Some(prefix)) => vec![format!("{bucket}/{prefix}*")],
            (ResourceRef::Bucket(bucket), None) => vec![bucket.to_string(), format!("{bucket}/*")],
            (ResourceRef::Table(table), _) => vec![table.to_string()],
        }
    }
}

impl ValidateNode for Grant {
    fn validate(&self, topology: &Topology) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if let Err(e) = topology.cast_resource::<Function>(&self.principal) {
            errs.add(e);
        }
        let target = match &self.resource {
            ResourceRef::Bucket(bucket) => topology.cast_resource::<Bucket>(bucket).map(|_| ()),
            ResourceRef::Table(table) => topology.cast_resource::<Table>(table).map(|_| ()),
        };
        if let Err(e) = target {
            errs.add(e);
        }

        errs.result()
    }
}

impl VisitableNode for Grant {
    fn route_key(&self) -> String {
        format!("grant({} -> {})", self.principal, self.resource)
    }
}

// Non-empty literal, no wildcard characters.
fn check_key_prefix(prefix: &str) -> Result<(), ConstructionError> {
    let invalid = |reason| ConstructionError::InvalidKeyPrefix {
        prefix: prefix.to_string(),
        reason,
    };

    if prefix.is_empty() {
        return Err(invalid("empty prefix would cover the whole bucket"));
    }
    if prefix.contains(WILDCARD_CHARS) {
        return Err(invalid("prefixes are literal, wildcards are not allowed"));
    }

    Ok(())
}
