use crate::{node::grant::WILDCARD_CHARS, prelude::*};

///
/// KeyFilter
///
/// Literal prefix/suffix an object key must carry for a rule to fire.
/// Absent parts match every key.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct KeyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    suffix: Option<String>,
}

impl KeyFilter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prefix: None,
            suffix: None,
        }
    }

    pub fn prefix(mut self, prefix: &str) -> Result<Self, ConstructionError> {
        check_literal(prefix)?;
        self.prefix = Some(prefix.to_string());

        Ok(self)
    }

    pub fn suffix(mut self, suffix: &str) -> Result<Self, ConstructionError> {
        check_literal(suffix)?;
        self.suffix = Some(suffix.to_string());

        Ok(self)
    }

    #[must_use]
    pub fn prefix_value(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn suffix_value(&self) -> &str {
        self.suffix.as_deref().unwrap_or_default()
    }

    /// Literal match: `key` starts with the prefix and ends with the suffix.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(self.prefix_value()) && key.ends_with(self.suffix_value())
    }

    /// True when some key could match both filters.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let (a, b) = (self.prefix_value(), other.prefix_value());
        let prefixes = a.starts_with(b) || b.starts_with(a);

        let (a, b) = (self.suffix_value(), other.suffix_value());
        let suffixes = a.ends_with(b) || b.ends_with(a);

        prefixes && suffixes
    }
}

fn check_literal(value: &str) -> Result<(), ConstructionError> {
    if value.contains(WILDCARD_CHARS) {
        return Err(ConstructionError::InvalidFilter {
            value: value.to_string(),
            reason: "filters are literal, wildcards are not allowed",
        });
    }

    Ok(())
}

///
/// Notification
///
/// Trigger edge: `event` on `bucket` with a key matching `filter` invokes
/// `target`. Carries no access rights of its own.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Notification {
    bucket: BucketRef,
    event: EventType,
    filter: KeyFilter,
    target: FunctionRef,
}

impl Notification {
    #[must_use]
    pub const fn new(
        bucket: BucketRef,
        event: EventType,
        filter: KeyFilter,
        target: FunctionRef,
    ) -> Self {
        Self {
            bucket,
            event,
            filter,
            target,
        }
    }

    #[must_use]
    pub const fn bucket(&self) -> &BucketRef {
        &self.bucket
    }

    #[must_use]
    pub const fn event(&self) -> EventType {
        self.event
    }

    #[must_use]
    pub const fn filter(&self) -> &KeyFilter {
        &self.filter
    }

    #[must_use]
    pub const fn target(&self) -> &FunctionRef {
        &self.target
    }

    /// Would an `event` on `key` in `bucket` fire this rule?
    #[must_use]
    pub fn fires_on(&self, bucket: &BucketRef, event: EventType, key: &str) -> bool {
        self.bucket == *bucket && self.event == event && self.filter.matches(key)
    }
}

impl ValidateNode for Notification {
    fn validate(&self, topology: &Topology) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if let Err(e) = topology.cast_resource::<Bucket>(&self.bucket) {
            errs.add(e);
        }
        if let Err(e) = topology.cast_resource::<Function>(&self.target) {
            errs.add(e);
        }

        errs.result()
    }
}

impl VisitableNode for Notification {
    fn route_key(&self) -> String {
        format!("notify({} -> {})", self.bucket, self.target)
    }
}
