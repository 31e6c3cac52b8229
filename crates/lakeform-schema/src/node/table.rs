use crate::{prelude::*, validate::naming::validate_resource_id};
use std::any::Any;

///
/// KeyAttribute
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct KeyAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl KeyAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

///
/// TableProps
///

#[derive(Clone, Debug)]
pub struct TableProps {
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub encryption: TableEncryption,
    pub read_capacity: u32,
    pub write_capacity: u32,
}

impl TableProps {
    /// Provisioned table with the minimum capacity of one unit each way.
    #[must_use]
    pub fn new(partition_key: KeyAttribute) -> Self {
        Self {
            partition_key,
            sort_key: None,
            encryption: TableEncryption::default(),
            read_capacity: 1,
            write_capacity: 1,
        }
    }
}

///
/// Table
///

#[derive(Clone, Debug, Serialize)]
pub struct Table {
    id: String,
    partition_key: KeyAttribute,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_key: Option<KeyAttribute>,

    encryption: TableEncryption,
    read_capacity: u32,
    write_capacity: u32,
}

impl Table {
    pub fn new(id: &str, props: &TableProps) -> Result<Self, ConstructionError> {
        validate_resource_id(id)?;

        let key_schema = |reason| ConstructionError::KeySchema {
            table: id.to_string(),
            reason,
        };
        if props.partition_key.name.trim().is_empty() {
            return Err(key_schema("partition key name is empty"));
        }
        if let Some(sort_key) = &props.sort_key {
            if sort_key.name.trim().is_empty() {
                return Err(key_schema("sort key name is empty"));
            }
            if sort_key.name == props.partition_key.name {
                return Err(key_schema("sort key must differ from partition key"));
            }
        }

        for (field, value) in [
            ("read_capacity", props.read_capacity),
            ("write_capacity", props.write_capacity),
        ] {
            if value == 0 {
                return Err(ConstructionError::Capacity {
                    table: id.to_string(),
                    field,
                });
            }
        }

        Ok(Self {
            id: id.to_string(),
            partition_key: props.partition_key.clone(),
            sort_key: props.sort_key.clone(),
            encryption: props.encryption,
            read_capacity: props.read_capacity,
            write_capacity: props.write_capacity,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Physical table name handed to functions through their environment.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn partition_key(&self) -> &KeyAttribute {
        &self.partition_key
    }

    #[must_use]
    pub const fn sort_key(&self) -> Option<&KeyAttribute> {
        self.sort_key.as_ref()
    }

    #[must_use]
    pub const fn encryption(&self) -> TableEncryption {
        self.encryption
    }

    #[must_use]
    pub const fn read_capacity(&self) -> u32 {
        self.read_capacity
    }

    #[must_use]
    pub const fn write_capacity(&self) -> u32 {
        self.write_capacity
    }
}

impl ResourceNode for Table {
    fn kind() -> ResourceKind {
        ResourceKind::Table
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ValidateNode for Table {
    fn validate(&self, _: &Topology) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if self.read_capacity == 0 || self.write_capacity == 0 {
            err!(
                errs,
                "capacities must be positive (read {}, write {})",
                self.read_capacity,
                self.write_capacity
            );
        }

        errs.result()
    }
}

impl VisitableNode for Table {
    fn route_key(&self) -> String {
        self.id.clone()
    }
}
