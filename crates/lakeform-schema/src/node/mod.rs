mod bucket;
mod build_spec;
mod function;
mod grant;
mod notification;
mod table;

pub use bucket::*;
pub use build_spec::*;
pub use function::*;
pub use grant::*;
pub use notification::*;
pub use table::*;

use crate::{error::ErrorTree, topology::Topology, visit::Visitor};
use derive_more::{Deref, Display};
use serde::Serialize;
use std::{any::Any, path::PathBuf};
use thiserror::Error as ThisError;

///
/// ConstructionError
///
/// Invalid declaration input. Raised before anything is built.
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum ConstructionError {
    #[error("capacity '{field}' of table '{table}' must be greater than zero")]
    Capacity { table: String, field: &'static str },

    #[error("resource id '{0}' is already declared")]
    DuplicateId(String),

    #[error("grant for '{principal}' must name at least one access level")]
    EmptyAccess { principal: String },

    #[error("invalid build steps: {0}")]
    InvalidBuildSteps(String),

    #[error("invalid key filter '{value}': {reason}")]
    InvalidFilter { value: String, reason: &'static str },

    #[error("invalid resource id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("invalid key prefix '{prefix}': {reason}")]
    InvalidKeyPrefix { prefix: String, reason: &'static str },

    #[error("invalid key schema on table '{table}': {reason}")]
    KeySchema { table: String, reason: &'static str },

    #[error("memory size {value} MB is outside {min}-{max} MB")]
    MemorySize { value: u32, min: u32, max: u32 },

    #[error("key prefixes only apply to buckets, '{resource}' is a table")]
    PrefixOnTable { resource: String },

    #[error("source folder '{}' {reason}", path.display())]
    SourceFolder { path: PathBuf, reason: &'static str },

    #[error("timeout of {seconds}s is outside 1-{max}s")]
    Timeout { seconds: u64, max: u64 },

    #[error("timeout of {millis}ms is not a whole number of seconds")]
    TimeoutFraction { millis: u128 },
}

///
/// ReferenceError
///
/// An edge names an endpoint that does not exist (yet) in the topology.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ReferenceError {
    #[error("{kind} '{id}' is not declared in this topology")]
    Undeclared { kind: ResourceKind, id: String },

    #[error("'{id}' is a {found}, expected a {expected}")]
    WrongKind {
        id: String,
        expected: ResourceKind,
        found: ResourceKind,
    },
}

///
/// ResourceKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[display("bucket")]
    Bucket,
    #[display("function")]
    Function,
    #[display("table")]
    Table,
}

///
/// Resource
///
/// Every node that owns an id in the topology.
///

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Bucket(Bucket),
    Function(Function),
    Table(Table),
}

impl Resource {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Bucket(node) => node.id(),
            Self::Function(node) => node.id(),
            Self::Table(node) => node.id(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Bucket(_) => ResourceKind::Bucket,
            Self::Function(_) => ResourceKind::Function,
            Self::Table(_) => ResourceKind::Table,
        }
    }

    pub(crate) fn as_node(&self) -> &dyn ResourceNode {
        match self {
            Self::Bucket(node) => node,
            Self::Function(node) => node,
            Self::Table(node) => node,
        }
    }
}

///
/// ResourceNode
///
/// Typed access into `Resource`, used by `Topology::cast_resource`.
///

pub trait ResourceNode: Any {
    fn kind() -> ResourceKind
    where
        Self: Sized;

    fn id(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

///
/// ValidateNode
///
/// Node-local checks. Runs with read access to the whole topology so a
/// node can inspect what it points at.
///

pub trait ValidateNode {
    fn validate(&self, _topology: &Topology) -> Result<(), ErrorTree> {
        Ok(())
    }
}

///
/// VisitableNode
///

pub trait VisitableNode: ValidateNode {
    /// Route segment used to key validation errors; empty means "no segment".
    fn route_key(&self) -> String {
        String::new()
    }

    fn accept<V: Visitor>(&self, visitor: &mut V) {
        visitor.enter(self);
        self.drive(visitor);
        visitor.exit(self);
    }

    fn drive<V: Visitor>(&self, _: &mut V) {}
}

//
// Handles
//
// Returned by `Topology::add_*`. A handle is only an id; the topology checks
// it still refers to a node of the right kind whenever an edge is declared.
//

///
/// BucketRef
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct BucketRef(pub(crate) String);

///
/// TableRef
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TableRef(pub(crate) String);

///
/// FunctionRef
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct FunctionRef(pub(crate) String);

///
/// ResourceRef
///
/// Target of a grant: a bucket or a table.
///

#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceRef {
    Bucket(BucketRef),
    Table(TableRef),
}

impl ResourceRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Bucket(r) => r,
            Self::Table(r) => r,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Bucket(_) => ResourceKind::Bucket,
            Self::Table(_) => ResourceKind::Table,
        }
    }
}

impl From<&BucketRef> for ResourceRef {
    fn from(r: &BucketRef) -> Self {
        Self::Bucket(r.clone())
    }
}

impl From<&TableRef> for ResourceRef {
    fn from(r: &TableRef) -> Self {
        Self::Table(r.clone())
    }
}

///
/// RoleRef
/// Externally managed execution role.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RoleRef(String);

impl RoleRef {
    #[must_use]
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }
}

///
/// LayerRef
/// Externally managed function layer.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct LayerRef(String);

impl LayerRef {
    #[must_use]
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }
}
