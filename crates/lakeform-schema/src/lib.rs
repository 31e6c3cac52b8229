//! Declarative resource graph for lakeform stacks: buckets, tables,
//! functions, grants and notification rules, plus the validation pass that
//! runs before anything is bundled or materialized.

pub mod error;
pub mod node;
pub mod topology;
pub mod types;
pub mod validate;
pub mod visit;

/// Maximum length for resource identifiers.
pub const MAX_RESOURCE_ID_LEN: usize = 64;

/// Smallest memory size a function may be declared with, in MB.
pub const MIN_MEMORY_MB: u32 = 128;

/// Largest memory size a function may be declared with, in MB.
pub const MAX_MEMORY_MB: u32 = 10_240;

/// Longest timeout a function may be declared with, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 900;

use crate::node::{ConstructionError, ReferenceError};
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        err,
        error::ErrorTree,
        node::*,
        topology::Topology,
        types::{
            Access, Action, AttributeType, BucketEncryption, EventType, Platform, TableEncryption,
            Toolchain,
        },
        visit::Visitor,
    };
    pub use serde::Serialize;
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("validation failed:\n{0}")]
    Validation(error::ErrorTree),
}
