//! ## Crate layout
//! - `build`: isolated build environments, bundling and synthesis.
//! - `config`: `lakeform.toml` loading.
//! - `schema`: resource nodes, grants, notification rules and the topology.
//!
//! Stack definitions normally only need `lakeform::prelude::*`.

pub use lakeform_build as build;
pub use lakeform_config_build as config;
pub use lakeform_schema as schema;

pub use lakeform_build::{Assembly, synth, synth_with_config};

use thiserror::Error as ThisError;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Error
///
/// Anything a stack definition can fail with, from loading the config file
/// to writing the assembly.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Schema(#[from] schema::Error),

    #[error(transparent)]
    Synth(#[from] build::SynthError),
}

impl From<schema::node::ConstructionError> for Error {
    fn from(err: schema::node::ConstructionError) -> Self {
        Self::Schema(err.into())
    }
}

impl From<schema::node::ReferenceError> for Error {
    fn from(err: schema::node::ReferenceError) -> Self {
        Self::Schema(err.into())
    }
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Assembly, Error,
        build::{
            BuildError, SynthError,
            sandbox::{BuildEnvironment, ContainerSandbox, LocalSandbox},
        },
        config::{Config, SandboxKind},
        synth, synth_with_config,
    };
    pub use lakeform_schema::prelude::*;
}
