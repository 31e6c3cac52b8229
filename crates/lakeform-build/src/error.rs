use lakeform_schema::node::StepKind;
use std::path::PathBuf;
use thiserror::Error as ThisError;

///
/// BuildError
///
/// Failure inside one function's build pipeline. No artifact is produced
/// when any of these is returned.
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum BuildError {
    #[error("compile step failed (exit {status}): {output}")]
    CompileFailed { status: String, output: String },

    #[error("io error while {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compile step did not produce '{}'", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("could not start {step} step in {environment}: {source}")]
    Spawn {
        step: StepKind,
        environment: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("test suite failed (exit {status}): {output}")]
    TestsFailed { status: String, output: String },

    #[error("build output must be a single binary, found: {}", entries.join(", "))]
    UnexpectedOutput { entries: Vec<String> },
}

impl BuildError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

///
/// SynthError
///

#[derive(Debug, ThisError)]
pub enum SynthError {
    #[error(transparent)]
    Schema(#[from] lakeform_schema::Error),

    #[error("bundling function '{function}' failed: {source}")]
    Build {
        function: String,
        #[source]
        source: BuildError,
    },

    #[error("io error while {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("refusing to write assembly to '{}': {reason}", path.display())]
    OutputDir { path: PathBuf, reason: String },
}

impl SynthError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
