//! Bundling: test, compile and stage one function binary.

use crate::{
    asset::Asset,
    error::BuildError,
    sandbox::{BuildEnvironment, StepOutput, Workspace},
};
use lakeform_schema::node::{BINARY_NAME, BuildSpec, BuildStep, StepKind};
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info};

/// Output lines kept in a step failure.
pub const FAILURE_TAIL_LINES: usize = 20;

///
/// Bundler
///

pub struct Bundler<'a> {
    environment: &'a dyn BuildEnvironment,
}

impl<'a> Bundler<'a> {
    #[must_use]
    pub const fn new(environment: &'a dyn BuildEnvironment) -> Self {
        Self { environment }
    }

    ///
    /// bundle
    ///
    /// Run every step of `spec` in a fresh workspace and copy the resulting
    /// binary into `stage_dir`. The workspace is dropped on every path;
    /// nothing reaches `stage_dir` unless all steps succeeded.
    ///
    pub fn bundle(
        &self,
        function: &str,
        spec: &BuildSpec,
        stage_dir: &Path,
    ) -> Result<Asset, BuildError> {
        info!(
            function,
            environment = self.environment.name(),
            source = %spec.source_folder().display(),
            "bundling function"
        );

        let workspace = Workspace::prepare(spec.source_folder())?;
        let env = spec.required_environment();

        for step in spec.steps() {
            let output = self.environment.run_step(&workspace, step, &env)?;
            check_step(function, step, &output)?;
            debug!(function, step = %step.kind, "build step succeeded");
        }

        let binary = single_binary(&workspace)?;
        let bytes = fs::read(&binary).map_err(|e| BuildError::io("reading", &binary, e))?;
        let asset = Asset::new(function, format!("{:x}", Sha256::digest(&bytes)));

        let dir = asset.path_in(stage_dir);
        fs::create_dir_all(&dir).map_err(|e| BuildError::io("creating", &dir, e))?;
        fs::copy(&binary, dir.join(BINARY_NAME))
            .map_err(|e| BuildError::io("staging", &binary, e))?;

        info!(function, hash = %asset.hash, "bundled function");

        Ok(asset)
    }
}

fn check_step(function: &str, step: &BuildStep, output: &StepOutput) -> Result<(), BuildError> {
    if output.success() {
        return Ok(());
    }

    let status = output.status_label();
    let tail = output.tail(FAILURE_TAIL_LINES);
    error!(function, step = %step.kind, %status, "build step failed");

    Err(match step.kind {
        StepKind::Test => BuildError::TestsFailed {
            status,
            output: tail,
        },
        StepKind::Compile => BuildError::CompileFailed {
            status,
            output: tail,
        },
    })
}

// The output directory must hold `main` and nothing else.
fn single_binary(workspace: &Workspace) -> Result<PathBuf, BuildError> {
    let binary = workspace.binary();
    if !binary.is_file() {
        return Err(BuildError::MissingArtifact { path: binary });
    }

    let output = workspace.output();
    let mut entries = Vec::new();
    for entry in fs::read_dir(output).map_err(|e| BuildError::io("reading", output, e))? {
        let entry = entry.map_err(|e| BuildError::io("reading", output, e))?;
        entries.push(entry.file_name().to_string_lossy().into_owned());
    }

    if entries.len() != 1 {
        entries.sort();
        return Err(BuildError::UnexpectedOutput { entries });
    }

    Ok(binary)
}
