//! Isolated build environments.
//!
//! A build runs inside a `Workspace`: a throwaway directory holding a copy of
//! the function source (`asset-input`) and an empty `asset-output`. The
//! workspace is removed when dropped, whether the build succeeded or not.

mod container;
mod local;

pub use container::ContainerSandbox;
pub use local::LocalSandbox;

use crate::error::BuildError;
use lakeform_config_build::{SandboxKind, SynthConfig, ToolchainConfig};
use lakeform_schema::node::{BINARY_NAME, BuildStep};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    process::Output,
};
use tempfile::TempDir;
use tracing::debug;

/// Directory name of the source copy inside a workspace.
pub const INPUT_DIR: &str = "asset-input";

/// Directory name the compile step writes the binary into.
pub const OUTPUT_DIR: &str = "asset-output";

///
/// BuildEnvironment
///
/// Runs one build step against a prepared workspace. `env` already holds
/// the target variables; implementations add `ASSET_OUTPUT` themselves
/// because its value depends on how the workspace is mounted.
///

pub trait BuildEnvironment {
    fn name(&self) -> &'static str;

    fn run_step(
        &self,
        workspace: &Workspace,
        step: &BuildStep,
        env: &BTreeMap<String, String>,
    ) -> Result<StepOutput, BuildError>;
}

/// Pick the environment configured in `[synth] sandbox`.
#[must_use]
pub fn from_config(synth: &SynthConfig, toolchain: &ToolchainConfig) -> Box<dyn BuildEnvironment> {
    match synth.sandbox {
        SandboxKind::Local => Box::new(LocalSandbox::new()),
        SandboxKind::Container => Box::new(ContainerSandbox::new(&toolchain.image)),
    }
}

///
/// StepOutput
///

#[derive(Clone, Debug, Default)]
pub struct StepOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StepOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }

    /// Exit status for error messages; `signal` when killed.
    #[must_use]
    pub fn status_label(&self) -> String {
        self.status
            .map_or_else(|| "signal".to_string(), |code| code.to_string())
    }

    /// Last lines of combined output, enough to see why a step failed.
    #[must_use]
    pub fn tail(&self, lines: usize) -> String {
        let separator = if self.stdout.is_empty() || self.stdout.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        let combined = format!("{}{separator}{}", self.stdout, self.stderr);
        let all: Vec<&str> = combined.lines().collect();
        let start = all.len().saturating_sub(lines);

        all[start..].join("\n")
    }
}

impl From<Output> for StepOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

///
/// Workspace
///

#[derive(Debug)]
pub struct Workspace {
    root: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace and copy `source` into it.
    pub fn prepare(source: &Path) -> Result<Self, BuildError> {
        let root = tempfile::Builder::new()
            .prefix("lakeform-build-")
            .tempdir()
            .map_err(|e| BuildError::io("creating workspace", std::env::temp_dir(), e))?;

        let input = root.path().join(INPUT_DIR);
        let output = root.path().join(OUTPUT_DIR);
        copy_dir(source, &input)?;
        fs::create_dir(&output).map_err(|e| BuildError::io("creating", &output, e))?;

        Ok(Self {
            root,
            input,
            output,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Where the compile step must leave the binary.
    #[must_use]
    pub fn binary(&self) -> PathBuf {
        self.output.join(BINARY_NAME)
    }
}

// Recursive copy in sorted order. File symlinks are copied as the files they
// point to; directory symlinks are skipped so a link to an ancestor cannot loop.
fn copy_dir(from: &Path, to: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(to).map_err(|e| BuildError::io("creating", to, e))?;

    let mut entries = fs::read_dir(from)
        .map_err(|e| BuildError::io("reading", from, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BuildError::io("reading", from, e))?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let src = entry.path();
        let dst = to.join(entry.file_name());

        let file_type = entry
            .file_type()
            .map_err(|e| BuildError::io("reading", &src, e))?;

        if file_type.is_dir() {
            copy_dir(&src, &dst)?;
            continue;
        }
        if file_type.is_symlink() {
            let target = fs::metadata(&src).map_err(|e| BuildError::io("resolving", &src, e))?;
            if target.is_dir() {
                debug!(link = %src.display(), "skipping directory symlink");
                continue;
            }
        }

        fs::copy(&src, &dst).map_err(|e| BuildError::io("copying", &src, e))?;
    }

    Ok(())
}
