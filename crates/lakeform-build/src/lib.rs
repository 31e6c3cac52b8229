//! Bundling and synthesis for lakeform stacks.
//!
//! `synth` turns a declared `Topology` into a cloud assembly on disk:
//! `manifest.json` plus one `asset.<sha256>/main` per function binary.

pub mod asset;
pub mod bundle;
pub mod error;
pub mod manifest;
pub mod sandbox;

pub use error::{BuildError, SynthError};

use crate::{
    asset::{ASSET_DIR_PREFIX, Asset},
    bundle::Bundler,
    manifest::{MANIFEST_FILE, Manifest},
    sandbox::BuildEnvironment,
};
use lakeform_config_build::Config;
use lakeform_schema::topology::Topology;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Validate, bundle and write `topology` into `out_dir`.
pub fn synth(
    topology: &Topology,
    environment: &dyn BuildEnvironment,
    out_dir: &Path,
) -> Result<Assembly, SynthError> {
    AssemblyBuilder::new(topology, environment).synth(out_dir)
}

/// `synth` with the sandbox and output directory taken from `config`.
pub fn synth_with_config(topology: &Topology, config: &Config) -> Result<Assembly, SynthError> {
    let environment = sandbox::from_config(&config.synth, &config.toolchain);

    synth(topology, environment.as_ref(), &config.synth.out_dir)
}

///
/// Assembly
///

#[derive(Clone, Debug)]
pub struct Assembly {
    pub manifest: Manifest,
    pub out_dir: PathBuf,
}

impl Assembly {
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(MANIFEST_FILE)
    }

    /// Staged binary of `function`, if it was bundled.
    #[must_use]
    pub fn binary_path(&self, function: &str) -> Option<PathBuf> {
        self.manifest
            .functions
            .iter()
            .find(|f| f.function.id() == function)
            .and_then(|f| f.asset.as_ref())
            .map(|dir| {
                self.out_dir
                    .join(dir)
                    .join(lakeform_schema::node::BINARY_NAME)
            })
    }
}

///
/// AssemblyBuilder
///

pub struct AssemblyBuilder<'a> {
    topology: &'a Topology,
    environment: &'a dyn BuildEnvironment,
}

impl<'a> AssemblyBuilder<'a> {
    #[must_use]
    pub const fn new(topology: &'a Topology, environment: &'a dyn BuildEnvironment) -> Self {
        Self {
            topology,
            environment,
        }
    }

    /// Validated manifest without building anything.
    pub fn plan(&self) -> Result<Manifest, SynthError> {
        self.topology.validate()?;

        Ok(Manifest::from_topology(self.topology, &[]))
    }

    ///
    /// synth
    ///
    /// Everything is written to a staging directory next to `out_dir` and
    /// moved into place at the end. On error `out_dir` is left as it was.
    /// A directory that is not a previous assembly is never replaced.
    ///
    pub fn synth(&self, out_dir: &Path) -> Result<Assembly, SynthError> {
        let stack = self.topology.id();
        info!(stack, out_dir = %out_dir.display(), "synthesizing stack");

        self.topology.validate()?;
        let target = self.check_out_dir(out_dir)?;

        let stage = stage_dir(&target)?;
        let assets = self.bundle_all(stage.path())?;

        let manifest = Manifest::from_topology(self.topology, &assets);
        let manifest_path = stage.path().join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&manifest_path, json)
            .map_err(|e| SynthError::io("writing", &manifest_path, e))?;

        replace_dir(stage.path(), &target)?;
        info!(
            stack,
            functions = assets.len(),
            out_dir = %out_dir.display(),
            "stack synthesized"
        );

        Ok(Assembly {
            manifest,
            out_dir: out_dir.to_path_buf(),
        })
    }

    ///
    /// check_out_dir
    ///
    /// `out_dir` is replaced wholesale, so it must not overlap any function
    /// source and, when it exists, must be empty or a previous assembly.
    /// Returns the absolute path to write to.
    ///
    fn check_out_dir(&self, out_dir: &Path) -> Result<PathBuf, SynthError> {
        let refuse = |reason: String| SynthError::OutputDir {
            path: out_dir.to_path_buf(),
            reason,
        };

        let target = absolute_path(out_dir)?;
        if target.parent().is_none() {
            return Err(refuse("is a filesystem root".to_string()));
        }

        for function in self.topology.functions() {
            let source = function.build().source_folder();
            if source.starts_with(&target) {
                return Err(refuse(format!(
                    "contains the source folder of function '{}'",
                    function.id()
                )));
            }
            if target.starts_with(source) {
                return Err(refuse(format!(
                    "is inside the source folder of function '{}'",
                    function.id()
                )));
            }
        }

        if target.exists() {
            check_previous_assembly(&target).map_err(refuse)?;
        }

        Ok(target)
    }

    // Declaration order; the first failure stops the pass.
    fn bundle_all(&self, stage: &Path) -> Result<Vec<Asset>, SynthError> {
        let bundler = Bundler::new(self.environment);

        self.topology
            .functions()
            .map(|function| {
                bundler
                    .bundle(function.id(), function.build(), stage)
                    .map_err(|source| SynthError::Build {
                        function: function.id().to_string(),
                        source,
                    })
            })
            .collect()
    }
}

// Absolute path with the existing part canonicalized, so it compares
// against canonical source folders.
fn absolute_path(path: &Path) -> Result<PathBuf, SynthError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| SynthError::io("resolving", path, e))?
            .join(path)
    };

    let mut existing = joined.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|e| SynthError::io("resolving", existing, e))?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }

    Ok(resolved)
}

// Empty, or `manifest.json` plus `asset.*` directories and nothing else.
fn check_previous_assembly(dir: &Path) -> Result<(), String> {
    if !dir.is_dir() {
        return Err("exists and is not a directory".to_string());
    }

    let mut entries = 0;
    let mut has_manifest = false;
    for entry in fs::read_dir(dir).map_err(|e| format!("cannot be read: {e}"))? {
        let entry = entry.map_err(|e| format!("cannot be read: {e}"))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        entries += 1;

        if name == MANIFEST_FILE && !is_dir {
            has_manifest = true;
        } else if !(is_dir && name.starts_with(ASSET_DIR_PREFIX)) {
            return Err(format!("holds '{name}', which is not part of an assembly"));
        }
    }

    if entries > 0 && !has_manifest {
        return Err(format!("is not empty and has no {MANIFEST_FILE}"));
    }

    Ok(())
}

fn stage_dir(out_dir: &Path) -> Result<tempfile::TempDir, SynthError> {
    let parent = match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| SynthError::io("creating", parent, e))?;

    tempfile::Builder::new()
        .prefix(".lakeform-stage-")
        .tempdir_in(parent)
        .map_err(|e| SynthError::io("creating staging dir in", parent, e))
}

// The staging TempDir is gone after the rename; its drop ignores that.
fn replace_dir(stage: &Path, out_dir: &Path) -> Result<(), SynthError> {
    if out_dir.exists() {
        fs::remove_dir_all(out_dir).map_err(|e| SynthError::io("removing", out_dir, e))?;
    }

    fs::rename(stage, out_dir).map_err(|e| SynthError::io("moving assembly to", out_dir, e))
}
