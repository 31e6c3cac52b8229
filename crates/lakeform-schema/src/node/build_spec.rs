use crate::prelude::*;
use derive_more::Display;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Environment key carrying the target operating system.
pub const ENV_TARGET_OS: &str = "TARGET_OS";

/// Environment key carrying the target architecture.
pub const ENV_TARGET_ARCH: &str = "TARGET_ARCH";

/// Environment key carrying the static-link flag.
pub const ENV_STATIC_LINK: &str = "STATIC_LINK";

/// Build-only variable pointing at the directory the binary must land in.
pub const ENV_ASSET_OUTPUT: &str = "ASSET_OUTPUT";

/// File name of the compiled binary inside the output directory. Also the
/// function handler.
pub const BINARY_NAME: &str = "main";

///
/// StepKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    #[display("test")]
    Test,
    #[display("compile")]
    Compile,
}

///
/// BuildStep
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BuildStep {
    pub kind: StepKind,
    pub command: String,
}

impl BuildStep {
    #[must_use]
    pub fn new(kind: StepKind, command: impl Into<String>) -> Self {
        Self {
            kind,
            command: command.into(),
        }
    }
}

///
/// BuildSpec
///
/// How one function artifact is produced: run the source folder's tests,
/// then cross-compile one static binary to `$ASSET_OUTPUT/main`.
///

#[derive(Clone, Debug, Serialize)]
pub struct BuildSpec {
    source_folder: PathBuf,
    platform: Platform,
    static_link_only: bool,
    toolchain: Toolchain,
    steps: Vec<BuildStep>,
}

impl BuildSpec {
    pub fn new(
        source_folder: impl AsRef<Path>,
        platform: Platform,
        toolchain: Toolchain,
    ) -> Result<Self, ConstructionError> {
        let source_folder = resolve_source_folder(source_folder.as_ref())?;
        let steps = vec![
            BuildStep::new(StepKind::Test, toolchain.test_command.clone()),
            BuildStep::new(StepKind::Compile, toolchain.build_command.clone()),
        ];

        let spec = Self {
            source_folder,
            platform,
            static_link_only: true,
            toolchain,
            steps,
        };
        check_steps(&spec.steps).map_err(ConstructionError::InvalidBuildSteps)?;

        Ok(spec)
    }

    #[must_use]
    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }

    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    #[must_use]
    pub const fn static_link_only(&self) -> bool {
        self.static_link_only
    }

    #[must_use]
    pub const fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    #[must_use]
    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    /// The system-owned variables every build and every function carries.
    #[must_use]
    pub fn required_environment(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (ENV_TARGET_OS.to_string(), self.platform.os.clone()),
            (ENV_TARGET_ARCH.to_string(), self.platform.arch.clone()),
            (
                ENV_STATIC_LINK.to_string(),
                self.static_link_only.to_string(),
            ),
        ])
    }
}

impl ValidateNode for BuildSpec {
    fn validate(&self, _: &Topology) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if !self.source_folder.is_dir() {
            err!(
                errs,
                "source folder '{}' no longer exists",
                self.source_folder.display()
            );
        }
        if !self.static_link_only {
            err!(errs, "artifacts must be statically linked");
        }
        if let Err(reason) = check_steps(&self.steps) {
            errs.add(reason);
        }

        errs.result()
    }
}

impl VisitableNode for BuildSpec {
    fn route_key(&self) -> String {
        "build".to_string()
    }
}

// resolve_source_folder
fn resolve_source_folder(path: &Path) -> Result<PathBuf, ConstructionError> {
    let invalid = |reason| ConstructionError::SourceFolder {
        path: path.to_path_buf(),
        reason,
    };

    if path.as_os_str().is_empty() {
        return Err(invalid("is empty"));
    }
    if !path.exists() {
        return Err(invalid("does not exist"));
    }
    if !path.is_dir() {
        return Err(invalid("is not a directory"));
    }

    path.canonicalize().map_err(|_| invalid("cannot be resolved"))
}

// Tests first, exactly one compile step, compile last and aimed at the output dir.
fn check_steps(steps: &[BuildStep]) -> Result<(), String> {
    let Some(first) = steps.first() else {
        return Err("no build steps".to_string());
    };
    if first.kind != StepKind::Test {
        return Err(format!("first step must run tests, found {}", first.kind));
    }

    let compiles = steps.iter().filter(|s| s.kind == StepKind::Compile).count();
    if compiles != 1 {
        return Err(format!("expected exactly one compile step, found {compiles}"));
    }

    let last = &steps[steps.len() - 1];
    if last.kind != StepKind::Compile {
        return Err("compile must be the last step".to_string());
    }
    if !last.command.contains(ENV_ASSET_OUTPUT) {
        return Err(format!(
            "compile step must write to ${ENV_ASSET_OUTPUT}/{BINARY_NAME}"
        ));
    }
    if steps.iter().any(|s| s.command.trim().is_empty()) {
        return Err("build step command is empty".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn steps_run_tests_before_compiling() {
        let dir = tempdir().unwrap();
        let spec = BuildSpec::new(dir.path(), Platform::default(), Toolchain::default()).unwrap();

        let kinds: Vec<_> = spec.steps().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Test, StepKind::Compile]);
        assert!(spec.steps()[1].command.contains("$ASSET_OUTPUT/main"));
        assert!(spec.static_link_only());
    }

    #[test]
    fn required_environment_reflects_injected_platform() {
        let dir = tempdir().unwrap();
        let spec = BuildSpec::new(
            dir.path(),
            Platform::new("linux", "arm64"),
            Toolchain::default(),
        )
        .unwrap();

        let env = spec.required_environment();
        assert_eq!(env[ENV_TARGET_OS], "linux");
        assert_eq!(env[ENV_TARGET_ARCH], "arm64");
        assert_eq!(env[ENV_STATIC_LINK], "true");
    }

    #[test]
    fn missing_source_folder_is_rejected() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = BuildSpec::new(&missing, Platform::default(), Toolchain::default())
            .expect_err("missing folder should fail");
        assert!(err.to_string().contains("does not exist"), "got: {err}");
    }

    #[test]
    fn file_as_source_folder_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.go");
        std::fs::write(&file, "package main").unwrap();

        let err = BuildSpec::new(&file, Platform::default(), Toolchain::default())
            .expect_err("file should fail");
        assert!(err.to_string().contains("not a directory"), "got: {err}");
    }

    #[test]
    fn compile_without_output_path_is_rejected() {
        let dir = tempdir().unwrap();
        let toolchain = Toolchain {
            build_command: "go build -o main".to_string(),
            ..Toolchain::default()
        };

        let err = BuildSpec::new(dir.path(), Platform::default(), toolchain)
            .expect_err("compile step must target the output dir");
        assert!(matches!(err, ConstructionError::InvalidBuildSteps(_)));
    }

    #[test]
    fn empty_test_command_is_rejected() {
        let dir = tempdir().unwrap();
        let toolchain = Toolchain {
            test_command: "  ".to_string(),
            ..Toolchain::default()
        };

        assert!(BuildSpec::new(dir.path(), Platform::default(), toolchain).is_err());
    }
}
