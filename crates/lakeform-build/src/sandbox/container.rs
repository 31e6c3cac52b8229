use super::{BuildEnvironment, StepOutput, Workspace};
use crate::error::BuildError;
use lakeform_schema::node::{BuildStep, ENV_ASSET_OUTPUT};
use std::{collections::BTreeMap, process::Command};
use tracing::debug;

/// Mount point of the source copy inside the container.
pub const CONTAINER_INPUT: &str = "/asset-input";

/// Mount point of the output directory inside the container.
pub const CONTAINER_OUTPUT: &str = "/asset-output";

///
/// ContainerSandbox
///
/// Runs every step in a fresh `docker run --rm` container of the toolchain
/// image. Source is mounted read-only; only `/asset-output` is writable
/// from the host's point of view.
///

#[derive(Clone, Debug)]
pub struct ContainerSandbox {
    program: String,
    image: String,
    user: String,
}

impl ContainerSandbox {
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            program: "docker".to_string(),
            image: image.into(),
            user: "root".to_string(),
        }
    }

    /// Use a docker-compatible CLI such as `podman`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Arguments passed to the container CLI for one step.
    #[must_use]
    pub fn run_args(
        &self,
        workspace: &Workspace,
        step: &BuildStep,
        env: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-u".to_string(),
            self.user.clone(),
            "-v".to_string(),
            format!("{}:{CONTAINER_INPUT}:ro", workspace.input().display()),
            "-v".to_string(),
            format!("{}:{CONTAINER_OUTPUT}", workspace.output().display()),
            "-w".to_string(),
            CONTAINER_INPUT.to_string(),
        ];

        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push("-e".to_string());
        args.push(format!("{ENV_ASSET_OUTPUT}={CONTAINER_OUTPUT}"));

        args.push(self.image.clone());
        args.push("bash".to_string());
        args.push("-c".to_string());
        args.push(step.command.clone());

        args
    }
}

impl BuildEnvironment for ContainerSandbox {
    fn name(&self) -> &'static str {
        "container sandbox"
    }

    fn run_step(
        &self,
        workspace: &Workspace,
        step: &BuildStep,
        env: &BTreeMap<String, String>,
    ) -> Result<StepOutput, BuildError> {
        debug!(
            step = %step.kind,
            image = %self.image,
            command = %step.command,
            "running container build step"
        );

        let output = Command::new(&self.program)
            .args(self.run_args(workspace, step, env))
            .output()
            .map_err(|source| BuildError::Spawn {
                step: step.kind,
                environment: self.name(),
                source,
            })?;

        Ok(output.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeform_schema::node::StepKind;
    use tempfile::tempdir;

    #[test]
    fn run_args_mount_workspace_and_export_build_variables() {
        let source = tempdir().unwrap();
        let workspace = Workspace::prepare(source.path()).unwrap();
        let env = BTreeMap::from([
            ("STATIC_LINK".to_string(), "true".to_string()),
            ("TARGET_ARCH".to_string(), "amd64".to_string()),
            ("TARGET_OS".to_string(), "linux".to_string()),
        ]);
        let step = BuildStep::new(StepKind::Test, "go test -v");

        let args = ContainerSandbox::new("public.ecr.aws/sam/build-go1.x").run_args(
            &workspace,
            &step,
            &env,
        );

        let input_mount = format!("{}:/asset-input:ro", workspace.input().display());
        assert!(args.contains(&input_mount), "args: {args:?}");
        assert!(args.contains(&"TARGET_OS=linux".to_string()));
        assert!(args.contains(&"ASSET_OUTPUT=/asset-output".to_string()));
        assert_eq!(
            &args[args.len() - 4..],
            &["public.ecr.aws/sam/build-go1.x", "bash", "-c", "go test -v"]
        );
        assert_eq!(&args[..4], &["run", "--rm", "-u", "root"]);
    }

    #[test]
    fn missing_cli_is_a_spawn_error() {
        let source = tempdir().unwrap();
        let workspace = Workspace::prepare(source.path()).unwrap();
        let sandbox = ContainerSandbox::new("image").with_program("lakeform-no-such-docker");
        let step = BuildStep::new(StepKind::Test, "true");

        let err = sandbox
            .run_step(&workspace, &step, &BTreeMap::new())
            .expect_err("missing program should fail to spawn");
        assert!(matches!(err, BuildError::Spawn { step: StepKind::Test, .. }));
    }
}
