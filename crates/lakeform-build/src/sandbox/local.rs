use super::{BuildEnvironment, StepOutput, Workspace};
use crate::error::BuildError;
use lakeform_schema::node::{BuildStep, ENV_ASSET_OUTPUT};
use std::{collections::BTreeMap, process::Command};
use tracing::debug;

/// Host variables forwarded into a local build by default.
pub const DEFAULT_PASSTHROUGH: [&str; 2] = ["PATH", "HOME"];

///
/// LocalSandbox
///
/// Runs steps with `sh -c` on the host, inside the workspace copy of the
/// source and with a cleared environment.
///

#[derive(Clone, Debug)]
pub struct LocalSandbox {
    shell: String,
    passthrough: Vec<String>,
}

impl LocalSandbox {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            passthrough: DEFAULT_PASSTHROUGH.iter().map(ToString::to_string).collect(),
        }
    }

    /// Forward one more host variable (e.g. `GOPATH`) into every step.
    #[must_use]
    pub fn with_passthrough(mut self, key: impl Into<String>) -> Self {
        self.passthrough.push(key.into());
        self
    }

    pub(crate) fn command(
        &self,
        workspace: &Workspace,
        step: &BuildStep,
        env: &BTreeMap<String, String>,
    ) -> Command {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&step.command)
            .current_dir(workspace.input())
            .env_clear();

        for key in &self.passthrough {
            if let Some(value) = std::env::var_os(key) {
                command.env(key, value);
            }
        }
        command.envs(env).env(ENV_ASSET_OUTPUT, workspace.output());

        command
    }
}

impl Default for LocalSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildEnvironment for LocalSandbox {
    fn name(&self) -> &'static str {
        "local sandbox"
    }

    fn run_step(
        &self,
        workspace: &Workspace,
        step: &BuildStep,
        env: &BTreeMap<String, String>,
    ) -> Result<StepOutput, BuildError> {
        debug!(step = %step.kind, command = %step.command, "running local build step");

        let output = self
            .command(workspace, step, env)
            .output()
            .map_err(|source| BuildError::Spawn {
                step: step.kind,
                environment: self.name(),
                source,
            })?;

        Ok(output.into())
    }
}
