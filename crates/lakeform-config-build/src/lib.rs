//! Build-time configuration for lakeform stacks.
//!
//! Loaded from `lakeform.toml`. Every section is optional and falls back to
//! the single supported target (linux/amd64, Go toolchain, container sandbox).

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

/// Default configuration file name looked up next to a stack definition.
pub const CONFIG_FILE_NAME: &str = "lakeform.toml";

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// Config
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub target: TargetConfig,
    pub toolchain: ToolchainConfig,
    pub synth: SynthConfig,
}

impl Config {
    /// Load and parse a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&raw)
    }

    /// Load `lakeform.toml` from `dir` if it exists, otherwise return defaults.
    pub fn load_or_default(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}

///
/// TargetConfig
///
/// The one OS/architecture pair every function artifact is compiled for.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    pub os: String,
    pub arch: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        }
    }
}

///
/// ToolchainConfig
///
/// Shell commands run inside the build environment. `build` must write the
/// binary to `$ASSET_OUTPUT/main`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    pub test: String,
    pub build: String,
    pub runtime: String,
    pub image: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            test: "go test -v".to_string(),
            build: r#"CGO_ENABLED=0 GOOS="$TARGET_OS" GOARCH="$TARGET_ARCH" go build -o "$ASSET_OUTPUT/main""#
                .to_string(),
            runtime: "go1.x".to_string(),
            image: "public.ecr.aws/sam/build-go1.x".to_string(),
        }
    }
}

///
/// SandboxKind
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxKind {
    /// Opt-in: runs steps on the host with the host toolchain.
    Local,
    #[default]
    Container,
}

///
/// SynthConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    pub out_dir: PathBuf,
    pub sandbox: SandboxKind,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("lakeform.out"),
            sandbox: SandboxKind::Container,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, Config::default());
        assert_eq!(config.target.os, "linux");
        assert_eq!(config.target.arch, "amd64");
        assert_eq!(config.synth.sandbox, SandboxKind::Container);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml_str(
            r#"
            [target]
            arch = "arm64"

            [synth]
            sandbox = "local"
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.target.os, "linux");
        assert_eq!(config.target.arch, "arm64");
        assert_eq!(config.synth.sandbox, SandboxKind::Local);
        assert_eq!(config.toolchain, ToolchainConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("[target]\nplatform = \"windows\"\n")
            .expect_err("unknown key should fail");

        assert!(
            err.to_string().contains("platform"),
            "error should name the unknown key, got: {err}"
        );
    }

    #[test]
    fn load_or_default_falls_back_when_file_is_absent() {
        let dir = std::env::temp_dir().join("lakeform-config-build-absent");
        let config = Config::load_or_default(&dir).expect("missing file should fall back");

        assert_eq!(config, Config::default());
    }

    #[test]
    fn default_build_command_targets_fixed_output_path() {
        let toolchain = ToolchainConfig::default();

        assert!(toolchain.build.contains("$ASSET_OUTPUT/main"));
        assert!(toolchain.build.contains("CGO_ENABLED=0"));
    }
}
