use derive_more::Display;
use lakeform_config_build::{TargetConfig, ToolchainConfig};
use serde::Serialize;

///
/// Access
///
/// What a grant allows. Read and write are disjoint and never implied by
/// one another.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
#[remain::sorted]
pub enum Access {
    #[display("read")]
    Read,
    #[display("write")]
    Write,
}

impl Access {
    /// Concrete actions covered by this access level.
    #[must_use]
    pub const fn actions(self) -> &'static [Action] {
        match self {
            Self::Read => &[Action::List, Action::Get],
            Self::Write => &[Action::Put],
        }
    }
}

///
/// Action
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
#[remain::sorted]
pub enum Action {
    #[display("get")]
    Get,
    #[display("list")]
    List,
    #[display("put")]
    Put,
}

///
/// AttributeType
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[remain::sorted]
pub enum AttributeType {
    #[display("BINARY")]
    Binary,
    #[display("NUMBER")]
    Number,
    #[display("STRING")]
    String,
}

///
/// BucketEncryption
///
/// Has no unencrypted variant.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketEncryption {
    #[default]
    #[display("s3_managed")]
    S3Managed,
    #[display("kms_managed")]
    KmsManaged,
}

///
/// TableEncryption
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableEncryption {
    #[default]
    #[display("aws_managed")]
    AwsManaged,
    #[display("owned")]
    Owned,
}

///
/// EventType
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[display("object_created")]
    ObjectCreated,
    #[display("object_removed")]
    ObjectRemoved,
}

///
/// Platform
///
/// Target OS/architecture for one build. Injected per BuildSpec.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::from(&TargetConfig::default())
    }
}

impl From<&TargetConfig> for Platform {
    fn from(config: &TargetConfig) -> Self {
        Self::new(&config.os, &config.arch)
    }
}

///
/// Toolchain
///
/// Commands used to test and compile a function inside its build
/// environment, and the runtime/image the artifact targets.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Toolchain {
    pub test_command: String,
    pub build_command: String,
    pub runtime: String,
    pub image: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::from(&ToolchainConfig::default())
    }
}

impl From<&ToolchainConfig> for Toolchain {
    fn from(config: &ToolchainConfig) -> Self {
        Self {
            test_command: config.test.clone(),
            build_command: config.build.clone(),
            runtime: config.runtime.clone(),
            image: config.image.clone(),
        }
    }
}
