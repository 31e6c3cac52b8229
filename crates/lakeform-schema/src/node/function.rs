use crate::{
    MAX_MEMORY_MB, MAX_TIMEOUT_SECS, MIN_MEMORY_MB, prelude::*,
    validate::naming::validate_resource_id,
};
use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    time::Duration,
};
use tracing::debug;

/// Revision of the packaging contract implemented by `FunctionConstruct`.
/// Bumped whenever the build steps or the environment precedence change.
pub const FUNCTION_CONSTRUCT_VERSION: u32 = 1;

///
/// FunctionProps
///
/// Caller input for a function. Borrowed, never modified: one props value
/// can back several declarations.
///

#[derive(Clone, Debug)]
pub struct FunctionProps {
    pub source_folder: PathBuf,
    pub memory_size: u32,
    pub timeout: Duration,
    pub role: Option<RoleRef>,
    pub layers: BTreeSet<LayerRef>,
    pub environment: Option<BTreeMap<String, String>>,
    pub platform: Platform,
    pub toolchain: Toolchain,
}

impl FunctionProps {
    #[must_use]
    pub fn new(source_folder: impl Into<PathBuf>, memory_size: u32, timeout: Duration) -> Self {
        Self {
            source_folder: source_folder.into(),
            memory_size,
            timeout,
            role: None,
            layers: BTreeSet::new(),
            environment: None,
            platform: Platform::default(),
            toolchain: Toolchain::default(),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = Some(environment);
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: RoleRef) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn with_layer(mut self, layer: LayerRef) -> Self {
        self.layers.insert(layer);
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }
}

///
/// FunctionConstruct
///
/// Turns `FunctionProps` into a `Function` declaration. Settings the build
/// depends on are forced; everything else is the caller's.
///

pub struct FunctionConstruct;

impl FunctionConstruct {
    pub fn declare(id: &str, props: &FunctionProps) -> Result<Function, ConstructionError> {
        validate_resource_id(id)?;
        check_limits(props)?;

        let build = BuildSpec::new(
            &props.source_folder,
            props.platform.clone(),
            props.toolchain.clone(),
        )?;
        let environment = merge_environment(props.environment.as_ref(), &build);

        debug!(
            function = id,
            version = FUNCTION_CONSTRUCT_VERSION,
            source = %build.source_folder().display(),
            "declared function"
        );

        Ok(Function {
            id: id.to_string(),
            handler: BINARY_NAME.to_string(),
            runtime: build.toolchain().runtime.clone(),
            memory_size: props.memory_size,
            timeout_seconds: props.timeout.as_secs(),
            role: props.role.clone(),
            layers: props.layers.clone(),
            environment,
            build,
        })
    }
}

///
/// merge_environment
///
/// Precedence: caller keys first, then the system keys of `build`
/// overwrite. The result is a new map; `caller` is left untouched.
///

#[must_use]
pub fn merge_environment(
    caller: Option<&BTreeMap<String, String>>,
    build: &BuildSpec,
) -> BTreeMap<String, String> {
    let mut merged = caller.cloned().unwrap_or_default();

    for (key, value) in build.required_environment() {
        if let Some(previous) = merged.insert(key.clone(), value.clone())
            && previous != value
        {
            debug!(%key, %previous, %value, "system value overrides caller environment");
        }
    }

    merged
}

// Memory and timeout bounds.
fn check_limits(props: &FunctionProps) -> Result<(), ConstructionError> {
    if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&props.memory_size) {
        return Err(ConstructionError::MemorySize {
            value: props.memory_size,
            min: MIN_MEMORY_MB,
            max: MAX_MEMORY_MB,
        });
    }

    if props.timeout.subsec_nanos() != 0 {
        return Err(ConstructionError::TimeoutFraction {
            millis: props.timeout.as_millis(),
        });
    }

    let seconds = props.timeout.as_secs();
    if seconds == 0 || seconds > MAX_TIMEOUT_SECS {
        return Err(ConstructionError::Timeout {
            seconds,
            max: MAX_TIMEOUT_SECS,
        });
    }

    Ok(())
}

///
/// Function
///

#[derive(Clone, Debug, Serialize)]
pub struct Function {
    id: String,
    handler: String,
    runtime: String,
    memory_size: u32,
    timeout_seconds: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<RoleRef>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    layers: BTreeSet<LayerRef>,

    environment: BTreeMap<String, String>,

    #[serde(skip)]
    build: BuildSpec,
}

impl Function {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    #[must_use]
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    #[must_use]
    pub const fn memory_size(&self) -> u32 {
        self.memory_size
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub const fn role(&self) -> Option<&RoleRef> {
        self.role.as_ref()
    }

    #[must_use]
    pub const fn layers(&self) -> &BTreeSet<LayerRef> {
        &self.layers
    }

    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    #[must_use]
    pub const fn build(&self) -> &BuildSpec {
        &self.build
    }
}

impl ResourceNode for Function {
    fn kind() -> ResourceKind {
        ResourceKind::Function
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ValidateNode for Function {
    fn validate(&self, _: &Topology) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        for (key, value) in self.build.required_environment() {
            match self.environment.get(&key) {
                Some(actual) if *actual == value => {}
                Some(actual) => {
                    err!(errs, "environment '{key}' is '{actual}', expected '{value}'");
                }
                None => err!(errs, "environment is missing required key '{key}'"),
            }
        }

        errs.result()
    }
}

impl VisitableNode for Function {
    fn route_key(&self) -> String {
        self.id.clone()
    }

    fn drive<V: Visitor>(&self, v: &mut V) {
        self.build.accept(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    fn props(dir: &TempDir) -> FunctionProps {
        FunctionProps::new(dir.path(), 256, Duration::from_secs(60))
    }

    #[test]
    fn no_environment_gets_required_keys() {
        let dir = tempdir().unwrap();
        let function = FunctionConstruct::declare("convert-lambda", &props(&dir)).unwrap();

        let env = function.environment();
        assert_eq!(env.len(), 3);
        assert_eq!(env[ENV_TARGET_OS], "linux");
        assert_eq!(env[ENV_TARGET_ARCH], "amd64");
        assert_eq!(env[ENV_STATIC_LINK], "true");
    }

    #[test]
    fn conflicting_environment_is_overridden() {
        let dir = tempdir().unwrap();
        let caller = BTreeMap::from([
            (ENV_TARGET_OS.to_string(), "windows".to_string()),
            (ENV_TARGET_ARCH.to_string(), "arm".to_string()),
            (ENV_STATIC_LINK.to_string(), "false".to_string()),
        ]);
        let function =
            FunctionConstruct::declare("convert-lambda", &props(&dir).with_environment(caller))
                .unwrap();

        let env = function.environment();
        assert_eq!(env[ENV_TARGET_OS], "linux");
        assert_eq!(env[ENV_TARGET_ARCH], "amd64");
        assert_eq!(env[ENV_STATIC_LINK], "true");
    }

    #[test]
    fn extra_keys_are_preserved_and_input_is_not_mutated() {
        let dir = tempdir().unwrap();
        let props = props(&dir).with_environment(BTreeMap::from([
            ("TABLE_NAME".to_string(), "go-data-lake".to_string()),
            (ENV_TARGET_OS.to_string(), "darwin".to_string()),
        ]));
        let snapshot = props.environment.clone();

        let first = FunctionConstruct::declare("dynamo-lambda", &props).unwrap();
        let second = FunctionConstruct::declare("dynamo-lambda-copy", &props).unwrap();

        assert_eq!(first.environment()["TABLE_NAME"], "go-data-lake");
        assert_eq!(first.environment()[ENV_TARGET_OS], "linux");
        assert_eq!(first.environment(), second.environment());
        assert_eq!(props.environment, snapshot, "caller map must not change");
    }

    #[test]
    fn handler_and_runtime_follow_toolchain() {
        let dir = tempdir().unwrap();
        let function = FunctionConstruct::declare("convert-lambda", &props(&dir)).unwrap();

        assert_eq!(function.handler(), BINARY_NAME);
        assert_eq!(function.runtime(), "go1.x");
        assert_eq!(function.timeout(), Duration::from_secs(60));
        assert_eq!(function.memory_size(), 256);
    }

    #[test]
    fn zero_memory_and_timeout_are_rejected() {
        let dir = tempdir().unwrap();

        let zero_memory = FunctionProps {
            memory_size: 0,
            ..props(&dir)
        };
        assert!(matches!(
            FunctionConstruct::declare("f", &zero_memory),
            Err(ConstructionError::MemorySize { value: 0, .. })
        ));

        let zero_timeout = FunctionProps {
            timeout: Duration::ZERO,
            ..props(&dir)
        };
        assert!(matches!(
            FunctionConstruct::declare("f", &zero_timeout),
            Err(ConstructionError::Timeout { seconds: 0, .. })
        ));
    }

    #[test]
    fn fractional_timeout_is_rejected_as_such() {
        let dir = tempdir().unwrap();
        let props = FunctionProps {
            timeout: Duration::from_millis(1_500),
            ..props(&dir)
        };

        let err = FunctionConstruct::declare("f", &props).expect_err("1.5s is not whole seconds");
        assert!(matches!(
            err,
            ConstructionError::TimeoutFraction { millis: 1_500 }
        ));
        assert_eq!(
            err.to_string(),
            "timeout of 1500ms is not a whole number of seconds"
        );
    }

    #[test]
    fn missing_source_folder_aborts_before_build() {
        let dir = tempdir().unwrap();
        let props = FunctionProps::new(dir.path().join("src/convert"), 256, Duration::from_secs(60));

        let err = FunctionConstruct::declare("convert-lambda", &props)
            .expect_err("missing source folder should fail");
        assert!(matches!(err, ConstructionError::SourceFolder { .. }));
    }
}
