//! The go-go data lake: raw CSV files land in a bucket, `convert-lambda`
//! turns them into parquet under `curated/`, and `dynamo-lambda` loads the
//! curated records into a table keyed by day.

use lakeform::prelude::*;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

pub const STACK_ID: &str = "go-go-data-lake";

pub const BUCKET_ID: &str = "go-go-bucket";
pub const TABLE_ID: &str = "go-data-lake";
pub const CONVERT_FUNCTION_ID: &str = "convert-lambda";
pub const DYNAMO_FUNCTION_ID: &str = "dynamo-lambda";

pub const LANDING_PREFIX: &str = "landing/";
pub const CURATED_PREFIX: &str = "curated/";
pub const CSV_SUFFIX: &str = ".csv";
pub const PARQUET_SUFFIX: &str = ".parquet";

/// Variable the load function reads its table name from.
pub const ENV_TABLE_NAME: &str = "TABLE_NAME";

const FUNCTION_MEMORY_MB: u32 = 256;
const FUNCTION_TIMEOUT: Duration = Duration::from_secs(60);

///
/// DataLakeStack
///

#[derive(Debug)]
pub struct DataLakeStack {
    topology: Topology,
    pub bucket: BucketRef,
    pub table: TableRef,
    pub convert: FunctionRef,
    pub dynamo: FunctionRef,
}

impl DataLakeStack {
    ///
    /// declare
    ///
    /// `source_root` holds `src/convert` and `src/dynamo`; `config` supplies
    /// the target platform and toolchain for both functions.
    ///
    pub fn declare(source_root: &Path, config: &Config) -> Result<Self, Error> {
        let platform = Platform::from(&config.target);
        let toolchain = Toolchain::from(&config.toolchain);
        let function_props = |name: &str| {
            FunctionProps::new(
                source_folder(source_root, name),
                FUNCTION_MEMORY_MB,
                FUNCTION_TIMEOUT,
            )
            .with_platform(platform.clone())
            .with_toolchain(toolchain.clone())
        };

        let mut topology = Topology::new(STACK_ID)?;

        let bucket = topology.add_bucket(
            BUCKET_ID,
            &BucketProps {
                encryption: BucketEncryption::S3Managed,
                enforce_ssl: Some(true),
                ..BucketProps::default()
            },
        )?;

        let table = topology.add_table(
            TABLE_ID,
            &TableProps {
                encryption: TableEncryption::AwsManaged,
                ..TableProps::new(KeyAttribute::new("Day", AttributeType::Number))
            },
        )?;

        // convert: landing/*.csv -> curated/
        let convert = topology.add_function(CONVERT_FUNCTION_ID, &function_props("convert"))?;
        topology.grant_read(&convert, &bucket, Some(LANDING_PREFIX))?;
        topology.grant_write(&convert, &bucket, Some(CURATED_PREFIX))?;
        topology.notify(
            &bucket,
            EventType::ObjectCreated,
            KeyFilter::new().prefix(LANDING_PREFIX)?.suffix(CSV_SUFFIX)?,
            &convert,
        )?;

        // dynamo: curated/*.parquet -> table
        let table_name = topology.cast_resource::<Table>(&table)?.table_name().to_string();
        let dynamo = topology.add_function(
            DYNAMO_FUNCTION_ID,
            &function_props("dynamo")
                .with_environment(BTreeMap::from([(ENV_TABLE_NAME.to_string(), table_name)])),
        )?;
        topology.grant_read(&dynamo, &bucket, Some(CURATED_PREFIX))?;
        topology.grant_write(&dynamo, &table, None)?;
        topology.notify(
            &bucket,
            EventType::ObjectCreated,
            KeyFilter::new().prefix(CURATED_PREFIX)?.suffix(PARQUET_SUFFIX)?,
            &dynamo,
        )?;

        info!(stack = STACK_ID, "declared data lake stack");

        Ok(Self {
            topology,
            bucket,
            table,
            convert,
            dynamo,
        })
    }

    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Validate, bundle both functions and write the assembly per `config`.
    pub fn synth(&self, config: &Config) -> Result<Assembly, Error> {
        Ok(synth_with_config(&self.topology, config)?)
    }
}

#[must_use]
pub fn source_folder(source_root: &Path, name: &str) -> PathBuf {
    source_root.join("src").join(name)
}
