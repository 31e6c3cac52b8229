//! The cloud assembly manifest: everything the materialization layer needs
//! to create the declared resources, rendered from a validated topology.

use crate::asset::Asset;
use lakeform_schema::{
    node::{Bucket, BucketRef, Function, FunctionRef, Grant, Notification, ResourceRef, Table},
    topology::Topology,
    types::Action,
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

/// File name of the manifest inside an assembly.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Revision of the manifest layout.
pub const MANIFEST_VERSION: u32 = 1;

///
/// Manifest
///

#[derive(Clone, Debug, Serialize)]
pub struct Manifest {
    pub version: u32,
    pub stack: String,
    pub buckets: Vec<Bucket>,
    pub tables: Vec<Table>,
    pub functions: Vec<FunctionManifest>,
    pub policies: Vec<PolicyStatement>,
    pub notifications: Vec<Notification>,
    pub permissions: Vec<InvokePermission>,
}

impl Manifest {
    /// Render `topology`. Functions without an entry in `assets` are listed
    /// without an asset, which is what a plan looks like.
    #[must_use]
    pub fn from_topology(topology: &Topology, assets: &[Asset]) -> Self {
        let by_function: BTreeMap<&str, &Asset> =
            assets.iter().map(|a| (a.function.as_str(), a)).collect();

        let functions = topology
            .functions()
            .map(|function| FunctionManifest {
                function: function.clone(),
                asset: by_function.get(function.id()).map(|a| a.dir.clone()),
            })
            .collect();

        let permissions: BTreeSet<InvokePermission> = topology
            .notifications()
            .iter()
            .map(InvokePermission::from)
            .collect();

        Self {
            version: MANIFEST_VERSION,
            stack: topology.id().to_string(),
            buckets: topology.buckets().cloned().collect(),
            tables: topology.tables().cloned().collect(),
            functions,
            policies: topology.grants().iter().map(PolicyStatement::from).collect(),
            notifications: topology.notifications().to_vec(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Policy statements attached to one function's role.
    pub fn policies_for<'a>(
        &'a self,
        function: &'a FunctionRef,
    ) -> impl Iterator<Item = &'a PolicyStatement> {
        self.policies.iter().filter(move |p| p.principal == *function)
    }
}

///
/// FunctionManifest
///

#[derive(Clone, Debug, Serialize)]
pub struct FunctionManifest {
    #[serde(flatten)]
    pub function: Function,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,
}

///
/// PolicyStatement
///
/// One grant rendered as an allow statement.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PolicyStatement {
    pub principal: FunctionRef,
    pub target: ResourceRef,
    pub actions: BTreeSet<Action>,
    pub resources: Vec<String>,
}

impl From<&Grant> for PolicyStatement {
    fn from(grant: &Grant) -> Self {
        Self {
            principal: grant.principal().clone(),
            target: grant.resource().clone(),
            actions: grant.actions(),
            resources: grant.policy_resources(),
        }
    }
}

///
/// InvokePermission
///
/// Lets `source` invoke `function`. One per bucket/function pair, however
/// many rules connect them.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct InvokePermission {
    pub function: FunctionRef,
    pub source: BucketRef,
}

impl From<&Notification> for InvokePermission {
    fn from(rule: &Notification) -> Self {
        Self {
            function: rule.target().clone(),
            source: rule.bucket().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeform_schema::{
        node::{BucketProps, FunctionProps, KeyFilter},
        types::{Access, EventType},
    };
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::tempdir;

    fn topology(source: &std::path::Path) -> (Topology, FunctionRef) {
        let mut topology = Topology::new("stack").unwrap();
        let bucket = topology
            .add_bucket("bucket", &BucketProps::default())
            .unwrap();
        let function = topology
            .add_function("fn", &FunctionProps::new(source, 256, Duration::from_secs(60)))
            .unwrap();

        topology
            .grant(&function, &bucket, &[Access::Read, Access::Write], Some("in/"))
            .unwrap();
        for suffix in [".csv", ".tsv"] {
            let filter = KeyFilter::new().prefix("in/").unwrap().suffix(suffix).unwrap();
            topology
                .notify(&bucket, EventType::ObjectCreated, filter, &function)
                .unwrap();
        }

        (topology, function)
    }

    #[test]
    fn invoke_permissions_are_deduplicated() {
        let dir = tempdir().unwrap();
        let (topology, _) = topology(dir.path());

        let manifest = Manifest::from_topology(&topology, &[]);
        assert_eq!(manifest.notifications.len(), 2);
        assert_eq!(manifest.permissions.len(), 1);
    }

    #[test]
    fn policy_is_scoped_to_prefix() {
        let dir = tempdir().unwrap();
        let (topology, function) = topology(dir.path());

        let manifest = Manifest::from_topology(&topology, &[]);
        let policies: Vec<_> = manifest.policies_for(&function).collect();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].resources, vec!["bucket/in/*"]);
        assert_eq!(
            policies[0].actions,
            BTreeSet::from([Action::Get, Action::List, Action::Put])
        );
    }

    #[test]
    fn function_entry_carries_asset_and_environment() {
        let dir = tempdir().unwrap();
        let (topology, _) = topology(dir.path());
        let asset = Asset::new("fn", "cafe".to_string());

        let manifest = Manifest::from_topology(&topology, &[asset]);
        let json = serde_json::to_value(&manifest).unwrap();

        let function = &json["functions"][0];
        assert_eq!(function["id"], "fn");
        assert_eq!(function["handler"], "main");
        assert_eq!(function["asset"], "asset.cafe");
        assert_eq!(function["environment"]["STATIC_LINK"], "true");
        assert_eq!(json["version"], Value::from(MANIFEST_VERSION));
    }

    #[test]
    fn plan_has_no_assets() {
        let dir = tempdir().unwrap();
        let (topology, _) = topology(dir.path());

        let json = serde_json::to_value(Manifest::from_topology(&topology, &[])).unwrap();
        assert!(json["functions"][0].get("asset").is_none());
    }
}
