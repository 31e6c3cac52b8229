//! Stack topology: owns every node and edge declared during one synthesis
//! pass.

use crate::{
    Error,
    node::{
        Bucket, BucketProps, BucketRef, ConstructionError, Function, FunctionConstruct,
        FunctionProps, FunctionRef, Grant, KeyFilter, Notification, ReferenceError, Resource,
        ResourceKind, ResourceNode, ResourceRef, Table, TableProps, TableRef, VisitableNode,
    },
    types::{Access, Action, EventType},
    validate::{naming::validate_resource_id, validate_topology},
    visit::Visitor,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

///
/// Topology
///
/// Nodes are kept in declaration order. Edges (grants, notifications) may
/// only point at nodes that were declared before them.
///

#[derive(Clone, Debug)]
pub struct Topology {
    id: String,
    resources: Vec<Resource>,
    index: BTreeMap<String, usize>,
    grants: Vec<Grant>,
    notifications: Vec<Notification>,
}

impl Topology {
    pub fn new(id: &str) -> Result<Self, ConstructionError> {
        validate_resource_id(id)?;

        Ok(Self {
            id: id.to_string(),
            resources: Vec::new(),
            index: BTreeMap::new(),
            grants: Vec::new(),
            notifications: Vec::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    //
    // declarations
    //

    pub fn add_bucket(&mut self, id: &str, props: &BucketProps) -> Result<BucketRef, Error> {
        let bucket = Bucket::new(id, props)?;
        self.insert(Resource::Bucket(bucket))?;

        Ok(BucketRef(id.to_string()))
    }

    pub fn add_table(&mut self, id: &str, props: &TableProps) -> Result<TableRef, Error> {
        let table = Table::new(id, props)?;
        self.insert(Resource::Table(table))?;

        Ok(TableRef(id.to_string()))
    }

    pub fn add_function(&mut self, id: &str, props: &FunctionProps) -> Result<FunctionRef, Error> {
        // checked up front so a duplicate never reaches the filesystem
        self.check_unique(id)?;
        let function = FunctionConstruct::declare(id, props)?;
        self.insert(Resource::Function(function))?;

        Ok(FunctionRef(id.to_string()))
    }

    fn check_unique(&self, id: &str) -> Result<(), ConstructionError> {
        if self.index.contains_key(id) {
            return Err(ConstructionError::DuplicateId(id.to_string()));
        }

        Ok(())
    }

    fn insert(&mut self, resource: Resource) -> Result<(), ConstructionError> {
        let id = resource.id().to_string();
        self.check_unique(&id)?;

        debug!(stack = %self.id, kind = %resource.kind(), id = %id, "declared resource");
        self.index.insert(id, self.resources.len());
        self.resources.push(resource);

        Ok(())
    }

    //
    // edges
    //

    /// Record a capability edge. Both endpoints must already be declared.
    pub fn grant(
        &mut self,
        principal: &FunctionRef,
        resource: impl Into<ResourceRef>,
        access: &[Access],
        key_prefix: Option<&str>,
    ) -> Result<&Grant, Error> {
        let resource = resource.into();
        self.check_principal(principal)?;
        self.check_grant_target(&resource)?;

        let grant = Grant::new(principal.clone(), resource, access, key_prefix)?;
        debug!(
            stack = %self.id,
            principal = %grant.principal(),
            resource = %grant.resource(),
            prefix = grant.key_prefix().unwrap_or_default(),
            "declared grant"
        );
        self.grants.push(grant);

        Ok(&self.grants[self.grants.len() - 1])
    }

    pub fn grant_read(
        &mut self,
        principal: &FunctionRef,
        resource: impl Into<ResourceRef>,
        key_prefix: Option<&str>,
    ) -> Result<&Grant, Error> {
        self.grant(principal, resource, &[Access::Read], key_prefix)
    }

    pub fn grant_write(
        &mut self,
        principal: &FunctionRef,
        resource: impl Into<ResourceRef>,
        key_prefix: Option<&str>,
    ) -> Result<&Grant, Error> {
        self.grant(principal, resource, &[Access::Write], key_prefix)
    }

    /// Record a trigger edge. Both endpoints must already be declared.
    pub fn notify(
        &mut self,
        bucket: &BucketRef,
        event: EventType,
        filter: KeyFilter,
        target: &FunctionRef,
    ) -> Result<&Notification, Error> {
        self.cast_resource::<Bucket>(bucket)?;
        self.check_principal(target)?;

        let notification = Notification::new(bucket.clone(), event, filter, target.clone());
        debug!(
            stack = %self.id,
            bucket = %bucket,
            event = %event,
            prefix = notification.filter().prefix_value(),
            suffix = notification.filter().suffix_value(),
            target = %target,
            "declared notification"
        );
        self.notifications.push(notification);

        Ok(&self.notifications[self.notifications.len() - 1])
    }

    fn check_principal(&self, principal: &FunctionRef) -> Result<(), ReferenceError> {
        self.cast_resource::<Function>(principal).map(|_| ())
    }

    fn check_grant_target(&self, resource: &ResourceRef) -> Result<(), ReferenceError> {
        match resource {
            ResourceRef::Bucket(bucket) => self.cast_resource::<Bucket>(bucket).map(|_| ()),
            ResourceRef::Table(table) => self.cast_resource::<Table>(table).map(|_| ()),
        }
    }

    //
    // lookups
    //

    #[must_use]
    pub fn get_resource(&self, id: &str) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    /// Resolve `id` to a node of type `T`.
    pub fn cast_resource<T: ResourceNode>(&self, id: &str) -> Result<&T, ReferenceError> {
        let resource = self
            .get_resource(id)
            .ok_or_else(|| ReferenceError::Undeclared {
                kind: T::kind(),
                id: id.to_string(),
            })?;

        resource
            .as_node()
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| ReferenceError::WrongKind {
                id: id.to_string(),
                expected: T::kind(),
                found: resource.kind(),
            })
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.resources.iter().filter_map(|r| match r {
            Resource::Bucket(bucket) => Some(bucket),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.resources.iter().filter_map(|r| match r {
            Resource::Table(table) => Some(table),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.resources.iter().filter_map(|r| match r {
            Resource::Function(function) => Some(function),
            _ => None,
        })
    }

    #[must_use]
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources.iter().filter(|r| r.kind() == kind).count()
    }

    //
    // queries
    //

    /// Evaluate the declared grants for one access attempt.
    #[must_use]
    pub fn is_authorized(
        &self,
        principal: &FunctionRef,
        resource: impl Into<ResourceRef>,
        action: Action,
        key: Option<&str>,
    ) -> bool {
        let resource = resource.into();

        self.grants
            .iter()
            .any(|grant| grant.authorizes(principal, &resource, action, key))
    }

    /// Functions an `event` on `key` in `bucket` would invoke, in declaration order.
    #[must_use]
    pub fn triggered_functions(
        &self,
        bucket: &BucketRef,
        event: EventType,
        key: &str,
    ) -> Vec<&FunctionRef> {
        self.notifications
            .iter()
            .filter(|rule| rule.fires_on(bucket, event, key))
            .map(Notification::target)
            .collect()
    }

    //
    // validation
    //

    /// Run every node-local and topology-wide check.
    pub fn validate(&self) -> Result<(), Error> {
        validate_topology(self).map_err(Error::Validation)?;
        info!(
            stack = %self.id,
            resources = self.resources.len(),
            grants = self.grants.len(),
            notifications = self.notifications.len(),
            "topology validated"
        );

        Ok(())
    }

    /// Walk every node, then every edge, in declaration order.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) {
        for resource in &self.resources {
            match resource {
                Resource::Bucket(node) => node.accept(visitor),
                Resource::Function(node) => node.accept(visitor),
                Resource::Table(node) => node.accept(visitor),
            }
        }
        for grant in &self.grants {
            grant.accept(visitor);
        }
        for notification in &self.notifications {
            notification.accept(visitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{KeyAttribute, ResourceKind},
        types::AttributeType,
    };
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn duplicate_ids_are_rejected_across_kinds() {
        let mut topology = Topology::new("stack").unwrap();
        topology
            .add_bucket("shared", &BucketProps::default())
            .unwrap();

        let err = topology
            .add_table(
                "shared",
                &TableProps::new(KeyAttribute::new("Day", AttributeType::Number)),
            )
            .expect_err("duplicate id should fail");
        assert!(matches!(
            err,
            Error::Construction(ConstructionError::DuplicateId(_))
        ));
    }

    #[test]
    fn grant_to_undeclared_function_is_a_reference_error() {
        let mut topology = Topology::new("stack").unwrap();
        let bucket = topology
            .add_bucket("bucket", &BucketProps::default())
            .unwrap();
        let ghost = FunctionRef("ghost".to_string());

        let err = topology
            .grant_read(&ghost, &bucket, None)
            .expect_err("unknown principal should fail");
        assert!(matches!(
            err,
            Error::Reference(ReferenceError::Undeclared {
                kind: ResourceKind::Function,
                ..
            })
        ));
        assert!(topology.grants().is_empty());
    }

    #[test]
    fn handle_of_wrong_kind_is_rejected() {
        let dir = tempdir().unwrap();
        let mut topology = Topology::new("stack").unwrap();
        topology
            .add_bucket("bucket", &BucketProps::default())
            .unwrap();
        let function = topology
            .add_function(
                "fn",
                &FunctionProps::new(dir.path(), 256, Duration::from_secs(60)),
            )
            .unwrap();

        // a bucket handle naming the function id
        let forged = BucketRef(function.to_string());
        let err = topology
            .notify(&forged, EventType::ObjectCreated, KeyFilter::new(), &function)
            .expect_err("wrong kind should fail");
        assert!(matches!(
            err,
            Error::Reference(ReferenceError::WrongKind {
                expected: ResourceKind::Bucket,
                found: ResourceKind::Function,
                ..
            })
        ));
    }

    #[test]
    fn handles_from_another_topology_are_rejected() {
        let dir = tempdir().unwrap();
        let mut other = Topology::new("other").unwrap();
        let foreign = other
            .add_bucket("foreign-bucket", &BucketProps::default())
            .unwrap();

        let mut topology = Topology::new("stack").unwrap();
        let function = topology
            .add_function(
                "fn",
                &FunctionProps::new(dir.path(), 256, Duration::from_secs(60)),
            )
            .unwrap();

        assert!(topology.grant_read(&function, &foreign, None).is_err());
    }

    #[test]
    fn function_construction_error_aborts_declaration() {
        let dir = tempdir().unwrap();
        let mut topology = Topology::new("stack").unwrap();

        let err = topology
            .add_function(
                "fn",
                &FunctionProps::new(dir.path().join("missing"), 256, Duration::from_secs(60)),
            )
            .expect_err("missing source should fail");
        assert!(matches!(
            err,
            Error::Construction(ConstructionError::SourceFolder { .. })
        ));
        assert_eq!(topology.count(ResourceKind::Function), 0);
    }
}
