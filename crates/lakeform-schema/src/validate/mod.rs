//! Topology validation orchestration and shared helpers.

pub mod naming;
pub mod notification;

use crate::{error::ErrorTree, topology::Topology, visit::ValidateVisitor};

/// Run full topology validation in a staged, deterministic order.
pub(crate) fn validate_topology(topology: &Topology) -> Result<(), ErrorTree> {
    // Phase 1: validate each node (structural + local invariants).
    let mut errors = validate_nodes(topology);

    // Phase 2: enforce topology-wide invariants.
    validate_global(topology, &mut errors);

    errors.result()
}

// Validate all nodes via a visitor to retain route-aware error aggregation.
fn validate_nodes(topology: &Topology) -> ErrorTree {
    let mut visitor = ValidateVisitor::new(topology);
    topology.accept(&mut visitor);

    visitor.errors
}

// Run global validation passes that require a full topology view.
fn validate_global(topology: &Topology, errors: &mut ErrorTree) {
    naming::validate_unique_ids(topology, errors);
    notification::validate_no_overlap(topology, errors);
}
