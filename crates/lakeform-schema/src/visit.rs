//! Node traversal. Visitors see every node on the way in and out, which
//! keeps the current route available for error grouping.

use crate::{error::ErrorTree, node::VisitableNode, topology::Topology};

///
/// Visitor
///

pub trait Visitor {
    fn enter<N: VisitableNode + ?Sized>(&mut self, node: &N);

    fn exit<N: VisitableNode + ?Sized>(&mut self, node: &N);
}

///
/// ValidateVisitor
///
/// Runs `ValidateNode::validate` on every node and files errors under the
/// route of enclosing nodes (e.g. `convert-lambda.build`).
///

pub struct ValidateVisitor<'a> {
    topology: &'a Topology,
    route: Vec<String>,
    pushed: Vec<bool>,
    pub errors: ErrorTree,
}

impl<'a> ValidateVisitor<'a> {
    #[must_use]
    pub const fn new(topology: &'a Topology) -> Self {
        Self {
            topology,
            route: Vec::new(),
            pushed: Vec::new(),
            errors: ErrorTree::new(),
        }
    }
}

impl Visitor for ValidateVisitor<'_> {
    fn enter<N: VisitableNode + ?Sized>(&mut self, node: &N) {
        let key = node.route_key();
        let pushed = !key.is_empty();
        if pushed {
            self.route.push(key);
        }
        self.pushed.push(pushed);

        if let Err(errs) = node.validate(self.topology) {
            self.errors.add_at(&self.route, errs);
        }
    }

    fn exit<N: VisitableNode + ?Sized>(&mut self, _: &N) {
        if self.pushed.pop().unwrap_or(false) {
            self.route.pop();
        }
    }
}
