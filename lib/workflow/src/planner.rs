//! Execution planning.
//!
//! Computes the order a workflow's nodes run in. Runs are strictly
//! sequential, so the plan is a single topological order over all nodes.
//!
//! The planner is the authoritative cycle check: graphs restored from storage
//! never went through connection validation, and a cycle here fails the plan
//! rather than dropping nodes.

use crate::error::GraphError;
use crate::graph::WorkflowGraph;
use crate::node::NodeId;
use std::collections::{HashSet, VecDeque};

/// Returns an order over every node such that producers precede consumers.
///
/// Depth-first from each entry node in graph order; a node is prepended to
/// the result once everything downstream of it has been placed. Independent
/// chains get a deterministic but otherwise unspecified relative order.
///
/// # Errors
///
/// Returns `CycleDetected` if the graph has a cycle. Nodes that no entry node
/// reaches can only sit on or below a cycle, so they are reported the same way.
pub fn execution_order(graph: &WorkflowGraph) -> Result<Vec<NodeId>, GraphError> {
    let mut walk = Walk {
        graph,
        temporary: HashSet::new(),
        permanent: HashSet::new(),
        order: VecDeque::with_capacity(graph.node_count()),
    };

    for root in graph.entry_nodes() {
        walk.visit(root.id)?;
    }

    if let Some(stranded) = graph.nodes().find(|node| !walk.permanent.contains(&node.id)) {
        return Err(GraphError::CycleDetected {
            node_id: stranded.id,
        });
    }

    Ok(walk.order.into())
}

struct Walk<'a> {
    graph: &'a WorkflowGraph,
    temporary: HashSet<NodeId>,
    permanent: HashSet<NodeId>,
    order: VecDeque<NodeId>,
}

impl Walk<'_> {
    fn visit(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        if self.permanent.contains(&node_id) {
            return Ok(());
        }
        if !self.temporary.insert(node_id) {
            return Err(GraphError::CycleDetected { node_id });
        }

        let graph = self.graph;
        for dependent in graph.dependents(node_id) {
            self.visit(dependent.id)?;
        }

        self.temporary.remove(&node_id);
        self.permanent.insert(node_id);
        self.order.push_front(node_id);
        Ok(())
    }
}

/// Returns the nodes that could run next given the already executed set.
///
/// A node is runnable when it has not executed and every one of its
/// dependencies has. Results follow graph node order.
#[must_use]
pub fn next_runnable(graph: &WorkflowGraph, executed: &HashSet<NodeId>) -> Vec<NodeId> {
    graph
        .nodes()
        .filter(|node| !executed.contains(&node.id))
        .filter(|node| {
            graph
                .dependencies(node.id)
                .iter()
                .all(|dependency| executed.contains(&dependency.id))
        })
        .map(|node| node.id)
        .collect()
}
