//! Connection validation.
//!
//! Decides whether a candidate edge may enter a graph. Rules are evaluated in
//! order and the first failure wins:
//! 1. both endpoints have a resolved task kind
//! 2. the target has no incoming edge yet
//! 3. the edge does not close a cycle
//! 4. the target's kind is an allowed target of the source's kind
//!
//! Validation is a fast path for the editor. The planner re-checks acyclicity
//! independently before anything runs.

use crate::edge::Edge;
use crate::error::ConnectionRejection;
use crate::node::{NodeId, TaskNode};
use std::collections::HashSet;

/// Checks whether `source -> target` may be added to `edges`.
///
/// Does not modify anything; the caller inserts the edge on success.
///
/// # Errors
///
/// Returns the first rule the candidate breaks.
pub fn validate_connection(
    source: &TaskNode,
    target: &TaskNode,
    edges: &[Edge],
) -> Result<(), ConnectionRejection> {
    let (Some(source_kind), Some(target_kind)) = (source.kind(), target.kind()) else {
        return Err(ConnectionRejection::InvalidNodeConfiguration);
    };

    if edges.iter().any(|edge| edge.target == target.id) {
        return Err(ConnectionRejection::DuplicateIncoming { target: target.id });
    }

    if would_create_cycle(source.id, target.id, edges) {
        return Err(ConnectionRejection::WouldCreateCycle);
    }

    if !source_kind.can_connect_to(target_kind) {
        return Err(ConnectionRejection::IncompatibleKinds {
            source: source_kind,
            target: target_kind,
        });
    }

    Ok(())
}

/// Returns true if some forward path from `target` reaches `source`.
///
/// A self-loop counts as a cycle.
#[must_use]
pub fn would_create_cycle(source: NodeId, target: NodeId, edges: &[Edge]) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![target];

    while let Some(current) = stack.pop() {
        if current == source {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(
            edges
                .iter()
                .filter(|edge| edge.source == current)
                .map(|edge| edge.target),
        );
    }

    false
}
