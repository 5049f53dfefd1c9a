//! Edge types for workflow graphs.
//!
//! An edge is a directed dependency: the source node produces, the target node
//! consumes. Edges carry no port names; which field of the target receives
//! the data is decided by the kind pair (see `propagation`).

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use taskweave_core::EdgeId;

/// A directed edge from a producer node to a consumer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// The producing node.
    pub source: NodeId,
    /// The consuming node.
    pub target: NodeId,
}

impl Edge {
    /// Creates a new edge with a fresh ID.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
        }
    }
}
