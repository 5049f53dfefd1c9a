//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConnectionRejection`: why a candidate edge was refused
//! - `GraphError`: graph operations, planning and config resolution
//! - `CoordinatorError`: run-level context wrapped around lower errors
//!
//! A task failing during a run is not an error at this level; it is recorded
//! in the run's results (see `execution::TaskResult`).

use crate::node::{NodeId, TaskKind};
use std::fmt;
use taskweave_core::{EdgeId, WorkflowId};

/// Why the connection validator refused a candidate edge.
///
/// The display text is the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRejection {
    /// One of the endpoints has no resolvable task kind.
    InvalidNodeConfiguration,
    /// The target already has an incoming edge.
    DuplicateIncoming { target: NodeId },
    /// The edge would close a cycle.
    WouldCreateCycle,
    /// The target's kind is not an allowed target of the source's kind.
    IncompatibleKinds { source: TaskKind, target: TaskKind },
}

impl fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNodeConfiguration => write!(f, "Invalid node configuration"),
            Self::DuplicateIncoming { .. } => {
                write!(f, "Node can only have one incoming connection")
            }
            Self::WouldCreateCycle => write!(f, "Cycles not allowed"),
            Self::IncompatibleKinds { source, target } => {
                write!(f, "Cannot connect {source} to {target}")
            }
        }
    }
}

impl std::error::Error for ConnectionRejection {}

/// Errors from graph operations.
///
/// These contain only what the graph layer knows. Workflow-level context is
/// added by the caller with `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// A node with the given ID is already in the graph.
    DuplicateNode { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// An edge references a node that is not part of the graph.
    MissingEndpoint { edge_id: EdgeId, node_id: NodeId },
    /// No execution order exists.
    CycleDetected { node_id: NodeId },
    /// A node's configuration is unusable.
    MalformedConfig {
        node_id: NodeId,
        reason: &'static str,
    },
    /// A config update tried to change the node's kind.
    KindChange {
        node_id: NodeId,
        from: Option<TaskKind>,
        to: Option<TaskKind>,
    },
    /// An edge breaks one of the connection rules.
    InvalidConnection {
        source: NodeId,
        target: NodeId,
        rejection: ConnectionRejection,
    },
}

impl GraphError {
    /// Returns the connection rejection, if this is one.
    #[must_use]
    pub fn rejection(&self) -> Option<ConnectionRejection> {
        match self {
            Self::InvalidConnection { rejection, .. } => Some(*rejection),
            _ => None,
        }
    }
}

fn kind_name(kind: Option<TaskKind>) -> &'static str {
    kind.map_or("unresolved", TaskKind::as_str)
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::DuplicateNode { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::MissingEndpoint { edge_id, node_id } => {
                write!(f, "edge {edge_id} references unknown node {node_id}")
            }
            Self::CycleDetected { node_id } => {
                write!(f, "graph contains a cycle through {node_id}")
            }
            Self::MalformedConfig { node_id, reason } => {
                write!(f, "malformed config on node {node_id}: {reason}")
            }
            Self::KindChange { node_id, from, to } => write!(
                f,
                "cannot change node {node_id} from {} to {}",
                kind_name(*from),
                kind_name(*to)
            ),
            Self::InvalidConnection {
                source,
                target,
                rejection,
            } => write!(f, "invalid connection {source} -> {target}: {rejection}"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Run-level errors.
///
/// Use these as context wrappers around `GraphError` reports raised before
/// any node has been started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// No execution plan could be computed (use as context wrapper).
    Planning { workflow_id: WorkflowId },
    /// A node's configuration could not be used (use as context wrapper).
    MalformedWorkflow { workflow_id: WorkflowId },
    /// An edge breaks the connection rules (use as context wrapper).
    InvalidWorkflow { workflow_id: WorkflowId },
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning { workflow_id } => {
                write!(f, "could not plan execution of workflow {workflow_id}")
            }
            Self::MalformedWorkflow { workflow_id } => {
                write!(f, "workflow {workflow_id} has malformed nodes")
            }
            Self::InvalidWorkflow { workflow_id } => {
                write!(f, "workflow {workflow_id} breaks the connection rules")
            }
        }
    }
}

impl std::error::Error for CoordinatorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages_match_editor_text() {
        assert_eq!(
            ConnectionRejection::IncompatibleKinds {
                source: TaskKind::Email,
                target: TaskKind::Scraping,
            }
            .to_string(),
            "Cannot connect email to scraping"
        );
        assert_eq!(
            ConnectionRejection::DuplicateIncoming {
                target: NodeId::new()
            }
            .to_string(),
            "Node can only have one incoming connection"
        );
        assert_eq!(
            ConnectionRejection::WouldCreateCycle.to_string(),
            "Cycles not allowed"
        );
        assert_eq!(
            ConnectionRejection::InvalidNodeConfiguration.to_string(),
            "Invalid node configuration"
        );
    }

    #[test]
    fn graph_error_display() {
        let node_id = NodeId::new();
        let err = GraphError::NodeNotFound { node_id };
        assert!(err.to_string().contains("node not found"));

        let err = GraphError::KindChange {
            node_id,
            from: Some(TaskKind::Email),
            to: None,
        };
        assert!(err.to_string().contains("from email to unresolved"));
    }

    #[test]
    fn invalid_connection_exposes_rejection() {
        let err = GraphError::InvalidConnection {
            source: NodeId::new(),
            target: NodeId::new(),
            rejection: ConnectionRejection::WouldCreateCycle,
        };
        assert_eq!(err.rejection(), Some(ConnectionRejection::WouldCreateCycle));
        assert!(err.to_string().ends_with("Cycles not allowed"));
        assert_eq!(GraphError::EdgeNotFound { edge_id: EdgeId::new() }.rejection(), None);
    }

    #[test]
    fn coordinator_error_display() {
        let workflow_id = WorkflowId::new();
        let err = CoordinatorError::Planning { workflow_id };
        assert!(err.to_string().contains("could not plan"));
    }
}
