//! Workflow definition types.
//!
//! A workflow is a named pipeline of tasks that consists of:
//! - Metadata (name, description, status, timestamps)
//! - A directed graph of task nodes
//!
//! The engine reads workflows but never changes them; callers fold run
//! outcomes back in with [`Workflow::record_outcome`].

use crate::error::{ConnectionRejection, GraphError};
use crate::execution::{RunStatus, RunSummary};
use crate::graph::WorkflowGraph;
use crate::planner::execution_order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use taskweave_core::WorkflowId;

/// The last known state of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Never run, or the last run was cancelled.
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Metadata for a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Human-readable name for this workflow.
    pub name: String,
    /// Description of what this workflow does.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: WorkflowStatus,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowMetadata {
    /// Creates new metadata with default values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            status: WorkflowStatus::Idle,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Workflow metadata.
    pub metadata: WorkflowMetadata,
    /// The workflow graph (nodes and edges).
    #[serde(default)]
    pub graph: WorkflowGraph,
}

impl Workflow {
    /// Creates a new workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(WorkflowId::new(), name)
    }

    /// Creates a workflow with a specific ID.
    #[must_use]
    pub fn with_id(id: WorkflowId, name: impl Into<String>) -> Self {
        Self {
            id,
            metadata: WorkflowMetadata::new(name),
            graph: WorkflowGraph::new(),
        }
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        self.metadata.status
    }

    /// Validates the whole workflow.
    ///
    /// Checks, in order:
    /// - Every node has a resolved, well-formed configuration
    /// - No node has more than one incoming edge
    /// - Every edge joins kinds the connection table allows
    /// - The graph is acyclic
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), GraphError> {
        for node in self.graph.nodes() {
            node.config
                .check()
                .map_err(|reason| GraphError::MalformedConfig {
                    node_id: node.id,
                    reason,
                })?;
        }

        let mut has_incoming = HashSet::new();
        for edge in self.graph.edges() {
            let invalid = |rejection| GraphError::InvalidConnection {
                source: edge.source,
                target: edge.target,
                rejection,
            };

            if !has_incoming.insert(edge.target) {
                return Err(invalid(ConnectionRejection::DuplicateIncoming {
                    target: edge.target,
                }));
            }

            let source_kind = self.graph.get_node(edge.source).and_then(|n| n.kind());
            let target_kind = self.graph.get_node(edge.target).and_then(|n| n.kind());
            if let (Some(source), Some(target)) = (source_kind, target_kind) {
                if !source.can_connect_to(target) {
                    return Err(invalid(ConnectionRejection::IncompatibleKinds { source, target }));
                }
            }
        }

        execution_order(&self.graph).map(|_| ())
    }

    /// Marks the workflow as running.
    pub fn mark_running(&mut self) {
        self.metadata.status = WorkflowStatus::Running;
        self.touch();
    }

    /// Folds a finished run into the workflow's status.
    ///
    /// Returns false, leaving the workflow unchanged, if the run belongs to a
    /// different workflow.
    pub fn record_outcome(&mut self, summary: &RunSummary) -> bool {
        if summary.workflow_id != self.id {
            return false;
        }

        self.metadata.status = match summary.status {
            RunStatus::Running => WorkflowStatus::Running,
            RunStatus::Completed => WorkflowStatus::Completed,
            RunStatus::Failed => WorkflowStatus::Failed,
            RunStatus::Cancelled => WorkflowStatus::Idle,
        };
        self.touch();
        true
    }

    /// Marks the workflow as updated (bumps updated_at timestamp).
    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }
}

/// Summary information about a workflow (for listings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    /// Workflow ID.
    pub id: WorkflowId,
    /// Workflow name.
    pub name: String,
    pub status: WorkflowStatus,
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&Workflow> for WorkflowSummary {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id,
            name: workflow.metadata.name.clone(),
            status: workflow.metadata.status,
            node_count: workflow.graph.node_count(),
            updated_at: workflow.metadata.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::execution::ExecutionRun;
    use crate::node::{ClassificationConfig, TaskConfig, TaskKind, TaskNode};

    fn pipeline() -> Workflow {
        let mut workflow = Workflow::new("Daily digest");
        let a = workflow
            .graph
            .add_node(TaskNode::of_kind("Scrape", TaskKind::Scraping))
            .expect("add node");
        let b = workflow
            .graph
            .add_node(TaskNode::of_kind("Summarize", TaskKind::Summarization))
            .expect("add node");
        let c = workflow
            .graph
            .add_node(TaskNode::of_kind("Email", TaskKind::Email))
            .expect("add node");
        workflow.graph.connect(a, b).expect("edge");
        workflow.graph.connect(b, c).expect("edge");
        workflow
    }

    #[test]
    fn workflow_creation() {
        let workflow = Workflow::new("Test Workflow");
        assert_eq!(workflow.name(), "Test Workflow");
        assert_eq!(workflow.status(), WorkflowStatus::Idle);
        assert_eq!(workflow.graph.node_count(), 0);
    }

    #[test]
    fn valid_pipeline_passes() {
        assert_eq!(pipeline().validate(), Ok(()));
    }

    #[test]
    fn validate_reports_malformed_config() {
        let mut workflow = pipeline();
        let node = TaskNode::new(
            "Classify",
            TaskConfig::Classification(ClassificationConfig {
                image_url: String::new(),
                confidence_threshold: 2.0,
            }),
        );
        let node_id = workflow.graph.add_node(node).expect("add node");

        assert_eq!(
            workflow.validate(),
            Err(GraphError::MalformedConfig {
                node_id,
                reason: "confidence threshold must be within [0, 1]",
            })
        );
    }

    #[test]
    fn validate_reports_restored_fan_in() {
        let a = TaskNode::of_kind("a", TaskKind::Scraping);
        let b = TaskNode::of_kind("b", TaskKind::Classification);
        let c = TaskNode::of_kind("c", TaskKind::Email);
        let edges = [Edge::new(a.id, c.id), Edge::new(b.id, c.id)];
        let mut workflow = Workflow::new("fan in");
        workflow.graph = WorkflowGraph::from_parts([a, b, c], edges).expect("graph");

        let err = workflow.validate().expect_err("fan-in");
        assert!(matches!(
            err.rejection(),
            Some(ConnectionRejection::DuplicateIncoming { .. })
        ));
    }

    #[test]
    fn validate_reports_restored_kind_mismatch() {
        let a = TaskNode::of_kind("a", TaskKind::Email);
        let b = TaskNode::of_kind("b", TaskKind::Scraping);
        let edges = [Edge::new(a.id, b.id)];
        let mut workflow = Workflow::new("backwards");
        workflow.graph = WorkflowGraph::from_parts([a, b], edges).expect("graph");

        let err = workflow.validate().expect_err("kind mismatch");
        assert_eq!(
            err.rejection().map(|r| r.to_string()).as_deref(),
            Some("Cannot connect email to scraping")
        );
    }

    #[test]
    fn record_outcome_updates_status() {
        let mut workflow = pipeline();
        let before = workflow.metadata.updated_at;
        workflow.mark_running();
        assert_eq!(workflow.status(), WorkflowStatus::Running);

        let mut run = ExecutionRun::new(workflow.id, Vec::new());
        run.fail();
        assert!(workflow.record_outcome(&run.into_summary()));
        assert_eq!(workflow.status(), WorkflowStatus::Failed);
        assert!(workflow.metadata.updated_at >= before);
    }

    #[test]
    fn record_outcome_ignores_other_workflows() {
        let mut workflow = pipeline();
        let mut run = ExecutionRun::new(WorkflowId::new(), Vec::new());
        run.complete();

        assert!(!workflow.record_outcome(&run.into_summary()));
        assert_eq!(workflow.status(), WorkflowStatus::Idle);
    }

    #[test]
    fn workflow_summary_from_workflow() {
        let workflow = pipeline();
        let summary = WorkflowSummary::from(&workflow);

        assert_eq!(summary.id, workflow.id);
        assert_eq!(summary.name, "Daily digest");
        assert_eq!(summary.node_count, 3);
    }

    #[test]
    fn workflow_serde_roundtrip() {
        let mut workflow = pipeline();
        workflow.metadata = workflow
            .metadata
            .with_description("Scrape, summarize, send");
        let json = serde_json::to_string(&workflow).expect("serialize");
        let parsed: Workflow = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(workflow.id, parsed.id);
        assert_eq!(workflow.metadata, parsed.metadata);
        assert_eq!(parsed.graph.edge_count(), 2);
        assert_eq!(parsed.validate(), Ok(()));
    }
}
