//! Workflow execution state.
//!
//! A run walks its planned order one node at a time. The state tracked here:
//! - Overall run status
//! - Per-node status and recorded result
//! - An ordered execution log
//!
//! Every run owns its own [`ExecutionRun`]; nothing here is shared between
//! runs.

use crate::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use taskweave_core::{WorkflowId, WorkflowRunId};

/// Per-node status, keyed by node.
pub type StatusMap = BTreeMap<NodeId, NodeStatus>;

/// Per-node recorded result, keyed by node.
pub type ResultMap = BTreeMap<NodeId, TaskResult>;

/// The overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is executing nodes.
    Running,
    /// Every node completed.
    Completed,
    /// A node failed and the run stopped.
    Failed,
    /// The run was cancelled between nodes.
    Cancelled,
}

impl RunStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// The status of a single node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Node has not started.
    Pending,
    /// Node's task is executing.
    Processing,
    /// Node's task succeeded.
    Completed,
    /// Node's task failed.
    Error,
}

impl NodeStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// The recorded outcome of one node's task.
///
/// Serialized as `{"status": "success", "result": ...}` or
/// `{"status": "error", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResult {
    Success {
        #[serde(default, skip_serializing_if = "JsonValue::is_null")]
        result: JsonValue,
    },
    Error {
        #[serde(default)]
        error: String,
    },
}

impl TaskResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(result: JsonValue) -> Self {
        Self::Success { result }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Returns true if the task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the result payload of a successful task.
    #[must_use]
    pub fn payload(&self) -> Option<&JsonValue> {
        match self {
            Self::Success { result } => Some(result),
            Self::Error { .. } => None,
        }
    }

    /// Returns the error message of a failed task.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Error { error } => Some(error),
        }
    }
}

/// Severity of an execution log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One entry in a run's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    /// The node the entry is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<NodeId>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
}

impl ExecutionLog {
    fn new(task_id: Option<NodeId>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            task_id,
            message: message.into(),
            timestamp: Utc::now(),
            level,
        }
    }
}

/// The transient state of one run.
#[derive(Debug, Clone)]
pub struct ExecutionRun {
    id: WorkflowRunId,
    workflow_id: WorkflowId,
    status: RunStatus,
    order: Vec<NodeId>,
    statuses: StatusMap,
    results: ResultMap,
    logs: Vec<ExecutionLog>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRun {
    /// Creates a running run with every planned node pending.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, order: Vec<NodeId>) -> Self {
        let statuses = order
            .iter()
            .map(|node_id| (*node_id, NodeStatus::Pending))
            .collect();

        Self {
            id: WorkflowRunId::new(),
            workflow_id,
            status: RunStatus::Running,
            order,
            statuses,
            results: ResultMap::new(),
            logs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> WorkflowRunId {
        self.id
    }

    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the planned execution order.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns the status of a node, if it is part of this run.
    #[must_use]
    pub fn node_status(&self, node_id: NodeId) -> Option<NodeStatus> {
        self.statuses.get(&node_id).copied()
    }

    #[must_use]
    pub fn statuses(&self) -> &StatusMap {
        &self.statuses
    }

    /// Returns the results recorded so far.
    #[must_use]
    pub fn results(&self) -> &ResultMap {
        &self.results
    }

    #[must_use]
    pub fn logs(&self) -> &[ExecutionLog] {
        &self.logs
    }

    /// Marks a node as processing.
    pub fn start_node(&mut self, node_id: NodeId) {
        self.statuses.insert(node_id, NodeStatus::Processing);
    }

    /// Records a node's successful result and marks it completed.
    pub fn complete_node(&mut self, node_id: NodeId, result: JsonValue) {
        let message = match &result {
            JsonValue::String(text) => format!("Task completed: {text}"),
            other => format!("Task completed: {other}"),
        };
        self.results.insert(node_id, TaskResult::success(result));
        self.statuses.insert(node_id, NodeStatus::Completed);
        self.logs
            .push(ExecutionLog::new(Some(node_id), LogLevel::Info, message));
    }

    /// Records a node's failure and marks it errored.
    pub fn fail_node(&mut self, node_id: NodeId, error: impl Into<String>) {
        let error = error.into();
        self.logs
            .push(ExecutionLog::new(Some(node_id), LogLevel::Error, error.clone()));
        self.results.insert(node_id, TaskResult::failure(error));
        self.statuses.insert(node_id, NodeStatus::Error);
    }

    /// Marks the run as completed.
    pub fn complete(&mut self) {
        self.finish(RunStatus::Completed);
    }

    /// Marks the run as failed.
    pub fn fail(&mut self) {
        self.finish(RunStatus::Failed);
    }

    /// Marks the run as cancelled.
    pub fn cancel(&mut self) {
        self.logs
            .push(ExecutionLog::new(None, LogLevel::Warning, "Run cancelled"));
        self.finish(RunStatus::Cancelled);
    }

    fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Consumes the run and returns its summary.
    #[must_use]
    pub fn into_summary(self) -> RunSummary {
        RunSummary {
            run_id: self.id,
            workflow_id: self.workflow_id,
            status: self.status,
            order: self.order,
            statuses: self.statuses,
            results: self.results,
            logs: self.logs,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// The outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: WorkflowRunId,
    pub workflow_id: WorkflowId,
    pub status: RunStatus,
    /// The order nodes were planned to run in.
    pub order: Vec<NodeId>,
    pub statuses: StatusMap,
    /// Results for the nodes that ran. Nodes that never started have none.
    pub results: ResultMap,
    pub logs: Vec<ExecutionLog>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// Returns true if every node completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Returns the duration of the run, if it has finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        let end = self.finished_at?;
        Some(end - self.started_at)
    }

    /// Returns the node whose failure stopped the run, if any.
    #[must_use]
    pub fn failed_node(&self) -> Option<NodeId> {
        self.statuses
            .iter()
            .find(|(_, status)| **status == NodeStatus::Error)
            .map(|(node_id, _)| *node_id)
    }
}

/// Discrete progress events published during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// Run started; every node is pending.
    RunStarted {
        run_id: WorkflowRunId,
        workflow_id: WorkflowId,
        timestamp: DateTime<Utc>,
    },
    /// Node started processing.
    NodeStarted {
        run_id: WorkflowRunId,
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    /// Node completed successfully.
    NodeCompleted {
        run_id: WorkflowRunId,
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    /// Node failed.
    NodeFailed {
        run_id: WorkflowRunId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Run completed successfully.
    RunCompleted {
        run_id: WorkflowRunId,
        timestamp: DateTime<Utc>,
    },
    /// Run failed.
    RunFailed {
        run_id: WorkflowRunId,
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    /// Run was cancelled.
    RunCancelled {
        run_id: WorkflowRunId,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    /// Returns the run ID associated with this event.
    #[must_use]
    pub fn run_id(&self) -> WorkflowRunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::NodeStarted { run_id, .. }
            | Self::NodeCompleted { run_id, .. }
            | Self::NodeFailed { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. }
            | Self::RunCancelled { run_id, .. } => *run_id,
        }
    }

    /// Returns the node this event is about, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::NodeStarted { node_id, .. }
            | Self::NodeCompleted { node_id, .. }
            | Self::NodeFailed { node_id, .. }
            | Self::RunFailed { node_id, .. } => Some(*node_id),
            Self::RunStarted { .. } | Self::RunCompleted { .. } | Self::RunCancelled { .. } => {
                None
            }
        }
    }

    /// Returns the timestamp of this event.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RunStarted { timestamp, .. }
            | Self::NodeStarted { timestamp, .. }
            | Self::NodeCompleted { timestamp, .. }
            | Self::NodeFailed { timestamp, .. }
            | Self::RunCompleted { timestamp, .. }
            | Self::RunFailed { timestamp, .. }
            | Self::RunCancelled { timestamp, .. } => *timestamp,
        }
    }

    /// Returns true if this event ends the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunCompleted { .. } | Self::RunFailed { .. } | Self::RunCancelled { .. }
        )
    }
}
