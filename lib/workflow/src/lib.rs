//! Workflow engine for taskweave.
//!
//! This crate provides the workflow execution engine, including:
//!
//! - **Graph Model**: Directed graphs using petgraph with typed task nodes
//! - **Connection Validation**: Fan-in, acyclicity and kind-compatibility rules
//! - **Planning**: Topological execution order and runnable-node queries
//! - **Propagation**: Upstream results spliced into downstream configurations
//! - **Coordination**: Sequential runs with per-node progress and cancellation

pub mod coordinator;
pub mod definition;
pub mod edge;
pub mod error;
pub mod execution;
pub mod graph;
pub mod node;
pub mod planner;
pub mod progress;
pub mod propagation;
pub mod runner;
pub mod validation;

pub use coordinator::Coordinator;
pub use definition::{Workflow, WorkflowMetadata, WorkflowStatus, WorkflowSummary};
pub use edge::Edge;
pub use error::{ConnectionRejection, CoordinatorError, GraphError};
pub use execution::{
    ExecutionEvent, ExecutionLog, ExecutionRun, LogLevel, NodeStatus, RunStatus, RunSummary,
    TaskResult,
};
pub use graph::WorkflowGraph;
pub use node::{
    ClassificationConfig, EmailConfig, NodeId, Position, ScrapingConfig, SummarizationConfig,
    TaskConfig, TaskKind, TaskNode,
};
pub use planner::{execution_order, next_runnable};
pub use progress::{ChannelSink, NoopSink, ProgressSink, ProgressUpdate, TracingSink};
pub use propagation::effective_config;
pub use runner::{EchoRunner, MockRunner, TaskRunner, TaskRunnerError};
pub use validation::validate_connection;
