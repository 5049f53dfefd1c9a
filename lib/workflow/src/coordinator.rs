//! Execution coordinator.
//!
//! Drives one workflow run:
//! 1. Plan the execution order and check every node's configuration and
//!    every edge against the connection rules
//! 2. Mark every node pending
//! 3. For each node in order: mark it processing, build its effective
//!    configuration, call the task runner, record the result
//! 4. Stop at the first failure
//!
//! Nodes run strictly one at a time. The task runner call is the only await
//! point; cancellation is checked between nodes and never interrupts a call
//! in flight.

use crate::definition::Workflow;
use crate::error::{CoordinatorError, GraphError};
use crate::execution::{ExecutionEvent, ExecutionRun, RunSummary};
use crate::node::{NodeId, TaskKind};
use crate::planner::execution_order;
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::propagation::effective_config;
use crate::runner::TaskRunner;
use chrono::Utc;
use rootcause::prelude::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Runs workflows against a task runner, publishing progress to a sink.
///
/// Holds no per-run state, so one coordinator can drive any number of runs,
/// concurrently or not.
pub struct Coordinator<R: TaskRunner, S: ProgressSink> {
    runner: R,
    sink: S,
}

impl<R: TaskRunner, S: ProgressSink> Coordinator<R, S> {
    /// Creates a new coordinator.
    pub fn new(runner: R, sink: S) -> Self {
        Self { runner, sink }
    }

    /// Runs a workflow to completion or first failure.
    ///
    /// # Errors
    ///
    /// See [`Coordinator::run_with_cancellation`].
    pub async fn run(
        &self,
        workflow: &Workflow,
    ) -> taskweave_core::Result<RunSummary, CoordinatorError> {
        self.run_with_cancellation(workflow, CancellationToken::new())
            .await
    }

    /// Runs a workflow, stopping between nodes once `cancel` is triggered.
    ///
    /// A failing task is not an error: the run stops and the summary has
    /// status `Failed`.
    ///
    /// # Errors
    ///
    /// Returns an error, before any node is started or any progress is
    /// published, if:
    /// - No execution order exists (`Planning`)
    /// - A node's configuration is unresolved or malformed (`MalformedWorkflow`)
    /// - An edge breaks the fan-in or kind rules (`InvalidWorkflow`)
    #[instrument(skip_all, fields(workflow = %workflow.id))]
    pub async fn run_with_cancellation(
        &self,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> taskweave_core::Result<RunSummary, CoordinatorError> {
        let steps = plan(workflow)?;

        let mut run = ExecutionRun::new(
            workflow.id,
            steps.iter().map(|(node_id, _)| *node_id).collect(),
        );
        info!(run = %run.id(), nodes = run.order().len(), "run started");
        self.publish(
            &run,
            ExecutionEvent::RunStarted {
                run_id: run.id(),
                workflow_id: run.workflow_id(),
                timestamp: Utc::now(),
            },
        );

        for (node_id, kind) in steps {
            if cancel.is_cancelled() {
                run.cancel();
                info!(run = %run.id(), "run cancelled");
                self.publish(
                    &run,
                    ExecutionEvent::RunCancelled {
                        run_id: run.id(),
                        timestamp: Utc::now(),
                    },
                );
                return Ok(run.into_summary());
            }

            run.start_node(node_id);
            debug!(run = %run.id(), node = %node_id, %kind, "task started");
            self.publish(
                &run,
                ExecutionEvent::NodeStarted {
                    run_id: run.id(),
                    node_id,
                    timestamp: Utc::now(),
                },
            );

            let outcome = match effective_config(&workflow.graph, node_id, run.results()) {
                Ok(config) => self
                    .runner
                    .execute(node_id, kind, &config)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(result) => {
                    run.complete_node(node_id, result);
                    debug!(run = %run.id(), node = %node_id, "task completed");
                    self.publish(
                        &run,
                        ExecutionEvent::NodeCompleted {
                            run_id: run.id(),
                            node_id,
                            timestamp: Utc::now(),
                        },
                    );
                }
                Err(error) => {
                    warn!(run = %run.id(), node = %node_id, %error, "task failed");
                    run.fail_node(node_id, error.clone());
                    self.publish(
                        &run,
                        ExecutionEvent::NodeFailed {
                            run_id: run.id(),
                            node_id,
                            error,
                            timestamp: Utc::now(),
                        },
                    );

                    run.fail();
                    info!(run = %run.id(), node = %node_id, "run failed");
                    self.publish(
                        &run,
                        ExecutionEvent::RunFailed {
                            run_id: run.id(),
                            node_id,
                            timestamp: Utc::now(),
                        },
                    );
                    return Ok(run.into_summary());
                }
            }
        }

        run.complete();
        info!(run = %run.id(), "run completed");
        self.publish(
            &run,
            ExecutionEvent::RunCompleted {
                run_id: run.id(),
                timestamp: Utc::now(),
            },
        );
        Ok(run.into_summary())
    }

    fn publish(&self, run: &ExecutionRun, event: ExecutionEvent) {
        self.sink.publish(ProgressUpdate {
            event,
            statuses: run.statuses().clone(),
            results: run.results().clone(),
        });
    }
}

/// Returns the ordered steps of a run, each with its resolved kind.
fn plan(
    workflow: &Workflow,
) -> taskweave_core::Result<Vec<(NodeId, TaskKind)>, CoordinatorError> {
    let workflow_id = workflow.id;
    let order =
        execution_order(&workflow.graph).context(CoordinatorError::Planning { workflow_id })?;

    let steps = order
        .into_iter()
        .map(|node_id| resolve(workflow, node_id))
        .collect::<Result<Vec<_>, GraphError>>()
        .context(CoordinatorError::MalformedWorkflow { workflow_id })?;

    // Restored edges never went through `connect`.
    workflow
        .validate()
        .context(CoordinatorError::InvalidWorkflow { workflow_id })?;

    Ok(steps)
}

fn resolve(workflow: &Workflow, node_id: NodeId) -> Result<(NodeId, TaskKind), GraphError> {
    let node = workflow
        .graph
        .get_node(node_id)
        .ok_or(GraphError::NodeNotFound { node_id })?;
    node.config
        .check()
        .map_err(|reason| GraphError::MalformedConfig { node_id, reason })?;
    let kind = node.kind().ok_or(GraphError::MalformedConfig {
        node_id,
        reason: "unrecognized task type",
    })?;
    Ok((node_id, kind))
}
