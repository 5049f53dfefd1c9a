//! Progress reporting.
//!
//! The coordinator publishes a [`ProgressUpdate`] after every status change:
//! the event itself plus a snapshot of every node's status and the results
//! recorded so far. Sinks decide what to do with them (render, stream, log,
//! ignore).

use crate::execution::{ExecutionEvent, ResultMap, StatusMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One published progress step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub event: ExecutionEvent,
    /// `{nodeId -> status}` after the event.
    pub statuses: StatusMap,
    /// `{nodeId -> {status, result?, error?}}` after the event.
    pub results: ResultMap,
}

/// Receives progress updates during a run.
///
/// Called from the run loop; implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, update: ProgressUpdate);
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn publish(&self, update: ProgressUpdate) {
        (**self).publish(update);
    }
}

/// A sink that discards all updates.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn publish(&self, _update: ProgressUpdate) {}
}

/// A sink that forwards updates to an unbounded channel.
///
/// One update per status change keeps volume low, so the channel is unbounded
/// and a slow consumer never stalls the run.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn publish(&self, update: ProgressUpdate) {
        // Receiver may have been dropped
        let _ = self.sender.send(update);
    }
}

/// A sink that logs every update.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn publish(&self, update: ProgressUpdate) {
        let completed = update
            .results
            .values()
            .filter(|result| result.is_success())
            .count();
        let total = update.statuses.len();

        match &update.event {
            ExecutionEvent::NodeFailed { node_id, error, .. } => {
                warn!(
                    run = %update.event.run_id(),
                    node = %node_id,
                    at = %update.event.timestamp(),
                    %error,
                    "task failed"
                );
            }
            event => {
                info!(
                    run = %event.run_id(),
                    at = %event.timestamp(),
                    node = ?event.node_id().map(|id| id.to_string()),
                    completed,
                    total,
                    "{}",
                    event_name(event)
                );
            }
        }
    }
}

fn event_name(event: &ExecutionEvent) -> &'static str {
    match event {
        ExecutionEvent::RunStarted { .. } => "run started",
        ExecutionEvent::NodeStarted { .. } => "task started",
        ExecutionEvent::NodeCompleted { .. } => "task completed",
        ExecutionEvent::NodeFailed { .. } => "task failed",
        ExecutionEvent::RunCompleted { .. } => "run completed",
        ExecutionEvent::RunFailed { .. } => "run failed",
        ExecutionEvent::RunCancelled { .. } => "run cancelled",
    }
}
