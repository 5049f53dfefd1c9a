//! Task runner boundary.
//!
//! The coordinator hands each node's effective configuration to a
//! [`TaskRunner`] and records whatever it returns. Retries, timeouts and
//! result caching belong to the runner, not the engine.

use crate::node::{NodeId, TaskConfig, TaskKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Executes a single task.
///
/// This is the only call in a run allowed to suspend.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Runs the task for `node_id` with its effective configuration.
    ///
    /// Returns the task's result payload.
    async fn execute(
        &self,
        node_id: NodeId,
        kind: TaskKind,
        config: &TaskConfig,
    ) -> Result<JsonValue, TaskRunnerError>;
}

#[async_trait]
impl<T: TaskRunner + ?Sized> TaskRunner for Box<T> {
    async fn execute(
        &self,
        node_id: NodeId,
        kind: TaskKind,
        config: &TaskConfig,
    ) -> Result<JsonValue, TaskRunnerError> {
        (**self).execute(node_id, kind, config).await
    }
}

#[async_trait]
impl<T: TaskRunner + ?Sized> TaskRunner for Arc<T> {
    async fn execute(
        &self,
        node_id: NodeId,
        kind: TaskKind,
        config: &TaskConfig,
    ) -> Result<JsonValue, TaskRunnerError> {
        (**self).execute(node_id, kind, config).await
    }
}

/// Errors reported by a task runner.
///
/// The display text becomes the failed node's error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskRunnerError {
    /// The task ran and reported failure.
    Rejected { message: String },
    /// The task could not be reached.
    Unavailable { message: String },
    /// The task answered with something that could not be understood.
    InvalidResponse { message: String },
}

impl std::fmt::Display for TaskRunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { message } => write!(f, "{message}"),
            Self::Unavailable { message } => write!(f, "task runner unavailable: {message}"),
            Self::InvalidResponse { message } => {
                write!(f, "invalid task runner response: {message}")
            }
        }
    }
}

impl std::error::Error for TaskRunnerError {}

/// A runner that returns each task's configuration as its result.
///
/// Useful for dry runs: the recorded results show what every task would
/// have been asked to do.
pub struct EchoRunner;

#[async_trait]
impl TaskRunner for EchoRunner {
    async fn execute(
        &self,
        _node_id: NodeId,
        _kind: TaskKind,
        config: &TaskConfig,
    ) -> Result<JsonValue, TaskRunnerError> {
        serde_json::to_value(config).map_err(|e| TaskRunnerError::InvalidResponse {
            message: e.to_string(),
        })
    }
}

/// A runner that can be configured to succeed or fail.
pub struct MockRunner {
    /// If set, all executions will fail with this error.
    pub fail_with: Option<TaskRunnerError>,
    /// The output to return on success.
    pub output: JsonValue,
}

impl MockRunner {
    /// Creates a mock runner that succeeds with the given output.
    #[must_use]
    pub fn succeeding(output: JsonValue) -> Self {
        Self {
            fail_with: None,
            output,
        }
    }

    /// Creates a mock runner that fails with the given error.
    #[must_use]
    pub fn failing(error: TaskRunnerError) -> Self {
        Self {
            fail_with: Some(error),
            output: JsonValue::Null,
        }
    }
}

#[async_trait]
impl TaskRunner for MockRunner {
    async fn execute(
        &self,
        _node_id: NodeId,
        _kind: TaskKind,
        _config: &TaskConfig,
    ) -> Result<JsonValue, TaskRunnerError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(self.output.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EmailConfig;
    use serde_json::json;

    #[tokio::test]
    async fn echo_runner_returns_config() {
        let config = TaskConfig::Email(EmailConfig {
            recipient: "ops@example.com".to_string(),
            subject: "Digest".to_string(),
            body: "Hello".to_string(),
        });

        let result = EchoRunner
            .execute(NodeId::new(), TaskKind::Email, &config)
            .await
            .expect("echo");

        assert_eq!(result["type"], "email");
        assert_eq!(result["body"], "Hello");
    }

    #[tokio::test]
    async fn mock_runner_fails_when_configured() {
        let runner = MockRunner::failing(TaskRunnerError::Rejected {
            message: "quota exceeded".to_string(),
        });
        let err = runner
            .execute(
                NodeId::new(),
                TaskKind::Scraping,
                &TaskConfig::default_for(TaskKind::Scraping),
            )
            .await
            .expect_err("should fail");
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn boxed_runner_delegates() {
        let runner: Box<dyn TaskRunner> = Box::new(MockRunner::succeeding(json!("done")));
        let result = runner
            .execute(
                NodeId::new(),
                TaskKind::Classification,
                &TaskConfig::default_for(TaskKind::Classification),
            )
            .await
            .expect("success");
        assert_eq!(result, json!("done"));
    }

    #[test]
    fn error_display() {
        let err = TaskRunnerError::Unavailable {
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "task runner unavailable: connection refused"
        );
    }
}
