//! Task runner backed by the remote task API.
//!
//! Each task is posted to `{base_url}/tasks/execute/` as
//! `{"nodeId", "type", "config"}` and answered with
//! `{"status": "success"|"error", "result"?, "error"?}`.

use crate::config::RunnerConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use taskweave_workflow::{NodeId, TaskConfig, TaskKind, TaskResult, TaskRunner, TaskRunnerError};
use tracing::debug;

/// Request body for the task API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest<'a> {
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub config: &'a TaskConfig,
}

/// Converts a task API answer into a runner outcome.
///
/// # Errors
///
/// Returns `Rejected` with the API's message if the task reported failure.
pub fn interpret(answer: TaskResult) -> Result<JsonValue, TaskRunnerError> {
    match answer {
        TaskResult::Success { result } => Ok(result),
        TaskResult::Error { error } if error.is_empty() => Err(TaskRunnerError::Rejected {
            message: "task failed without a message".to_string(),
        }),
        TaskResult::Error { error } => Err(TaskRunnerError::Rejected { message: error }),
    }
}

/// Runs tasks through the remote task API.
pub struct HttpTaskRunner {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTaskRunner {
    /// Creates a runner for the configured task API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &RunnerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.execute_url(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TaskRunner for HttpTaskRunner {
    async fn execute(
        &self,
        node_id: NodeId,
        kind: TaskKind,
        config: &TaskConfig,
    ) -> Result<JsonValue, TaskRunnerError> {
        let request = TaskRequest {
            node_id: node_id.to_string(),
            kind,
            config,
        };
        debug!(node = %node_id, %kind, endpoint = %self.endpoint, "posting task");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TaskRunnerError::Unavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TaskRunnerError::Unavailable {
                message: e.to_string(),
            })?;

        // Failed tasks may come back with a 4xx/5xx and a regular error body;
        // a success body only counts with a 2xx status.
        let unavailable = || TaskRunnerError::Unavailable {
            message: format!("task API answered {status}"),
        };
        match serde_json::from_str::<TaskResult>(&body) {
            Ok(TaskResult::Success { .. }) if !status.is_success() => Err(unavailable()),
            Ok(answer) => interpret(answer),
            Err(_) if !status.is_success() => Err(unavailable()),
            Err(e) => Err(TaskRunnerError::InvalidResponse {
                message: e.to_string(),
            }),
        }
    }
}
