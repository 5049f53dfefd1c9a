//! CLI subcommand implementations.
//!
//! Each command loads a workflow document, calls into the engine and writes
//! human-readable output to `out`. Errors are returned as reports for `main`
//! to print.

use crate::config::RunnerConfig;
use crate::document::{find_node, load_workflow, save_workflow};
use crate::error::CliError;
use crate::http_runner::HttpTaskRunner;
use rootcause::prelude::{Report, ResultExt};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use taskweave_workflow::{
    Coordinator, EchoRunner, RunSummary, TaskKind, TaskNode, TaskResult, TaskRunner, TracingSink,
    WorkflowSummary, execution_order, next_runnable,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn describe(node: &TaskNode) -> String {
    let kind = node.kind().map_or("unresolved", TaskKind::as_str);
    format!("{} ({kind}) {}", node.name, node.id)
}

/// Checks every workflow invariant.
///
/// # Errors
///
/// Returns the first violation, wrapped in `InvalidWorkflow`.
pub fn validate(path: &Path, out: &mut impl Write) -> Result<(), Report<CliError>> {
    let workflow = load_workflow(path)?;
    workflow.validate().context(CliError::InvalidWorkflow)?;

    writeln!(
        out,
        "workflow '{}' is valid: {} nodes, {} edges",
        workflow.name(),
        workflow.graph.node_count(),
        workflow.graph.edge_count()
    )
    .context(CliError::Output)
}

/// Prints the execution order, one numbered node per line.
///
/// # Errors
///
/// Returns an error if the workflow has a cycle.
pub fn order(path: &Path, out: &mut impl Write) -> Result<(), Report<CliError>> {
    let workflow = load_workflow(path)?;
    let order = execution_order(&workflow.graph).context(CliError::InvalidWorkflow)?;

    for (position, node) in order
        .iter()
        .filter_map(|node_id| workflow.graph.get_node(*node_id))
        .enumerate()
    {
        writeln!(out, "{}. {}", position + 1, describe(node)).context(CliError::Output)?;
    }
    Ok(())
}

/// Prints the nodes that could run once `executed` have finished.
///
/// # Errors
///
/// Returns an error if a reference does not resolve to a node.
pub fn runnable(
    path: &Path,
    executed: &[String],
    out: &mut impl Write,
) -> Result<(), Report<CliError>> {
    let workflow = load_workflow(path)?;
    let executed = executed
        .iter()
        .map(|reference| find_node(&workflow, reference))
        .collect::<Result<HashSet<_>, _>>()?;

    for node in next_runnable(&workflow.graph, &executed)
        .into_iter()
        .filter_map(|node_id| workflow.graph.get_node(node_id))
    {
        writeln!(out, "{}", describe(node)).context(CliError::Output)?;
    }
    Ok(())
}

/// Adds an edge between two nodes and saves the document.
///
/// The result is written to `output` if given, otherwise back to `path`.
///
/// # Errors
///
/// Returns an error if either node is unknown or the connection is refused.
pub fn connect(
    path: &Path,
    source: &str,
    target: &str,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<(), Report<CliError>> {
    let mut workflow = load_workflow(path)?;
    let source_id = find_node(&workflow, source)?;
    let target_id = find_node(&workflow, target)?;
    let source_kind = workflow.graph.get_node(source_id).and_then(TaskNode::kind);

    let edge_id = workflow
        .graph
        .connect(source_id, target_id)
        .context(CliError::Connection { source_kind })?;
    workflow.touch();

    let destination = output.unwrap_or(path);
    save_workflow(destination, &workflow)?;
    info!(%edge_id, path = %destination.display(), "workflow saved");

    writeln!(out, "connected {source} -> {target} ({edge_id})").context(CliError::Output)
}

/// Prints the workflow's listing summary as JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be loaded.
pub fn show(path: &Path, out: &mut impl Write) -> Result<(), Report<CliError>> {
    let workflow = load_workflow(path)?;
    let summary = WorkflowSummary::from(&workflow);
    let json = serde_json::to_string_pretty(&summary).context(CliError::Output)?;
    writeln!(out, "{json}").context(CliError::Output)
}

/// Options for [`run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Use the echo runner instead of the task API.
    pub dry_run: bool,
    /// Fold the outcome into the document's status and save it.
    pub record: bool,
}

/// Runs a workflow and prints its summary as JSON.
///
/// With `record`, the document is saved as running before the first task and
/// saved again with the outcome; a run that cannot start restores the prior
/// status. A failed task does not make this an error; check the returned
/// summary.
///
/// # Errors
///
/// Returns an error if the workflow cannot be planned, the runner cannot be
/// built, or the document cannot be saved.
pub async fn run(
    path: &Path,
    options: RunOptions,
    runner_config: &RunnerConfig,
    cancel: CancellationToken,
    out: &mut impl Write,
) -> Result<RunSummary, Report<CliError>> {
    let mut workflow = load_workflow(path)?;

    let runner: Box<dyn TaskRunner> = if options.dry_run {
        Box::new(EchoRunner)
    } else {
        let runner = HttpTaskRunner::new(runner_config).context(CliError::HttpClient)?;
        info!(endpoint = runner.endpoint(), "using task API");
        Box::new(runner)
    };
    let coordinator = Coordinator::new(runner, TracingSink);

    let previous = workflow.status();
    if options.record {
        workflow.mark_running();
        save_workflow(path, &workflow)?;
    }

    let summary = match coordinator.run_with_cancellation(&workflow, cancel).await {
        Ok(summary) => summary,
        Err(report) => {
            if options.record {
                workflow.metadata.status = previous;
                save_workflow(path, &workflow)?;
            }
            return Err(report).context(CliError::Run);
        }
    };

    if let Some(node_id) = summary.failed_node() {
        let error = summary
            .results
            .get(&node_id)
            .and_then(TaskResult::error_message)
            .unwrap_or_default();
        warn!(node = %node_id, error, "run stopped at failed task");
    }

    if options.record && workflow.record_outcome(&summary) {
        save_workflow(path, &workflow)?;
    }

    let json = serde_json::to_string_pretty(&summary).context(CliError::Output)?;
    writeln!(out, "{json}").context(CliError::Output)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use serde_json::json;
    use taskweave_workflow::{Edge, RunStatus, ScrapingConfig, TaskConfig, Workflow, WorkflowStatus};

    struct Fixture {
        _dir: tempfile::TempDir,
        path: PathBuf,
    }

    /// scrape -> summarize, plus an unconnected email node.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("workflow.json");

        let mut workflow = Workflow::new("Digest");
        let scrape = workflow
            .graph
            .add_node(TaskNode::new(
                "scrape",
                TaskConfig::Scraping(ScrapingConfig {
                    url: "https://example.com".to_string(),
                    selectors: vec!["h1".to_string()],
                }),
            ))
            .expect("add node");
        let summarize = workflow
            .graph
            .add_node(TaskNode::of_kind("summarize", TaskKind::Summarization))
            .expect("add node");
        workflow
            .graph
            .add_node(TaskNode::of_kind("email", TaskKind::Email))
            .expect("add node");
        workflow.graph.connect(scrape, summarize).expect("edge");
        save_workflow(&path, &workflow).expect("save");

        Fixture { _dir: dir, path }
    }

    fn output(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).expect("utf8")
    }

    #[test]
    fn validate_reports_counts() {
        let fixture = fixture();
        let mut out = Vec::new();
        validate(&fixture.path, &mut out).expect("valid");
        assert_eq!(
            output(out),
            "workflow 'Digest' is valid: 3 nodes, 1 edges\n"
        );
    }

    #[test]
    fn order_puts_scrape_before_summarize() {
        let fixture = fixture();
        let mut out = Vec::new();
        order(&fixture.path, &mut out).expect("order");

        let text = output(out);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let scrape = lines.iter().position(|l| l.contains("scrape (scraping)"));
        let summarize = lines
            .iter()
            .position(|l| l.contains("summarize (summarization)"));
        assert!(scrape < summarize);
        assert!(lines[0].starts_with("1. "));
    }

    #[test]
    fn runnable_follows_executed_nodes() {
        let fixture = fixture();

        let mut out = Vec::new();
        runnable(&fixture.path, &[], &mut out).expect("runnable");
        let text = output(out);
        assert!(text.contains("scrape"));
        assert!(text.contains("email"));
        assert!(!text.contains("summarize"));

        let mut out = Vec::new();
        runnable(&fixture.path, &["scrape".to_string()], &mut out).expect("runnable");
        let text = output(out);
        assert!(text.contains("summarize"));
        assert!(!text.contains("scrape ("));
    }

    #[test]
    fn runnable_rejects_unknown_reference() {
        let fixture = fixture();
        let mut out = Vec::new();
        assert!(runnable(&fixture.path, &["fax".to_string()], &mut out).is_err());
    }

    #[test]
    fn connect_saves_to_output() {
        let fixture = fixture();
        let destination = fixture.path.with_file_name("connected.json");

        let mut out = Vec::new();
        connect(
            &fixture.path,
            "summarize",
            "email",
            Some(&destination),
            &mut out,
        )
        .expect("connect");
        assert!(output(out).starts_with("connected summarize -> email"));

        assert_eq!(load_workflow(&destination).expect("load").graph.edge_count(), 2);
        assert_eq!(load_workflow(&fixture.path).expect("load").graph.edge_count(), 1);
    }

    #[test]
    fn connect_explains_rejection() {
        let fixture = fixture();
        let mut out = Vec::new();

        let err = connect(&fixture.path, "email", "scrape", None, &mut out)
            .expect_err("email cannot feed scraping");
        assert!(err.to_string().contains("email nodes cannot feed"));
        assert_eq!(load_workflow(&fixture.path).expect("load").graph.edge_count(), 1);
    }

    #[test]
    fn show_prints_summary() {
        let fixture = fixture();
        let mut out = Vec::new();
        show(&fixture.path, &mut out).expect("show");

        let summary: serde_json::Value = serde_json::from_str(&output(out)).expect("json");
        assert_eq!(summary["name"], "Digest");
        assert_eq!(summary["node_count"], 3);
        assert_eq!(summary["status"], "idle");
    }

    #[tokio::test]
    async fn dry_run_completes_and_records() {
        let fixture = fixture();
        let mut out = Vec::new();
        let options = RunOptions {
            dry_run: true,
            record: true,
        };

        let summary = run(
            &fixture.path,
            options,
            &RunnerConfig::default(),
            CancellationToken::new(),
            &mut out,
        )
        .await
        .expect("run");

        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.results.len(), 3);
        let printed: RunSummary = serde_json::from_slice(&out).expect("json");
        assert_eq!(printed.run_id, summary.run_id);

        let saved = load_workflow(&fixture.path).expect("load");
        assert_eq!(saved.status(), WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn cancelled_run_leaves_document_alone() {
        let fixture = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut out = Vec::new();
        let summary = run(
            &fixture.path,
            RunOptions {
                dry_run: true,
                record: false,
            },
            &RunnerConfig::default(),
            cancel,
            &mut out,
        )
        .await
        .expect("run");

        assert_eq!(summary.status, RunStatus::Cancelled);
        assert!(summary.results.is_empty());
        let saved = load_workflow(&fixture.path).expect("load");
        assert_eq!(saved.status(), WorkflowStatus::Idle);
    }

    #[tokio::test]
    async fn recorded_run_that_cannot_start_restores_status() {
        let fixture = fixture();
        let mut workflow = load_workflow(&fixture.path).expect("load");
        let email = find_node(&workflow, "email").expect("email");
        let scrape = find_node(&workflow, "scrape").expect("scrape");
        workflow
            .graph
            .insert_edge(Edge::new(email, scrape))
            .expect("stored edge");
        save_workflow(&fixture.path, &workflow).expect("save");

        let mut out = Vec::new();
        let result = run(
            &fixture.path,
            RunOptions {
                dry_run: true,
                record: true,
            },
            &RunnerConfig::default(),
            CancellationToken::new(),
            &mut out,
        )
        .await;

        assert!(result.is_err());
        assert!(out.is_empty());
        let saved = load_workflow(&fixture.path).expect("load");
        assert_eq!(saved.status(), WorkflowStatus::Idle);
    }

    #[test]
    fn connect_keeps_unrecognized_nodes_intact() {
        let fixture = fixture();
        let stored = json!({ "type": "translation", "lang": "fr" });
        let mut workflow = load_workflow(&fixture.path).expect("load");
        workflow
            .graph
            .add_node(TaskNode::new("translate", TaskConfig::Unresolved(stored.clone())))
            .expect("add node");
        save_workflow(&fixture.path, &workflow).expect("save");

        let mut out = Vec::new();
        connect(&fixture.path, "summarize", "email", None, &mut out).expect("connect");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&fixture.path).expect("read"))
                .expect("json");
        let translate = raw["graph"]["nodes"]
            .as_array()
            .expect("nodes")
            .iter()
            .find(|node| node["name"] == "translate")
            .expect("translate node");
        assert_eq!(translate["config"], stored);
    }
}
