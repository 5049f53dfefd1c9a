//! Data propagation between tasks.
//!
//! Before a node runs, the results of the nodes feeding into it are written
//! into fields of its configuration. Which field receives the data depends
//! only on the (producer kind, consumer kind) pair:
//!
//! | producer       | consumer      | field        |
//! |----------------|---------------|--------------|
//! | scraping       | summarization | `input_text` |
//! | scraping       | email         | `body`       |
//! | classification | email         | `body`       |
//! | summarization  | email         | `body`       |
//!
//! Pairs outside the table pass the stored configuration through unchanged.

use crate::error::GraphError;
use crate::execution::TaskResult;
use crate::graph::WorkflowGraph;
use crate::node::{NodeId, TaskConfig, TaskKind};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;

/// A configuration field that can receive upstream output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedField {
    /// `SummarizationConfig::input_text`.
    InputText,
    /// `EmailConfig::body`.
    Body,
}

impl MappedField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputText => "input_text",
            Self::Body => "body",
        }
    }
}

/// Returns the field of a `target` config that receives `source` output.
#[must_use]
pub const fn mapped_field(source: TaskKind, target: TaskKind) -> Option<MappedField> {
    match (source, target) {
        (TaskKind::Scraping, TaskKind::Summarization) => Some(MappedField::InputText),
        (
            TaskKind::Scraping | TaskKind::Classification | TaskKind::Summarization,
            TaskKind::Email,
        ) => Some(MappedField::Body),
        _ => None,
    }
}

/// Returns the text to forward from a recorded result.
///
/// Failed results and falsy payloads (`null`, `false`, `0`, `""`) forward
/// nothing. String payloads are forwarded verbatim, anything else as compact
/// JSON.
#[must_use]
pub fn forwarded_text(result: &TaskResult) -> Option<String> {
    match result.payload()? {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::Number(n) if n.as_f64() == Some(0.0) => None,
        JsonValue::String(text) if text.is_empty() => None,
        JsonValue::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Writes `text` into `field` of `config`.
///
/// Returns false if `config` has no such field.
pub fn write_field(config: &mut TaskConfig, field: MappedField, text: String) -> bool {
    match (field, config) {
        (MappedField::InputText, TaskConfig::Summarization(summarization)) => {
            summarization.input_text = text;
            true
        }
        (MappedField::Body, TaskConfig::Email(email)) => {
            email.body = text;
            true
        }
        _ => false,
    }
}

/// Returns a copy of a node's configuration with upstream results applied.
///
/// Dependencies are applied in graph order, so with more than one mapped
/// dependency the last one wins. Dependencies without a recorded result are
/// skipped.
///
/// # Errors
///
/// Returns `NodeNotFound` if `node_id` is not in the graph.
pub fn effective_config(
    graph: &WorkflowGraph,
    node_id: NodeId,
    results: &BTreeMap<NodeId, TaskResult>,
) -> Result<TaskConfig, GraphError> {
    let node = graph
        .get_node(node_id)
        .ok_or(GraphError::NodeNotFound { node_id })?;
    let mut config = node.config.clone();

    let Some(target_kind) = node.kind() else {
        return Ok(config);
    };

    for dependency in graph.dependencies(node_id) {
        let Some(field) = dependency
            .kind()
            .and_then(|source_kind| mapped_field(source_kind, target_kind))
        else {
            continue;
        };
        let Some(text) = results.get(&dependency.id).and_then(forwarded_text) else {
            continue;
        };

        if write_field(&mut config, field, text) {
            debug!(
                node = %node_id,
                from = %dependency.id,
                field = field.as_str(),
                "propagated upstream result"
            );
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::node::{EmailConfig, ScrapingConfig, SummarizationConfig, TaskNode};
    use serde_json::json;

    fn scenario() -> (WorkflowGraph, NodeId, NodeId, NodeId) {
        let mut graph = WorkflowGraph::new();
        let mut scraping = ScrapingConfig {
            url: "https://example.com".to_string(),
            ..ScrapingConfig::default()
        };
        scraping.add_selector(".title");
        scraping.add_selector(".body");

        let a = graph
            .add_node(TaskNode::new("A", TaskConfig::Scraping(scraping)))
            .expect("add node");
        let b = graph
            .add_node(TaskNode::of_kind("B", TaskKind::Summarization))
            .expect("add node");
        let c = graph
            .add_node(TaskNode::new(
                "C",
                TaskConfig::Email(EmailConfig {
                    recipient: "ops@example.com".to_string(),
                    subject: "Digest".to_string(),
                    body: String::new(),
                }),
            ))
            .expect("add node");
        graph.connect(a, b).expect("edge");
        graph.connect(b, c).expect("edge");
        (graph, a, b, c)
    }

    #[test]
    fn mapping_table() {
        use TaskKind::*;
        assert_eq!(mapped_field(Scraping, Summarization), Some(MappedField::InputText));
        assert_eq!(mapped_field(Scraping, Email), Some(MappedField::Body));
        assert_eq!(mapped_field(Classification, Email), Some(MappedField::Body));
        assert_eq!(mapped_field(Summarization, Email), Some(MappedField::Body));
        assert_eq!(mapped_field(Classification, Summarization), None);
        assert_eq!(mapped_field(Email, Scraping), None);
    }

    #[test]
    fn mapped_pairs_are_legal_connections() {
        for source in TaskKind::ALL {
            for target in TaskKind::ALL {
                if mapped_field(source, target).is_some() {
                    assert!(source.can_connect_to(target), "{source} -> {target}");
                }
            }
        }
    }

    #[test]
    fn scenario_chain_propagates() {
        let (graph, a, b, c) = scenario();
        let mut results = BTreeMap::new();

        results.insert(a, TaskResult::success(json!("Hello world")));
        match effective_config(&graph, b, &results).expect("config") {
            TaskConfig::Summarization(s) => {
                assert_eq!(s.input_text, "Hello world");
                assert_eq!(s.max_length, 130);
            }
            other => panic!("unexpected config: {other:?}"),
        }

        results.insert(b, TaskResult::success(json!("Hello")));
        match effective_config(&graph, c, &results).expect("config") {
            TaskConfig::Email(e) => {
                assert_eq!(e.body, "Hello");
                assert_eq!(e.recipient, "ops@example.com");
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn stored_config_is_not_modified() {
        let (graph, a, b, _) = scenario();
        let results = BTreeMap::from([(a, TaskResult::success(json!("Hello world")))]);

        effective_config(&graph, b, &results).expect("config");

        let stored = graph.get_node(b).expect("node");
        assert_eq!(stored.config, TaskConfig::default_for(TaskKind::Summarization));
    }

    #[test]
    fn effective_config_is_idempotent() {
        let (graph, a, b, _) = scenario();
        let results = BTreeMap::from([(a, TaskResult::success(json!("Hello world")))]);

        let first = effective_config(&graph, b, &results).expect("config");
        let second = effective_config(&graph, b, &results).expect("config");
        assert_eq!(first, second);
    }

    #[test]
    fn missing_or_empty_results_are_skipped() {
        let (graph, a, b, _) = scenario();
        let stored = graph.get_node(b).expect("node").config.clone();

        let none = BTreeMap::new();
        assert_eq!(effective_config(&graph, b, &none).expect("config"), stored);

        for payload in [JsonValue::Null, json!(""), json!(false), json!(0), json!(0.0)] {
            let results = BTreeMap::from([(a, TaskResult::success(payload))]);
            assert_eq!(effective_config(&graph, b, &results).expect("config"), stored);
        }

        let failed = BTreeMap::from([(a, TaskResult::failure("boom"))]);
        assert_eq!(effective_config(&graph, b, &failed).expect("config"), stored);
    }

    #[test]
    fn truthy_scalars_forwarded_as_text() {
        assert_eq!(
            forwarded_text(&TaskResult::success(json!(true))).as_deref(),
            Some("true")
        );
        assert_eq!(
            forwarded_text(&TaskResult::success(json!(42))).as_deref(),
            Some("42")
        );
        assert_eq!(forwarded_text(&TaskResult::success(json!(0))), None);
        assert_eq!(forwarded_text(&TaskResult::success(json!(false))), None);
    }

    #[test]
    fn structured_payload_forwarded_as_json_text() {
        let classify = TaskNode::of_kind("classify", TaskKind::Classification);
        let email = TaskNode::of_kind("email", TaskKind::Email);
        let (classify_id, email_id) = (classify.id, email.id);
        let graph =
            WorkflowGraph::from_parts([classify, email], [Edge::new(classify_id, email_id)])
                .expect("graph");

        let results = BTreeMap::from([(
            classify_id,
            TaskResult::success(json!({ "label": "cat", "score": 0.9 })),
        )]);

        match effective_config(&graph, email_id, &results).expect("config") {
            TaskConfig::Email(e) => assert_eq!(e.body, r#"{"label":"cat","score":0.9}"#),
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn unmapped_pair_passes_config_through() {
        // Only reachable through a restored document; connect() refuses it.
        let classify = TaskNode::of_kind("classify", TaskKind::Classification);
        let summarize = TaskNode::new(
            "summarize",
            TaskConfig::Summarization(SummarizationConfig {
                input_text: "keep me".to_string(),
                ..SummarizationConfig::default()
            }),
        );
        let (classify_id, summarize_id) = (classify.id, summarize.id);
        let graph = WorkflowGraph::from_parts(
            [classify, summarize],
            [Edge::new(classify_id, summarize_id)],
        )
        .expect("graph");

        let results = BTreeMap::from([(classify_id, TaskResult::success(json!("cat")))]);
        match effective_config(&graph, summarize_id, &results).expect("config") {
            TaskConfig::Summarization(s) => assert_eq!(s.input_text, "keep me"),
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn unknown_node() {
        let (graph, ..) = scenario();
        let missing = NodeId::new();
        assert_eq!(
            effective_config(&graph, missing, &BTreeMap::new()),
            Err(GraphError::NodeNotFound { node_id: missing })
        );
    }
}
