//! Workflow documents on disk.
//!
//! A document is the JSON form of a [`Workflow`]:
//! `{"id", "metadata": {...}, "graph": {"nodes": [...], "edges": [...]}}`.

use crate::error::CliError;
use rootcause::prelude::{Report, ResultExt};
use std::path::Path;
use taskweave_workflow::{NodeId, Workflow};

/// Reads and parses a workflow document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid workflow
/// (including edges that reference missing nodes).
pub fn load_workflow(path: &Path) -> Result<Workflow, Report<CliError>> {
    let content = std::fs::read_to_string(path).context(CliError::ReadDocument {
        path: path.to_path_buf(),
    })?;

    serde_json::from_str(&content).context(CliError::ParseDocument {
        path: path.to_path_buf(),
    })
}

/// Writes a workflow document as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the workflow cannot be serialized or written.
pub fn save_workflow(path: &Path, workflow: &Workflow) -> Result<(), Report<CliError>> {
    let context = || CliError::WriteDocument {
        path: path.to_path_buf(),
    };
    let json = serde_json::to_string_pretty(workflow).context(context())?;
    std::fs::write(path, json + "\n").context(context())
}

/// Resolves a node by ID (with or without the `node_` prefix) or by name.
///
/// # Errors
///
/// Returns an error if nothing matches, or if a name matches several nodes.
pub fn find_node(workflow: &Workflow, reference: &str) -> Result<NodeId, Report<CliError>> {
    if let Ok(node_id) = reference.parse::<NodeId>() {
        if workflow.graph.contains_node(node_id) {
            return Ok(node_id);
        }
    }

    let mut matches = workflow
        .graph
        .nodes()
        .filter(|node| node.name == reference)
        .map(|node| node.id);

    match (matches.next(), matches.next()) {
        (Some(node_id), None) => Ok(node_id),
        (Some(_), Some(_)) => Err(CliError::AmbiguousNode {
            reference: reference.to_string(),
        }
        .into()),
        (None, _) => Err(CliError::UnknownNode {
            reference: reference.to_string(),
        }
        .into()),
    }
}
