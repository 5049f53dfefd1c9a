//! Domain error types for CLI operations.
//!
//! Lower-level errors (I/O, parsing, engine errors) are wrapped with these as
//! rootcause context, so the printed report reads from the command down to
//! the root cause.

use std::fmt;
use std::path::PathBuf;
use taskweave_workflow::TaskKind;

#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config,
    /// The HTTP client could not be built.
    HttpClient,
    /// A workflow document could not be read.
    ReadDocument { path: PathBuf },
    /// A workflow document could not be parsed.
    ParseDocument { path: PathBuf },
    /// A workflow document could not be written.
    WriteDocument { path: PathBuf },
    /// No node matches the given ID or name.
    UnknownNode { reference: String },
    /// More than one node has the given name.
    AmbiguousNode { reference: String },
    /// The workflow breaks one of its invariants.
    InvalidWorkflow,
    /// The requested edge was refused. Carries the source node's kind, if
    /// resolved, to list what it may feed.
    Connection { source_kind: Option<TaskKind> },
    /// The run could not be started.
    Run,
    /// Output could not be written.
    Output,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "failed to load configuration"),
            Self::HttpClient => write!(f, "failed to build HTTP client"),
            Self::ReadDocument { path } => {
                write!(f, "failed to read workflow file: {}", path.display())
            }
            Self::ParseDocument { path } => {
                write!(f, "failed to parse workflow file: {}", path.display())
            }
            Self::WriteDocument { path } => {
                write!(f, "failed to write workflow file: {}", path.display())
            }
            Self::UnknownNode { reference } => write!(f, "no node matches '{reference}'"),
            Self::AmbiguousNode { reference } => {
                write!(f, "more than one node is named '{reference}'; use its ID")
            }
            Self::InvalidWorkflow => write!(f, "workflow is invalid"),
            Self::Connection { source_kind: None } => write!(f, "connection refused"),
            Self::Connection {
                source_kind: Some(kind),
            } => {
                let allowed = kind.allowed_targets();
                if allowed.is_empty() {
                    write!(f, "connection refused; {kind} nodes cannot feed other tasks")
                } else {
                    let names: Vec<_> = allowed.iter().map(|k| k.as_str()).collect();
                    write!(
                        f,
                        "connection refused; {kind} nodes may feed: {}",
                        names.join(", ")
                    )
                }
            }
            Self::Run => write!(f, "workflow run could not start"),
            Self::Output => write!(f, "failed to write output"),
        }
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path() {
        let err = CliError::ReadDocument {
            path: PathBuf::from("/tmp/digest.json"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read workflow file: /tmp/digest.json"
        );
    }

    #[test]
    fn connection_lists_allowed_targets() {
        let err = CliError::Connection {
            source_kind: Some(TaskKind::Scraping),
        };
        assert_eq!(
            err.to_string(),
            "connection refused; scraping nodes may feed: summarization, email"
        );

        let err = CliError::Connection {
            source_kind: Some(TaskKind::Email),
        };
        assert!(err.to_string().contains("cannot feed"));
    }
}
