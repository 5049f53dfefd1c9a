//! Task node types and configurations.
//!
//! Every node in a workflow is one unit of work of a fixed kind:
//! - A unique ID within the workflow
//! - A human-readable label
//! - A kind-specific configuration record
//! - An optional canvas position, carried for the editor and otherwise ignored

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;
use taskweave_core::define_id;

define_id!(
    /// A unique identifier for a node within a workflow.
    NodeId,
    "node"
);

/// The closed set of task kinds a node can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Fetch a page and extract content with CSS selectors.
    Scraping,
    /// Condense input text.
    Summarization,
    /// Label an image.
    Classification,
    /// Send an email.
    Email,
}

impl TaskKind {
    /// All task kinds, in declaration order.
    pub const ALL: [TaskKind; 4] = [
        Self::Scraping,
        Self::Summarization,
        Self::Classification,
        Self::Email,
    ];

    /// Returns the kinds a node of this kind may feed into.
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [TaskKind] {
        match self {
            Self::Scraping => &[Self::Summarization, Self::Email],
            Self::Classification => &[Self::Email],
            Self::Summarization => &[Self::Email],
            Self::Email => &[],
        }
    }

    /// Returns true if an edge from this kind to `target` is legal.
    #[must_use]
    pub fn can_connect_to(self, target: TaskKind) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Returns the wire name of this kind (`"scraping"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scraping => "scraping",
            Self::Summarization => "summarization",
            Self::Classification => "classification",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for scraping tasks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// The page to fetch.
    pub url: String,
    /// CSS selectors, applied in order.
    pub selectors: Vec<String>,
}

impl ScrapingConfig {
    /// Adds a selector unless it is already present.
    pub fn add_selector(&mut self, selector: impl Into<String>) {
        let selector = selector.into();
        if !self.selectors.contains(&selector) {
            self.selectors.push(selector);
        }
    }
}

/// Configuration for summarization tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// The text to summarize. Usually filled from an upstream scraping node.
    pub input_text: String,
    /// Maximum summary length.
    pub max_length: u32,
    /// Minimum summary length.
    pub min_length: u32,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            input_text: String::new(),
            max_length: 130,
            min_length: 30,
        }
    }
}

/// Configuration for image classification tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// The image to classify.
    pub image_url: String,
    /// Minimum confidence for a label to be reported, in `[0, 1]`.
    pub confidence_threshold: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            image_url: String::new(),
            confidence_threshold: 0.5,
        }
    }
}

/// Configuration for email dispatch tasks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub recipient: String,
    pub subject: String,
    /// Message body. Usually filled from an upstream node's output.
    pub body: String,
}

/// Configuration for a node, tagged by task kind.
///
/// Documents whose `type` is not a known kind still load; the node ends up
/// `Unresolved` and is rejected by connection validation and by the
/// coordinator's pre-flight check. The original JSON is kept and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskConfig {
    Scraping(ScrapingConfig),
    Summarization(SummarizationConfig),
    Classification(ClassificationConfig),
    Email(EmailConfig),
    /// A configuration whose kind could not be resolved, as stored.
    Unresolved(JsonValue),
}

/// Wire form of the resolvable configurations.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownConfig {
    Scraping(ScrapingConfig),
    Summarization(SummarizationConfig),
    Classification(ClassificationConfig),
    Email(EmailConfig),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownConfigRef<'a> {
    Scraping(&'a ScrapingConfig),
    Summarization(&'a SummarizationConfig),
    Classification(&'a ClassificationConfig),
    Email(&'a EmailConfig),
}

impl From<KnownConfig> for TaskConfig {
    fn from(config: KnownConfig) -> Self {
        match config {
            KnownConfig::Scraping(c) => Self::Scraping(c),
            KnownConfig::Summarization(c) => Self::Summarization(c),
            KnownConfig::Classification(c) => Self::Classification(c),
            KnownConfig::Email(c) => Self::Email(c),
        }
    }
}

impl Serialize for TaskConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scraping(c) => KnownConfigRef::Scraping(c).serialize(serializer),
            Self::Summarization(c) => KnownConfigRef::Summarization(c).serialize(serializer),
            Self::Classification(c) => KnownConfigRef::Classification(c).serialize(serializer),
            Self::Email(c) => KnownConfigRef::Email(c).serialize(serializer),
            Self::Unresolved(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TaskConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;
        let resolvable = raw
            .get("type")
            .and_then(JsonValue::as_str)
            .is_some_and(|name| TaskKind::ALL.iter().any(|kind| kind.as_str() == name));
        if !resolvable {
            return Ok(Self::Unresolved(raw));
        }

        KnownConfig::deserialize(raw)
            .map(Self::from)
            .map_err(serde::de::Error::custom)
    }
}

impl TaskConfig {
    /// Returns a fresh configuration with the defaults for `kind`.
    #[must_use]
    pub fn default_for(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Scraping => Self::Scraping(ScrapingConfig::default()),
            TaskKind::Summarization => Self::Summarization(SummarizationConfig::default()),
            TaskKind::Classification => Self::Classification(ClassificationConfig::default()),
            TaskKind::Email => Self::Email(EmailConfig::default()),
        }
    }

    /// Returns the task kind, or `None` if it could not be resolved.
    #[must_use]
    pub fn kind(&self) -> Option<TaskKind> {
        match self {
            Self::Scraping(_) => Some(TaskKind::Scraping),
            Self::Summarization(_) => Some(TaskKind::Summarization),
            Self::Classification(_) => Some(TaskKind::Classification),
            Self::Email(_) => Some(TaskKind::Email),
            Self::Unresolved(_) => None,
        }
    }

    /// Checks the configuration is well-formed.
    ///
    /// # Errors
    ///
    /// Returns a short description of the first problem found.
    pub fn check(&self) -> Result<(), &'static str> {
        match self {
            Self::Unresolved(_) => Err("unrecognized task type"),
            Self::Classification(c) if !(0.0..=1.0).contains(&c.confidence_threshold) => {
                Err("confidence threshold must be within [0, 1]")
            }
            Self::Summarization(s) if s.min_length > s.max_length => {
                Err("min length exceeds max length")
            }
            _ => Ok(()),
        }
    }
}

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A task node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// Human-readable label.
    pub name: String,
    /// Kind and kind-specific settings.
    pub config: TaskConfig,
    /// Where the editor placed the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl TaskNode {
    /// Creates a new node with a random ID.
    #[must_use]
    pub fn new(name: impl Into<String>, config: TaskConfig) -> Self {
        Self::with_id(NodeId::new(), name, config)
    }

    /// Creates a new node with a specific ID.
    #[must_use]
    pub fn with_id(id: NodeId, name: impl Into<String>, config: TaskConfig) -> Self {
        Self {
            id,
            name: name.into(),
            config,
            position: None,
        }
    }

    /// Creates a node of `kind` with that kind's default configuration.
    #[must_use]
    pub fn of_kind(name: impl Into<String>, kind: TaskKind) -> Self {
        Self::new(name, TaskConfig::default_for(kind))
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    /// Returns the task kind, or `None` if it could not be resolved.
    #[must_use]
    pub fn kind(&self) -> Option<TaskKind> {
        self.config.kind()
    }
}
