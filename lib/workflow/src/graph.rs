//! Workflow graph implementation using petgraph.
//!
//! Workflows are directed graphs where:
//! - Nodes are configured tasks of a fixed kind
//! - Edges carry one task's output into the next task's configuration
//!
//! Edges enter the graph through [`WorkflowGraph::connect`], which applies the
//! connection rules, or through [`WorkflowGraph::insert_edge`] when restoring a
//! stored document. The serialized form is `{ "nodes": [...], "edges": [...] }`.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::node::{NodeId, TaskConfig, TaskNode};
use crate::validation::validate_connection;
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskweave_core::EdgeId;
use tracing::{debug, warn};

/// A workflow graph using petgraph's directed graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphParts", into = "GraphParts")]
pub struct WorkflowGraph {
    /// The underlying directed graph.
    graph: DiGraph<TaskNode, Edge>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeId, NodeIndex>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index_map: HashMap::new(),
        }
    }

    /// Builds a graph from stored nodes and edges.
    ///
    /// Edges are restored as-is; only their endpoints are checked.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if two nodes share an ID, or `MissingEndpoint`
    /// for the first edge that references a node not in `nodes`.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = TaskNode>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        for edge in edges {
            graph.insert_edge(edge)?;
        }
        Ok(graph)
    }

    /// Adds a node to the graph.
    ///
    /// Returns the node ID.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if a node with the same ID is already present.
    pub fn add_node(&mut self, node: TaskNode) -> Result<NodeId, GraphError> {
        let node_id = node.id;
        if self.node_index_map.contains_key(&node_id) {
            return Err(GraphError::DuplicateNode { node_id });
        }
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        Ok(node_id)
    }

    /// Removes a node from the graph.
    ///
    /// Also removes all edges connected to this node.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<TaskNode> {
        let index = self.node_index_map.remove(&node_id)?;
        let node = self.graph.remove_node(index);
        // petgraph moves the last node into the freed slot.
        self.rebuild_index_map();
        node
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: NodeId) -> Option<&TaskNode> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a mutable reference to a node by its ID.
    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut TaskNode> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight_mut(*index)
    }

    /// Returns true if the graph contains `node_id`.
    #[must_use]
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node_index_map.contains_key(&node_id)
    }

    /// Replaces a node's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the node doesn't exist or if `config` is of a
    /// different kind than the node's current configuration.
    pub fn update_config(&mut self, node_id: NodeId, config: TaskConfig) -> Result<(), GraphError> {
        let node = self
            .get_node_mut(node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;

        if node.kind() != config.kind() {
            return Err(GraphError::KindChange {
                node_id,
                from: node.kind(),
                to: config.kind(),
            });
        }

        node.config = config;
        Ok(())
    }

    /// Connects two nodes, applying the connection rules.
    ///
    /// Returns the ID of the new edge.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Source or target node doesn't exist
    /// - The connection rules reject the edge
    pub fn connect(&mut self, source_id: NodeId, target_id: NodeId) -> Result<EdgeId, GraphError> {
        let source_index = *self
            .node_index_map
            .get(&source_id)
            .ok_or(GraphError::NodeNotFound { node_id: source_id })?;

        let target_index = *self
            .node_index_map
            .get(&target_id)
            .ok_or(GraphError::NodeNotFound { node_id: target_id })?;

        let edges: Vec<Edge> = self.graph.edge_weights().copied().collect();
        let source = &self.graph[source_index];
        let target = &self.graph[target_index];

        if let Err(rejection) = validate_connection(source, target, &edges) {
            warn!(source = %source_id, target = %target_id, %rejection, "connection rejected");
            return Err(GraphError::InvalidConnection {
                source: source_id,
                target: target_id,
                rejection,
            });
        }

        let edge = Edge::new(source_id, target_id);
        self.graph.add_edge(source_index, target_index, edge);
        debug!(edge = %edge.id, source = %source_id, target = %target_id, "nodes connected");
        Ok(edge.id)
    }

    /// Inserts a stored edge without applying the connection rules.
    ///
    /// Used when restoring documents; planning re-checks acyclicity and
    /// `Workflow::validate` re-checks the remaining rules.
    ///
    /// # Errors
    ///
    /// Returns `MissingEndpoint` if either endpoint is not in the graph.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let missing = |node_id| GraphError::MissingEndpoint {
            edge_id: edge.id,
            node_id,
        };
        let source_index = *self
            .node_index_map
            .get(&edge.source)
            .ok_or_else(|| missing(edge.source))?;
        let target_index = *self
            .node_index_map
            .get(&edge.target)
            .ok_or_else(|| missing(edge.target))?;

        self.graph.add_edge(source_index, target_index, edge);
        Ok(())
    }

    /// Removes an edge by its ID.
    ///
    /// # Errors
    ///
    /// Returns `EdgeNotFound` if no edge has this ID.
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Result<Edge, GraphError> {
        let index = self
            .edge_index(edge_id)
            .ok_or(GraphError::EdgeNotFound { edge_id })?;
        self.graph
            .remove_edge(index)
            .ok_or(GraphError::EdgeNotFound { edge_id })
    }

    fn edge_index(&self, edge_id: EdgeId) -> Option<EdgeIndex> {
        self.graph
            .edge_references()
            .find(|edge| edge.weight().id == edge_id)
            .map(|edge| edge.id())
    }

    /// Returns all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.graph.node_weights()
    }

    /// Returns all edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns nodes that have no incoming edges (entry points).
    pub fn entry_nodes(&self) -> Vec<&TaskNode> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count() == 0)
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Returns nodes that have no outgoing edges (terminal nodes).
    pub fn terminal_nodes(&self) -> Vec<&TaskNode> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count() == 0)
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Returns the nodes that feed into `node_id`.
    pub fn dependencies(&self, node_id: NodeId) -> Vec<&TaskNode> {
        self.neighbors(node_id, Direction::Incoming)
    }

    /// Returns the nodes that `node_id` feeds into.
    pub fn dependents(&self, node_id: NodeId) -> Vec<&TaskNode> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    fn neighbors(&self, node_id: NodeId, direction: Direction) -> Vec<&TaskNode> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };

        // petgraph yields the most recent edge first.
        let mut edges: Vec<_> = self.graph.edges_directed(index, direction).collect();
        edges.sort_by_key(|edge| edge.id());

        edges
            .into_iter()
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                self.graph.node_weight(other)
            })
            .collect()
    }

    /// Rebuilds the node index map from the underlying graph.
    fn rebuild_index_map(&mut self) {
        self.node_index_map.clear();
        for index in self.graph.node_indices() {
            if let Some(node) = self.graph.node_weight(index) {
                self.node_index_map.insert(node.id, index);
            }
        }
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form of a [`WorkflowGraph`].
#[derive(Debug, Serialize, Deserialize)]
struct GraphParts {
    #[serde(default)]
    nodes: Vec<TaskNode>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl TryFrom<GraphParts> for WorkflowGraph {
    type Error = GraphError;

    fn try_from(parts: GraphParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.nodes, parts.edges)
    }
}

impl From<WorkflowGraph> for GraphParts {
    fn from(graph: WorkflowGraph) -> Self {
        let edges = graph.graph.edge_weights().copied().collect();
        let (nodes, _) = graph.graph.into_nodes_edges();
        Self {
            nodes: nodes.into_iter().map(|node| node.weight).collect(),
            edges,
        }
    }
}
