//! Workflow graph implementation using petgraph.
//!
//! Workflows are directed graphs where nodes are automation steps and edges
//! order them. The graph keeps two invariants at all times:
//! - node IDs and edge IDs are unique within the graph
//! - every edge's source and target resolve to a node in the same graph
//!
//! Operations that would break either invariant return a [`GraphError`] and
//! leave the graph untouched. The storage is a [`StableDiGraph`] so indices
//! held in the ID maps survive removals.

use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::node::{Node, NodeData, NodeId, NodeKind, Position};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A workflow graph using petgraph's stable directed graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphDocument", into = "GraphDocument")]
pub struct WorkflowGraph {
    graph: StableDiGraph<Node, Edge>,
    node_index_map: HashMap<NodeId, NodeIndex>,
    edge_index_map: HashMap<EdgeId, EdgeIndex>,
}

/// Wire form of a graph: `{ nodes: [...], edges: [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// The result of removing a node.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    /// Edges removed along with the node.
    pub edges: Vec<Edge>,
}

/// The result of inserting a node on an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub node_id: NodeId,
    /// The edge that was split.
    pub removed: Edge,
    /// The new `source -> node` edge.
    pub upstream: EdgeId,
    /// The new `node -> target` edge.
    pub downstream: EdgeId,
}

/// Old-to-new identifier mapping produced by [`WorkflowGraph::duplicate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMapping {
    pub nodes: HashMap<NodeId, NodeId>,
    pub edges: HashMap<EdgeId, EdgeId>,
}

/// A duplicated graph together with its ID mapping.
#[derive(Debug, Clone)]
pub struct Duplicate {
    pub graph: WorkflowGraph,
    pub mapping: IdMapping,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            node_index_map: HashMap::new(),
            edge_index_map: HashMap::new(),
        }
    }

    /// Builds a graph from node and edge lists, validating both invariants.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate IDs or an edge with a missing endpoint.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        for edge in edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    /// Adds a node to the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same ID already exists.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.node_index_map.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { node_id: node.id });
        }
        let node_id = node.id.clone();
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id.clone(), index);
        Ok(node_id)
    }

    /// Removes a node and every edge that starts or ends at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<RemovedNode, GraphError> {
        let index = *self
            .node_index_map
            .get(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;

        let incident: Vec<EdgeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|edge| edge.id())
            .collect();

        let mut edges = Vec::with_capacity(incident.len());
        for edge_index in incident {
            // A self-loop shows up in both directions
            if let Some(edge) = self.graph.remove_edge(edge_index) {
                self.edge_index_map.remove(&edge.id);
                edges.push(edge);
            }
        }

        self.node_index_map.remove(node_id);
        let node = self
            .graph
            .remove_node(index)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;

        Ok(RemovedNode { node, edges })
    }

    /// Connects two existing nodes with a new edge and returns its ID.
    ///
    /// Parallel edges between the same pair are allowed.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint does not exist.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<EdgeId, GraphError> {
        let edge = Edge::new(self.fresh_edge_id(), source.clone(), target.clone());
        let edge_id = edge.id.clone();
        self.add_edge(edge)?;
        Ok(edge_id)
    }

    /// Adds a caller-identified edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge ID is taken or an endpoint does not exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edge_index_map.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdge { edge_id: edge.id });
        }
        let source = self.require_endpoint(&edge, &edge.source)?;
        let target = self.require_endpoint(&edge, &edge.target)?;

        let edge_id = edge.id.clone();
        let index = self.graph.add_edge(source, target, edge);
        self.edge_index_map.insert(edge_id, index);
        Ok(())
    }

    /// Removes a single edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist.
    pub fn disconnect(&mut self, edge_id: &EdgeId) -> Result<Edge, GraphError> {
        let index = self
            .edge_index_map
            .remove(edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound {
                edge_id: edge_id.clone(),
            })?;
        self.graph
            .remove_edge(index)
            .ok_or_else(|| GraphError::EdgeNotFound {
                edge_id: edge_id.clone(),
            })
    }

    /// Splits an edge `S -> T` into `S -> N -> T` by inserting `node`.
    ///
    /// `position` places the new node; when `None` it goes to the midpoint
    /// between `S` and `T`. The split edge is removed and two edges with fresh
    /// IDs are added, so the node count and the edge count each grow by one.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist, an endpoint is missing,
    /// or the new node's ID is already taken.
    pub fn insert_node_on_edge(
        &mut self,
        edge_id: &EdgeId,
        mut node: Node,
        position: Option<Position>,
    ) -> Result<Insertion, GraphError> {
        let edge = self
            .get_edge(edge_id)
            .cloned()
            .ok_or_else(|| GraphError::EdgeNotFound {
                edge_id: edge_id.clone(),
            })?;
        let source = self
            .get_node(&edge.source)
            .ok_or_else(|| GraphError::DanglingEdge {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
            })?;
        let target = self
            .get_node(&edge.target)
            .ok_or_else(|| GraphError::DanglingEdge {
                edge_id: edge.id.clone(),
                node_id: edge.target.clone(),
            })?;
        if self.contains_node(&node.id) {
            return Err(GraphError::DuplicateNode { node_id: node.id });
        }

        node.position = position.unwrap_or_else(|| source.position.midpoint(&target.position));

        // Everything is validated; the steps below cannot fail.
        let node_id = self.add_node(node)?;
        let removed = self.disconnect(edge_id)?;
        let upstream = self.connect(&removed.source, &node_id)?;
        let downstream = self.connect(&node_id, &removed.target)?;

        Ok(Insertion {
            node_id,
            removed,
            upstream,
            downstream,
        })
    }

    /// Produces a structurally identical graph with fresh node and edge IDs.
    ///
    /// Kinds, labels, configuration and positions are copied. Every edge is
    /// rewired through the node mapping, so the duplicate is isomorphic to
    /// `self` and shares no identifiers with it.
    #[must_use]
    pub fn duplicate(&self) -> Duplicate {
        let mut graph = Self::new();
        let mut mapping = IdMapping::default();
        let mut index_map: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        for old_index in self.graph.node_indices() {
            let Some(node) = self.graph.node_weight(old_index) else {
                continue;
            };
            let new_id = self.fresh_node_id(node.kind(), &graph);
            let copy = Node {
                id: new_id.clone(),
                ..node.clone()
            };
            let new_index = graph.graph.add_node(copy);
            graph.node_index_map.insert(new_id.clone(), new_index);
            index_map.insert(old_index, new_index);
            mapping.nodes.insert(node.id.clone(), new_id);
        }

        for edge_ref in self.graph.edge_references() {
            let (Some(&source), Some(&target)) = (
                index_map.get(&edge_ref.source()),
                index_map.get(&edge_ref.target()),
            ) else {
                debug_assert!(false, "edge endpoint missing from node mapping");
                continue;
            };
            let old = edge_ref.weight();
            let new_id = self.fresh_edge_id_against(&graph);
            let copy = Edge {
                id: new_id.clone(),
                source: graph.graph[source].id.clone(),
                target: graph.graph[target].id.clone(),
                kind: old.kind,
            };
            let new_index = graph.graph.add_edge(source, target, copy);
            graph.edge_index_map.insert(new_id.clone(), new_index);
            mapping.edges.insert(old.id.clone(), new_id);
        }

        Duplicate { graph, mapping }
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: &NodeId) -> Option<&Node> {
        let index = self.node_index_map.get(node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a reference to an edge by its ID.
    #[must_use]
    pub fn get_edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        let index = self.edge_index_map.get(edge_id)?;
        self.graph.edge_weight(*index)
    }

    /// Returns true if a node with this ID exists.
    #[must_use]
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.node_index_map.contains_key(node_id)
    }

    /// Moves a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn set_position(&mut self, node_id: &NodeId, position: Position) -> Result<(), GraphError> {
        self.node_mut(node_id)?.position = position;
        Ok(())
    }

    /// Relabels a node and/or replaces its `data` payload.
    ///
    /// New `data` replaces the configuration and every extra field. An
    /// explicit `label` wins over one carried inside `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or `data` belongs to a
    /// different node kind.
    pub fn update_node(
        &mut self,
        node_id: &NodeId,
        label: Option<String>,
        data: Option<NodeData>,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(node_id)?;
        if let Some(data) = &data
            && data.kind() != node.kind()
        {
            return Err(GraphError::KindMismatch {
                node_id: node_id.clone(),
                expected: node.kind(),
                found: data.kind(),
            });
        }
        if let Some(data) = data {
            if let Some(label) = data.label {
                node.label = label;
            }
            node.config = data.config;
            node.extra = data.extra;
        }
        if let Some(label) = label {
            node.label = label;
        }
        Ok(())
    }

    /// Returns all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph
            .node_indices()
            .filter_map(|index| self.graph.node_weight(index))
    }

    /// Returns all edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph
            .edge_indices()
            .filter_map(|index| self.graph.edge_weight(index))
    }

    /// Returns the current position of every node.
    #[must_use]
    pub fn positions(&self) -> HashMap<NodeId, Position> {
        self.nodes()
            .map(|node| (node.id.clone(), node.position))
            .collect()
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

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns nodes that have no incoming edges (entry points).
    pub fn entry_nodes(&self) -> Vec<&Node> {
        self.nodes_without(Direction::Incoming)
    }

    /// Returns nodes that have no outgoing edges (terminal nodes).
    pub fn terminal_nodes(&self) -> Vec<&Node> {
        self.nodes_without(Direction::Outgoing)
    }

    /// Returns the successors (downstream nodes) of a given node.
    pub fn successors(&self, node_id: &NodeId) -> Vec<(&Node, &Edge)> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    /// Returns the predecessors (upstream nodes) of a given node.
    pub fn predecessors(&self, node_id: &NodeId) -> Vec<(&Node, &Edge)> {
        self.neighbors(node_id, Direction::Incoming)
    }

    /// Validates the graph as a runnable workflow.
    ///
    /// # Errors
    ///
    /// Returns the first problem found; see [`Self::validation_issues`].
    pub fn validate(&self) -> Result<(), GraphError> {
        match self.validation_issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Lists every reason the graph is not a runnable workflow.
    ///
    /// Checks:
    /// - At least one trigger node exists
    /// - Trigger nodes have no incoming edges
    /// - End nodes have no outgoing edges
    /// - No cycles (DAG validation)
    #[must_use]
    pub fn validation_issues(&self) -> Vec<GraphError> {
        let mut issues = Vec::new();

        if !self.nodes().any(|node| node.kind() == NodeKind::Trigger) {
            issues.push(GraphError::MissingTrigger);
        }

        for index in self.graph.node_indices() {
            let node = &self.graph[index];
            let has = |direction| {
                self.graph
                    .edges_directed(index, direction)
                    .next()
                    .is_some()
            };
            match node.kind() {
                NodeKind::Trigger if has(Direction::Incoming) => {
                    issues.push(GraphError::TriggerHasIncoming {
                        node_id: node.id.clone(),
                    });
                }
                NodeKind::End if has(Direction::Outgoing) => {
                    issues.push(GraphError::EndHasOutgoing {
                        node_id: node.id.clone(),
                    });
                }
                _ => {}
            }
        }

        if petgraph::algo::is_cyclic_directed(&self.graph) {
            issues.push(GraphError::CycleDetected);
        }

        issues
    }

    /// Converts the graph into its wire form.
    #[must_use]
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    fn node_mut(&mut self, node_id: &NodeId) -> Result<&mut Node, GraphError> {
        let index = self
            .node_index_map
            .get(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        self.graph
            .node_weight_mut(*index)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })
    }

    fn require_endpoint(&self, edge: &Edge, node_id: &NodeId) -> Result<NodeIndex, GraphError> {
        self.node_index_map
            .get(node_id)
            .copied()
            .ok_or_else(|| GraphError::DanglingEdge {
                edge_id: edge.id.clone(),
                node_id: node_id.clone(),
            })
    }

    fn nodes_without(&self, direction: Direction) -> Vec<&Node> {
        self.graph
            .node_indices()
            .filter(|&index| self.graph.edges_directed(index, direction).next().is_none())
            .filter_map(|index| self.graph.node_weight(index))
            .collect()
    }

    fn neighbors(&self, node_id: &NodeId, direction: Direction) -> Vec<(&Node, &Edge)> {
        let Some(&index) = self.node_index_map.get(node_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(index, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                Some((self.graph.node_weight(other)?, edge.weight()))
            })
            .collect()
    }

    fn fresh_edge_id(&self) -> EdgeId {
        loop {
            let id = EdgeId::generate();
            if !self.edge_index_map.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_edge_id_against(&self, other: &Self) -> EdgeId {
        loop {
            let id = EdgeId::generate();
            if !self.edge_index_map.contains_key(&id) && !other.edge_index_map.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_node_id(&self, kind: NodeKind, other: &Self) -> NodeId {
        loop {
            let id = NodeId::generate(kind);
            if !self.contains_node(&id) && !other.contains_node(&id) {
                return id;
            }
        }
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for WorkflowGraph {
    fn eq(&self, other: &Self) -> bool {
        self.node_count() == other.node_count()
            && self.edge_count() == other.edge_count()
            && self
                .nodes()
                .all(|node| other.get_node(&node.id) == Some(node))
            && self
                .edges()
                .all(|edge| other.get_edge(&edge.id) == Some(edge))
    }
}

impl TryFrom<GraphDocument> for WorkflowGraph {
    type Error = GraphError;

    fn try_from(document: GraphDocument) -> Result<Self, Self::Error> {
        Self::from_parts(document.nodes, document.edges)
    }
}

impl From<WorkflowGraph> for GraphDocument {
    fn from(graph: WorkflowGraph) -> Self {
        graph.to_document()
    }
}
