//! PropertyGraph: the in-process graph the embedded stores execute against

use super::edge::{Edge, EdgeId, Relationship};
use super::node::{Label, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Kind of a named schema object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Constraint,
    Index,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Constraint => "constraint",
            SchemaKind::Index => "index",
        }
    }
}

/// Nodes and edges staged by one write, applied all at once.
#[derive(Debug, Clone, Default)]
pub struct GraphDelta {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Labelled property graph with adjacency lists and the lookups the
/// resolution model needs: identifiers by `(type, value)` and entities by
/// their `id` property.
///
/// The identifier lookup is non-unique. The same `(type, value)` pair may
/// appear on several nodes if it was created before any merge could see it.
#[derive(Debug, Clone, Default)]
pub struct PropertyGraph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
    identifiers: HashMap<(String, String), Vec<NodeId>>,
    entities: HashMap<String, Vec<NodeId>>,
    schema: BTreeMap<String, SchemaKind>,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Nodes with the given label
    pub fn nodes_with_label(&self, label: Label) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |node| node.label == label)
    }

    /// Insert a node, indexing identifiers and entity IDs.
    pub fn insert_node(&mut self, node: Node) {
        match node.label {
            Label::Identifier => {
                if let (Some(kind), Some(value)) = (node.str_property("type"), node.str_property("value")) {
                    self.identifiers
                        .entry((kind.to_string(), value.to_string()))
                        .or_default()
                        .push(node.id);
                }
            }
            Label::Entity => {
                if let Some(id) = node.str_property("id") {
                    self.entities.entry(id.to_string()).or_default().push(node.id);
                }
            }
            _ => {}
        }
        self.nodes.insert(node.id, node);
    }

    /// Insert an edge. Edges whose endpoints are unknown are still stored;
    /// callers stage endpoints in the same delta.
    pub fn insert_edge(&mut self, edge: Edge) {
        self.outgoing.entry(edge.source).or_default().push(edge.id);
        self.incoming.entry(edge.target).or_default().push(edge.id);
        self.edges.insert(edge.id, edge);
    }

    /// Apply a staged write: all nodes first, then all edges.
    pub fn apply(&mut self, delta: GraphDelta) {
        for node in delta.nodes {
            self.insert_node(node);
        }
        for edge in delta.edges {
            self.insert_edge(edge);
        }
    }

    /// Identifier nodes for `(type, value)`
    pub fn find_identifiers(&self, kind: &str, value: &str) -> Vec<&Node> {
        self.identifiers
            .get(&(kind.to_string(), value.to_string()))
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Entity nodes carrying the given `id` property
    pub fn find_entities(&self, entity_id: &str) -> Vec<&Node> {
        self.entities
            .get(entity_id)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Outgoing edges of `node` with `relationship`, paired with their targets
    pub fn outgoing(&self, node: &NodeId, relationship: Relationship) -> Vec<(&Edge, &Node)> {
        self.neighbours(self.outgoing.get(node), relationship, |edge| &edge.target)
    }

    /// Incoming edges of `node` with `relationship`, paired with their sources
    pub fn incoming(&self, node: &NodeId, relationship: Relationship) -> Vec<(&Edge, &Node)> {
        self.neighbours(self.incoming.get(node), relationship, |edge| &edge.source)
    }

    fn neighbours<'a>(
        &'a self,
        edge_ids: Option<&'a Vec<EdgeId>>,
        relationship: Relationship,
        other_end: impl Fn(&Edge) -> &NodeId,
    ) -> Vec<(&'a Edge, &'a Node)> {
        edge_ids
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .filter(|edge| edge.relationship == relationship)
            .filter_map(|edge| self.nodes.get(other_end(edge)).map(|node| (edge, node)))
            .collect()
    }

    /// Remove a node together with every edge touching it.
    ///
    /// Returns the removed edge IDs, or `None` if the node did not exist.
    pub fn detach_delete(&mut self, id: &NodeId) -> Option<Vec<EdgeId>> {
        let node = self.nodes.remove(id)?;

        match node.label {
            Label::Identifier => {
                if let (Some(kind), Some(value)) = (node.str_property("type"), node.str_property("value")) {
                    let key = (kind.to_string(), value.to_string());
                    remove_from_index(&mut self.identifiers, &key, id);
                }
            }
            Label::Entity => {
                if let Some(entity_id) = node.str_property("id") {
                    remove_from_index(&mut self.entities, &entity_id.to_string(), id);
                }
            }
            _ => {}
        }

        let mut removed = Vec::new();
        let touching: Vec<EdgeId> = self
            .outgoing
            .remove(id)
            .into_iter()
            .chain(self.incoming.remove(id))
            .flatten()
            .collect();
        for edge_id in touching {
            if let Some(edge) = self.edges.remove(&edge_id) {
                if let Some(list) = self.outgoing.get_mut(&edge.source) {
                    list.retain(|e| *e != edge_id);
                }
                if let Some(list) = self.incoming.get_mut(&edge.target) {
                    list.retain(|e| *e != edge_id);
                }
                removed.push(edge_id);
            }
        }
        Some(removed)
    }

    /// Up to `limit` node IDs, in no particular order
    pub fn node_ids(&self, limit: usize) -> Vec<NodeId> {
        self.nodes.keys().take(limit).copied().collect()
    }

    // === Schema ===

    /// Register a schema object. Returns false if it already existed.
    pub fn create_schema(&mut self, name: &str, kind: SchemaKind) -> bool {
        if self.schema.contains_key(name) {
            return false;
        }
        self.schema.insert(name.to_string(), kind);
        true
    }

    /// Drop a schema object. Returns false if it did not exist.
    pub fn drop_schema(&mut self, name: &str) -> bool {
        self.schema.remove(name).is_some()
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schema.contains_key(name)
    }

    pub fn schema(&self) -> impl Iterator<Item = (&str, SchemaKind)> {
        self.schema.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

fn remove_from_index<K: std::hash::Hash + Eq>(index: &mut HashMap<K, Vec<NodeId>>, key: &K, id: &NodeId) {
    if let Some(ids) = index.get_mut(key) {
        ids.retain(|n| n != id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}
