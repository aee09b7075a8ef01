//! The primary in-memory tables.
//!
//! [`GraphStore`] owns every node and edge by id. Edges refer to their
//! endpoints by id only - there are no pointers between records, all
//! navigation goes back through the store or the secondary indexes.
//!
//! Reads may run concurrently; writes are serialized externally by the
//! commit coordinator, so the store itself offers no transactional
//! isolation. Lookups by id are average-case O(1).

use std::collections::{BTreeMap, BTreeSet};

use arcstr::ArcStr;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use quiver_common::hash::FxHashMap;
use quiver_common::types::{EdgeId, NodeId, PropertyKey, Value};

/// A graph vertex: a set of labels plus a property map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Opaque unique identifier, stable for the node's lifetime.
    pub id: NodeId,
    /// Symbolic tags. Order irrelevant, duplicates impossible.
    pub labels: BTreeSet<ArcStr>,
    /// Property map; keys unique per node.
    pub properties: BTreeMap<PropertyKey, Value>,
}

impl Node {
    /// Returns the property value for `key`, if present.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(&PropertyKey::new(key))
    }

    /// Returns `true` if the node carries `label`.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// A directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Opaque unique identifier.
    pub id: EdgeId,
    /// Source node id. Must resolve while the edge is committed.
    pub from: NodeId,
    /// Destination node id. Must resolve while the edge is committed.
    pub to: NodeId,
    /// The single symbolic type tag.
    pub edge_type: ArcStr,
    /// Property map; same value universe as nodes.
    pub properties: BTreeMap<PropertyKey, Value>,
}

impl Edge {
    /// Returns the property value for `key`, if present.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(&PropertyKey::new(key))
    }
}

/// The primary tables: id -> node and id -> edge.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: RwLock<FxHashMap<NodeId, Node>>,
    edges: RwLock<FxHashMap<EdgeId, Edge>>,
}

impl GraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a node.
    pub fn put_node(&self, node: Node) {
        self.nodes.write().insert(node.id.clone(), node);
    }

    /// Returns a copy of the node with the given id.
    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.nodes.read().get(id).cloned()
    }

    /// Removes the node with the given id, returning it if present.
    pub fn delete_node(&self, id: &NodeId) -> Option<Node> {
        self.nodes.write().remove(id)
    }

    /// Returns `true` if a node with the given id exists.
    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.read().contains_key(id)
    }

    /// Returns every live node.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<Node> {
        self.nodes.read().values().cloned().collect()
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Inserts or replaces an edge.
    pub fn put_edge(&self, edge: Edge) {
        self.edges.write().insert(edge.id.clone(), edge);
    }

    /// Returns a copy of the edge with the given id.
    #[must_use]
    pub fn get_edge(&self, id: &EdgeId) -> Option<Edge> {
        self.edges.read().get(id).cloned()
    }

    /// Removes the edge with the given id, returning it if present.
    pub fn delete_edge(&self, id: &EdgeId) -> Option<Edge> {
        self.edges.write().remove(id)
    }

    /// Returns `true` if an edge with the given id exists.
    #[must_use]
    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.read().contains_key(id)
    }

    /// Returns every live edge.
    #[must_use]
    pub fn all_edges(&self) -> Vec<Edge> {
        self.edges.read().values().cloned().collect()
    }

    /// Returns the number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.read().len()
    }

    /// Edges whose `from` is the given node, by linear scan.
    ///
    /// Snapshot and diagnostics only - hot paths go through
    /// [`GraphIndexes`](super::GraphIndexes).
    #[must_use]
    pub fn edges_from(&self, id: &NodeId) -> Vec<Edge> {
        self.edges
            .read()
            .values()
            .filter(|e| e.from == *id)
            .cloned()
            .collect()
    }

    /// Edges whose `to` is the given node, by linear scan.
    ///
    /// Snapshot and diagnostics only - hot paths go through
    /// [`GraphIndexes`](super::GraphIndexes).
    #[must_use]
    pub fn edges_to(&self, id: &NodeId) -> Vec<Edge> {
        self.edges
            .read()
            .values()
            .filter(|e| e.to == *id)
            .cloned()
            .collect()
    }

    /// Erases everything.
    pub fn clear(&self) {
        self.nodes.write().clear();
        self.edges.write().clear();
    }
}
