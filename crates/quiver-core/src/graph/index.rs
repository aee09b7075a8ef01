//! Secondary indexes over the primary tables.
//!
//! Four structures, all id-based (no record pointers):
//!
//! | Index | Maps |
//! | ----- | ---- |
//! | `out_edges` | node id -> edge ids with that `from` |
//! | `in_edges` | node id -> edge ids with that `to` |
//! | `labels` | label -> node ids carrying it |
//! | `props` | (key, value) -> node ids with that exact pair |
//!
//! The caller (the commit coordinator) deindexes an entity's pre-image
//! before indexing its post-image, so every mutation leaves the indexes
//! exactly consistent with the store. A self-loop edge appears in both
//! adjacency tables for its node.

use arcstr::ArcStr;
use parking_lot::RwLock;

use quiver_common::hash::{FxHashMap, FxHashSet};
use quiver_common::types::{EdgeId, HashableValue, NodeId, PropertyKey, Value};

use super::store::{Edge, GraphStore, Node};

/// The four secondary indexes.
#[derive(Debug, Default)]
pub struct GraphIndexes {
    out_edges: RwLock<FxHashMap<NodeId, FxHashSet<EdgeId>>>,
    in_edges: RwLock<FxHashMap<NodeId, FxHashSet<EdgeId>>>,
    labels: RwLock<FxHashMap<ArcStr, FxHashSet<NodeId>>>,
    props: RwLock<FxHashMap<(PropertyKey, HashableValue), FxHashSet<NodeId>>>,
}

impl GraphIndexes {
    /// Creates empty indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a node's labels and property pairs.
    pub fn index_node(&self, node: &Node) {
        let mut labels = self.labels.write();
        for label in &node.labels {
            labels
                .entry(label.clone())
                .or_default()
                .insert(node.id.clone());
        }
        drop(labels);

        let mut props = self.props.write();
        for (key, value) in &node.properties {
            props
                .entry((key.clone(), HashableValue::new(value.clone())))
                .or_default()
                .insert(node.id.clone());
        }
    }

    /// Removes exactly the pairings of the given pre-image.
    pub fn deindex_node(&self, node: &Node) {
        let mut labels = self.labels.write();
        for label in &node.labels {
            if let Some(set) = labels.get_mut(label) {
                set.remove(&node.id);
                if set.is_empty() {
                    labels.remove(label);
                }
            }
        }
        drop(labels);

        let mut props = self.props.write();
        for (key, value) in &node.properties {
            let entry = (key.clone(), HashableValue::new(value.clone()));
            if let Some(set) = props.get_mut(&entry) {
                set.remove(&node.id);
                if set.is_empty() {
                    props.remove(&entry);
                }
            }
        }
    }

    /// Indexes an edge in both adjacency tables.
    pub fn index_edge(&self, edge: &Edge) {
        self.out_edges
            .write()
            .entry(edge.from.clone())
            .or_default()
            .insert(edge.id.clone());
        self.in_edges
            .write()
            .entry(edge.to.clone())
            .or_default()
            .insert(edge.id.clone());
    }

    /// Removes an edge from both adjacency tables.
    pub fn deindex_edge(&self, edge: &Edge) {
        let mut out = self.out_edges.write();
        if let Some(set) = out.get_mut(&edge.from) {
            set.remove(&edge.id);
            if set.is_empty() {
                out.remove(&edge.from);
            }
        }
        drop(out);

        let mut inn = self.in_edges.write();
        if let Some(set) = inn.get_mut(&edge.to) {
            set.remove(&edge.id);
            if set.is_empty() {
                inn.remove(&edge.to);
            }
        }
    }

    /// Edge ids whose `from` is the given node.
    #[must_use]
    pub fn out_edges(&self, id: &NodeId) -> Vec<EdgeId> {
        self.out_edges
            .read()
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Edge ids whose `to` is the given node.
    #[must_use]
    pub fn in_edges(&self, id: &NodeId) -> Vec<EdgeId> {
        self.in_edges
            .read()
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Node ids carrying the given label.
    #[must_use]
    pub fn nodes_with_label(&self, label: &str) -> Vec<NodeId> {
        self.labels
            .read()
            .get(label)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Node ids whose properties contain the exact (key, value) pair.
    #[must_use]
    pub fn nodes_with_property(&self, key: &str, value: &Value) -> Vec<NodeId> {
        self.props
            .read()
            .get(&(PropertyKey::new(key), HashableValue::new(value.clone())))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All label names currently indexed, with their node counts.
    #[must_use]
    pub fn label_counts(&self) -> Vec<(ArcStr, usize)> {
        self.labels
            .read()
            .iter()
            .map(|(label, set)| (label.clone(), set.len()))
            .collect()
    }

    /// Erases everything.
    pub fn clear(&self) {
        self.out_edges.write().clear();
        self.in_edges.write().clear();
        self.labels.write().clear();
        self.props.write().clear();
    }

    /// Rebuilds all four indexes from the store's current contents.
    ///
    /// Used after a snapshot load, which restores the primary tables only.
    pub fn rebuild(&self, store: &GraphStore) {
        self.clear();
        for node in store.all_nodes() {
            self.index_node(&node);
        }
        for edge in store.all_edges() {
            self.index_edge(&edge);
        }
    }

    /// Returns `true` if no index contains any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.out_edges.read().is_empty()
            && self.in_edges.read().is_empty()
            && self.labels.read().is_empty()
            && self.props.read().is_empty()
    }
}
