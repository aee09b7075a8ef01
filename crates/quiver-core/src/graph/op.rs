//! Graph mutation operations.
//!
//! [`Operation`] is the single vocabulary shared by forward op lists, undo
//! lists and WAL records. `Put` variants are upserts, which lets creation,
//! update and undo-restore share one shape.
//!
//! [`validate`] checks a whole op sequence against the live store before
//! anything is applied; [`apply`] then mutates store and indexes. Both run
//! under the coordinator's commit lock, so a sequence that validated cannot
//! fail to apply.

use serde::{Deserialize, Serialize};

use quiver_common::hash::FxHashSet;
use quiver_common::types::{EdgeId, NodeId};
use quiver_common::{Error, Result};

use super::index::GraphIndexes;
use super::store::{Edge, GraphStore, Node};

/// A single forward or inverse mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Insert or replace a node.
    PutNode(Node),
    /// Delete a node by id. Incident edges are deleted by their own ops.
    DeleteNode(NodeId),
    /// Insert or replace an edge. Endpoints must exist at apply time.
    PutEdge(Edge),
    /// Delete an edge by id.
    DeleteEdge(EdgeId),
}

/// Validates an op sequence against the live store.
///
/// Tracks the effects of earlier ops in the sequence, so an edge whose
/// endpoint is created two ops earlier validates. Returns the first
/// violation: `NotFound` for a delete of a missing entity,
/// `ReferentialIntegrity` for an edge with a missing endpoint.
pub fn validate(store: &GraphStore, ops: &[Operation]) -> Result<()> {
    let mut added_nodes: FxHashSet<NodeId> = FxHashSet::default();
    let mut removed_nodes: FxHashSet<NodeId> = FxHashSet::default();
    let mut added_edges: FxHashSet<EdgeId> = FxHashSet::default();
    let mut removed_edges: FxHashSet<EdgeId> = FxHashSet::default();

    let node_live = |id: &NodeId, added: &FxHashSet<NodeId>, removed: &FxHashSet<NodeId>| {
        added.contains(id) || (!removed.contains(id) && store.contains_node(id))
    };

    for op in ops {
        match op {
            Operation::PutNode(node) => {
                added_nodes.insert(node.id.clone());
                removed_nodes.remove(&node.id);
            }
            Operation::DeleteNode(id) => {
                if !node_live(id, &added_nodes, &removed_nodes) {
                    return Err(Error::NotFound {
                        kind: "node",
                        id: id.to_string(),
                    });
                }
                removed_nodes.insert(id.clone());
                added_nodes.remove(id);
            }
            Operation::PutEdge(edge) => {
                for endpoint in [&edge.from, &edge.to] {
                    if !node_live(endpoint, &added_nodes, &removed_nodes) {
                        return Err(Error::ReferentialIntegrity {
                            edge: edge.id.to_string(),
                            node: endpoint.to_string(),
                        });
                    }
                }
                added_edges.insert(edge.id.clone());
                removed_edges.remove(&edge.id);
            }
            Operation::DeleteEdge(id) => {
                let live = added_edges.contains(id)
                    || (!removed_edges.contains(id) && store.contains_edge(id));
                if !live {
                    return Err(Error::NotFound {
                        kind: "edge",
                        id: id.to_string(),
                    });
                }
                removed_edges.insert(id.clone());
                added_edges.remove(id);
            }
        }
    }
    Ok(())
}

/// Applies one operation to the store and indexes.
///
/// On updates the pre-image is deindexed before the post-image is indexed,
/// so index invariants hold when this returns.
pub fn apply(store: &GraphStore, indexes: &GraphIndexes, op: &Operation) -> Result<()> {
    match op {
        Operation::PutNode(node) => {
            if let Some(old) = store.get_node(&node.id) {
                indexes.deindex_node(&old);
            }
            store.put_node(node.clone());
            indexes.index_node(node);
        }
        Operation::DeleteNode(id) => {
            let node = store.delete_node(id).ok_or_else(|| Error::NotFound {
                kind: "node",
                id: id.to_string(),
            })?;
            indexes.deindex_node(&node);
        }
        Operation::PutEdge(edge) => {
            for endpoint in [&edge.from, &edge.to] {
                if !store.contains_node(endpoint) {
                    return Err(Error::ReferentialIntegrity {
                        edge: edge.id.to_string(),
                        node: endpoint.to_string(),
                    });
                }
            }
            if let Some(old) = store.get_edge(&edge.id) {
                indexes.deindex_edge(&old);
            }
            store.put_edge(edge.clone());
            indexes.index_edge(edge);
        }
        Operation::DeleteEdge(id) => {
            let edge = store.delete_edge(id).ok_or_else(|| Error::NotFound {
                kind: "edge",
                id: id.to_string(),
            })?;
            indexes.deindex_edge(&edge);
        }
    }
    Ok(())
}

/// Applies an undo operation leniently.
///
/// Forward ops only ever apply at commit, so the undo of an abandoned
/// transaction targets a store that never changed: deletes of never-created
/// entities and restores of untouched pre-images. Missing targets are
/// therefore skipped rather than reported.
pub fn apply_undo(store: &GraphStore, indexes: &GraphIndexes, op: &Operation) {
    match op {
        Operation::PutNode(node) => {
            if let Some(old) = store.get_node(&node.id) {
                indexes.deindex_node(&old);
            }
            store.put_node(node.clone());
            indexes.index_node(node);
        }
        Operation::DeleteNode(id) => {
            if let Some(node) = store.delete_node(id) {
                indexes.deindex_node(&node);
            }
        }
        Operation::PutEdge(edge) => {
            if store.contains_node(&edge.from) && store.contains_node(&edge.to) {
                if let Some(old) = store.get_edge(&edge.id) {
                    indexes.deindex_edge(&old);
                }
                store.put_edge(edge.clone());
                indexes.index_edge(edge);
            }
        }
        Operation::DeleteEdge(id) => {
            if let Some(edge) = store.delete_edge(id) {
                indexes.deindex_edge(&edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcstr::ArcStr;
    use std::collections::{BTreeMap, BTreeSet};

    fn node(id: &str) -> Node {
        Node {
            id: NodeId::new(id),
            labels: BTreeSet::from([ArcStr::from("Person")]),
            properties: BTreeMap::new(),
        }
    }

    fn edge(id: &str, from: &str, to: &str) -> Edge {
        Edge {
            id: EdgeId::new(id),
            from: NodeId::new(from),
            to: NodeId::new(to),
            edge_type: ArcStr::from("KNOWS"),
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_edge_to_node_created_earlier_in_sequence() {
        let store = GraphStore::new();
        let ops = vec![
            Operation::PutNode(node("a")),
            Operation::PutNode(node("b")),
            Operation::PutEdge(edge("e", "a", "b")),
        ];
        assert!(validate(&store, &ops).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_endpoint() {
        let store = GraphStore::new();
        let ops = vec![
            Operation::PutNode(node("a")),
            Operation::PutEdge(edge("e", "a", "ghost")),
        ];
        let err = validate(&store, &ops).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { .. }));
    }

    #[test]
    fn test_validate_rejects_edge_to_node_deleted_earlier() {
        let store = GraphStore::new();
        store.put_node(node("a"));
        store.put_node(node("b"));
        let ops = vec![
            Operation::DeleteNode(NodeId::new("b")),
            Operation::PutEdge(edge("e", "a", "b")),
        ];
        assert!(validate(&store, &ops).is_err());
    }

    #[test]
    fn test_validate_rejects_delete_of_missing() {
        let store = GraphStore::new();
        assert!(matches!(
            validate(&store, &[Operation::DeleteNode(NodeId::new("ghost"))]),
            Err(Error::NotFound { kind: "node", .. })
        ));
        assert!(matches!(
            validate(&store, &[Operation::DeleteEdge(EdgeId::new("ghost"))]),
            Err(Error::NotFound { kind: "edge", .. })
        ));
    }

    #[test]
    fn test_apply_put_node_reindexes() {
        let store = GraphStore::new();
        let indexes = GraphIndexes::new();

        apply(&store, &indexes, &Operation::PutNode(node("a"))).unwrap();
        assert_eq!(indexes.nodes_with_label("Person"), vec![NodeId::new("a")]);

        // Replacing with different labels removes the old pairing.
        let mut replacement = node("a");
        replacement.labels = BTreeSet::from([ArcStr::from("Robot")]);
        apply(&store, &indexes, &Operation::PutNode(replacement)).unwrap();
        assert!(indexes.nodes_with_label("Person").is_empty());
        assert_eq!(indexes.nodes_with_label("Robot"), vec![NodeId::new("a")]);
    }

    #[test]
    fn test_apply_edge_checks_referential_integrity() {
        let store = GraphStore::new();
        let indexes = GraphIndexes::new();
        let err = apply(&store, &indexes, &Operation::PutEdge(edge("e", "a", "b"))).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { .. }));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_apply_undo_is_lenient() {
        let store = GraphStore::new();
        let indexes = GraphIndexes::new();

        // Undo of a create that never applied: delete of a missing node.
        apply_undo(&store, &indexes, &Operation::DeleteNode(NodeId::new("a")));
        assert_eq!(store.node_count(), 0);

        // Undo restoring an edge whose endpoints are gone is skipped.
        apply_undo(&store, &indexes, &Operation::PutEdge(edge("e", "x", "y")));
        assert_eq!(store.edge_count(), 0);
        assert!(indexes.is_empty());
    }
}
