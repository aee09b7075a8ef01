//! Transaction builder mutators.
//!
//! Each mutator appends one logical step to the transaction: forward ops
//! in build order, and for every forward op an inverse computed from the
//! pre-image the store holds right now. Rollback later walks the undo
//! list backwards, so multi-op steps (node deletion and its cascade) are
//! restored node-first.
//!
//! Build-time lookup failures return an error and leave the transaction
//! untouched; the caller is expected to abandon it.

use std::collections::BTreeMap;

use arcstr::ArcStr;

use quiver_common::types::{EdgeId, IdGenerator, NodeId, PropertyKey, Value};
use quiver_common::{Error, Result};
use quiver_core::graph::{Edge, GraphIndexes, GraphStore, Node, Operation};

use super::{NodeChanges, Transaction};

fn props_from(pairs: &[(&str, Value)]) -> BTreeMap<PropertyKey, Value> {
    pairs
        .iter()
        .map(|(k, v)| (PropertyKey::new(*k), v.clone()))
        .collect()
}

/// Buffers creation of a new node and returns its freshly allocated id.
pub(crate) fn create_node(
    ids: &IdGenerator,
    tx: &mut Transaction,
    labels: &[&str],
    props: &[(&str, Value)],
) -> Result<NodeId> {
    tx.ensure_open()?;

    let node = Node {
        id: ids.node_id(),
        labels: labels.iter().map(|l| ArcStr::from(*l)).collect(),
        properties: props_from(props),
    };
    let id = node.id.clone();

    tx.ops.push(Operation::PutNode(node));
    tx.undo.push(Operation::DeleteNode(id.clone()));
    tx.metadata.insert("node_id".to_string(), id.to_string());
    Ok(id)
}

/// Buffers creation of a new edge and returns its freshly allocated id.
///
/// Endpoint existence is not checked here - referential integrity is
/// enforced when the coordinator validates the commit.
pub(crate) fn create_edge(
    ids: &IdGenerator,
    tx: &mut Transaction,
    edge_type: &str,
    from: &NodeId,
    to: &NodeId,
    props: &[(&str, Value)],
) -> Result<EdgeId> {
    tx.ensure_open()?;

    let edge = Edge {
        id: ids.edge_id(),
        from: from.clone(),
        to: to.clone(),
        edge_type: ArcStr::from(edge_type),
        properties: props_from(props),
    };
    let id = edge.id.clone();

    tx.ops.push(Operation::PutEdge(edge));
    tx.undo.push(Operation::DeleteEdge(id.clone()));
    tx.metadata.insert("edge_id".to_string(), id.to_string());
    Ok(id)
}

/// Buffers a partial update of an existing node.
///
/// Labels in `changes` replace the set; properties merge key-by-key.
pub(crate) fn update_node(
    store: &GraphStore,
    tx: &mut Transaction,
    id: &NodeId,
    changes: NodeChanges,
) -> Result<()> {
    tx.ensure_open()?;

    let old = store.get_node(id).ok_or_else(|| Error::NotFound {
        kind: "node",
        id: id.to_string(),
    })?;

    let mut merged = old.clone();
    if let Some(labels) = changes.labels {
        merged.labels = labels;
    }
    if let Some(props) = changes.properties {
        for (key, value) in props {
            merged.properties.insert(key, value);
        }
    }

    tx.ops.push(Operation::PutNode(merged));
    tx.undo.push(Operation::PutNode(old));
    Ok(())
}

/// Buffers deletion of a node and every incident edge.
///
/// The incident edges are collected through the indexes now, at build
/// time; their deletions precede the node's so the forward sequence never
/// leaves a dangling edge, and their restores follow the node's on
/// rollback.
pub(crate) fn delete_node(
    store: &GraphStore,
    indexes: &GraphIndexes,
    tx: &mut Transaction,
    id: &NodeId,
) -> Result<()> {
    tx.ensure_open()?;

    let node = store.get_node(id).ok_or_else(|| Error::NotFound {
        kind: "node",
        id: id.to_string(),
    })?;

    // A self-loop sits in both adjacency sets; dedup so it is deleted once.
    let mut edge_ids = indexes.out_edges(id);
    for incoming in indexes.in_edges(id) {
        if !edge_ids.contains(&incoming) {
            edge_ids.push(incoming);
        }
    }

    let mut edges = Vec::with_capacity(edge_ids.len());
    for edge_id in &edge_ids {
        let edge = store.get_edge(edge_id).ok_or_else(|| Error::NotFound {
            kind: "edge",
            id: edge_id.to_string(),
        })?;
        edges.push(edge);
    }

    for edge in &edges {
        tx.ops.push(Operation::DeleteEdge(edge.id.clone()));
        tx.undo.push(Operation::PutEdge(edge.clone()));
    }
    tx.ops.push(Operation::DeleteNode(id.clone()));
    tx.undo.push(Operation::PutNode(node));
    Ok(())
}

/// Buffers deletion of a single edge.
pub(crate) fn delete_edge(store: &GraphStore, tx: &mut Transaction, id: &EdgeId) -> Result<()> {
    tx.ensure_open()?;

    let edge = store.get_edge(id).ok_or_else(|| Error::NotFound {
        kind: "edge",
        id: id.to_string(),
    })?;

    tx.ops.push(Operation::DeleteEdge(id.clone()));
    tx.undo.push(Operation::PutEdge(edge));
    Ok(())
}
