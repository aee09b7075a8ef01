//! Graph traversal algorithms over the adjacency indexes.
//!
//! Breadth-first search, unweighted shortest path and one-hop neighbor
//! expansion. All traversals read through the store and indexes without
//! mutating anything.

use std::collections::VecDeque;

use quiver_common::hash::{FxHashMap, FxHashSet};
use quiver_common::types::NodeId;

use super::index::GraphIndexes;
use super::store::GraphStore;
use super::Direction;

/// One-hop neighbor ids of a node, deduplicated.
///
/// With [`Direction::Both`] a neighbor reachable both ways appears once;
/// a self-loop contributes the node itself once.
#[must_use]
pub fn neighbors(
    store: &GraphStore,
    indexes: &GraphIndexes,
    node: &NodeId,
    direction: Direction,
) -> Vec<NodeId> {
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut result = Vec::new();
    for target in expand(store, indexes, node, None, direction) {
        if seen.insert(target.clone()) {
            result.push(target);
        }
    }
    result
}

/// Endpoint ids reachable from `node` over edges matching `edge_type`.
///
/// Unlike [`neighbors`] this does not deduplicate: parallel edges yield
/// their endpoint once per edge.
#[must_use]
pub fn expand(
    store: &GraphStore,
    indexes: &GraphIndexes,
    node: &NodeId,
    edge_type: Option<&str>,
    direction: Direction,
) -> Vec<NodeId> {
    let mut result = Vec::new();

    let mut follow = |edge_ids: Vec<quiver_common::types::EdgeId>, outgoing: bool| {
        for edge_id in edge_ids {
            let Some(edge) = store.get_edge(&edge_id) else {
                continue;
            };
            if let Some(ty) = edge_type {
                if edge.edge_type.as_str() != ty {
                    continue;
                }
            }
            result.push(if outgoing { edge.to } else { edge.from });
        }
    };

    match direction {
        Direction::Outgoing => follow(indexes.out_edges(node), true),
        Direction::Incoming => follow(indexes.in_edges(node), false),
        Direction::Both => {
            follow(indexes.out_edges(node), true);
            follow(indexes.in_edges(node), false);
        }
    }

    result
}

/// Breadth-first search from `start`, level by level.
///
/// Returns each reachable node paired with its discovery depth, the start
/// node included at depth 0. `max_depth` bounds how far the frontier
/// advances; `None` explores the whole component.
#[must_use]
pub fn bfs(
    store: &GraphStore,
    indexes: &GraphIndexes,
    start: &NodeId,
    direction: Direction,
    max_depth: Option<usize>,
) -> Vec<(NodeId, usize)> {
    if !store.contains_node(start) {
        return Vec::new();
    }

    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut results = Vec::new();
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();

    visited.insert(start.clone());
    queue.push_back((start.clone(), 0));
    results.push((start.clone(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if let Some(max) = max_depth {
            if depth >= max {
                continue;
            }
        }
        for next in expand(store, indexes, &current, None, direction) {
            if visited.insert(next.clone()) {
                results.push((next.clone(), depth + 1));
                queue.push_back((next, depth + 1));
            }
        }
    }

    results
}

/// Unweighted shortest path from `from` to `to`, as a node id sequence
/// including both endpoints.
///
/// Returns `None` when no path exists or either endpoint is missing.
/// `from == to` yields the single-node path.
#[must_use]
pub fn shortest_path(
    store: &GraphStore,
    indexes: &GraphIndexes,
    from: &NodeId,
    to: &NodeId,
    direction: Direction,
) -> Option<Vec<NodeId>> {
    if !store.contains_node(from) || !store.contains_node(to) {
        return None;
    }
    if from == to {
        return Some(vec![from.clone()]);
    }

    let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(from.clone());
    parent.insert(from.clone(), from.clone());

    while let Some(current) = queue.pop_front() {
        for next in expand(store, indexes, &current, None, direction) {
            if parent.contains_key(&next) {
                continue;
            }
            parent.insert(next.clone(), current.clone());
            if next == *to {
                // Walk the parent chain back to the start.
                let mut path = vec![next];
                while let Some(p) = parent.get(path.last().expect("path is non-empty")) {
                    if path.last() == Some(p) {
                        break;
                    }
                    path.push(p.clone());
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }

    None
}
