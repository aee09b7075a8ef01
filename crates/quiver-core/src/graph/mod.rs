//! The in-memory graph: primary tables, secondary indexes, traversals.

pub mod index;
pub mod op;
pub mod store;
pub mod traversal;

pub use index::GraphIndexes;
pub use op::Operation;
pub use store::{Edge, GraphStore, Node};

/// Direction of edge traversal relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow edges whose `from` is the node.
    Outgoing,
    /// Follow edges whose `to` is the node.
    Incoming,
    /// Follow edges in both directions.
    Both,
}
