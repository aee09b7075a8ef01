//! Identifier types for graph elements and transactions.
//!
//! Nodes and edges carry opaque hex-string identifiers issued by
//! [`IdGenerator`](super::IdGenerator); they are stable for the element's
//! lifetime and never reused. Transactions carry a numeric sequence id
//! assigned at commit, so `TxId` ordering equals commit ordering.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node in the graph.
///
/// An opaque lowercase-hex string. Cheap to clone (interned).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(ArcStr);

impl NodeId {
    /// Creates a node id from a string.
    #[must_use]
    pub fn new(id: impl Into<ArcStr>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Unique identifier for an edge in the graph.
///
/// An opaque lowercase-hex string. Cheap to clone (interned).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(ArcStr);

impl EdgeId {
    /// Creates an edge id from a string.
    #[must_use]
    pub fn new(id: impl Into<ArcStr>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Unique identifier for a committed transaction.
///
/// Assigned by the commit coordinator in strictly increasing order, so the
/// numeric ordering of `TxId`s equals WAL append order and replay order.
/// An open transaction holds [`TxId::INVALID`] until it commits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct TxId(pub u64);

impl TxId {
    /// The invalid/unassigned transaction id.
    pub const INVALID: Self = Self(0);

    /// Creates a `TxId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next transaction id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Checks if this is a valid (assigned) transaction id.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "TxId({})", self.0)
        } else {
            write!(f, "TxId(INVALID)")
        }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TxId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<TxId> for u64 {
    fn from(id: TxId) -> Self {
        id.0
    }
}
