//! Transactions: buffered operations, undo logs and serialized commit.
//!
//! A [`Transaction`] is a value that accumulates forward operations and
//! their inverses. Nothing touches the store until the coordinator commits;
//! until then a transaction can be abandoned or rolled back with no state
//! effect. Builder mutators live in [`builder`]; the commit/rollback
//! critical section lives in [`coordinator`].

pub(crate) mod builder;
pub(crate) mod coordinator;

use std::collections::{BTreeMap, BTreeSet};

use arcstr::ArcStr;

use quiver_common::hash::FxHashMap;
use quiver_common::types::{PropertyKey, TxId, Value};
use quiver_common::{error::TransactionError, Result};
use quiver_core::graph::Operation;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Accepting operations; has not affected the store or indexes.
    Open,
    /// Durably applied. Immutable.
    Committed,
    /// Undone without committing. Immutable.
    RolledBack,
}

impl TxState {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            TxState::Open => "open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled_back",
        }
    }
}

/// A unit of work applied atomically at commit time.
///
/// Obtain one from [`QuiverDB::begin`](crate::QuiverDB::begin), feed it to
/// the builder mutators, then commit or roll back. The undo list holds the
/// inverse of every forward op, computed from the pre-image at build time;
/// rollback applies it in reverse build order.
#[derive(Debug)]
pub struct Transaction {
    pub(crate) id: TxId,
    pub(crate) ops: Vec<Operation>,
    pub(crate) undo: Vec<Operation>,
    pub(crate) state: TxState,
    pub(crate) metadata: FxHashMap<String, String>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self {
            id: TxId::INVALID,
            ops: Vec::new(),
            undo: Vec::new(),
            state: TxState::Open,
            metadata: FxHashMap::default(),
        }
    }

    /// The commit-sequence id. [`TxId::INVALID`] until commit succeeds.
    #[must_use]
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Returns `true` while the transaction accepts operations.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == TxState::Open
    }

    /// The buffered forward operations, in build order.
    #[must_use]
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    /// Outcome hint from the most recent operation, e.g. the id a
    /// `create_node` allocated under the key `"node_id"`.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Errors unless the transaction is still open.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TransactionError::InvalidState {
                expected: TxState::Open.name(),
                found: self.state.name(),
            }
            .into())
        }
    }
}

/// A partial update for [`update_node`](crate::QuiverDB::update_node).
///
/// Labels, when given, replace the node's label set. Properties, when
/// given, merge into the node's map: existing keys not mentioned survive,
/// mentioned keys are overwritten.
#[derive(Debug, Clone, Default)]
pub struct NodeChanges {
    pub(crate) labels: Option<BTreeSet<ArcStr>>,
    pub(crate) properties: Option<BTreeMap<PropertyKey, Value>>,
}

impl NodeChanges {
    /// An empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the node's labels with the given set.
    #[must_use]
    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.labels = Some(labels.iter().map(|l| ArcStr::from(*l)).collect());
        self
    }

    /// Sets one property in the merge map.
    #[must_use]
    pub fn property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(PropertyKey::new(key), value.into());
        self
    }
}
