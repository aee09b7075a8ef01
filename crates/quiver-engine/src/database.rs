//! The main database struct and operations.
//!
//! Start here with [`QuiverDB`] - it's your handle to everything.

use std::collections::BTreeMap;

use quiver_common::types::{EdgeId, IdGenerator, NodeId, TxId, Value};
use quiver_common::{Error, Result};
use quiver_core::graph::{op, traversal, Direction, Edge, GraphIndexes, GraphStore, Node};
use quiver_core::storage::{SnapshotManager, WalConfig, WalManager};

use crate::config::Config;
use crate::query::{self, ExecContext, Row};
use crate::transaction::coordinator::TxCoordinator;
use crate::transaction::{builder, NodeChanges, Transaction};

/// Your handle to a Quiver database.
///
/// Create one with [`in_memory()`](Self::in_memory) for quick experiments
/// or [`open()`](Self::open) for persistent storage. Mutate through
/// transactions; read through the query language or the direct accessors.
///
/// # Examples
///
/// ```
/// use quiver_engine::QuiverDB;
///
/// let db = QuiverDB::in_memory();
///
/// let mut tx = db.begin();
/// let alice = db.create_node(&mut tx, &["User"], &[("name", "Alice".into())])?;
/// let bob = db.create_node(&mut tx, &["User"], &[("name", "Bob".into())])?;
/// db.create_edge(&mut tx, "FRIEND", &alice, &bob, &[])?;
/// db.commit(&mut tx)?;
///
/// let rows = db.query("MATCH (a:User)-[:FRIEND]->(b) RETURN a.name, b.name")?;
/// assert_eq!(rows.len(), 1);
/// # Ok::<(), quiver_common::Error>(())
/// ```
#[derive(Debug)]
pub struct QuiverDB {
    config: Config,
    store: GraphStore,
    indexes: GraphIndexes,
    coordinator: TxCoordinator,
    ids: IdGenerator,
    wal: Option<WalManager>,
    snapshots: Option<SnapshotManager>,
}

/// Aggregate counts over the live graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphStats {
    /// Number of live nodes.
    pub node_count: usize,
    /// Number of live edges.
    pub edge_count: usize,
    /// Node count per label.
    pub label_counts: BTreeMap<String, usize>,
    /// Edge count per edge type.
    pub edge_type_counts: BTreeMap<String, usize>,
}

impl QuiverDB {
    /// Creates an in-memory database - fast to create, gone when dropped.
    ///
    /// Use this for tests and experiments. For data that survives
    /// restarts, use [`open()`](Self::open) instead.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_config(Config::in_memory()).expect("in-memory database creation should not fail")
    }

    /// Opens a database at the given path, creating it if it doesn't exist.
    ///
    /// If the path has been used before, the snapshot is loaded and every
    /// committed WAL record newer than it is replayed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path isn't writable, a snapshot file is
    /// unreadable, or replay hits a corrupt (non-trailing) record.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self> {
        Self::with_config(Config::persistent(path))
    }

    /// Creates a database with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory can't be created or
    /// recovery fails.
    pub fn with_config(config: Config) -> Result<Self> {
        let mut db = Self {
            store: GraphStore::new(),
            indexes: GraphIndexes::new(),
            coordinator: TxCoordinator::new(),
            ids: IdGenerator::new(),
            wal: None,
            snapshots: None,
            config,
        };

        if let Some(path) = db.config.path.clone() {
            std::fs::create_dir_all(&path)?;
            db.snapshots = Some(SnapshotManager::new(path.join("snapshots")));
            db.wal = Some(WalManager::with_config(
                path.join("wal"),
                WalConfig {
                    durability: db.config.durability,
                },
            )?);
            db.recover()?;
        }

        Ok(db)
    }

    /// Restores state from the snapshot pair (if present) and replays
    /// newer WAL records. Returns `true` if a snapshot was loaded.
    fn recover(&self) -> Result<bool> {
        let mut last = TxId::INVALID;
        let mut had_snapshot = false;

        if let Some(snapshots) = &self.snapshots {
            if let Some((data, meta)) = snapshots.load()? {
                for node in data.nodes {
                    self.store.put_node(node);
                }
                for edge in data.edges {
                    self.store.put_edge(edge);
                }
                self.indexes.rebuild(&self.store);
                last = meta.last_tx_id;
                had_snapshot = true;
                tracing::debug!(
                    nodes = self.store.node_count(),
                    edges = self.store.edge_count(),
                    last_tx_id = last.as_u64(),
                    "snapshot loaded"
                );
            }
        }

        if let Some(wal) = &self.wal {
            let store = &self.store;
            let indexes = &self.indexes;
            let mut max_tx = last;
            let replayed = wal.replay(|record| {
                if record.tx_id > last {
                    for operation in &record.ops {
                        op::apply(store, indexes, operation)?;
                    }
                    if record.tx_id > max_tx {
                        max_tx = record.tx_id;
                    }
                }
                Ok(())
            })?;
            if replayed > 0 {
                tracing::debug!(records = replayed, last_tx_id = max_tx.as_u64(), "WAL replayed");
            }
            last = max_tx;
        }

        self.coordinator.set_last_tx_id(last);
        Ok(had_snapshot)
    }

    // === Transactions ===

    /// Begins a new transaction.
    #[must_use]
    pub fn begin(&self) -> Transaction {
        Transaction::new()
    }

    /// Buffers creation of a node; returns the allocated id.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer open.
    pub fn create_node(
        &self,
        tx: &mut Transaction,
        labels: &[&str],
        props: &[(&str, Value)],
    ) -> Result<NodeId> {
        builder::create_node(&self.ids, tx, labels, props)
    }

    /// Buffers creation of an edge; returns the allocated id. Endpoint
    /// existence is checked at commit, not here.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer open.
    pub fn create_edge(
        &self,
        tx: &mut Transaction,
        edge_type: &str,
        from: &NodeId,
        to: &NodeId,
        props: &[(&str, Value)],
    ) -> Result<EdgeId> {
        builder::create_edge(&self.ids, tx, edge_type, from, to, props)
    }

    /// Buffers a partial node update. Labels in `changes` replace the
    /// set; properties merge key-by-key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the node doesn't exist, or an error if the
    /// transaction is no longer open.
    pub fn update_node(
        &self,
        tx: &mut Transaction,
        id: &NodeId,
        changes: NodeChanges,
    ) -> Result<()> {
        builder::update_node(&self.store, tx, id, changes)
    }

    /// Buffers deletion of a node and all its incident edges.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the node doesn't exist, or an error if the
    /// transaction is no longer open.
    pub fn delete_node(&self, tx: &mut Transaction, id: &NodeId) -> Result<()> {
        builder::delete_node(&self.store, &self.indexes, tx, id)
    }

    /// Buffers deletion of an edge.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the edge doesn't exist, or an error if the
    /// transaction is no longer open.
    pub fn delete_edge(&self, tx: &mut Transaction, id: &EdgeId) -> Result<()> {
        builder::delete_edge(&self.store, tx, id)
    }

    /// Commits a transaction: validates, writes one WAL record, applies.
    ///
    /// # Errors
    ///
    /// Validation failures (`NotFound`, `ReferentialIntegrity`) and
    /// durability failures leave the transaction open with nothing
    /// applied; the caller may retry or abandon it.
    pub fn commit(&self, tx: &mut Transaction) -> Result<TxId> {
        self.coordinator
            .commit(&self.store, &self.indexes, self.wal.as_ref(), tx)
    }

    /// Rolls back an open transaction. No WAL record is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction isn't open.
    pub fn rollback(&self, tx: &mut Transaction) -> Result<()> {
        self.coordinator.rollback(&self.store, &self.indexes, tx)
    }

    // === Reads ===

    /// Returns the node with the given id.
    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.store.get_node(id)
    }

    /// Returns the edge with the given id.
    #[must_use]
    pub fn get_edge(&self, id: &EdgeId) -> Option<Edge> {
        self.store.get_edge(id)
    }

    /// Returns every live node.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<Node> {
        self.store.all_nodes()
    }

    /// Returns every live edge.
    #[must_use]
    pub fn all_edges(&self) -> Vec<Edge> {
        self.store.all_edges()
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Returns the number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.store.edge_count()
    }

    /// Nodes carrying the given label, via the label index.
    #[must_use]
    pub fn nodes_by_label(&self, label: &str) -> Vec<Node> {
        self.indexes
            .nodes_with_label(label)
            .into_iter()
            .filter_map(|id| self.store.get_node(&id))
            .collect()
    }

    /// Nodes whose properties contain the exact pair, via the property
    /// index.
    #[must_use]
    pub fn nodes_by_property(&self, key: &str, value: &Value) -> Vec<Node> {
        self.indexes
            .nodes_with_property(key, value)
            .into_iter()
            .filter_map(|id| self.store.get_node(&id))
            .collect()
    }

    /// Outgoing edges of a node.
    #[must_use]
    pub fn out_edges(&self, id: &NodeId) -> Vec<Edge> {
        self.indexes
            .out_edges(id)
            .into_iter()
            .filter_map(|edge_id| self.store.get_edge(&edge_id))
            .collect()
    }

    /// Incoming edges of a node.
    #[must_use]
    pub fn in_edges(&self, id: &NodeId) -> Vec<Edge> {
        self.indexes
            .in_edges(id)
            .into_iter()
            .filter_map(|edge_id| self.store.get_edge(&edge_id))
            .collect()
    }

    /// Endpoint ids reachable over edges of `edge_type` in `direction`.
    #[must_use]
    pub fn expand(&self, id: &NodeId, edge_type: &str, direction: Direction) -> Vec<NodeId> {
        traversal::expand(&self.store, &self.indexes, id, Some(edge_type), direction)
    }

    /// Deduplicated one-hop neighbor ids.
    #[must_use]
    pub fn neighbors(&self, id: &NodeId, direction: Direction) -> Vec<NodeId> {
        traversal::neighbors(&self.store, &self.indexes, id, direction)
    }

    /// Breadth-first search from `start`: each reachable node with its
    /// discovery depth.
    #[must_use]
    pub fn bfs(
        &self,
        start: &NodeId,
        direction: Direction,
        max_depth: Option<usize>,
    ) -> Vec<(NodeId, usize)> {
        traversal::bfs(&self.store, &self.indexes, start, direction, max_depth)
    }

    /// Unweighted shortest path between two nodes, endpoints included.
    #[must_use]
    pub fn shortest_path(
        &self,
        from: &NodeId,
        to: &NodeId,
        direction: Direction,
    ) -> Option<Vec<NodeId>> {
        traversal::shortest_path(&self.store, &self.indexes, from, to, direction)
    }

    /// Aggregate counts over the live graph.
    #[must_use]
    pub fn statistics(&self) -> GraphStats {
        let mut label_counts = BTreeMap::new();
        for (label, count) in self.indexes.label_counts() {
            label_counts.insert(label.to_string(), count);
        }
        let mut edge_type_counts: BTreeMap<String, usize> = BTreeMap::new();
        for edge in self.store.all_edges() {
            *edge_type_counts.entry(edge.edge_type.to_string()).or_default() += 1;
        }
        GraphStats {
            node_count: self.store.node_count(),
            edge_count: self.store.edge_count(),
            label_counts,
            edge_type_counts,
        }
    }

    /// Runs a read-only query and materializes its rows.
    ///
    /// # Errors
    ///
    /// Returns a syntax error from the lexer/parser/planner, or a type
    /// error from evaluation. No partial results are returned.
    pub fn query(&self, text: &str) -> Result<Vec<Row>> {
        let parsed = query::parse(text)?;
        let plan = query::Planner::new().plan(&parsed)?;
        let plan = query::optimize(plan);
        let ctx = ExecContext {
            store: &self.store,
            indexes: &self.indexes,
        };
        query::execute(&plan, ctx).collect()
    }

    // === Administration ===

    /// Creates a snapshot of the whole graph and truncates the WAL up to
    /// it. Runs in the coordinator's critical section, so no commit
    /// interleaves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] for in-memory databases or on file
    /// failure.
    pub fn create_snapshot(&self) -> Result<TxId> {
        let (Some(wal), Some(snapshots)) = (self.wal.as_ref(), self.snapshots.as_ref()) else {
            return Err(Error::Snapshot(
                "snapshots require a persistent database".to_string(),
            ));
        };
        self.coordinator.snapshot(&self.store, wal, snapshots)
    }

    /// Clears in-memory state and restores it from disk: snapshot first,
    /// then newer WAL records. Returns `true` if a snapshot was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] for in-memory databases, or any
    /// recovery failure.
    pub fn load_snapshot(&self) -> Result<bool> {
        if self.snapshots.is_none() {
            return Err(Error::Snapshot(
                "snapshots require a persistent database".to_string(),
            ));
        }
        self.store.clear();
        self.indexes.clear();
        self.recover()
    }

    /// The id of the most recently committed transaction.
    #[must_use]
    pub fn last_tx_id(&self) -> TxId {
        self.coordinator.last_tx_id()
    }

    /// The WAL file's current length in bytes, for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] for in-memory databases, or the
    /// underlying I/O error.
    pub fn wal_len(&self) -> Result<u64> {
        match &self.wal {
            Some(wal) => wal.len(),
            None => Err(Error::Snapshot("no WAL for in-memory database".to_string())),
        }
    }
}
