//! The commit coordinator.
//!
//! One per database. A single mutex serializes every commit, rollback and
//! snapshot, so the WAL is appended strictly in commit order and the store
//! and indexes only ever see one writer. Readers are unaffected.
//!
//! Commit protocol: validate all forward ops against the live store, then
//! append one WAL record, then apply. Validation runs under the same lock
//! as apply, so a validated sequence cannot fail to apply - which is how
//! a durably appended record is guaranteed to take effect.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use quiver_common::types::TxId;
use quiver_common::Result;
use quiver_core::graph::{op, GraphIndexes, GraphStore};
use quiver_core::storage::{timestamp_ms, SnapshotManager, WalManager, WalRecord};

use super::{Transaction, TxState};

/// Serializes commits, rollbacks and snapshots for one database.
#[derive(Debug, Default)]
pub(crate) struct TxCoordinator {
    /// Guards the commit-and-apply critical section.
    lock: Mutex<()>,
    /// Id of the most recently committed transaction.
    last_tx_id: AtomicU64,
}

impl TxCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The id of the most recently committed transaction.
    pub(crate) fn last_tx_id(&self) -> TxId {
        TxId::new(self.last_tx_id.load(Ordering::Acquire))
    }

    /// Adopts a recovered id, e.g. after snapshot load and WAL replay.
    pub(crate) fn set_last_tx_id(&self, id: TxId) {
        self.last_tx_id.store(id.as_u64(), Ordering::Release);
    }

    /// Commits a transaction: validate, log, apply, mark.
    ///
    /// On validation or durability failure the transaction stays `Open`
    /// and nothing has changed, so the caller may retry or abandon it.
    pub(crate) fn commit(
        &self,
        store: &GraphStore,
        indexes: &GraphIndexes,
        wal: Option<&WalManager>,
        tx: &mut Transaction,
    ) -> Result<TxId> {
        let _guard = self.lock.lock();

        tx.ensure_open()?;
        op::validate(store, &tx.ops)?;

        let tx_id = self.last_tx_id().next();
        if let Some(wal) = wal {
            let record = WalRecord {
                tx_id,
                timestamp_ms: timestamp_ms(),
                ops: tx.ops.clone(),
            };
            wal.append(&record)?;
        }

        for operation in &tx.ops {
            if let Err(e) = op::apply(store, indexes, operation) {
                // Unreachable for a validated sequence: validation and
                // apply run under the same lock. If it ever fires the WAL
                // already holds the record and the store has diverged.
                tracing::error!(tx_id = tx_id.as_u64(), error = %e, "apply failed after durable append");
                return Err(e);
            }
        }

        tx.id = tx_id;
        tx.state = TxState::Committed;
        self.last_tx_id.store(tx_id.as_u64(), Ordering::Release);
        Ok(tx_id)
    }

    /// Rolls back an open transaction by applying its undo list in
    /// reverse build order. Writes no WAL record.
    pub(crate) fn rollback(
        &self,
        store: &GraphStore,
        indexes: &GraphIndexes,
        tx: &mut Transaction,
    ) -> Result<()> {
        let _guard = self.lock.lock();

        tx.ensure_open()?;
        for operation in tx.undo.iter().rev() {
            op::apply_undo(store, indexes, operation);
        }
        tx.state = TxState::RolledBack;
        Ok(())
    }

    /// Creates a snapshot and truncates the WAL up to it, with no commit
    /// interleaved. Returns the snapshot's last-committed transaction id.
    pub(crate) fn snapshot(
        &self,
        store: &GraphStore,
        wal: &WalManager,
        snapshots: &SnapshotManager,
    ) -> Result<TxId> {
        let _guard = self.lock.lock();

        let last = self.last_tx_id();
        snapshots.create(store, last)?;
        wal.truncate(last)?;
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::builder;
    use quiver_common::types::{IdGenerator, NodeId, Value};
    use quiver_common::Error;
    use tempfile::tempdir;

    fn fixture() -> (GraphStore, GraphIndexes, IdGenerator, TxCoordinator) {
        (
            GraphStore::new(),
            GraphIndexes::new(),
            IdGenerator::new(),
            TxCoordinator::new(),
        )
    }

    #[test]
    fn test_commit_applies_and_assigns_sequence() {
        let (store, indexes, ids, coordinator) = fixture();

        let mut tx = Transaction::new();
        let node_id =
            builder::create_node(&ids, &mut tx, &["Person"], &[("age", Value::Int64(1))]).unwrap();

        let tx_id = coordinator.commit(&store, &indexes, None, &mut tx).unwrap();
        assert_eq!(tx_id, TxId::new(1));
        assert_eq!(tx.id(), TxId::new(1));
        assert_eq!(tx.state(), TxState::Committed);
        assert!(store.contains_node(&node_id));
        assert_eq!(indexes.nodes_with_label("Person").len(), 1);

        // Next commit gets the next sequence number.
        let mut tx2 = Transaction::new();
        builder::create_node(&ids, &mut tx2, &[], &[]).unwrap();
        assert_eq!(
            coordinator.commit(&store, &indexes, None, &mut tx2).unwrap(),
            TxId::new(2)
        );
    }

    #[test]
    fn test_commit_rejects_missing_endpoint_without_wal_write() {
        let (store, indexes, ids, coordinator) = fixture();
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();

        let mut tx = Transaction::new();
        builder::create_edge(
            &ids,
            &mut tx,
            "KNOWS",
            &NodeId::new("ghost-a"),
            &NodeId::new("ghost-b"),
            &[],
        )
        .unwrap();

        let err = coordinator
            .commit(&store, &indexes, Some(&wal), &mut tx)
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { .. }));

        // Validation failed before the append: no WAL bytes, tx still open.
        assert!(wal.is_empty().unwrap());
        assert!(tx.is_open());
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn test_commit_twice_is_invalid_state() {
        let (store, indexes, ids, coordinator) = fixture();
        let mut tx = Transaction::new();
        builder::create_node(&ids, &mut tx, &[], &[]).unwrap();

        coordinator.commit(&store, &indexes, None, &mut tx).unwrap();
        let err = coordinator.commit(&store, &indexes, None, &mut tx).unwrap_err();
        assert!(matches!(err, Error::Transaction(_)));
    }

    #[test]
    fn test_rollback_leaves_state_untouched() {
        let (store, indexes, ids, coordinator) = fixture();

        // Seed one committed node.
        let mut setup = Transaction::new();
        let id = builder::create_node(&ids, &mut setup, &["Person"], &[("age", Value::Int64(30))])
            .unwrap();
        coordinator.commit(&store, &indexes, None, &mut setup).unwrap();

        // Build an update and a delete, then roll back.
        let mut tx = Transaction::new();
        builder::update_node(
            &store,
            &mut tx,
            &id,
            crate::transaction::NodeChanges::new().property("age", 99i64),
        )
        .unwrap();
        coordinator.rollback(&store, &indexes, &mut tx).unwrap();

        assert_eq!(tx.state(), TxState::RolledBack);
        let node = store.get_node(&id).unwrap();
        assert_eq!(node.property("age"), Some(&Value::Int64(30)));
        assert_eq!(
            indexes.nodes_with_property("age", &Value::Int64(30)),
            vec![id]
        );
        assert!(indexes.nodes_with_property("age", &Value::Int64(99)).is_empty());
    }

    #[test]
    fn test_rollback_of_committed_is_invalid() {
        let (store, indexes, ids, coordinator) = fixture();
        let mut tx = Transaction::new();
        builder::create_node(&ids, &mut tx, &[], &[]).unwrap();
        coordinator.commit(&store, &indexes, None, &mut tx).unwrap();
        assert!(coordinator.rollback(&store, &indexes, &mut tx).is_err());
    }

    #[test]
    fn test_snapshot_truncates_wal() {
        let (store, indexes, ids, coordinator) = fixture();
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path().join("wal")).unwrap();
        let snapshots = SnapshotManager::new(dir.path().join("snapshots"));

        for _ in 0..3 {
            let mut tx = Transaction::new();
            builder::create_node(&ids, &mut tx, &["Person"], &[]).unwrap();
            coordinator
                .commit(&store, &indexes, Some(&wal), &mut tx)
                .unwrap();
        }
        assert_eq!(wal.read_all().unwrap().len(), 3);

        let last = coordinator.snapshot(&store, &wal, &snapshots).unwrap();
        assert_eq!(last, TxId::new(3));
        assert_eq!(wal.len().unwrap(), 0);

        let (data, meta) = snapshots.load().unwrap().unwrap();
        assert_eq!(data.nodes.len(), 3);
        assert_eq!(meta.last_tx_id, TxId::new(3));
    }

    #[test]
    fn test_wal_records_are_in_commit_order() {
        let (store, indexes, ids, coordinator) = fixture();
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();

        for _ in 0..5 {
            let mut tx = Transaction::new();
            builder::create_node(&ids, &mut tx, &[], &[]).unwrap();
            coordinator
                .commit(&store, &indexes, Some(&wal), &mut tx)
                .unwrap();
        }

        let ids_in_log: Vec<u64> = wal
            .read_all()
            .unwrap()
            .iter()
            .map(|r| r.tx_id.as_u64())
            .collect();
        assert_eq!(ids_in_log, vec![1, 2, 3, 4, 5]);
    }
}
