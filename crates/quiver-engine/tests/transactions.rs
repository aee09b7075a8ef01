//! Integration tests for transaction semantics: atomic commit, rollback,
//! cascade deletion and error outcomes.

use quiver_engine::{Direction, Error, NodeChanges, QuiverDB, TxState, Value};

#[test]
fn rollback_restores_original_property() {
    let db = QuiverDB::in_memory();

    let mut t1 = db.begin();
    let id = db
        .create_node(&mut t1, &["User"], &[("age", 30i64.into())])
        .unwrap();
    db.commit(&mut t1).unwrap();

    let mut t2 = db.begin();
    db.update_node(&mut t2, &id, NodeChanges::new().property("age", 99i64))
        .unwrap();
    db.rollback(&mut t2).unwrap();

    assert_eq!(t2.state(), TxState::RolledBack);
    let node = db.get_node(&id).unwrap();
    assert_eq!(node.property("age"), Some(&Value::Int64(30)));
}

#[test]
fn abandoned_transaction_has_no_effect() {
    let db = QuiverDB::in_memory();
    {
        let mut tx = db.begin();
        db.create_node(&mut tx, &["User"], &[]).unwrap();
        // Dropped without commit.
    }
    assert_eq!(db.node_count(), 0);
    assert!(db.nodes_by_label("User").is_empty());
}

#[test]
fn open_transaction_invisible_until_commit() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    db.create_node(&mut tx, &["User"], &[]).unwrap();

    // Nothing applied yet.
    assert_eq!(db.node_count(), 0);
    assert!(db.query("MATCH (u:User) RETURN u").unwrap().is_empty());

    db.commit(&mut tx).unwrap();
    assert_eq!(db.node_count(), 1);
}

#[test]
fn commit_is_atomic_for_multi_op_transactions() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    let a = db.create_node(&mut tx, &["User"], &[]).unwrap();
    let b = db.create_node(&mut tx, &["User"], &[]).unwrap();
    db.create_edge(&mut tx, "FRIEND", &a, &b, &[]).unwrap();
    db.commit(&mut tx).unwrap();

    assert_eq!(db.node_count(), 2);
    assert_eq!(db.edge_count(), 1);
}

#[test]
fn edge_to_missing_node_fails_commit_and_stays_open() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    let a = db.create_node(&mut tx, &["User"], &[]).unwrap();
    db.create_edge(
        &mut tx,
        "FRIEND",
        &a,
        &quiver_engine::NodeId::new("no-such-node"),
        &[],
    )
    .unwrap();

    let err = db.commit(&mut tx).unwrap_err();
    assert!(matches!(err, Error::ReferentialIntegrity { .. }));

    // Nothing applied, transaction retryable.
    assert_eq!(db.node_count(), 0);
    assert!(tx.is_open());
}

#[test]
fn delete_node_cascades_to_incident_edges() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    let a = db.create_node(&mut tx, &["User"], &[]).unwrap();
    let b = db.create_node(&mut tx, &["User"], &[]).unwrap();
    let c = db.create_node(&mut tx, &["User"], &[]).unwrap();
    db.create_edge(&mut tx, "FRIEND", &a, &b, &[]).unwrap();
    db.create_edge(&mut tx, "FRIEND", &c, &a, &[]).unwrap();
    db.create_edge(&mut tx, "FRIEND", &b, &c, &[]).unwrap();
    db.commit(&mut tx).unwrap();

    let mut tx = db.begin();
    db.delete_node(&mut tx, &a).unwrap();
    db.commit(&mut tx).unwrap();

    // Both edges touching `a` are gone; the b->c edge survives.
    assert_eq!(db.node_count(), 2);
    assert_eq!(db.edge_count(), 1);
    assert!(db.out_edges(&b).len() == 1);
    assert!(db.in_edges(&a).is_empty());
}

#[test]
fn delete_node_rollback_restores_node_and_edges() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    let a = db.create_node(&mut tx, &["User"], &[("name", "a".into())]).unwrap();
    let b = db.create_node(&mut tx, &["User"], &[]).unwrap();
    db.create_edge(&mut tx, "FRIEND", &a, &b, &[]).unwrap();
    db.commit(&mut tx).unwrap();

    let mut tx = db.begin();
    db.delete_node(&mut tx, &a).unwrap();
    db.rollback(&mut tx).unwrap();

    assert_eq!(db.node_count(), 2);
    assert_eq!(db.edge_count(), 1);
    assert_eq!(db.neighbors(&a, Direction::Outgoing), vec![b]);
}

#[test]
fn update_merges_properties_and_replaces_labels() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    let id = db
        .create_node(
            &mut tx,
            &["User"],
            &[("name", "Ada".into()), ("age", 36i64.into())],
        )
        .unwrap();
    db.commit(&mut tx).unwrap();

    let mut tx = db.begin();
    db.update_node(
        &mut tx,
        &id,
        NodeChanges::new()
            .labels(&["Admin"])
            .property("age", 37i64),
    )
    .unwrap();
    db.commit(&mut tx).unwrap();

    let node = db.get_node(&id).unwrap();
    assert!(node.has_label("Admin"));
    assert!(!node.has_label("User"));
    assert_eq!(node.property("name"), Some(&Value::String("Ada".into())));
    assert_eq!(node.property("age"), Some(&Value::Int64(37)));

    // Indexes follow the update.
    assert!(db.nodes_by_label("User").is_empty());
    assert_eq!(db.nodes_by_label("Admin").len(), 1);
    assert!(db.nodes_by_property("age", &Value::Int64(36)).is_empty());
    assert_eq!(db.nodes_by_property("age", &Value::Int64(37)).len(), 1);
}

#[test]
fn terminal_transactions_reject_further_use() {
    let db = QuiverDB::in_memory();

    let mut committed = db.begin();
    db.create_node(&mut committed, &[], &[]).unwrap();
    db.commit(&mut committed).unwrap();
    assert!(matches!(
        db.create_node(&mut committed, &[], &[]),
        Err(Error::Transaction(_))
    ));
    assert!(matches!(db.commit(&mut committed), Err(Error::Transaction(_))));
    assert!(matches!(db.rollback(&mut committed), Err(Error::Transaction(_))));

    let mut rolled_back = db.begin();
    db.create_node(&mut rolled_back, &[], &[]).unwrap();
    db.rollback(&mut rolled_back).unwrap();
    assert!(matches!(db.commit(&mut rolled_back), Err(Error::Transaction(_))));
}

#[test]
fn build_time_not_found_leaves_transaction_usable() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    let err = db
        .update_node(
            &mut tx,
            &quiver_engine::NodeId::new("ghost"),
            NodeChanges::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(tx.is_open());
    assert!(tx.ops().is_empty());
}

#[test]
fn metadata_reports_allocated_ids() {
    let db = QuiverDB::in_memory();
    let mut tx = db.begin();
    let node_id = db.create_node(&mut tx, &[], &[]).unwrap();
    assert_eq!(tx.metadata("node_id"), Some(node_id.as_str()));

    let edge_id = db.create_edge(&mut tx, "SELF", &node_id, &node_id, &[]).unwrap();
    assert_eq!(tx.metadata("edge_id"), Some(edge_id.as_str()));
}

#[test]
fn commit_sequence_ids_increase() {
    let db = QuiverDB::in_memory();
    for expected in 1u64..=4 {
        let mut tx = db.begin();
        db.create_node(&mut tx, &[], &[]).unwrap();
        let tx_id = db.commit(&mut tx).unwrap();
        assert_eq!(tx_id.as_u64(), expected);
        assert_eq!(tx.id(), tx_id);
    }
}

#[test]
fn indexes_consistent_after_each_commit() {
    // Every node must be reachable through each of its labels and
    // property pairs after every commit.
    let db = QuiverDB::in_memory();

    let mut tx = db.begin();
    let a = db
        .create_node(&mut tx, &["User", "Admin"], &[("age", 1i64.into())])
        .unwrap();
    db.commit(&mut tx).unwrap();

    for node in db.all_nodes() {
        for label in &node.labels {
            assert!(db
                .nodes_by_label(label)
                .iter()
                .any(|candidate| candidate.id == node.id));
        }
        for (key, value) in &node.properties {
            assert!(db
                .nodes_by_property(key.as_str(), value)
                .iter()
                .any(|candidate| candidate.id == node.id));
        }
    }

    let mut tx = db.begin();
    db.delete_node(&mut tx, &a).unwrap();
    db.commit(&mut tx).unwrap();
    assert!(db.nodes_by_label("User").is_empty());
    assert!(db.nodes_by_label("Admin").is_empty());
    assert!(db.nodes_by_property("age", &Value::Int64(1)).is_empty());
}
