//! Quiver: an embedded property-graph database.
//!
//! Start with [`QuiverDB`] - it's your handle to everything. Open a
//! database, build transactions, commit them, and ask pattern-matching
//! questions:
//!
//! ```
//! use quiver_engine::QuiverDB;
//!
//! let db = QuiverDB::in_memory();
//!
//! let mut tx = db.begin();
//! db.create_node(&mut tx, &["Person"], &[("name", "Alice".into())])?;
//! db.commit(&mut tx)?;
//!
//! let rows = db.query("MATCH (p:Person) RETURN p.name")?;
//! assert_eq!(rows.len(), 1);
//! # Ok::<(), quiver_common::Error>(())
//! ```

pub mod config;
pub mod database;
pub mod query;
pub mod transaction;

pub use config::Config;
pub use database::{GraphStats, QuiverDB};
pub use query::exec::{Row, RowValue};
pub use transaction::{NodeChanges, Transaction, TxState};

pub use quiver_common::types::{EdgeId, NodeId, TxId, Value};
pub use quiver_common::{Error, Result};
pub use quiver_core::graph::{Direction, Edge, Node};
