//! The query pipeline: lexer → parser → planner → optimizer → executor.
//!
//! The language is a small read-only pattern matcher:
//!
//! ```text
//! MATCH (u:User)-[:FRIEND]->(f)
//! WHERE f.age >= 20
//! RETURN f.name, f.age
//! ORDER BY f.age DESC
//! ```
//!
//! [`parse`](parser::parse) turns text into an AST, [`Planner`](plan::Planner)
//! turns the AST into a [`PlanOp`](plan::PlanOp) tree,
//! [`optimize`](optimizer::optimize) applies filter pushdown and pipe
//! collapse, and [`execute`](exec::execute) streams rows.

pub mod ast;
pub mod exec;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod plan;

pub use exec::{execute, ExecContext, Row, RowValue};
pub use optimizer::optimize;
pub use parser::parse;
pub use plan::{PlanOp, Planner};
