//! Query executor.
//!
//! Walks the plan tree producing a lazy stream of rows; only `OrderBy`
//! (and the final consumer) materializes. A row maps variable names to
//! bindings. Execution never mutates the graph and sees committed data
//! only; each emitted row reflects a state that was valid at some point
//! during execution.
//!
//! Comparison semantics: `=`/`!=` across different types evaluate the
//! equality as false (integers and floats compare numerically); the
//! ordering operators on incomparable operands are a type error.

use std::collections::BTreeMap;

use quiver_common::error::QueryError;
use quiver_common::types::Value;
use quiver_common::{Error, Result};
use quiver_core::graph::{Direction, GraphIndexes, GraphStore, Node};

use super::ast::{CompareOp, Expr, OrderItem, ReturnItem};
use super::plan::PlanOp;

/// What a row variable is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    /// A whole node.
    Node(Node),
    /// A scalar, e.g. a projected property.
    Scalar(Value),
}

impl RowValue {
    /// Returns the node if this binding is one.
    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            RowValue::Node(node) => Some(node),
            RowValue::Scalar(_) => None,
        }
    }

    /// Returns the scalar if this binding is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            RowValue::Scalar(value) => Some(value),
            RowValue::Node(_) => None,
        }
    }
}

/// A result row: variable (or `"var.prop"`) to binding.
pub type Row = BTreeMap<String, RowValue>;

/// Borrowed view of the graph an execution reads.
#[derive(Clone, Copy)]
pub struct ExecContext<'g> {
    /// The primary tables.
    pub store: &'g GraphStore,
    /// The secondary indexes.
    pub indexes: &'g GraphIndexes,
}

type RowIter<'g> = Box<dyn Iterator<Item = Result<Row>> + 'g>;

/// Executes a plan, yielding rows lazily.
pub fn execute<'g>(plan: &'g PlanOp, ctx: ExecContext<'g>) -> impl Iterator<Item = Result<Row>> + 'g {
    run(plan, ctx, Row::new())
}

fn once_err<'g>(error: Error) -> RowIter<'g> {
    Box::new(std::iter::once(Err(error)))
}

fn run<'g>(plan: &'g PlanOp, ctx: ExecContext<'g>, seed: Row) -> RowIter<'g> {
    match plan {
        PlanOp::NodeScan { var } => {
            Box::new(ctx.store.all_nodes().into_iter().map(move |node| {
                let mut row = seed.clone();
                row.insert(var.clone(), RowValue::Node(node));
                Ok(row)
            }))
        }

        PlanOp::LabelScan { label, var } => {
            let ids = ctx.indexes.nodes_with_label(label);
            Box::new(ids.into_iter().filter_map(move |id| {
                let node = ctx.store.get_node(&id)?;
                let mut row = seed.clone();
                row.insert(var.clone(), RowValue::Node(node));
                Some(Ok(row))
            }))
        }

        PlanOp::Expand {
            edge_type,
            direction,
            source_var,
            target_var,
        } => {
            let direction = *direction;
            let source_id = match seed.get(source_var.as_str()) {
                Some(RowValue::Node(node)) => node.id.clone(),
                Some(RowValue::Scalar(_)) => {
                    return once_err(
                        QueryError::type_error(format!("variable `{source_var}` is not a node"))
                            .into(),
                    );
                }
                None => {
                    return once_err(
                        QueryError::type_error(format!("variable `{source_var}` is not bound"))
                            .into(),
                    );
                }
            };

            let edge_ids = match direction {
                Direction::Outgoing => ctx.indexes.out_edges(&source_id),
                Direction::Incoming => ctx.indexes.in_edges(&source_id),
                Direction::Both => {
                    let mut ids = ctx.indexes.out_edges(&source_id);
                    for id in ctx.indexes.in_edges(&source_id) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                    ids
                }
            };

            Box::new(edge_ids.into_iter().filter_map(move |edge_id| {
                let edge = ctx.store.get_edge(&edge_id)?;
                if edge.edge_type != *edge_type {
                    return None;
                }
                let endpoint = match direction {
                    Direction::Outgoing => edge.to,
                    Direction::Incoming => edge.from,
                    Direction::Both => {
                        if edge.from == source_id {
                            edge.to
                        } else {
                            edge.from
                        }
                    }
                };
                let node = ctx.store.get_node(&endpoint)?;
                let mut row = seed.clone();
                row.insert(target_var.clone(), RowValue::Node(node));
                Some(Ok(row))
            }))
        }

        PlanOp::Filter { predicate, input } => {
            Box::new(run(input, ctx, seed).filter_map(move |result| match result {
                Ok(row) => match eval_expr(predicate, &row) {
                    Ok(true) => Some(Ok(row)),
                    Ok(false) => None,
                    Err(e) => Some(Err(e)),
                },
                Err(e) => Some(Err(e)),
            }))
        }

        PlanOp::Pipe { left, right } => match (left, right) {
            (Some(left), Some(right)) => {
                Box::new(run(left, ctx, seed).flat_map(move |result| -> RowIter<'g> {
                    match result {
                        Ok(row) => run(right, ctx, row),
                        Err(e) => once_err(e),
                    }
                }))
            }
            (Some(side), None) | (None, Some(side)) => run(side, ctx, seed),
            (None, None) => Box::new(std::iter::empty()),
        },

        PlanOp::Project { items, input } => {
            Box::new(run(input, ctx, seed).map(move |result| {
                let row = result?;
                project_row(items, &row)
            }))
        }

        PlanOp::OrderBy { items, input } => {
            let rows: Result<Vec<Row>> = run(input, ctx, seed).collect();
            let mut rows = match rows {
                Ok(rows) => rows,
                Err(e) => return once_err(e),
            };
            rows.sort_by(|a, b| compare_rows(items, a, b));
            Box::new(rows.into_iter().map(Ok))
        }
    }
}

fn project_row(items: &[ReturnItem], row: &Row) -> Result<Row> {
    let mut out = Row::new();
    for item in items {
        let binding = row.get(item.variable.as_str()).ok_or_else(|| {
            Error::from(QueryError::type_error(format!(
                "variable `{}` is not bound",
                item.variable
            )))
        })?;
        match &item.property {
            None => {
                out.insert(item.key(), binding.clone());
            }
            Some(property) => {
                let value = match binding {
                    RowValue::Node(node) => {
                        node.property(property).cloned().unwrap_or(Value::Null)
                    }
                    RowValue::Scalar(_) => {
                        return Err(QueryError::type_error(format!(
                            "variable `{}` has no properties",
                            item.variable
                        ))
                        .into());
                    }
                };
                out.insert(item.key(), RowValue::Scalar(value));
            }
        }
    }
    Ok(out)
}

/// Resolves the value an ORDER BY item sorts on.
///
/// Projection has already run, so the value may live under the projected
/// `"var.prop"` key or be reachable through a whole-node binding. Anything
/// else sorts as null.
fn order_key(item: &OrderItem, row: &Row) -> Value {
    let projected = format!("{}.{}", item.variable, item.property);
    if let Some(RowValue::Scalar(value)) = row.get(&projected) {
        return value.clone();
    }
    if let Some(RowValue::Node(node)) = row.get(item.variable.as_str()) {
        return node.property(&item.property).cloned().unwrap_or(Value::Null);
    }
    Value::Null
}

fn compare_rows(items: &[OrderItem], a: &Row, b: &Row) -> std::cmp::Ordering {
    for item in items {
        let left = order_key(item, a);
        let right = order_key(item, b);
        let mut ordering = left.total_cmp_values(&right);
        if item.descending {
            ordering = ordering.reverse();
        }
        if ordering != std::cmp::Ordering::Equal {
            return ordering;
        }
    }
    std::cmp::Ordering::Equal
}

/// Evaluates a predicate against a row, with short-circuit and/or.
fn eval_expr(expr: &Expr, row: &Row) -> Result<bool> {
    match expr {
        Expr::And(left, right) => Ok(eval_expr(left, row)? && eval_expr(right, row)?),
        Expr::Or(left, right) => Ok(eval_expr(left, row)? || eval_expr(right, row)?),
        Expr::HasLabel { variable, label } => match row.get(variable.as_str()) {
            Some(RowValue::Node(node)) => Ok(node.has_label(label)),
            _ => Err(QueryError::type_error(format!("variable `{variable}` is not a node")).into()),
        },
        Expr::Comparison {
            variable,
            property,
            op,
            value,
        } => {
            let left = match row.get(variable.as_str()) {
                Some(RowValue::Node(node)) => {
                    node.property(property).cloned().unwrap_or(Value::Null)
                }
                Some(RowValue::Scalar(_)) => {
                    return Err(QueryError::type_error(format!(
                        "variable `{variable}` has no properties"
                    ))
                    .into());
                }
                None => {
                    return Err(QueryError::type_error(format!(
                        "variable `{variable}` is not bound"
                    ))
                    .into());
                }
            };

            match op {
                CompareOp::Eq => Ok(left.loose_eq(value)),
                CompareOp::Ne => Ok(!left.loose_eq(value)),
                _ => match left.partial_cmp_values(value) {
                    Some(ordering) => Ok(match op {
                        CompareOp::Lt => ordering == std::cmp::Ordering::Less,
                        CompareOp::Le => ordering != std::cmp::Ordering::Greater,
                        CompareOp::Gt => ordering == std::cmp::Ordering::Greater,
                        CompareOp::Ge => ordering != std::cmp::Ordering::Less,
                        CompareOp::Eq | CompareOp::Ne => unreachable!("handled above"),
                    }),
                    None => Err(QueryError::type_error(format!(
                        "cannot order {} against {}",
                        left.type_name(),
                        value.type_name()
                    ))
                    .into()),
                },
            }
        }
    }
}
