//! Abstract syntax tree for the query language.

use arcstr::ArcStr;

use quiver_common::types::{PropertyKey, Value};
use quiver_core::graph::Direction;

/// A parsed read-only query: `MATCH ... [WHERE ...] RETURN ... [ORDER BY ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Comma-separated patterns of the MATCH clause. Never empty.
    pub patterns: Vec<Pattern>,
    /// Optional WHERE predicate.
    pub where_clause: Option<Expr>,
    /// RETURN items. Never empty.
    pub return_items: Vec<ReturnItem>,
    /// ORDER BY items; empty when the clause is absent.
    pub order_by: Vec<OrderItem>,
}

/// One pattern: a node, optionally followed by a single relation hop.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// The starting node.
    pub start: NodePattern,
    /// The relation and target node, when present.
    pub hop: Option<Hop>,
}

/// The relation half of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    /// The relation's type and direction.
    pub relation: RelPattern,
    /// The node on the far side.
    pub target: NodePattern,
}

/// A node fragment: `(var:Label {key: value, ...})` with every piece optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    /// Binding variable, if named.
    pub variable: Option<String>,
    /// Label constraint, if present.
    pub label: Option<ArcStr>,
    /// Inline equality constraints; may be empty.
    pub properties: Vec<(PropertyKey, Value)>,
}

/// A relation fragment: `-[:TYPE]->` or `<-[:TYPE]-`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    /// The single edge type.
    pub edge_type: ArcStr,
    /// Outgoing for `-[:T]->`, incoming for `<-[:T]-`.
    pub direction: Direction,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Returns `true` for the ordering operators (`< <= > >=`).
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge)
    }
}

/// A boolean expression over row bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `var.prop op value`
    Comparison {
        /// The bound variable.
        variable: String,
        /// The property looked up on it.
        property: String,
        /// The comparison operator.
        op: CompareOp,
        /// The literal right-hand side.
        value: Value,
    },
    /// Label membership test. Produced by the planner for labeled target
    /// nodes; the surface grammar has no syntax for it.
    HasLabel {
        /// The bound variable.
        variable: String,
        /// The required label.
        label: ArcStr,
    },
    /// Short-circuit conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction.
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Collects the variables the expression reads into `out`.
    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Comparison { variable, .. } | Expr::HasLabel { variable, .. } => {
                out.push(variable);
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
        }
    }
}

/// One RETURN item: a whole binding (`var`) or a scalar (`var.prop`).
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    /// The bound variable.
    pub variable: String,
    /// The property, for scalar projection.
    pub property: Option<String>,
}

impl ReturnItem {
    /// The output column key: `"var"` or `"var.prop"`.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.property {
            Some(prop) => format!("{}.{}", self.variable, prop),
            None => self.variable.clone(),
        }
    }
}

/// One ORDER BY item: `var.prop [ASC|DESC]`, ascending by default.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// The bound variable.
    pub variable: String,
    /// The property sorted on.
    pub property: String,
    /// `true` for DESC.
    pub descending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_item_key() {
        let whole = ReturnItem {
            variable: "u".to_string(),
            property: None,
        };
        assert_eq!(whole.key(), "u");

        let scalar = ReturnItem {
            variable: "u".to_string(),
            property: Some("name".to_string()),
        };
        assert_eq!(scalar.key(), "u.name");
    }

    #[test]
    fn test_collect_variables() {
        let expr = Expr::And(
            Box::new(Expr::Comparison {
                variable: "a".to_string(),
                property: "age".to_string(),
                op: CompareOp::Ge,
                value: Value::Int64(20),
            }),
            Box::new(Expr::Or(
                Box::new(Expr::Comparison {
                    variable: "b".to_string(),
                    property: "age".to_string(),
                    op: CompareOp::Lt,
                    value: Value::Int64(30),
                }),
                Box::new(Expr::HasLabel {
                    variable: "a".to_string(),
                    label: "User".into(),
                }),
            )),
        );
        let mut vars = Vec::new();
        expr.collect_variables(&mut vars);
        assert_eq!(vars, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_compare_op_classification() {
        assert!(CompareOp::Lt.is_ordering());
        assert!(CompareOp::Ge.is_ordering());
        assert!(!CompareOp::Eq.is_ordering());
        assert!(!CompareOp::Ne.is_ordering());
    }
}
