//! Query planner.
//!
//! Translates a parsed [`Query`] into a tree of [`PlanOp`]s. The operator
//! set is closed: the executor dispatches on the variant, not on trait
//! objects. Pattern folds seed with an empty `Pipe` side; the optimizer's
//! redundant-pipe rule collapses it away.

use arcstr::ArcStr;

use quiver_common::error::QueryError;
use quiver_common::hash::FxHashSet;
use quiver_common::Result;
use quiver_core::graph::Direction;

use super::ast::{CompareOp, Expr, OrderItem, Pattern, Query, ReturnItem};

/// One node of the executable plan tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOp {
    /// One row per live node, bound as `var`.
    NodeScan {
        /// The variable bound for each node.
        var: String,
    },
    /// One row per node carrying `label`, via the label index.
    LabelScan {
        /// The required label.
        label: ArcStr,
        /// The variable bound for each node.
        var: String,
    },
    /// For the node bound as `source_var` in the incoming row, one row per
    /// endpoint reachable over an edge of `edge_type` in `direction`,
    /// bound as `target_var`.
    Expand {
        /// Required edge type.
        edge_type: ArcStr,
        /// Traversal direction.
        direction: Direction,
        /// Variable holding the node to expand from.
        source_var: String,
        /// Variable the reached endpoint is bound to.
        target_var: String,
    },
    /// Keeps rows for which the predicate holds.
    Filter {
        /// The predicate evaluated against each row.
        predicate: Expr,
        /// Producer of candidate rows.
        input: Box<PlanOp>,
    },
    /// Executes `left`, then runs `right` once per left row. A missing
    /// side makes the pipe redundant; the optimizer collapses it.
    Pipe {
        /// The driving side.
        left: Option<Box<PlanOp>>,
        /// The per-row side.
        right: Option<Box<PlanOp>>,
    },
    /// Emits projection rows keyed by `var` or `"var.prop"`.
    Project {
        /// The RETURN items.
        items: Vec<ReturnItem>,
        /// Producer of bound rows.
        input: Box<PlanOp>,
    },
    /// Materializes and sorts, left-to-right over the items.
    OrderBy {
        /// The sort keys, ascending unless marked descending.
        items: Vec<OrderItem>,
        /// Producer of rows to sort.
        input: Box<PlanOp>,
    },
}

impl PlanOp {
    /// Collects the variables this subtree binds into `out`.
    pub fn bound_variables(&self, out: &mut FxHashSet<String>) {
        match self {
            PlanOp::NodeScan { var } | PlanOp::LabelScan { var, .. } => {
                out.insert(var.clone());
            }
            PlanOp::Expand { target_var, .. } => {
                out.insert(target_var.clone());
            }
            PlanOp::Filter { input, .. }
            | PlanOp::Project { input, .. }
            | PlanOp::OrderBy { input, .. } => input.bound_variables(out),
            PlanOp::Pipe { left, right } => {
                if let Some(left) = left {
                    left.bound_variables(out);
                }
                if let Some(right) = right {
                    right.bound_variables(out);
                }
            }
        }
    }
}

/// Translates queries into plan trees.
#[derive(Debug, Default)]
pub struct Planner {
    anon_counter: u32,
}

impl Planner {
    /// Creates a planner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans a query.
    ///
    /// # Errors
    ///
    /// Returns a syntax error when WHERE, RETURN or ORDER BY reference a
    /// variable no pattern binds.
    pub fn plan(&mut self, query: &Query) -> Result<PlanOp> {
        let mut declared: FxHashSet<String> = FxHashSet::default();

        let mut acc: Option<Box<PlanOp>> = None;
        for pattern in &query.patterns {
            let plan = self.plan_pattern(pattern, &mut declared);
            acc = Some(Box::new(PlanOp::Pipe {
                left: acc,
                right: Some(Box::new(plan)),
            }));
        }
        let Some(acc) = acc else {
            return Err(QueryError::syntax("query has no patterns").into());
        };
        let mut root = *acc;

        if let Some(predicate) = &query.where_clause {
            Self::check_variables(predicate, &declared)?;
            root = PlanOp::Filter {
                predicate: predicate.clone(),
                input: Box::new(root),
            };
        }

        for item in &query.return_items {
            Self::check_variable(&item.variable, &declared)?;
        }
        root = PlanOp::Project {
            items: query.return_items.clone(),
            input: Box::new(root),
        };

        if !query.order_by.is_empty() {
            for item in &query.order_by {
                Self::check_variable(&item.variable, &declared)?;
            }
            root = PlanOp::OrderBy {
                items: query.order_by.clone(),
                input: Box::new(root),
            };
        }

        Ok(root)
    }

    fn plan_pattern(&mut self, pattern: &Pattern, declared: &mut FxHashSet<String>) -> PlanOp {
        let source_var = self.var_or_anon(pattern.start.variable.as_deref());
        declared.insert(source_var.clone());

        let mut op = match &pattern.start.label {
            Some(label) => PlanOp::LabelScan {
                label: label.clone(),
                var: source_var.clone(),
            },
            None => PlanOp::NodeScan {
                var: source_var.clone(),
            },
        };

        // Inline property map: one equality filter per entry. An empty
        // map adds nothing.
        for (key, value) in &pattern.start.properties {
            op = PlanOp::Filter {
                predicate: Expr::Comparison {
                    variable: source_var.clone(),
                    property: key.as_str().to_string(),
                    op: CompareOp::Eq,
                    value: value.clone(),
                },
                input: Box::new(op),
            };
        }

        if let Some(hop) = &pattern.hop {
            let target_var = self.var_or_anon(hop.target.variable.as_deref());
            declared.insert(target_var.clone());

            let expand = PlanOp::Expand {
                edge_type: hop.relation.edge_type.clone(),
                direction: hop.relation.direction,
                source_var,
                target_var: target_var.clone(),
            };
            op = PlanOp::Pipe {
                left: Some(Box::new(op)),
                right: Some(Box::new(expand)),
            };

            if let Some(label) = &hop.target.label {
                op = PlanOp::Filter {
                    predicate: Expr::HasLabel {
                        variable: target_var.clone(),
                        label: label.clone(),
                    },
                    input: Box::new(op),
                };
            }
            for (key, value) in &hop.target.properties {
                op = PlanOp::Filter {
                    predicate: Expr::Comparison {
                        variable: target_var.clone(),
                        property: key.as_str().to_string(),
                        op: CompareOp::Eq,
                        value: value.clone(),
                    },
                    input: Box::new(op),
                };
            }
        }

        op
    }

    fn var_or_anon(&mut self, variable: Option<&str>) -> String {
        match variable {
            Some(name) => name.to_string(),
            None => {
                self.anon_counter += 1;
                format!("__v{}", self.anon_counter)
            }
        }
    }

    fn check_variables(expr: &Expr, declared: &FxHashSet<String>) -> Result<()> {
        let mut used = Vec::new();
        expr.collect_variables(&mut used);
        for variable in used {
            Self::check_variable(variable, declared)?;
        }
        Ok(())
    }

    fn check_variable(variable: &str, declared: &FxHashSet<String>) -> Result<()> {
        if declared.contains(variable) {
            Ok(())
        } else {
            Err(QueryError::syntax(format!("unknown variable `{variable}`")).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    fn plan(text: &str) -> PlanOp {
        Planner::new().plan(&parse(text).unwrap()).unwrap()
    }

    #[test]
    fn test_bare_node_plans_node_scan() {
        let plan = plan("MATCH (n) RETURN n");
        let PlanOp::Project { input, .. } = plan else {
            panic!("expected Project at root");
        };
        let PlanOp::Pipe { left: None, right: Some(right) } = *input else {
            panic!("expected seed Pipe");
        };
        assert_eq!(*right, PlanOp::NodeScan { var: "n".to_string() });
    }

    #[test]
    fn test_labeled_node_plans_label_scan() {
        let plan = plan("MATCH (u:User) RETURN u");
        let PlanOp::Project { input, .. } = plan else {
            panic!("expected Project");
        };
        let PlanOp::Pipe { right: Some(right), .. } = *input else {
            panic!("expected Pipe");
        };
        assert!(matches!(
            *right,
            PlanOp::LabelScan { ref label, ref var } if label == "User" && var == "u"
        ));
    }

    #[test]
    fn test_inline_properties_become_filters() {
        let plan = plan("MATCH (u:User {name: 'Alice'}) RETURN u");
        let PlanOp::Project { input, .. } = plan else {
            panic!("expected Project");
        };
        let PlanOp::Pipe { right: Some(right), .. } = *input else {
            panic!("expected Pipe");
        };
        let PlanOp::Filter { predicate, input } = *right else {
            panic!("expected Filter from inline property");
        };
        assert!(matches!(predicate, Expr::Comparison { op: CompareOp::Eq, .. }));
        assert!(matches!(*input, PlanOp::LabelScan { .. }));
    }

    #[test]
    fn test_empty_property_map_adds_no_filter() {
        let plan = plan("MATCH (u {}) RETURN u");
        let PlanOp::Project { input, .. } = plan else {
            panic!("expected Project");
        };
        let PlanOp::Pipe { right: Some(right), .. } = *input else {
            panic!("expected Pipe");
        };
        assert!(matches!(*right, PlanOp::NodeScan { .. }));
    }

    #[test]
    fn test_relation_plans_expand_via_pipe() {
        let plan = plan("MATCH (a:User)-[:FRIEND]->(b) RETURN b");
        let PlanOp::Project { input, .. } = plan else {
            panic!("expected Project");
        };
        // Outer pipe folds the single pattern; inner pipe chains the expand.
        let PlanOp::Pipe { right: Some(pattern_plan), .. } = *input else {
            panic!("expected outer Pipe");
        };
        let PlanOp::Pipe { left: Some(left), right: Some(right) } = *pattern_plan else {
            panic!("expected inner Pipe");
        };
        assert!(matches!(*left, PlanOp::LabelScan { .. }));
        assert!(matches!(
            *right,
            PlanOp::Expand { ref source_var, ref target_var, direction: Direction::Outgoing, .. }
                if source_var == "a" && target_var == "b"
        ));
    }

    #[test]
    fn test_labeled_target_gets_has_label_filter() {
        let plan = plan("MATCH (a)-[:FRIEND]->(b:User) RETURN b");
        let PlanOp::Project { input, .. } = plan else {
            panic!("expected Project");
        };
        let PlanOp::Pipe { right: Some(pattern_plan), .. } = *input else {
            panic!("expected outer Pipe");
        };
        assert!(matches!(
            *pattern_plan,
            PlanOp::Filter { predicate: Expr::HasLabel { .. }, .. }
        ));
    }

    #[test]
    fn test_where_and_order_by_layering() {
        let plan = plan("MATCH (u) WHERE u.age >= 20 RETURN u.age ORDER BY u.age DESC");
        let PlanOp::OrderBy { items, input } = plan else {
            panic!("expected OrderBy at root");
        };
        assert!(items[0].descending);
        let PlanOp::Project { input, .. } = *input else {
            panic!("expected Project under OrderBy");
        };
        assert!(matches!(*input, PlanOp::Filter { .. }));
    }

    #[test]
    fn test_anonymous_nodes_get_synthetic_variables() {
        let plan = plan("MATCH (:User)-[:FRIEND]->(f) RETURN f");
        let mut bound = FxHashSet::default();
        plan.bound_variables(&mut bound);
        assert!(bound.contains("f"));
        assert!(bound.iter().any(|v| v.starts_with("__v")));
    }

    #[test]
    fn test_multiple_patterns_left_fold() {
        let plan = plan("MATCH (a), (b) RETURN a, b");
        let PlanOp::Project { input, .. } = plan else {
            panic!("expected Project");
        };
        let PlanOp::Pipe { left: Some(left), right: Some(right) } = *input else {
            panic!("expected outer Pipe");
        };
        // Left subtree holds the first pattern's seed pipe.
        assert!(matches!(*left, PlanOp::Pipe { .. }));
        assert!(matches!(*right, PlanOp::NodeScan { ref var } if var == "b"));
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let query = parse("MATCH (u) RETURN ghost").unwrap();
        assert!(Planner::new().plan(&query).is_err());

        let query = parse("MATCH (u) WHERE ghost.age = 1 RETURN u").unwrap();
        assert!(Planner::new().plan(&query).is_err());

        let query = parse("MATCH (u) RETURN u ORDER BY ghost.age").unwrap();
        assert!(Planner::new().plan(&query).is_err());
    }
}
