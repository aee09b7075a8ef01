//! Plan optimizer.
//!
//! Two purely structural rewrites, both result-set preserving:
//!
//! 1. **Filter pushdown** - a `Filter` sitting on a `Pipe` whose free
//!    variables are all bound by the left subplan moves into the left
//!    subplan, shrinking the cardinality entering `Expand`.
//! 2. **Redundant-pipe elimination** - a `Pipe` missing a side collapses
//!    to the other side.

use quiver_common::hash::FxHashSet;

use super::ast::Expr;
use super::plan::PlanOp;

/// Rewrites a plan bottom-up until neither rule applies.
#[must_use]
pub fn optimize(plan: PlanOp) -> PlanOp {
    match plan {
        PlanOp::Filter { predicate, input } => {
            let input = optimize(*input);
            match input {
                PlanOp::Pipe {
                    left: Some(left),
                    right,
                } if bound_by(&left, &predicate) => {
                    let pushed = optimize(PlanOp::Filter {
                        predicate,
                        input: left,
                    });
                    PlanOp::Pipe {
                        left: Some(Box::new(pushed)),
                        right,
                    }
                }
                other => PlanOp::Filter {
                    predicate,
                    input: Box::new(other),
                },
            }
        }
        PlanOp::Pipe { left, right } => {
            let left = left.map(|op| Box::new(optimize(*op)));
            let right = right.map(|op| Box::new(optimize(*op)));
            match (left, right) {
                (Some(left), None) => *left,
                (None, Some(right)) => *right,
                (left, right) => PlanOp::Pipe { left, right },
            }
        }
        PlanOp::Project { items, input } => PlanOp::Project {
            items,
            input: Box::new(optimize(*input)),
        },
        PlanOp::OrderBy { items, input } => PlanOp::OrderBy {
            items,
            input: Box::new(optimize(*input)),
        },
        leaf => leaf,
    }
}

/// Whether `subplan` binds every variable `predicate` reads.
fn bound_by(subplan: &PlanOp, predicate: &Expr) -> bool {
    let mut bound = FxHashSet::default();
    subplan.bound_variables(&mut bound);
    let mut free = Vec::new();
    predicate.collect_variables(&mut free);
    free.iter().all(|variable| bound.contains(*variable))
}
