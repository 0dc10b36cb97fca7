//! Renders a plan tree as a parenthesized join expression.

use super::arena::{PlanArena, PlanHandle};
use crate::graph::QueryGraph;

/// Recursively render `handle`: leaves as `(relation_name)`, internal nodes
/// as `(⟨left⟩⋈⟨right⟩)`. No precedence sugar.
pub fn print_plan(arena: &PlanArena, graph: &QueryGraph, handle: PlanHandle) -> String {
    let plan = arena.get(handle);
    match (plan.left, plan.right) {
        (None, None) => format!("({})", graph.relation(plan.relation as u32).name),
        (Some(left), Some(right)) => format!(
            "({}⋈{})",
            print_plan(arena, graph, left),
            print_plan(arena, graph, right)
        ),
        _ => unreachable!("a plan has either both children or neither"),
    }
}
