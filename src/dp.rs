//! DPsize: dynamic programming over join subsets, enumerated by subset size.

use crate::bitset::full_mask;
use crate::cost::{CostAdapter, CostResult};
use crate::error::{CostAdapterError, GraphError};
use crate::graph::QueryGraph;
use crate::plan::{table_scan_features, Plan, PlanArena, PlanHandle};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Errors a DP run can fail with.
#[derive(Debug, thiserror::Error)]
pub enum DpError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    CostAdapter(#[from] CostAdapterError),
}

/// Runs DPsize over a [`QueryGraph`], memoizing the cheapest plan per
/// connected subset and returning the plan for the full relation set.
pub struct DpSize<'g, A: CostAdapter> {
    graph: &'g QueryGraph,
    adapter: A,
    arena: PlanArena,
    memo: HashMap<u64, PlanHandle>,
}

impl<'g, A: CostAdapter> DpSize<'g, A> {
    pub fn new(graph: &'g QueryGraph, adapter: A) -> Self {
        DpSize {
            graph,
            adapter,
            arena: PlanArena::new(),
            memo: HashMap::new(),
        }
    }

    /// Run DPsize to completion, returning the best plan for
    /// `2^R - 1` (all relations), or `None` if `R == 0`.
    ///
    /// Fails if the query graph is disconnected: the full relation set
    /// never gets a memo entry.
    pub fn run(&mut self) -> Result<Option<PlanHandle>, DpError> {
        let r = self.graph.len();
        if r == 0 {
            return Ok(None);
        }

        let mut size_buckets: Vec<Vec<u64>> = vec![Vec::new(); r + 1];

        // Seed singletons.
        for relation in &self.graph.relations {
            let singleton = 1u64 << relation.id;
            let leaf = Plan {
                open_pipeline_features: table_scan_features(relation),
                left: None,
                right: None,
                cardinality: relation.cardinality,
                cost: 0.0,
                mat_cost: 0.0,
                relation: relation.id as i64,
            };
            let handle = self.arena.alloc(leaf);
            self.memo.insert(singleton, handle);
            size_buckets[1].push(singleton);
        }
        trace!(relations = r, "seeded base table plans");

        for size in 2..=r {
            for left_size in 1..size {
                let right_size = size - left_size;
                // Avoid visiting the exact same unordered pair twice when
                // iterating over the same bucket against itself would
                // otherwise double the work for no new coverage; every
                // pair with left_size != right_size is still considered
                // twice in total (once from each side), and pairs with
                // left_size == right_size are also considered twice — both
                // intentional per the DP's asymmetric cost contract.
                let lefts = size_buckets[left_size].clone();
                let rights = size_buckets[right_size].clone();
                for &left_class in &lefts {
                    for &right_class in &rights {
                        if left_class & right_class != 0 {
                            continue;
                        }
                        let left_handle = self.memo[&left_class];
                        let right_handle = self.memo[&right_class];
                        if let Some(new_class) =
                            self.create_join_tree(left_class, left_handle, right_class, right_handle)?
                        {
                            size_buckets[size].push(new_class);
                        }
                    }
                }
            }
            debug!(size, candidates = size_buckets[size].len(), "DPsize size enumerated");
        }

        Ok(self.memo.get(&full_mask(r as u32)).copied())
    }

    /// Returns `Some(new_class)` iff a
    /// plan for `left_class | right_class` was newly allocated this call
    /// (so the driver adds it to its size bucket exactly once).
    fn create_join_tree(
        &mut self,
        left_class: u64,
        left_handle: PlanHandle,
        right_class: u64,
        right_handle: PlanHandle,
    ) -> Result<Option<u64>, DpError> {
        let new_class = left_class | right_class;

        let (handle, allocated) = match self.memo.get(&new_class) {
            Some(&existing) => (existing, false),
            None => {
                if !self.graph.is_connected(left_class, right_class) {
                    return Ok(None);
                }
                let right_plan = self.arena.get(right_handle);
                let placeholder = Plan {
                    open_pipeline_features: right_plan.open_pipeline_features,
                    left: Some(left_handle),
                    right: Some(right_handle),
                    cardinality: f64::INFINITY,
                    cost: f64::INFINITY,
                    mat_cost: f64::INFINITY,
                    relation: -1,
                };
                let handle = self.arena.alloc(placeholder);
                self.memo.insert(new_class, handle);
                (handle, true)
            }
        };

        let card = self.graph.cardinality(new_class)?;
        let left_plan = self.arena.get(left_handle).clone();
        let right_plan = self.arena.get(right_handle).clone();
        let CostResult {
            open_features,
            cost,
            mat_cost,
        } = self.adapter.cost(&left_plan, &right_plan, card)?;

        let entry = self.arena.get_mut(handle);
        if cost < entry.cost {
            entry.left = Some(left_handle);
            entry.right = Some(right_handle);
            entry.cost = cost;
            entry.mat_cost = mat_cost;
            entry.cardinality = card;
            entry.open_pipeline_features = open_features;
        }

        Ok(if allocated { Some(new_class) } else { None })
    }

    pub fn arena(&self) -> &PlanArena {
        &self.arena
    }

    pub fn memo_contains(&self, subset: u64) -> bool {
        self.memo.contains_key(&subset)
    }
}
