//! C_out: a simple output-cardinality-sum cost, used as a baseline / sanity
//! optimizer.

use super::{CostAdapter, CostResult};
use crate::error::CostAdapterError;
use crate::plan::Plan;

#[derive(Debug, Default, Clone, Copy)]
pub struct CostOut;

impl CostAdapter for CostOut {
    fn cost(
        &mut self,
        left: &Plan,
        right: &Plan,
        output_cardinality: f64,
    ) -> Result<CostResult, CostAdapterError> {
        Ok(CostResult {
            open_features: Default::default(),
            cost: output_cardinality + left.cost + right.cost,
            mat_cost: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;

    fn plan(cost: f64) -> Plan {
        Plan {
            open_pipeline_features: Feature::default(),
            left: None,
            right: None,
            cardinality: 0.0,
            cost,
            mat_cost: 0.0,
            relation: 0,
        }
    }

    #[test]
    fn cost_is_output_card_plus_both_subplan_costs() {
        let mut adapter = CostOut;
        let result = adapter.cost(&plan(10.0), &plan(20.0), 50.0).unwrap();
        assert_eq!(result.cost, 80.0);
        assert_eq!(result.mat_cost, 0.0);
    }
}
