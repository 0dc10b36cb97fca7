//! Plan representation and the bump arena that owns it.

pub mod arena;
pub mod printer;

pub use arena::{PlanArena, PlanHandle};

use crate::error::CostAdapterError;
use crate::feature::Feature;
use crate::graph::Relation;

/// Fixed tuple-width proxy used by `build_hash_table`'s `out_size` field.
/// Presumably a bytes-per-tuple estimate baked into the trained model.
const HASH_BUILD_OUT_SIZE: f64 = 16.0;

/// A node in a join tree. `relation >= 0` marks a base-table leaf;
/// `-1` marks an internal (join) node.
///
/// `open_pipeline_features` describes the currently-unterminated pipeline
/// whose sink is this plan's output. `mat_cost` is the cost of every
/// already-materialized pipeline; `cost = mat_cost + cost_of_open_pipeline`.
#[derive(Debug, Clone)]
pub struct Plan {
    pub open_pipeline_features: Feature,
    pub left: Option<PlanHandle>,
    pub right: Option<PlanHandle>,
    pub cardinality: f64,
    pub cost: f64,
    pub mat_cost: f64,
    pub relation: i64,
}

impl Plan {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Derive the open-pipeline features of a freshly scanned base table.
/// Undefined (divides by zero) if `relation.table_size == 0`.
pub fn table_scan_features(relation: &Relation) -> Feature {
    Feature {
        table_scan_const: 1.0,
        table_scan_in_card: relation.table_size,
        table_scan_out_percentage: relation.cardinality / relation.table_size,
        table_scan_empty_output: if relation.cardinality == 0.0 { 1.0 } else { 0.0 },
        ..Feature::default()
    }
}

/// Terminate `plan`'s open pipeline with a hash-table build, returning the
/// features of the now-closed pipeline.
///
/// Precondition: the open pipeline has not already been closed by a build.
/// Violating it (chaining two builds on the same pipeline) is a cost-adapter
/// contract violation, not a recoverable error.
pub fn build_hash_table(plan: &Plan) -> Result<Feature, CostAdapterError> {
    if plan.open_pipeline_features.hash_join_build_const > 0.0 {
        return Err(CostAdapterError::BuildAlreadyOpen(
            plan.open_pipeline_features.hash_join_build_const,
        ));
    }
    let mut result = plan.open_pipeline_features;
    let in_card = result.table_scan_in_card;
    result.add_assign(&Feature {
        hash_join_build_const: 1.0,
        hash_join_build_out_card: plan.cardinality,
        hash_join_build_out_size: HASH_BUILD_OUT_SIZE,
        hash_join_build_in_percentage: plan.cardinality / in_card,
        ..Feature::default()
    });
    Ok(result)
}

/// Extend the probe side's open pipeline with a hash-join probe against
/// `build_plan`, producing the probe pipeline's new open features.
pub fn probe_features(probe_plan: &Plan, build_plan: &Plan, out_card: f64) -> Feature {
    let mut result = probe_plan.open_pipeline_features;
    let in_card = result.table_scan_in_card;
    result.add_assign(&Feature {
        hash_join_probe_const: 1.0,
        hash_join_probe_in_card: build_plan.cardinality,
        hash_join_probe_right_percentage: probe_plan.cardinality / in_card,
        hash_join_probe_out_percentage: out_card / in_card,
        ..Feature::default()
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_relation(table_size: f64, cardinality: f64) -> Relation {
        Relation {
            name: "r".into(),
            id: 0,
            table_size,
            cardinality,
        }
    }

    fn leaf(relation: &Relation) -> Plan {
        Plan {
            open_pipeline_features: table_scan_features(relation),
            left: None,
            right: None,
            cardinality: relation.cardinality,
            cost: 0.0,
            mat_cost: 0.0,
            relation: relation.id as i64,
        }
    }

    #[test]
    fn table_scan_features_match_spec() {
        let r = base_relation(100.0, 25.0);
        let f = table_scan_features(&r);
        assert_eq!(f.table_scan_const, 1.0);
        assert_eq!(f.table_scan_in_card, 100.0);
        assert_eq!(f.table_scan_out_percentage, 0.25);
        assert_eq!(f.table_scan_empty_output, 0.0);
    }

    #[test]
    fn table_scan_features_flags_empty_output() {
        let r = base_relation(100.0, 0.0);
        let f = table_scan_features(&r);
        assert_eq!(f.table_scan_empty_output, 1.0);
    }

    #[test]
    fn build_hash_table_increments_build_const_by_one() {
        let r = base_relation(100.0, 25.0);
        let plan = leaf(&r);
        let built = build_hash_table(&plan).unwrap();
        assert_eq!(
            built.hash_join_build_const,
            plan.open_pipeline_features.hash_join_build_const + 1.0
        );
        assert_eq!(built.hash_join_build_out_card, plan.cardinality);
        assert_eq!(built.hash_join_build_out_size, HASH_BUILD_OUT_SIZE);
    }

    #[test]
    fn build_hash_table_rejects_an_already_open_build() {
        let r = base_relation(100.0, 25.0);
        let mut plan = leaf(&r);
        plan.open_pipeline_features.hash_join_build_const = 1.0;
        let err = build_hash_table(&plan).unwrap_err();
        assert!(matches!(err, CostAdapterError::BuildAlreadyOpen(v) if v == 1.0));
    }

    #[test]
    fn probe_features_extends_the_probe_side_pipeline() {
        let build_r = base_relation(100.0, 10.0);
        let probe_r = base_relation(200.0, 50.0);
        let build_plan = leaf(&build_r);
        let probe_plan = leaf(&probe_r);
        let out_card = 5.0;

        let probed = probe_features(&probe_plan, &build_plan, out_card);
        assert_eq!(probed.hash_join_probe_const, 1.0);
        assert_eq!(probed.hash_join_probe_in_card, build_plan.cardinality);
        assert_eq!(
            probed.hash_join_probe_right_percentage,
            probe_plan.cardinality / probe_plan.open_pipeline_features.table_scan_in_card
        );
        assert_eq!(
            probed.hash_join_probe_out_percentage,
            out_card / probe_plan.open_pipeline_features.table_scan_in_card
        );
    }
}
