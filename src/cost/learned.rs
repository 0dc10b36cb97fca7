//! Learned gradient-boosted-tree cost adapter: scores the build side's
//! hash-table construction and the probe side's hash-join probe separately
//! through the compiled regression forest.

use super::{CostAdapter, CostResult};
use crate::error::CostAdapterError;
use crate::model::{ForestEvaluator, Model};
use crate::plan::{build_hash_table, probe_features, Plan};

pub struct CostModel<E: ForestEvaluator> {
    model: Model<E>,
}

impl<E: ForestEvaluator> CostModel<E> {
    /// `model` must already be sized (via `Model::resize`) for at least one
    /// concurrent prediction; the adapter registers and predicts one row at
    /// a time, one registration and prediction per candidate join.
    pub fn new(model: Model<E>) -> Self {
        CostModel { model }
    }

    pub fn calls_to_predict(&self) -> u64 {
        self.model.calls_to_predict()
    }
}

impl<E: ForestEvaluator> CostAdapter for CostModel<E> {
    fn cost(
        &mut self,
        left: &Plan,
        right: &Plan,
        output_cardinality: f64,
    ) -> Result<CostResult, CostAdapterError> {
        let build_features = build_hash_table(left)?;
        self.model
            .register_features(&build_features)
            .expect("model buffer sized for at least one row");
        let left_build_cost = self.model.predict_one();

        let probe = probe_features(right, left, output_cardinality);
        self.model
            .register_features(&probe)
            .expect("model buffer sized for at least one row");
        let probe_cost = self.model.predict_one();

        let mat_cost = left.mat_cost + right.mat_cost + left_build_cost;
        Ok(CostResult {
            open_features: probe,
            cost: mat_cost + probe_cost,
            mat_cost,
        })
    }
}
