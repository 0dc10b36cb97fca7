//! Cost-model adapter: maps a pair of sub-plans plus an output cardinality
//! to `(open_features, cost, mat_cost)`.

pub mod cout;
pub mod learned;

pub use cout::CostOut;
pub use learned::CostModel;

use crate::error::CostAdapterError;
use crate::feature::Feature;
use crate::plan::Plan;

/// What a cost adapter returns for one candidate join.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostResult {
    /// Features of the pipeline that is still open after this join.
    pub open_features: Feature,
    /// Cost of the full join tree rooted at this join.
    pub cost: f64,
    /// Cost of every pipeline except the currently open one.
    pub mat_cost: f64,
}

/// The cost-adapter capability the DP driver is parameterized by.
///
/// Convention: `left` is always the build side, `right` the probe side.
/// The DP driver tries both orientations by swapping its arguments; the
/// adapter itself never swaps.
pub trait CostAdapter {
    fn cost(
        &mut self,
        left: &Plan,
        right: &Plan,
        output_cardinality: f64,
    ) -> Result<CostResult, CostAdapterError>;
}
