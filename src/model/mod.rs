//! Batched inference interface to the compiled regression forest.
//!
//! The forest itself is an external collaborator whose ABI is fixed; this
//! module owns the dense input/output buffers the DP driver
//! registers features into, and the `ForestEvaluator` capability used to
//! score them.

use crate::error::ModelError;
use crate::feature::{Feature, MODEL_INPUT_WIDTH};

/// A capability that scores rows of the 110-wide model input and writes
/// one real per row to the output buffer.
///
/// `eval` must read exactly `input[start_row * 110 .. (start_row + n_rows) * 110]`
/// and write exactly `output[start_row .. start_row + n_rows]` — matching
/// the `forest_root(input, output, start_row, n_rows)` C ABI.
/// Rows are independent; implementations must not read beyond the
/// specified rows.
pub trait ForestEvaluator {
    fn eval(&self, input: &[f64], output: &mut [f64], start_row: usize, n_rows: usize);
}

/// Links against a process-global `forest_root` symbol, matching the
/// compiled decision-forest evaluator's ABI exactly. Behind a feature flag
/// since no such object file ships with this crate; callers that need the
/// real model provide their own `build.rs`/linker setup and enable
/// `forest-ffi`.
#[cfg(feature = "forest-ffi")]
pub struct ExternForest;

#[cfg(feature = "forest-ffi")]
mod ffi {
    extern "C" {
        pub fn forest_root(input: *const f64, output: *mut f64, start_row: i32, n_rows: i32);
    }
}

#[cfg(feature = "forest-ffi")]
impl ForestEvaluator for ExternForest {
    fn eval(&self, input: &[f64], output: &mut [f64], start_row: usize, n_rows: usize) {
        // SAFETY: `input`/`output` are caller-owned dense buffers at least
        // `(start_row + n_rows) * MODEL_INPUT_WIDTH` / `start_row + n_rows`
        // long respectively, matching the forest_root ABI's row contract.
        unsafe {
            ffi::forest_root(
                input.as_ptr(),
                output.as_mut_ptr(),
                start_row as i32,
                n_rows as i32,
            );
        }
    }
}

/// A test double implementing the same ABI as the compiled forest, driven
/// by caller-supplied closures over a row's `(build_cost, probe_cost)`
/// shape — used for testing asymmetric build/probe costs
/// and for unit tests that don't want to link a real forest.
pub struct MockForest<F>
where
    F: Fn(&[f64]) -> f64,
{
    pub score_row: F,
}

impl<F> ForestEvaluator for MockForest<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn eval(&self, input: &[f64], output: &mut [f64], start_row: usize, n_rows: usize) {
        for i in 0..n_rows {
            let row = &input[(start_row + i) * MODEL_INPUT_WIDTH..(start_row + i + 1) * MODEL_INPUT_WIDTH];
            output[start_row + i] = (self.score_row)(row);
        }
    }
}

/// Owns the dense input/output buffers used to batch predictions, and
/// invokes a `ForestEvaluator` against them.
///
/// Exclusively owned by a single `PlanGenerator`/DP driver; not shared
/// across threads.
pub struct Model<E: ForestEvaluator> {
    evaluator: E,
    input: Vec<f64>,
    output: Vec<f64>,
    capacity: usize,
    filled: usize,
    calls_to_predict: u64,
}

impl<E: ForestEvaluator> Model<E> {
    pub fn new(evaluator: E) -> Self {
        Model {
            evaluator,
            input: Vec::new(),
            output: Vec::new(),
            capacity: 0,
            filled: 0,
            calls_to_predict: 0,
        }
    }

    /// Reallocate both buffers for up to `n` concurrent predictions, zero
    /// the input, and reset `filled`.
    pub fn resize(&mut self, n: usize) {
        self.input = vec![0.0; n * MODEL_INPUT_WIDTH];
        self.output = vec![0.0; n];
        self.capacity = n;
        self.filled = 0;
    }

    /// Number of completed calls to `predict_one`/`predict_many` so far.
    pub fn calls_to_predict(&self) -> u64 {
        self.calls_to_predict
    }

    /// Register `feature` into the next free input row, returning the row
    /// index whose output slot will hold its prediction.
    pub fn register_features(&mut self, feature: &Feature) -> Result<usize, ModelError> {
        if self.filled >= self.capacity {
            return Err(ModelError::BufferOverflow {
                filled: self.filled,
                capacity: self.capacity,
            });
        }
        let row = self.filled;
        let start = row * MODEL_INPUT_WIDTH;
        let slice: &mut [f64; MODEL_INPUT_WIDTH] = (&mut self.input[start..start + MODEL_INPUT_WIDTH])
            .try_into()
            .expect("row slice is exactly MODEL_INPUT_WIDTH wide");
        feature.add_to(slice);
        self.filled += 1;
        Ok(row)
    }

    /// Zero the filled portion of the input buffer (conservatively, the
    /// whole buffer) and reset `filled`.
    fn reset_input(&mut self) {
        self.input.iter_mut().for_each(|x| *x = 0.0);
    }

    /// Invoke the forest on row 0 only, apply the exp-and-scale transform,
    /// then reset the buffers. Returns the prediction.
    ///
    /// This is the model-training contract: the raw log-residual
    /// regression output is converted to an absolute latency estimate
    /// relative to the pipeline's input cardinality (input slot 1).
    pub fn predict_one(&mut self) -> f64 {
        self.evaluator.eval(&self.input, &mut self.output, 0, 1);
        self.output[0] = (-self.output[0]).exp() * self.input[1];
        self.reset_input();
        self.filled = 0;
        self.calls_to_predict += 1;
        self.output[0]
    }

    /// Invoke the forest on rows `[0, filled)`, apply the same
    /// exp-and-scale transform per row, then reset the buffers. Exists for
    /// the latency-benchmark path; must produce identical results to
    /// `predict_one` called once per row.
    pub fn predict_many(&mut self) -> Vec<f64> {
        let n = self.filled;
        self.evaluator.eval(&self.input, &mut self.output, 0, n);
        for i in 0..n {
            self.output[i] = (-self.output[i]).exp() * self.input[i * MODEL_INPUT_WIDTH + 1];
        }
        let results = self.output[..n].to_vec();
        self.reset_input();
        self.filled = 0;
        self.calls_to_predict += 1;
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_forest(value: f64) -> MockForest<impl Fn(&[f64]) -> f64> {
        MockForest {
            score_row: move |_row| value,
        }
    }

    #[test]
    fn register_features_fills_rows_in_order() {
        let mut model = Model::new(constant_forest(0.0));
        model.resize(2);
        let f = Feature {
            table_scan_const: 1.0,
            ..Default::default()
        };
        assert_eq!(model.register_features(&f).unwrap(), 0);
        assert_eq!(model.register_features(&f).unwrap(), 1);
    }

    #[test]
    fn register_features_overflow_is_rejected() {
        let mut model = Model::new(constant_forest(0.0));
        model.resize(1);
        model.register_features(&Feature::default()).unwrap();
        let err = model.register_features(&Feature::default()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::BufferOverflow {
                filled: 1,
                capacity: 1
            }
        ));
    }

    #[test]
    fn predict_one_applies_exp_and_scale_transform() {
        // raw output 0.0 -> exp(-0)=1 -> scaled by in_card (slot 1).
        let mut model = Model::new(constant_forest(0.0));
        model.resize(1);
        let f = Feature {
            table_scan_in_card: 42.0,
            ..Default::default()
        };
        model.register_features(&f).unwrap();
        let prediction = model.predict_one();
        assert_eq!(prediction, 42.0);
        assert_eq!(model.calls_to_predict(), 1);
    }

    #[test]
    fn predict_one_resets_state_after_call() {
        let mut model = Model::new(constant_forest(0.0));
        model.resize(1);
        model.register_features(&Feature::default()).unwrap();
        model.predict_one();
        // The slot is free again.
        model.register_features(&Feature::default()).unwrap();
    }

    #[test]
    fn predict_many_matches_serial_predict_one() {
        let rows = [
            Feature {
                table_scan_in_card: 10.0,
                table_scan_const: 3.0,
                ..Default::default()
            },
            Feature {
                table_scan_in_card: 20.0,
                table_scan_const: 7.0,
                ..Default::default()
            },
            Feature {
                table_scan_in_card: 30.0,
                table_scan_const: 1.0,
                ..Default::default()
            },
        ];

        // Raw score depends deterministically on row content so that
        // batched vs serial evaluation is a meaningful check.
        let scorer = |row: &[f64]| row[0] * 0.1;

        let mut batched = Model::new(MockForest { score_row: scorer });
        batched.resize(rows.len());
        for f in &rows {
            batched.register_features(f).unwrap();
        }
        let batched_results = batched.predict_many();

        let mut serial_results = Vec::new();
        for f in &rows {
            let mut serial = Model::new(MockForest { score_row: scorer });
            serial.resize(1);
            serial.register_features(f).unwrap();
            serial_results.push(serial.predict_one());
        }

        assert_eq!(batched_results, serial_results);
    }
}
