//! The 12-field engine feature record and its projection into the model's
//! dense 110-slot input layout.

/// Width of the compiled forest's input row. Part of the trained-model
/// contract; never change without retraining the forest.
pub const MODEL_INPUT_WIDTH: usize = 110;

/// A value-semantic record of the engine features the cost model scores.
///
/// Additive: `a.add_assign(&b)` sums matching fields. Three groups mirror
/// the three pipeline stages the learned model was trained on: a base
/// table scan, a hash-join build, and a hash-join probe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Feature {
    pub table_scan_const: f64,
    pub table_scan_in_card: f64,
    pub table_scan_out_percentage: f64,
    pub table_scan_empty_output: f64,

    pub hash_join_build_const: f64,
    pub hash_join_build_out_card: f64,
    pub hash_join_build_out_size: f64,
    pub hash_join_build_in_percentage: f64,

    pub hash_join_probe_const: f64,
    pub hash_join_probe_in_card: f64,
    pub hash_join_probe_right_percentage: f64,
    pub hash_join_probe_out_percentage: f64,
}

impl Feature {
    /// Field-wise addition from `other` into `self`.
    pub fn add_assign(&mut self, other: &Feature) {
        self.table_scan_const += other.table_scan_const;
        self.table_scan_in_card += other.table_scan_in_card;
        self.table_scan_out_percentage += other.table_scan_out_percentage;
        self.table_scan_empty_output += other.table_scan_empty_output;

        self.hash_join_build_const += other.hash_join_build_const;
        self.hash_join_build_out_card += other.hash_join_build_out_card;
        self.hash_join_build_out_size += other.hash_join_build_out_size;
        self.hash_join_build_in_percentage += other.hash_join_build_in_percentage;

        self.hash_join_probe_const += other.hash_join_probe_const;
        self.hash_join_probe_in_card += other.hash_join_probe_in_card;
        self.hash_join_probe_right_percentage += other.hash_join_probe_right_percentage;
        self.hash_join_probe_out_percentage += other.hash_join_probe_out_percentage;
    }

    /// Project this feature positionally into a dense 110-wide accumulator,
    /// adding at fixed slots. Calling this repeatedly
    /// with different features sums them at the same positions.
    ///
    /// Slot 5 is unconditionally incremented by 1.0 on every call — this is
    /// part of the trained model's contract (`TableScan_Scan_compare_percentage`
    /// is always treated as present) and must be preserved even though it
    /// looks like dead weight.
    pub fn add_to(&self, vec: &mut [f64; MODEL_INPUT_WIDTH]) {
        vec[0] += self.table_scan_const;
        vec[1] += self.table_scan_in_card;
        vec[3] += self.table_scan_out_percentage;
        vec[5] += 1.0;
        vec[10] += self.table_scan_empty_output;

        vec[39] += self.hash_join_build_const;
        vec[40] += self.hash_join_build_out_card;
        vec[41] += self.hash_join_build_out_size;
        vec[42] += self.hash_join_build_in_percentage;

        vec[43] += self.hash_join_probe_const;
        vec[44] += self.hash_join_probe_in_card;
        vec[45] += self.hash_join_probe_right_percentage;
        vec[46] += self.hash_join_probe_out_percentage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assign_is_field_wise_from_argument() {
        let mut a = Feature {
            hash_join_build_const: 1.0,
            ..Default::default()
        };
        let b = Feature {
            hash_join_build_const: 5.0,
            table_scan_const: 2.0,
            ..Default::default()
        };
        a.add_assign(&b);
        // Must take the value from `b`, not double `a`'s own field (the
        // copy-paste bug in the upstream model trainer that must not be reproduced).
        assert_eq!(a.hash_join_build_const, 6.0);
        assert_eq!(a.table_scan_const, 2.0);
    }

    #[test]
    fn add_to_sets_fixed_slots() {
        let f = Feature {
            table_scan_const: 1.0,
            table_scan_in_card: 100.0,
            table_scan_out_percentage: 0.5,
            table_scan_empty_output: 0.0,
            hash_join_build_const: 1.0,
            hash_join_build_out_card: 50.0,
            hash_join_build_out_size: 16.0,
            hash_join_build_in_percentage: 0.5,
            hash_join_probe_const: 1.0,
            hash_join_probe_in_card: 30.0,
            hash_join_probe_right_percentage: 0.3,
            hash_join_probe_out_percentage: 0.1,
        };
        let mut vec = [0.0; MODEL_INPUT_WIDTH];
        f.add_to(&mut vec);

        assert_eq!(vec[0], 1.0);
        assert_eq!(vec[1], 100.0);
        assert_eq!(vec[3], 0.5);
        assert_eq!(vec[5], 1.0);
        assert_eq!(vec[10], 0.0);
        assert_eq!(vec[39], 1.0);
        assert_eq!(vec[40], 50.0);
        assert_eq!(vec[41], 16.0);
        assert_eq!(vec[42], 0.5);
        assert_eq!(vec[43], 1.0);
        assert_eq!(vec[44], 30.0);
        assert_eq!(vec[45], 0.3);
        assert_eq!(vec[46], 0.1);
    }

    #[test]
    fn add_to_is_additive_across_calls() {
        let f = Feature {
            table_scan_const: 1.0,
            ..Default::default()
        };
        let mut vec = [0.0; MODEL_INPUT_WIDTH];
        f.add_to(&mut vec);
        f.add_to(&mut vec);
        assert_eq!(vec[0], 2.0);
        // Slot 5 increments once per call too.
        assert_eq!(vec[5], 2.0);
    }
}
