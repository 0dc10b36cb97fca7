//! Join-order optimizer: DPsize enumeration over bitset-encoded relation
//! classes, scored by a pluggable cost adapter (a simple output-cardinality
//! sum, or a learned regression-forest model).

pub mod bitset;
pub mod config;
pub mod cost;
pub mod dp;
pub mod error;
pub mod feature;
pub mod graph;
pub mod model;
pub mod parser;
pub mod plan;

pub use dp::{DpError, DpSize};
pub use error::{OptimizerError, OptimizerResult};
pub use graph::QueryGraph;
