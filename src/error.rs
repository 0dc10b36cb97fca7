//! Error types for the optimizer, grouped by the boundary that raises them.

use thiserror::Error;

/// Errors raised while parsing a query dump file.
///
/// Per the dump format's best-effort contract, most of these are logged
/// and the offending record is skipped rather than aborting the parse.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: could not parse '{token}' as an integer")]
    BadInt { line: usize, token: String },

    #[error("line {line}: could not parse '{token}' as a real number")]
    BadReal { line: usize, token: String },

    #[error("line {line}: join references unknown relation '{name}'")]
    UnknownRelation { line: usize, name: String },

    #[error("line {line}: malformed 'join' record, expected rel_a=\"...\" rel_b=\"...\" sel=...")]
    MalformedJoin { line: usize },
}

/// Errors raised while building or querying a `QueryGraph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("query has {0} relations, but the bitset representation supports at most 63")]
    TooManyRelations(usize),

    #[error("no cardinality entry for subset {0:#x}; the caller must supply one for every connected subset reachable by enumeration")]
    MissingCardinality(u64),
}

/// Errors raised by the `Model` batching buffers.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("register_features called {filled} times against a buffer sized for {capacity}")]
    BufferOverflow { filled: usize, capacity: usize },
}

/// Errors raised by a cost adapter when the DP driver violates its contract.
#[derive(Debug, Error)]
pub enum CostAdapterError {
    #[error("build_hash_table called on a plan whose open pipeline already has HashJoin_Build_const = {0}")]
    BuildAlreadyOpen(f64),
}

/// Crate-level error, aggregating every fallible boundary.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    CostAdapter(#[from] CostAdapterError),

    #[error("failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type OptimizerResult<T> = Result<T, OptimizerError>;
