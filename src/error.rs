//! Error types for loading families and running inference.

use thiserror::Error;

/// Result type alias for heredity operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A malformed family dataset. Raised before any inference begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("`{child}` references unknown parent `{parent}`")]
    UnknownParent { child: String, parent: String },

    #[error("`{0}` has exactly one recorded parent; both or neither are required")]
    PartialParentage(String),

    #[error("`{0}` is listed more than once")]
    DuplicateName(String),

    #[error("`{0}` is recorded as its own parent")]
    SelfParent(String),

    #[error("parent links form a cycle through `{0}`")]
    Cycle(String),

    #[error("row {row}: trait must be `1`, `0` or blank, got `{value}`")]
    MalformedTrait { row: usize, value: String },

    #[error("row {row}: individual name is blank")]
    BlankName { row: usize },

    #[error("missing column `{0}`")]
    MissingColumn(String),
}

/// Unified error type for heredity.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid family data: {0}")]
    Data(#[from] DataError),

    /// Every assignment consistent with the evidence has zero probability.
    #[error("{distribution} distribution of `{name}` sums to zero; evidence is inconsistent with the model")]
    Normalization {
        name: String,
        distribution: &'static str,
    },

    #[error("invalid probability tables: {0}")]
    InvalidProbabilities(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
