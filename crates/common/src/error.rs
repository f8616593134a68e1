use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A rate was supplied but is zero, negative, NaN or infinite.
    #[error("Invalid rate {rate} for {from} -> {to}: rates must be finite and positive.")]
    InvalidRate { from: String, to: String, rate: f64 },

    #[error("Currency {0} appears more than once in the currency set.")]
    DuplicateCurrency(String),

    #[error("At least two currencies are required, got {0}.")]
    TooFewCurrencies(usize),

    #[error("Currency {0} is not part of the graph.")]
    UnknownCurrency(String),

    #[error("Invalid numeric policy: {0}")]
    InvalidPolicy(String),

    /// Indicates an attempt to access a node index that exceeds the graph size (N).
    #[error("Node index {0} is out of bounds.")]
    NodeIndexOutOfBounds(usize),

    /// Indicates a structural inconsistency found during graph processing or validation.
    #[error("Graph structure is invalid or inconsistent.")]
    InvalidGraph,

    /// The predecessor chain did not close into a loop. This is a defect, not a user error.
    #[error("Cycle extraction failed due to a broken predecessor chain.")]
    CycleExtractionFailed,

    #[error("No conversion path from {from} to {to}.")]
    NoPathFound { from: String, to: String },
}
