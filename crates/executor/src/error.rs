use thiserror::Error;

use common::error::Error as ArbSolverError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed rate file: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Graph processing error: {0}")]
    GraphError(#[from] ArbSolverError),
}
