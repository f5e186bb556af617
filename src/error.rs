//! Error types for pminmax.
//!
//! Only conditions that stop the computation from launching are errors.
//! Per-worker trouble (a killed worker, a short read, a missing result
//! file) is absorbed into [`crate::collect::WorkerOutcome`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pminmax.
#[derive(Error, Debug)]
pub enum PminmaxError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to allocate array of {elements} elements")]
    Allocation { elements: usize },

    #[error("Pipe creation failed: {0}")]
    Pipe(String),

    #[error("Cannot prepare result file {}: {source}", path.display())]
    ResultFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fork failed: {0}")]
    Fork(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pminmax operations.
pub type Result<T> = std::result::Result<T, PminmaxError>;
