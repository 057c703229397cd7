//! Error types for the similarity pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid or incomplete run parameters.
    #[error("configuration error: {0}")]
    Config(String),

    /// Concept retrieval failed (endpoint answer or cache content).
    #[error("concept source error: {0}")]
    Source(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("npy error: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, SimError>;
