//! Error types for the `rkit-eval` crate.

use thiserror::Error;

/// Errors that can occur while evaluating retrieval quality.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A configuration validation error. Raised before any I/O is performed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A ground-truth record is missing, inconsistent, or carries an
    /// unrecognized tag.
    #[error("Judgment error: {0}")]
    Judgment(String),

    /// A search result payload is missing an expected metadata field.
    #[error("Malformed payload for chunk '{chunk_id}': missing field '{field}'")]
    MalformedPayload {
        /// The chunk whose payload is malformed.
        chunk_id: String,
        /// The missing metadata field.
        field: String,
    },

    /// A run contained no queries, or every query failed to evaluate.
    /// Aggregating nothing is an error, never a silent zero.
    #[error("Empty run: {0}")]
    EmptyRun(String),

    /// Reading or writing a persisted evaluation run failed.
    #[error("Run store error: {0}")]
    RunStore(String),

    /// An error propagated from the ingestion/retrieval layer.
    #[error(transparent)]
    Ingest(#[from] rkit_rag::IngestError),
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
