//! Error types for the `rkit-rag` crate.

use thiserror::Error;

/// Errors that can occur during ingestion and retrieval operations.
#[derive(Debug, Error)]
pub enum IngestError {
    /// An embedding provider call failed (network, auth, rate limit).
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector store operation failed.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while chunking a document.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// A configuration validation error. Raised before any I/O is performed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error in pipeline orchestration.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// A convenience result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
