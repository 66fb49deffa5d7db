//! Ingestion pipeline orchestrator.
//!
//! The [`IngestPipeline`] coordinates the chunk → embed → store workflow by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], and a [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use rkit_rag::{IngestPipeline, PipelineConfig, InMemoryVectorStore, SemanticChunker};
//!
//! let pipeline = IngestPipeline::builder()
//!     .config(PipelineConfig::default())
//!     .embedding_provider(provider.clone())
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(chunker))
//!     .build()?;
//!
//! pipeline.create_collection("docs").await?;
//! pipeline.ingest("docs", &document).await?;
//! let results = pipeline.query("docs", "search query", None).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{IngestError, Result};
use crate::vectorstore::{MetadataFilter, VectorStore};

/// Configuration parameters for the ingestion pipeline.
///
/// The field is private so every config passes through validation; construct
/// one with [`PipelineConfig::with_top_k`] or [`PipelineConfig::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

impl PipelineConfig {
    /// Create a config with the given `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if `top_k == 0`.
    pub fn with_top_k(top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(IngestError::Config("top_k must be greater than zero".to_string()));
        }
        Ok(Self { top_k })
    }

    /// Number of top results to return from vector search.
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// The outcome of ingesting one document within a batch.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The document was chunked, embedded, and stored.
    Stored {
        /// The id of the ingested document.
        document_id: String,
        /// The chunks written to the store.
        chunks: Vec<Chunk>,
    },
    /// The document could not be ingested; siblings were unaffected.
    Failed {
        /// The id of the failed document.
        document_id: String,
        /// The error that abandoned this document.
        error: IngestError,
    },
}

/// The ingestion pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and raw query
/// execution (embed → search). Construct one via
/// [`IngestPipeline::builder()`].
pub struct IngestPipeline {
    config: PipelineConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl IngestPipeline {
    /// Create a new [`IngestPipelineBuilder`].
    pub fn builder() -> IngestPipelineBuilder {
        IngestPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create a named collection in the vector store.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Pipeline`] if the vector store operation fails.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            IngestError::Pipeline(format!("failed to create collection '{name}': {e}"))
        })
    }

    /// Ingest a single document: chunk → embed → store.
    ///
    /// Returns the chunks that were stored (with embeddings attached).
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Pipeline`] if chunking, embedding, or storage
    /// fails, including the document ID in the error message.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunker.chunk(document).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "chunking failed during ingestion");
            IngestError::Pipeline(format!("chunking failed for document '{}': {e}", document.id))
        })?;
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            IngestError::Pipeline(format!(
                "embedding failed for document '{}': {e}",
                document.id
            ))
        })?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.upsert(collection, &chunks).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            IngestError::Pipeline(format!("upsert failed for document '{}': {e}", document.id))
        })?;

        let chunk_count = chunks.len();
        info!(document.id = %document.id, chunk_count, "ingested document");

        Ok(chunks)
    }

    /// Ingest multiple documents with per-document failure isolation.
    ///
    /// Each document is ingested independently: a failure abandons that
    /// document and is recorded in its [`IngestOutcome`], while its siblings
    /// proceed. With `fail_fast` set, the first failure aborts the batch
    /// instead and is returned as an error.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
        fail_fast: bool,
    ) -> Result<Vec<IngestOutcome>> {
        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            match self.ingest(collection, document).await {
                Ok(chunks) => outcomes
                    .push(IngestOutcome::Stored { document_id: document.id.clone(), chunks }),
                Err(e) if fail_fast => return Err(e),
                Err(e) => {
                    warn!(document.id = %document.id, error = %e, "document skipped in batch");
                    outcomes
                        .push(IngestOutcome::Failed { document_id: document.id.clone(), error: e });
                }
            }
        }
        Ok(outcomes)
    }

    /// Query the pipeline: embed the query text, then search the store.
    ///
    /// Returns up to `top_k` results ordered by descending similarity score.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Pipeline`] if embedding or search fails.
    pub async fn query(
        &self,
        collection: &str,
        query: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            IngestError::Pipeline(format!("query embedding failed: {e}"))
        })?;

        let results = self
            .vector_store
            .search(collection, &query_embedding, self.config.top_k, filter)
            .await
            .map_err(|e| {
                error!(collection, error = %e, "vector store search failed");
                IngestError::Pipeline(format!("search failed in collection '{collection}': {e}"))
            })?;

        info!(result_count = results.len(), "query completed");

        Ok(results)
    }
}

/// Builder for constructing an [`IngestPipeline`].
///
/// All fields are required except `config`, which defaults. Call
/// [`build()`](IngestPipelineBuilder::build) to validate and produce the
/// pipeline.
#[derive(Default)]
pub struct IngestPipelineBuilder {
    config: Option<PipelineConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if any required field is missing.
    pub fn build(self) -> Result<IngestPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| IngestError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| IngestError::Config("vector_store is required".to_string()))?;
        let chunker = self
            .chunker
            .ok_or_else(|| IngestError::Config("chunker is required".to_string()))?;

        Ok(IngestPipeline { config, embedding_provider, vector_store, chunker })
    }
}
