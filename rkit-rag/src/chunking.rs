//! Semantic document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SemanticChunker`], which
//! decides chunk boundaries from sentence-level embedding similarity under
//! token-budget constraints: a new chunk starts where adjacent sentences
//! drift apart semantically or where the running token total would exceed
//! the configured ceiling.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Chunk, Document, Sentence};
use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::error::{IngestError, Result};
use crate::segment::segment_sentences;
use crate::tokens::TokenCounter;

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text, token counts, and metadata
/// but no embeddings. Chunk embeddings are attached later by the pipeline.
#[async_trait]
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document contains no sentences.
    async fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Configuration for [`SemanticChunker`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkingConfig {
    /// Adjacent-sentence cosine similarity below which a split is proposed.
    pub similarity_threshold: f32,
    /// Token ceiling per chunk. Advisory at split-decision time: a single
    /// sentence longer than this still forms its own chunk.
    pub max_tokens: usize,
    /// Minimum tokens a chunk must hold before a proposed split is committed.
    pub min_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { similarity_threshold: 0.7, max_tokens: 500, min_tokens: 50 }
    }
}

impl ChunkingConfig {
    /// Create a new builder for constructing a [`ChunkingConfig`].
    pub fn builder() -> ChunkingConfigBuilder {
        ChunkingConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`ChunkingConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChunkingConfigBuilder {
    config: ChunkingConfig,
}

impl ChunkingConfigBuilder {
    /// Set the adjacent-sentence similarity threshold.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the token ceiling per chunk.
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the minimum tokens required before a split is committed.
    pub fn min_tokens(mut self, min_tokens: usize) -> Self {
        self.config.min_tokens = min_tokens;
        self
    }

    /// Build the [`ChunkingConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if:
    /// - `similarity_threshold` is outside `[0, 1]` or not finite
    /// - `max_tokens == 0`
    /// - `min_tokens > max_tokens`
    pub fn build(self) -> Result<ChunkingConfig> {
        let c = &self.config;
        if !c.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&c.similarity_threshold)
        {
            return Err(IngestError::Config(format!(
                "similarity_threshold ({}) must be within [0, 1]",
                c.similarity_threshold
            )));
        }
        if c.max_tokens == 0 {
            return Err(IngestError::Config("max_tokens must be greater than zero".to_string()));
        }
        if c.min_tokens > c.max_tokens {
            return Err(IngestError::Config(format!(
                "min_tokens ({}) must not exceed max_tokens ({})",
                c.min_tokens, c.max_tokens
            )));
        }
        Ok(self.config)
    }
}

/// Splits documents at semantic topic boundaries.
///
/// Each sentence is embedded and compared against the immediately preceding
/// sentence (never a chunk centroid). A split is proposed when the cosine
/// similarity falls below the threshold or the token ceiling would be
/// exceeded, and committed only once the accumulating chunk holds at least
/// `min_tokens` — the floor guards against runs of tiny chunks from noisy
/// similarity.
///
/// Sentence embeddings are requested with bounded concurrency; results are
/// consumed in original document order regardless of completion order. A
/// provider failure for any sentence abandons the whole document.
///
/// # Example
///
/// ```rust,ignore
/// use rkit_rag::{ChunkingConfig, SemanticChunker, WordTokenCounter};
///
/// let chunker = SemanticChunker::new(provider, Arc::new(WordTokenCounter), config);
/// let chunks = chunker.chunk(&document).await?;
/// ```
pub struct SemanticChunker {
    provider: Arc<dyn EmbeddingProvider>,
    counter: Arc<dyn TokenCounter>,
    config: ChunkingConfig,
    concurrency: usize,
}

/// Default number of in-flight sentence embedding requests.
const DEFAULT_EMBED_CONCURRENCY: usize = 8;

impl SemanticChunker {
    /// Create a new `SemanticChunker` with the default embedding concurrency.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        counter: Arc<dyn TokenCounter>,
        config: ChunkingConfig,
    ) -> Self {
        Self { provider, counter, config, concurrency: DEFAULT_EMBED_CONCURRENCY }
    }

    /// Set the number of sentence embeddings requested concurrently.
    ///
    /// Values below 1 are clamped to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Embed all sentences with bounded concurrency, in document order.
    async fn embed_sentences(&self, sentences: &[Sentence]) -> Result<Vec<Vec<f32>>> {
        // `buffered` preserves input order even when later requests finish first.
        let futures: Vec<_> =
            sentences.iter().map(|s| self.provider.embed(&s.text)).collect();
        stream::iter(futures)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Materialize a chunk from accumulated sentences.
    fn assemble_chunk(
        &self,
        document: &Document,
        sentences: &[&Sentence],
        token_count: usize,
        chunk_index: usize,
    ) -> Chunk {
        let text =
            sentences.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
        let mut metadata = document.metadata.clone();
        metadata.insert("chunk_index".to_string(), chunk_index.to_string());
        Chunk {
            id: format!("{}_{chunk_index}", document.id),
            text,
            embedding: Vec::new(),
            token_count,
            metadata,
            document_id: document.id.clone(),
        }
    }
}

#[async_trait]
impl Chunker for SemanticChunker {
    async fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        let sentences = segment_sentences(&document.text);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embed_sentences(&sentences).await?;
        let token_counts: Vec<usize> =
            sentences.iter().map(|s| self.counter.count(&s.text)).collect();

        let mut chunks = Vec::new();
        let mut current: Vec<&Sentence> = vec![&sentences[0]];
        let mut current_tokens = token_counts[0];

        for i in 1..sentences.len() {
            // A zero-vector embedding has no defined similarity; treat it as
            // maximally dissimilar so the comparison never sees a NaN.
            let similarity = cosine_similarity(&embeddings[i - 1], &embeddings[i])
                .unwrap_or(f32::NEG_INFINITY);

            let candidate = similarity < self.config.similarity_threshold
                || current_tokens + token_counts[i] > self.config.max_tokens;
            let committed = candidate && current_tokens >= self.config.min_tokens;

            if committed {
                chunks.push(self.assemble_chunk(document, &current, current_tokens, chunks.len()));
                current = vec![&sentences[i]];
                current_tokens = token_counts[i];
            } else {
                current.push(&sentences[i]);
                current_tokens += token_counts[i];
            }
        }

        chunks.push(self.assemble_chunk(document, &current, current_tokens, chunks.len()));

        debug!(
            document.id = %document.id,
            sentence_count = sentences.len(),
            chunk_count = chunks.len(),
            "chunked document"
        );

        Ok(chunks)
    }
}
