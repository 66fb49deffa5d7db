//! Semantic chunking and vector retrieval primitives for RetrievalKit.
//!
//! `rkit-rag` covers the ingestion half of a document-search pipeline:
//!
//! - [`segment`] splits raw text into ordered sentences
//! - [`tokens`] estimates token lengths for size budgets
//! - [`chunking`] decides chunk boundaries from sentence-embedding similarity
//! - [`embedding`] is the seam for external embedding providers
//! - [`vectorstore`] is the seam for external vector indexes, with
//!   [`inmemory`] as a self-contained implementation
//! - [`pipeline`] wires the pieces into a chunk → embed → store workflow
//!
//! Collaborators are injected as `Arc<dyn Trait>` handles; there is no
//! ambient client state, so tests substitute deterministic fakes.

pub mod chunking;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod pipeline;
pub mod segment;
pub mod tokens;
pub mod vectorstore;

pub use chunking::{Chunker, ChunkingConfig, ChunkingConfigBuilder, SemanticChunker};
pub use document::{Chunk, Document, SearchResult, Sentence};
pub use embedding::{EmbeddingProvider, cosine_similarity};
pub use error::{IngestError, Result};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{IngestOutcome, IngestPipeline, IngestPipelineBuilder, PipelineConfig};
pub use segment::segment_sentences;
pub use tokens::{TokenCounter, WordTokenCounter};
pub use vectorstore::{MetadataFilter, VectorStore};
