//! End-to-end flow: ingest documents, evaluate queries, aggregate, persist.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rkit_eval::aggregate::aggregate;
use rkit_eval::evaluator::{CaseOutcome, EvalConfig, RetrievalEvaluator};
use rkit_eval::groundtruth::{QueryCase, QueryType, RelevanceJudgment, SourceModality};
use rkit_eval::runstore::{FileRunStore, RunStore};
use rkit_rag::chunking::{ChunkingConfig, SemanticChunker};
use rkit_rag::document::Document;
use rkit_rag::embedding::EmbeddingProvider;
use rkit_rag::error::IngestError;
use rkit_rag::inmemory::InMemoryVectorStore;
use rkit_rag::pipeline::{IngestPipeline, PipelineConfig};
use rkit_rag::tokens::WordTokenCounter;

/// A deterministic provider serving pre-registered embeddings.
struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Arc<Self> {
        let vectors = entries.iter().map(|(text, v)| (text.to_string(), v.clone())).collect();
        Arc::new(Self { vectors })
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> rkit_rag::Result<Vec<f32>> {
        self.vectors.get(text).cloned().ok_or_else(|| IngestError::Embedding {
            provider: "static".to_string(),
            message: format!("no embedding registered for '{text}'"),
        })
    }

    fn dimensions(&self) -> usize {
        2
    }
}

fn provider() -> Arc<StaticEmbedder> {
    StaticEmbedder::new(&[
        // Sentences, as seen by the chunker.
        ("Paris is the capital of France.", vec![1.0, 0.0]),
        ("The Eiffel Tower is in Paris.", vec![0.95, 0.05]),
        ("Cats are popular pets.", vec![0.0, 1.0]),
        ("Many people keep cats as companions.", vec![0.05, 0.95]),
        // Chunk texts, as seen by the pipeline's batch embedding.
        ("Paris is the capital of France. The Eiffel Tower is in Paris.", vec![1.0, 0.0]),
        ("Cats are popular pets. Many people keep cats as companions.", vec![0.0, 1.0]),
        // Query texts.
        ("Where is the Eiffel Tower?", vec![0.9, 0.1]),
        ("What pets do people keep?", vec![0.1, 0.9]),
    ])
}

fn cases() -> Vec<QueryCase> {
    vec![
        QueryCase {
            id: "q_paris".to_string(),
            question: "Where is the Eiffel Tower?".to_string(),
            query_type: QueryType::Extractive,
            modality: SourceModality::Text,
            category: "landmarks".to_string(),
            judgment: RelevanceJudgment {
                doc_id: "paris.md".to_string(),
                section_id: None,
                keywords: vec!["Eiffel".to_string()],
            },
        },
        QueryCase {
            id: "q_cats".to_string(),
            question: "What pets do people keep?".to_string(),
            query_type: QueryType::Abstractive,
            modality: SourceModality::Text,
            category: "animals".to_string(),
            judgment: RelevanceJudgment {
                doc_id: "cats.md".to_string(),
                section_id: None,
                keywords: vec!["cats".to_string()],
            },
        },
    ]
}

#[tokio::test]
async fn ingest_evaluate_aggregate_persist() {
    let provider = provider();
    let store = Arc::new(InMemoryVectorStore::new());

    let chunking = ChunkingConfig::builder()
        .similarity_threshold(0.65)
        .max_tokens(500)
        .min_tokens(3)
        .build()
        .unwrap();
    let chunker = Arc::new(SemanticChunker::new(
        provider.clone(),
        Arc::new(WordTokenCounter),
        chunking,
    ));

    let pipeline = IngestPipeline::builder()
        .config(PipelineConfig::default())
        .embedding_provider(provider.clone())
        .vector_store(store.clone())
        .chunker(chunker)
        .build()
        .unwrap();

    pipeline.create_collection("docs").await.unwrap();
    let documents = [
        Document::new(
            "paris.md",
            "Paris is the capital of France. The Eiffel Tower is in Paris.",
        ),
        Document::new("cats.md", "Cats are popular pets. Many people keep cats as companions."),
    ];
    let outcomes = pipeline.ingest_batch("docs", &documents, false).await.unwrap();
    assert_eq!(outcomes.len(), 2);

    let config = EvalConfig::builder("docs").top_k(2).k_values(vec![1, 2]).build().unwrap();
    let evaluator = RetrievalEvaluator::new(provider, store, config);

    let outcomes = evaluator.evaluate_all(&cases()).await;
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        let CaseOutcome::Scored(evaluation) = outcome else {
            panic!("query failed unexpectedly: {outcome:?}");
        };
        // Each query's own document ranks first.
        assert_eq!(evaluation.metrics.get("mrr"), Some(1.0));
        assert_eq!(evaluation.metrics.get("recall@1"), Some(1.0));
        assert_eq!(evaluation.metrics.get("keyword_coverage"), Some(1.0));
    }

    let run = aggregate("nightly-baseline", outcomes).unwrap();
    assert_eq!(run.total_queries, 2);
    assert_eq!(run.aggregate.get("mrr"), Some(1.0));
    assert_eq!(run.by_category.len(), 2);
    assert_eq!(run.by_type.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let run_store = FileRunStore::new(dir.path());
    run_store.save(&run).await.unwrap();

    let loaded = run_store.load("nightly-baseline").await.unwrap().unwrap();
    assert_eq!(loaded, run);

    let summaries = run_store.list().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].name, "nightly-baseline");
    assert_eq!(summaries[0].mrr, Some(1.0));
}
