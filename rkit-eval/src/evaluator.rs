//! Retrieval evaluation.
//!
//! [`RetrievalEvaluator`] issues each ground-truth query against the vector
//! store, judges the ranked slate, and computes a per-query [`MetricSet`]
//! plus the retrieved snippets for later inspection. Queries are evaluated
//! with bounded concurrency and per-query failure isolation: a failed query
//! is recorded as a failure, never silently scored zero, and its siblings
//! proceed.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rkit_rag::embedding::EmbeddingProvider;
use rkit_rag::vectorstore::{MetadataFilter, VectorStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EvalError, Result};
use crate::groundtruth::{QueryCase, QueryType, SourceModality};
use crate::judge::{MatchMode, RelevanceJudge, ResultIdentity};
use crate::metrics::{MetricSet, ndcg, precision_at_k, recall_at_k, reciprocal_rank};

/// Characters of chunk text retained per snippet in the run record.
const SNIPPET_MAX_CHARS: usize = 240;

/// Configuration for a [`RetrievalEvaluator`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalConfig {
    /// The vector store collection to query.
    pub collection: String,
    /// Number of results requested per query.
    pub top_k: usize,
    /// The K cutoffs for recall/precision metrics. Each must be ≤ `top_k`.
    pub k_values: Vec<usize>,
    /// Number of queries evaluated concurrently.
    pub concurrency: usize,
    /// Optional metadata filter applied to every search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<MetadataFilter>,
}

impl EvalConfig {
    /// Create a new builder for constructing an [`EvalConfig`].
    pub fn builder(collection: impl Into<String>) -> EvalConfigBuilder {
        EvalConfigBuilder {
            collection: collection.into(),
            top_k: 10,
            k_values: vec![1, 5, 10],
            concurrency: 4,
            filter: None,
        }
    }
}

/// Builder for constructing a validated [`EvalConfig`].
#[derive(Debug, Clone)]
pub struct EvalConfigBuilder {
    collection: String,
    top_k: usize,
    k_values: Vec<usize>,
    concurrency: usize,
    filter: Option<MetadataFilter>,
}

impl EvalConfigBuilder {
    /// Set the number of results requested per query.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the K cutoffs for recall/precision metrics.
    pub fn k_values(mut self, k_values: Vec<usize>) -> Self {
        self.k_values = k_values;
        self
    }

    /// Set the number of queries evaluated concurrently.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Restrict every search to chunks matching the filter.
    pub fn filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Build the [`EvalConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Config`] if `top_k == 0`, `k_values` is empty,
    /// or any K exceeds `top_k`. Raised before any I/O.
    pub fn build(self) -> Result<EvalConfig> {
        if self.top_k == 0 {
            return Err(EvalError::Config("top_k must be greater than zero".to_string()));
        }
        if self.k_values.is_empty() {
            return Err(EvalError::Config("k_values must not be empty".to_string()));
        }
        if let Some(k) = self.k_values.iter().find(|&&k| k == 0 || k > self.top_k) {
            return Err(EvalError::Config(format!(
                "k value {k} must be within 1..=top_k ({})",
                self.top_k
            )));
        }
        Ok(EvalConfig {
            collection: self.collection,
            top_k: self.top_k,
            k_values: self.k_values,
            concurrency: self.concurrency.max(1),
            filter: self.filter,
        })
    }
}

/// One retrieved result retained in the run record for inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedSnippet {
    /// 1-indexed rank position in the slate.
    pub rank: usize,
    /// Similarity score reported by the store.
    pub score: f32,
    /// The retrieved chunk's source document id.
    pub doc_id: String,
    /// The retrieved chunk's section id, when the payload carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    /// The chunk text, truncated for the record.
    pub text: String,
}

/// The scored outcome of evaluating one query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryEvaluation {
    /// The evaluated query's identifier.
    pub query_id: String,
    /// The question text.
    pub question: String,
    /// The query's category label.
    pub category: String,
    /// Abstractive or extractive.
    pub query_type: QueryType,
    /// The query's source modality.
    pub modality: SourceModality,
    /// The judgment keywords, kept for transparency.
    pub keywords: Vec<String>,
    /// The per-query metrics.
    pub metrics: MetricSet,
    /// The top-K retrieved snippets.
    pub retrieved: Vec<RetrievedSnippet>,
}

/// The outcome of one query within a run: scored, or failed with the error
/// recorded so the run can report failures distinctly from zero scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CaseOutcome {
    /// The query was evaluated and scored.
    Scored(QueryEvaluation),
    /// The query could not be evaluated; excluded from aggregate means.
    Failed {
        /// The failed query's identifier.
        query_id: String,
        /// A description of the failure.
        error: String,
    },
}

/// Evaluates ground-truth queries against a vector store.
///
/// Metrics are pure functions of the ranked slate and the judgment:
/// re-running on identical inputs (same index contents, same embeddings)
/// produces identical metric sets.
///
/// # Example
///
/// ```rust,ignore
/// use rkit_eval::{EvalConfig, RetrievalEvaluator};
///
/// let config = EvalConfig::builder("docs").top_k(10).k_values(vec![1, 5, 10]).build()?;
/// let evaluator = RetrievalEvaluator::new(provider, store, config);
/// let outcomes = evaluator.evaluate_all(&cases).await;
/// ```
pub struct RetrievalEvaluator {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    judge: RelevanceJudge,
    config: EvalConfig,
}

impl RetrievalEvaluator {
    /// Create a new evaluator over the given provider and store.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: EvalConfig,
    ) -> Self {
        Self { provider, store, judge: RelevanceJudge, config }
    }

    /// Return a reference to the evaluator configuration.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate a single query case: embed → search → judge → score.
    ///
    /// # Errors
    ///
    /// Returns the provider or store error when the round trip fails, or
    /// [`EvalError::MalformedPayload`] when a result payload is missing its
    /// document id. No partial metrics are produced on failure.
    pub async fn evaluate_case(&self, case: &QueryCase) -> Result<QueryEvaluation> {
        let query_embedding = self.provider.embed(&case.question).await?;
        let results = self
            .store
            .search(
                &self.config.collection,
                &query_embedding,
                self.config.top_k,
                self.config.filter.as_ref(),
            )
            .await?;

        let identities: Vec<ResultIdentity> =
            results.iter().map(ResultIdentity::from_result).collect::<Result<_>>()?;

        let judgment = &case.judgment;
        let exact: Vec<bool> = identities
            .iter()
            .map(|id| self.judge.is_relevant(id, judgment, MatchMode::Exact))
            .collect();
        let by_doc: Vec<bool> = identities
            .iter()
            .map(|id| self.judge.is_relevant(id, judgment, MatchMode::Document))
            .collect();

        // Gains are keyword-coverage graded when the judgment carries
        // keywords, binary identity otherwise.
        let gains: Vec<f64> = if judgment.keywords.is_empty() {
            exact.iter().map(|&r| if r { 1.0 } else { 0.0 }).collect()
        } else {
            results
                .iter()
                .map(|r| self.judge.keyword_coverage([r.chunk.text.as_str()], &judgment.keywords))
                .collect()
        };

        let mut metrics = MetricSet::new();
        metrics.insert("mrr", reciprocal_rank(&exact));
        metrics.insert("doc_mrr", reciprocal_rank(&by_doc));
        metrics.insert("ndcg", ndcg(&gains));
        for &k in &self.config.k_values {
            metrics.insert(format!("recall@{k}"), recall_at_k(&exact, k));
            metrics.insert(format!("doc_recall@{k}"), recall_at_k(&by_doc, k));
            metrics.insert(format!("precision@{k}"), precision_at_k(&exact, k));
            metrics.insert(format!("doc_precision@{k}"), precision_at_k(&by_doc, k));
        }
        metrics.insert(
            "keyword_coverage",
            self.judge.keyword_coverage(
                results.iter().map(|r| r.chunk.text.as_str()),
                &judgment.keywords,
            ),
        );

        let retrieved = results
            .iter()
            .zip(&identities)
            .enumerate()
            .map(|(i, (result, identity))| RetrievedSnippet {
                rank: i + 1,
                score: result.score,
                doc_id: identity.doc_id.clone(),
                section_id: identity.section_id.clone(),
                text: truncate_chars(&result.chunk.text, SNIPPET_MAX_CHARS),
            })
            .collect();

        Ok(QueryEvaluation {
            query_id: case.id.clone(),
            question: case.question.clone(),
            category: case.category.clone(),
            query_type: case.query_type,
            modality: case.modality,
            keywords: judgment.keywords.clone(),
            metrics,
            retrieved,
        })
    }

    /// Evaluate all cases with bounded concurrency, preserving case order.
    ///
    /// Failures are isolated per query: a failed case becomes
    /// [`CaseOutcome::Failed`] while its siblings proceed.
    pub async fn evaluate_all(&self, cases: &[QueryCase]) -> Vec<CaseOutcome> {
        let outcomes: Vec<CaseOutcome> = stream::iter(cases.iter().map(|case| async move {
            match self.evaluate_case(case).await {
                Ok(evaluation) => CaseOutcome::Scored(evaluation),
                Err(e) => {
                    warn!(query_id = %case.id, error = %e, "query failed to evaluate");
                    CaseOutcome::Failed { query_id: case.id.clone(), error: e.to_string() }
                }
            }
        }))
        .buffered(self.config.concurrency)
        .collect()
        .await;

        let failed = outcomes.iter().filter(|o| matches!(o, CaseOutcome::Failed { .. })).count();
        info!(
            case_count = cases.len(),
            failed_count = failed,
            collection = %self.config.collection,
            "evaluation pass completed"
        );

        outcomes
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use rkit_rag::document::Chunk;
    use rkit_rag::error::IngestError;
    use rkit_rag::inmemory::InMemoryVectorStore;

    use super::*;
    use crate::groundtruth::RelevanceJudgment;

    struct StaticEmbedder {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl StaticEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> Arc<Self> {
            let vectors =
                entries.iter().map(|(text, v)| (text.to_string(), v.clone())).collect();
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

    fn chunk(id: &str, doc_id: &str, section: Option<&str>, embedding: Vec<f32>) -> Chunk {
        let mut metadata = HashMap::new();
        if let Some(section) = section {
            metadata.insert("section".to_string(), section.to_string());
        }
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            token_count: 3,
            metadata,
            document_id: doc_id.to_string(),
        }
    }

    fn case(question: &str, judgment: RelevanceJudgment) -> QueryCase {
        QueryCase {
            id: "q1".to_string(),
            question: question.to_string(),
            query_type: QueryType::Extractive,
            modality: SourceModality::Text,
            category: "general".to_string(),
            judgment,
        }
    }

    /// Store three chunks so the slate ranks `[B, A/3, A/1]`.
    async fn ranked_slate_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[
                    chunk("b_0", "B", None, vec![1.0, 0.0]),
                    chunk("a_3", "A", Some("3"), vec![0.9, 0.1]),
                    chunk("a_1", "A", Some("1"), vec![0.5, 0.5]),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn exact_section_judgment_scores_the_ranked_slate() {
        let provider = StaticEmbedder::new(&[("where?", vec![1.0, 0.0])]);
        let store = ranked_slate_store().await;
        let config =
            EvalConfig::builder("docs").top_k(5).k_values(vec![1, 3, 5]).build().unwrap();
        let evaluator = RetrievalEvaluator::new(provider, store, config);

        let judgment = RelevanceJudgment {
            doc_id: "A".to_string(),
            section_id: Some("3".to_string()),
            keywords: Vec::new(),
        };
        let evaluation = evaluator.evaluate_case(&case("where?", judgment)).await.unwrap();

        let m = &evaluation.metrics;
        assert_eq!(m.get("mrr"), Some(0.5));
        assert_eq!(m.get("doc_mrr"), Some(0.5));
        assert_eq!(m.get("recall@1"), Some(0.0));
        assert_eq!(m.get("recall@5"), Some(1.0));
        assert!((m.get("precision@3").unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!((m.get("doc_precision@3").unwrap() - 2.0 / 3.0).abs() < 1e-12);
        // Empty keyword set is vacuously satisfied.
        assert_eq!(m.get("keyword_coverage"), Some(1.0));

        assert_eq!(evaluation.retrieved.len(), 3);
        assert_eq!(evaluation.retrieved[0].rank, 1);
        assert_eq!(evaluation.retrieved[0].doc_id, "B");
        assert_eq!(evaluation.retrieved[1].section_id.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn keyword_judgment_grades_ndcg_gains() {
        let provider = StaticEmbedder::new(&[("who is the ceo?", vec![1.0, 0.0])]);
        let store = Arc::new(InMemoryVectorStore::new());
        store.create_collection("docs", 2).await.unwrap();
        let mut ceo_chunk = chunk("a_0", "A", None, vec![0.9, 0.1]);
        ceo_chunk.text = "Avery Lancaster is the CEO".to_string();
        let mut other_chunk = chunk("b_0", "B", None, vec![1.0, 0.0]);
        other_chunk.text = "Lancaster is an employee".to_string();
        store.upsert("docs", &[ceo_chunk, other_chunk]).await.unwrap();

        let config = EvalConfig::builder("docs").top_k(2).k_values(vec![1]).build().unwrap();
        let evaluator = RetrievalEvaluator::new(provider, store, config);

        let judgment = RelevanceJudgment {
            doc_id: "A".to_string(),
            section_id: None,
            keywords: vec!["Avery".to_string(), "CEO".to_string()],
        };
        let evaluation =
            evaluator.evaluate_case(&case("who is the ceo?", judgment)).await.unwrap();

        let m = &evaluation.metrics;
        assert_eq!(m.get("keyword_coverage"), Some(1.0));
        // Gains are [0.0, 1.0]: the covering chunk ranks second, so nDCG is
        // strictly between 0 and 1.
        let ndcg_value = m.get("ndcg").unwrap();
        assert!(ndcg_value > 0.0 && ndcg_value < 1.0);
    }

    #[tokio::test]
    async fn evaluate_all_isolates_failures() {
        // Only the first question has an embedding registered.
        let provider = StaticEmbedder::new(&[("where?", vec![1.0, 0.0])]);
        let store = ranked_slate_store().await;
        let config = EvalConfig::builder("docs").top_k(3).k_values(vec![1]).build().unwrap();
        let evaluator = RetrievalEvaluator::new(provider, store, config);

        let judgment = RelevanceJudgment {
            doc_id: "A".to_string(),
            section_id: None,
            keywords: Vec::new(),
        };
        let mut good = case("where?", judgment.clone());
        good.id = "q_good".to_string();
        let mut bad = case("unembeddable?", judgment);
        bad.id = "q_bad".to_string();

        let outcomes = evaluator.evaluate_all(&[good, bad]).await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(&outcomes[0], CaseOutcome::Scored(e) if e.query_id == "q_good"));
        assert!(
            matches!(&outcomes[1], CaseOutcome::Failed { query_id, .. } if query_id == "q_bad")
        );
    }

    #[tokio::test]
    async fn identical_inputs_produce_byte_identical_metrics() {
        let provider = StaticEmbedder::new(&[("where?", vec![1.0, 0.0])]);
        let store = ranked_slate_store().await;
        let config =
            EvalConfig::builder("docs").top_k(3).k_values(vec![1, 3]).build().unwrap();
        let evaluator = RetrievalEvaluator::new(provider, store, config);

        let judgment = RelevanceJudgment {
            doc_id: "A".to_string(),
            section_id: Some("3".to_string()),
            keywords: Vec::new(),
        };
        let first = evaluator.evaluate_case(&case("where?", judgment.clone())).await.unwrap();
        let second = evaluator.evaluate_case(&case("where?", judgment)).await.unwrap();

        let first_json = serde_json::to_vec(&first.metrics).unwrap();
        let second_json = serde_json::to_vec(&second.metrics).unwrap();
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn config_rejects_k_above_top_k() {
        let err = EvalConfig::builder("docs").top_k(5).k_values(vec![1, 10]).build();
        assert!(matches!(err, Err(EvalError::Config(_))));
    }

    #[test]
    fn config_rejects_empty_k_values() {
        let err = EvalConfig::builder("docs").k_values(Vec::new()).build();
        assert!(matches!(err, Err(EvalError::Config(_))));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 240), "short");
    }
}
