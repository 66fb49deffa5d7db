//! Retrieval-quality evaluation framework for RetrievalKit.
//!
//! `rkit-eval` scores a retrieval pipeline against ground-truth relevance
//! judgments:
//!
//! - [`groundtruth`] loads query cases and their judgments (qrels)
//! - [`judge`] decides relevance per result, by identity or keyword coverage
//! - [`metrics`] is the pure ranking math (reciprocal rank, nDCG,
//!   recall/precision at K)
//! - [`evaluator`] runs queries against a vector store and scores each slate
//! - [`aggregate`] folds per-query results into an [`aggregate::EvaluationRun`]
//! - [`runstore`] persists named runs for later browsing
//!
//! The embedding provider and vector store are injected through the
//! `rkit-rag` trait seams; nothing here holds ambient client state.

pub mod aggregate;
pub mod error;
pub mod evaluator;
pub mod groundtruth;
pub mod judge;
pub mod metrics;
pub mod runstore;

pub use aggregate::{EvaluationRun, FailedQuery, aggregate};
pub use error::{EvalError, Result};
pub use evaluator::{
    CaseOutcome, EvalConfig, EvalConfigBuilder, QueryEvaluation, RetrievalEvaluator,
    RetrievedSnippet,
};
pub use groundtruth::{
    QueryCase, QueryType, RelevanceJudgment, SourceModality, load_query_cases,
    load_reference_answers,
};
pub use judge::{MatchMode, RelevanceJudge, ResultIdentity};
pub use metrics::MetricSet;
pub use runstore::{FileRunStore, RunStore, RunSummary};
