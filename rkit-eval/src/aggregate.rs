//! Aggregation of per-query results into an evaluation run record.
//!
//! The aggregate is the arithmetic mean of each metric across the queries
//! that scored; the same mean is computed within each category, query type,
//! and source modality partition. Failed queries are reported distinctly and
//! never pulled into a mean as zeros, which would distort averages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EvalError, Result};
use crate::evaluator::{CaseOutcome, QueryEvaluation};
use crate::metrics::MetricSet;

/// A query that could not be evaluated, carried in the run record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedQuery {
    /// The failed query's identifier.
    pub query_id: String,
    /// A description of the failure.
    pub error: String,
}

/// A named, timestamped bundle of aggregate and per-query evaluation results.
///
/// Immutable once written; identified by its user-supplied name. The
/// detailed per-query results are retained deliberately — the record is for
/// inspection and debugging, not just summary numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRun {
    /// Internal record identity.
    pub id: Uuid,
    /// The user-supplied run name.
    pub name: String,
    /// When the run record was created.
    pub created_at: DateTime<Utc>,
    /// Total queries attempted, scored and failed together.
    pub total_queries: usize,
    /// Queries that failed to evaluate, excluded from every mean.
    pub failed_queries: Vec<FailedQuery>,
    /// Mean of each metric across scored queries.
    pub aggregate: MetricSet,
    /// Per-category means.
    pub by_category: BTreeMap<String, MetricSet>,
    /// Per-query-type means.
    pub by_type: BTreeMap<String, MetricSet>,
    /// Per-source-modality means.
    pub by_modality: BTreeMap<String, MetricSet>,
    /// The full per-query results: metrics plus retrieved snippets.
    pub detailed: Vec<QueryEvaluation>,
}

/// Combine per-query outcomes into an [`EvaluationRun`].
///
/// # Errors
///
/// Returns [`EvalError::EmptyRun`] when `outcomes` is empty or when every
/// query failed — there is nothing meaningful to average.
pub fn aggregate(name: impl Into<String>, outcomes: Vec<CaseOutcome>) -> Result<EvaluationRun> {
    let name = name.into();
    if outcomes.is_empty() {
        return Err(EvalError::EmptyRun(format!("run '{name}' evaluated no queries")));
    }

    let total_queries = outcomes.len();
    let mut scored: Vec<QueryEvaluation> = Vec::new();
    let mut failed_queries: Vec<FailedQuery> = Vec::new();
    for outcome in outcomes {
        match outcome {
            CaseOutcome::Scored(evaluation) => scored.push(evaluation),
            CaseOutcome::Failed { query_id, error } => {
                failed_queries.push(FailedQuery { query_id, error });
            }
        }
    }
    if scored.is_empty() {
        return Err(EvalError::EmptyRun(format!(
            "run '{name}': all {total_queries} queries failed to evaluate"
        )));
    }

    let all_metrics: Vec<MetricSet> = scored.iter().map(|e| e.metrics.clone()).collect();
    let aggregate = MetricSet::mean_of(&all_metrics);

    let by_category = partition_means(&scored, |e| e.category.clone());
    let by_type = partition_means(&scored, |e| e.query_type.as_str().to_string());
    let by_modality = partition_means(&scored, |e| e.modality.as_str().to_string());

    info!(
        run = %name,
        total_queries,
        scored_count = scored.len(),
        failed_count = failed_queries.len(),
        "aggregated evaluation run"
    );

    Ok(EvaluationRun {
        id: Uuid::new_v4(),
        name,
        created_at: Utc::now(),
        total_queries,
        failed_queries,
        aggregate,
        by_category,
        by_type,
        by_modality,
        detailed: scored,
    })
}

/// Mean metrics within each partition keyed by `key_of`.
fn partition_means(
    scored: &[QueryEvaluation],
    key_of: impl Fn(&QueryEvaluation) -> String,
) -> BTreeMap<String, MetricSet> {
    let mut partitions: BTreeMap<String, Vec<MetricSet>> = BTreeMap::new();
    for evaluation in scored {
        partitions.entry(key_of(evaluation)).or_default().push(evaluation.metrics.clone());
    }
    partitions.into_iter().map(|(key, sets)| (key, MetricSet::mean_of(&sets))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groundtruth::{QueryType, SourceModality};

    fn scored(id: &str, category: &str, query_type: QueryType, mrr: f64) -> CaseOutcome {
        let mut metrics = MetricSet::new();
        metrics.insert("mrr", mrr);
        metrics.insert("ndcg", mrr / 2.0);
        CaseOutcome::Scored(QueryEvaluation {
            query_id: id.to_string(),
            question: format!("question {id}"),
            category: category.to_string(),
            query_type,
            modality: SourceModality::Text,
            keywords: Vec::new(),
            metrics,
            retrieved: Vec::new(),
        })
    }

    #[test]
    fn aggregate_is_the_arithmetic_mean() {
        let run = aggregate(
            "test-run",
            vec![
                scored("q1", "hr", QueryType::Extractive, 1.0),
                scored("q2", "hr", QueryType::Abstractive, 0.5),
                scored("q3", "eng", QueryType::Extractive, 0.0),
            ],
        )
        .unwrap();

        assert_eq!(run.total_queries, 3);
        assert_eq!(run.aggregate.get("mrr"), Some(0.5));
        assert_eq!(run.aggregate.get("ndcg"), Some(0.25));
        assert_eq!(run.by_category.get("hr").unwrap().get("mrr"), Some(0.75));
        assert_eq!(run.by_category.get("eng").unwrap().get("mrr"), Some(0.0));
        assert_eq!(run.by_type.get("extractive").unwrap().get("mrr"), Some(0.5));
        assert_eq!(run.by_modality.get("text").unwrap().get("mrr"), Some(0.5));
        assert_eq!(run.detailed.len(), 3);
    }

    #[test]
    fn failed_queries_are_reported_not_averaged() {
        let run = aggregate(
            "test-run",
            vec![
                scored("q1", "hr", QueryType::Extractive, 1.0),
                CaseOutcome::Failed {
                    query_id: "q2".to_string(),
                    error: "index unreachable".to_string(),
                },
            ],
        )
        .unwrap();

        // The failure is counted in totals but excluded from the mean.
        assert_eq!(run.total_queries, 2);
        assert_eq!(run.failed_queries.len(), 1);
        assert_eq!(run.aggregate.get("mrr"), Some(1.0));
    }

    #[test]
    fn empty_outcomes_are_an_error() {
        let err = aggregate("empty", Vec::new());
        assert!(matches!(err, Err(EvalError::EmptyRun(_))));
    }

    #[test]
    fn all_failed_is_an_error() {
        let err = aggregate(
            "doomed",
            vec![CaseOutcome::Failed { query_id: "q1".to_string(), error: "boom".to_string() }],
        );
        assert!(matches!(err, Err(EvalError::EmptyRun(_))));
    }
}
