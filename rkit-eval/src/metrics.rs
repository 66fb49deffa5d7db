//! Pure ranking-quality math.
//!
//! Standard IR metrics over a single ranked slate:
//! - Reciprocal Rank: `1 / (1 + index of first relevant result)`
//! - nDCG: rank-discounted gain normalized against the ideal ordering
//! - Recall@K: whether any of the top-K results is relevant
//! - Precision@K: fraction of the top-K results that are relevant
//!
//! Every function here is a deterministic function of its arguments; no
//! state, no I/O. Positions are 0-indexed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reciprocal rank of the first relevant result: `1 / (1 + i)` for the first
/// `true` flag at 0-indexed position `i`, or 0 when nothing is relevant.
pub fn reciprocal_rank(relevance: &[bool]) -> f64 {
    match relevance.iter().position(|&r| r) {
        Some(i) => 1.0 / (1.0 + i as f64),
        None => 0.0,
    }
}

/// Discounted cumulative gain: `Σ gain_i / log2(i + 2)` for 0-indexed `i`.
pub fn dcg(gains: &[f64]) -> f64 {
    gains.iter().enumerate().map(|(i, gain)| gain / (i as f64 + 2.0).log2()).sum()
}

/// DCG of the same gains sorted descending, the best achievable ordering.
pub fn ideal_dcg(gains: &[f64]) -> f64 {
    let mut sorted = gains.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    dcg(&sorted)
}

/// Normalized DCG: `DCG / IDCG`, or 0 when the slate carries no relevant
/// signal anywhere (`IDCG == 0`).
pub fn ndcg(gains: &[f64]) -> f64 {
    let ideal = ideal_dcg(gains);
    if ideal == 0.0 {
        return 0.0;
    }
    dcg(gains) / ideal
}

/// Recall@K for a single relevant target: 1.0 if any of the top-K flags is
/// set, else 0.0.
pub fn recall_at_k(relevance: &[bool], k: usize) -> f64 {
    if relevance.iter().take(k).any(|&r| r) { 1.0 } else { 0.0 }
}

/// Precision@K: relevant results among the top K, over K. 0.0 when `k == 0`.
pub fn precision_at_k(relevance: &[bool], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = relevance.iter().take(k).filter(|&&r| r).count();
    hits as f64 / k as f64
}

/// A named set of metric values in `[0, 1]`.
///
/// Backed by a `BTreeMap` so iteration and serialization order are
/// deterministic: identical inputs serialize byte-identically.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MetricSet(BTreeMap<String, f64>);

impl MetricSet {
    /// Create an empty metric set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a metric value.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Iterate metrics in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of metrics in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Arithmetic mean of each metric key across the given sets.
    ///
    /// Every key present in any input appears in the output, averaged over
    /// the sets that define it. Returns an empty set for empty input.
    pub fn mean_of(sets: &[MetricSet]) -> MetricSet {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for set in sets {
            for (name, value) in set.iter() {
                let entry = sums.entry(name.to_string()).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        MetricSet(
            sums.into_iter().map(|(name, (sum, count))| (name, sum / count as f64)).collect(),
        )
    }
}

impl FromIterator<(String, f64)> for MetricSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
