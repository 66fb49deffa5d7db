//! Persistence of evaluation runs.
//!
//! A [`RunStore`] keeps named [`EvaluationRun`] records for later browsing.
//! Saving under an existing name overwrites that record; the listing is how
//! downstream dashboards discover known runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::EvaluationRun;
use crate::error::{EvalError, Result};

/// A lightweight listing entry for a stored run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The run's user-supplied name.
    pub name: String,
    /// When the run record was created.
    pub created_at: DateTime<Utc>,
    /// Total queries attempted.
    pub total_queries: usize,
    /// How many queries failed to evaluate.
    pub failed_count: usize,
    /// The headline aggregate reciprocal-rank metric, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrr: Option<f64>,
}

impl RunSummary {
    fn of(run: &EvaluationRun) -> Self {
        Self {
            name: run.name.clone(),
            created_at: run.created_at,
            total_queries: run.total_queries,
            failed_count: run.failed_queries.len(),
            mrr: run.aggregate.get("mrr"),
        }
    }
}

/// Durable storage for named evaluation runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist a run. Overwrites any existing run with the same name.
    async fn save(&self, run: &EvaluationRun) -> Result<()>;

    /// Load a run by name, or `None` when no run carries that name.
    async fn load(&self, name: &str) -> Result<Option<EvaluationRun>>;

    /// List summaries of all stored runs, sorted by name.
    async fn list(&self) -> Result<Vec<RunSummary>>;
}

/// A [`RunStore`] writing one JSON file per run under a base directory.
///
/// Run names are sanitized to a filesystem-safe form (`{name}.json`), so two
/// names that sanitize identically address the same record.
///
/// # Example
///
/// ```rust,ignore
/// use rkit_eval::FileRunStore;
///
/// let store = FileRunStore::new("eval_runs");
/// store.save(&run).await?;
/// let names = store.list().await?;
/// ```
#[derive(Debug, Clone)]
pub struct FileRunStore {
    base_dir: PathBuf,
}

impl FileRunStore {
    /// Create a store rooted at `base_dir`. The directory is created on the
    /// first save.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn run_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize_name(name)))
    }

    fn io_err(context: &str, path: &Path, e: impl std::fmt::Display) -> EvalError {
        EvalError::RunStore(format!("{context} '{}': {e}", path.display()))
    }
}

/// Reduce a run name to a filesystem-safe stem.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn save(&self, run: &EvaluationRun) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| Self::io_err("failed to create run directory", &self.base_dir, e))?;

        let path = self.run_path(&run.name);
        let json = serde_json::to_vec_pretty(run)
            .map_err(|e| Self::io_err("failed to serialize run", &path, e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Self::io_err("failed to write run", &path, e))?;

        info!(run = %run.name, path = %path.display(), "saved evaluation run");
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<EvaluationRun>> {
        let path = self.run_path(name);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err("failed to read run", &path, e)),
        };
        let run = serde_json::from_slice(&raw)
            .map_err(|e| Self::io_err("failed to parse run", &path, e))?;
        Ok(Some(run))
    }

    async fn list(&self) -> Result<Vec<RunSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err("failed to list runs in", &self.base_dir, e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_err("failed to list runs in", &self.base_dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| Self::io_err("failed to read run", &path, e))?;
            let run: EvaluationRun = serde_json::from_slice(&raw)
                .map_err(|e| Self::io_err("failed to parse run", &path, e))?;
            summaries.push(RunSummary::of(&run));
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(run_count = summaries.len(), "listed evaluation runs");
        Ok(summaries)
    }
}
