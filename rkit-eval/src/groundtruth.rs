//! Ground-truth query cases and relevance judgments (qrels).
//!
//! A [`QueryCase`] joins a question with its [`RelevanceJudgment`]: the
//! document (and optionally section) that should be retrieved, and/or the
//! keywords the retrieved text must cover. Cases are loaded once before an
//! evaluation run starts and are read-only throughout.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EvalError, Result};

/// How the reference answer relates to the source text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// The answer paraphrases or synthesizes the source.
    Abstractive,
    /// The answer is quoted directly from the source.
    Extractive,
}

impl QueryType {
    /// The wire/partition label for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abstractive => "abstractive",
            Self::Extractive => "extractive",
        }
    }
}

/// The modality of the source material the question draws on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum SourceModality {
    /// Plain prose.
    Text,
    /// Prose with images.
    TextImage,
    /// Prose with tables.
    TextTable,
    /// Prose with tables and images.
    TextTableImage,
}

impl SourceModality {
    /// The wire/partition label for this modality.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TextImage => "text-image",
            Self::TextTable => "text-table",
            Self::TextTableImage => "text-table-image",
        }
    }
}

/// The ground-truth target for a query. Exactly one judgment per query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelevanceJudgment {
    /// The document that should be retrieved.
    pub doc_id: String,
    /// The section within the document, when the judgment is that precise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    /// Keywords the retrieved text must cover, for graded scoring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// A question paired with its classification and ground-truth judgment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryCase {
    /// Unique query identifier.
    pub id: String,
    /// The question text.
    pub question: String,
    /// Abstractive or extractive.
    pub query_type: QueryType,
    /// The source modality the question draws on.
    pub modality: SourceModality,
    /// Free-form category label used for partitioned aggregation.
    pub category: String,
    /// The ground-truth judgment for this query.
    pub judgment: RelevanceJudgment,
}

/// The question half of the ground-truth wire format.
#[derive(Debug, Deserialize)]
struct QuestionRecord {
    question: String,
    #[serde(rename = "type")]
    query_type: QueryType,
    modality: SourceModality,
    category: String,
}

/// Load query cases by joining a questions file with a targets file.
///
/// Both files map query identifier to a record; the questions file carries
/// `{question, type, modality, category}` and the targets file carries
/// `{doc_id, section_id?, keywords?}`. Cases are returned sorted by query
/// identifier so a run's order is reproducible.
///
/// # Errors
///
/// Returns [`EvalError::Judgment`] if either file cannot be read or parsed,
/// or if a question has no matching target.
pub fn load_query_cases(
    questions_path: impl AsRef<Path>,
    targets_path: impl AsRef<Path>,
) -> Result<Vec<QueryCase>> {
    let questions: BTreeMap<String, QuestionRecord> = read_json(questions_path.as_ref())?;
    let mut targets: BTreeMap<String, RelevanceJudgment> = read_json(targets_path.as_ref())?;

    let mut cases = Vec::with_capacity(questions.len());
    for (id, record) in questions {
        let judgment = targets.remove(&id).ok_or_else(|| {
            EvalError::Judgment(format!("query '{id}' has no relevance target"))
        })?;
        cases.push(QueryCase {
            id,
            question: record.question,
            query_type: record.query_type,
            modality: record.modality,
            category: record.category,
            judgment,
        });
    }

    info!(case_count = cases.len(), "loaded ground-truth query cases");
    Ok(cases)
}

/// Load the optional map from query identifier to free-text reference answer.
///
/// # Errors
///
/// Returns [`EvalError::Judgment`] if the file cannot be read or parsed.
pub fn load_reference_answers(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    read_json(path.as_ref())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        EvalError::Judgment(format!("failed to read '{}': {e}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        EvalError::Judgment(format!("failed to parse '{}': {e}", path.display()))
    })
}
