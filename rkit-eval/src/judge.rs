//! Relevance judging.
//!
//! Decides whether a retrieved result satisfies a ground-truth judgment,
//! either by identity (document, optionally section) or by graded keyword
//! coverage over the retrieved text.

use rkit_rag::SearchResult;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::groundtruth::RelevanceJudgment;

/// How strictly result identity is compared against a judgment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Document id must match AND, when the judgment names a section, the
    /// section id must match too.
    Exact,
    /// Document id alone must match; sections are ignored. The lenient
    /// variant used for `doc_`-prefixed metrics.
    Document,
}

/// The identity fields extracted from a retrieved result's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultIdentity {
    /// The retrieved chunk's id.
    pub chunk_id: String,
    /// The source document id.
    pub doc_id: String,
    /// The source section id, when the payload carries one.
    pub section_id: Option<String>,
}

impl ResultIdentity {
    /// Extract identity from a search result payload.
    ///
    /// The section id, when present, lives in the chunk's `section` metadata
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MalformedPayload`] when the payload carries no
    /// document id.
    pub fn from_result(result: &SearchResult) -> Result<Self> {
        let doc_id = result.chunk.document_id.clone();
        if doc_id.is_empty() {
            return Err(EvalError::MalformedPayload {
                chunk_id: result.chunk.id.clone(),
                field: "document_id".to_string(),
            });
        }
        Ok(Self {
            chunk_id: result.chunk.id.clone(),
            doc_id,
            section_id: result.chunk.metadata.get("section").cloned(),
        })
    }
}

/// Judges retrieved results against ground-truth judgments.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceJudge;

impl RelevanceJudge {
    /// Decide whether a result satisfies the judgment under the given mode.
    pub fn is_relevant(
        &self,
        identity: &ResultIdentity,
        judgment: &RelevanceJudgment,
        mode: MatchMode,
    ) -> bool {
        if identity.doc_id != judgment.doc_id {
            return false;
        }
        match mode {
            MatchMode::Document => true,
            MatchMode::Exact => match &judgment.section_id {
                Some(section) => identity.section_id.as_ref() == Some(section),
                None => true,
            },
        }
    }

    /// Graded keyword coverage over the concatenation of retrieved texts.
    ///
    /// A keyword counts when it appears, case-insensitively, as a substring
    /// anywhere in any retrieved text. The score is matched keywords over
    /// total keywords. An empty keyword set is vacuously satisfied and
    /// scores 1.0; the denominator is never zero.
    pub fn keyword_coverage<'a, I>(&self, texts: I, keywords: &[String]) -> f64
    where
        I: IntoIterator<Item = &'a str>,
    {
        if keywords.is_empty() {
            return 1.0;
        }
        let haystack: String = texts
            .into_iter()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        let matched = keywords
            .iter()
            .filter(|keyword| haystack.contains(&keyword.to_lowercase()))
            .count();
        matched as f64 / keywords.len() as f64
    }
}
