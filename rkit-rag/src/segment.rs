//! Sentence segmentation.
//!
//! Splits raw text into an ordered sequence of [`Sentence`]s. Terminators
//! stay attached to their sentence; empty and whitespace-only spans are
//! discarded.

use crate::document::Sentence;

/// Boundaries that end a sentence. Checked in order; newlines also break.
const TERMINATORS: [&str; 3] = [". ", "! ", "? "];

/// Split text into sentences, preserving order and assigning positions.
///
/// Returns an empty `Vec` for empty or whitespace-only input.
///
/// # Example
///
/// ```rust,ignore
/// use rkit_rag::segment::segment_sentences;
///
/// let sentences = segment_sentences("One. Two! Three?");
/// assert_eq!(sentences.len(), 3);
/// assert_eq!(sentences[1].text, "Two!");
/// assert_eq!(sentences[1].position, 1);
/// ```
pub fn segment_sentences(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    for line in text.lines() {
        for span in split_at_terminators(line) {
            let trimmed = span.trim();
            if trimmed.is_empty() {
                continue;
            }
            sentences.push(Sentence { text: trimmed.to_string(), position: sentences.len() });
        }
    }
    sentences
}

/// Split a line at sentence terminators, keeping each terminator attached
/// to the preceding span.
fn split_at_terminators(line: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;

    while start < line.len() {
        let rest = &line[start..];
        let next = TERMINATORS
            .iter()
            .filter_map(|sep| rest.find(sep).map(|pos| pos + sep.len()))
            .min();
        match next {
            Some(end) => {
                result.push(&line[start..start + end]);
                start += end;
            }
            None => {
                result.push(rest);
                break;
            }
        }
    }

    result
}
