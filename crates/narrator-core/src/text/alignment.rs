//! Best-effort mapping from normalized speakable text back to the verbatim
//! source lines it came from.
//!
//! The source is cut into line-level fragments (sentence boundaries within a
//! line, plus line ends). Runs of consecutive fragments are joined the same
//! way the segmenter joins lines, including hyphen repair, and scored against
//! the speakable text with a normalized Levenshtein similarity. The best run
//! wins if it clears a length-adaptive threshold; otherwise the speakable
//! text stands in for itself.

use std::ops::Range;

use super::words::{collapse_whitespace, ends_with_sentence_punctuation};

/// Minimum similarity for any match.
const BASE_THRESHOLD: f64 = 0.6;

/// Upper bound for the length-adaptive threshold.
const MAX_THRESHOLD: f64 = 0.95;

/// Maximum number of source fragments a single match may span.
const MAX_RUN: usize = 12;

/// How many fragments past the cursor a [`SpanAligner`] may start a run.
const SEARCH_WINDOW: usize = 2 * MAX_RUN;

/// Edit distance between two strings, counted in chars.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `1 - distance / max_len`, in `0.0..=1.0`. Two empty strings are identical.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = levenshtein(a, b) as f64 / max_len as f64;
    1.0 - ratio
}

/// Score a candidate must exceed to count as a match for `processed`.
///
/// `max(0.6, len / 100)`, capped so long sentences can still match.
#[must_use]
pub fn match_threshold(processed: &str) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let adaptive = processed.chars().count() as f64 / 100.0;
    adaptive.clamp(BASE_THRESHOLD, MAX_THRESHOLD)
}

/// Find the verbatim source fragments that `processed` was produced from.
///
/// Returns the trimmed source lines of the best-scoring fragment run, or
/// `[processed]` when nothing clears [`match_threshold`]. Pure and
/// deterministic; ties go to the earliest run.
///
/// Every fragment of the source is a candidate start. Aligning a whole
/// document one utterance at a time should go through [`SpanAligner`].
#[must_use]
pub fn find_original_spans(processed: &str, full_original: &str) -> Vec<String> {
    let processed = processed.trim();
    if processed.is_empty() {
        return vec![String::new()];
    }

    let fragments = source_fragments(full_original);
    match best_run(&fragments, processed, 0..fragments.len()) {
        Some((start, end)) => trimmed_spans(&fragments[start..=end]),
        None => unmatched(processed),
    }
}

/// Aligns utterances against one source in reading order.
///
/// Keeps a cursor on the first source fragment not yet fully consumed and
/// only tries runs starting within [`SEARCH_WINDOW`] fragments of it, so a
/// document costs time proportional to its length. A miss leaves the cursor
/// where it was.
#[derive(Debug, Clone)]
pub struct SpanAligner {
    fragments: Vec<String>,
    cursor: usize,
}

impl SpanAligner {
    #[must_use]
    pub fn new(full_original: &str) -> Self {
        Self {
            fragments: source_fragments(full_original),
            cursor: 0,
        }
    }

    /// Like [`find_original_spans`], restricted to runs starting near the
    /// cursor. Advances past the matched run.
    pub fn align(&mut self, processed: &str) -> Vec<String> {
        let processed = processed.trim();
        if processed.is_empty() {
            return vec![String::new()];
        }

        let window_end = (self.cursor + SEARCH_WINDOW).min(self.fragments.len());
        let Some((start, end)) = best_run(&self.fragments, processed, self.cursor..window_end)
        else {
            return unmatched(processed);
        };

        // A chunk of a long sentence may stop inside the last line; the
        // next chunk then starts on that same line.
        self.cursor = if consumes(processed, &self.fragments[end]) {
            end + 1
        } else {
            end
        };
        trimmed_spans(&self.fragments[start..=end])
    }
}

/// Best `(start, end)` fragment run, with `start` drawn from `starts`.
fn best_run(fragments: &[String], processed: &str, starts: Range<usize>) -> Option<(usize, usize)> {
    let target_len = processed.chars().count();
    let threshold = match_threshold(processed);

    let mut best: Option<(f64, usize, usize)> = None;

    for start in starts {
        let mut joined = String::new();

        for end in start..fragments.len().min(start + MAX_RUN) {
            append_fragment(&mut joined, &fragments[end]);
            let candidate = collapse_whitespace(&joined);
            let candidate_len = candidate.chars().count();

            // Similarity can never exceed min/max of the two lengths.
            #[allow(clippy::cast_precision_loss)]
            let ceiling = candidate_len.min(target_len) as f64
                / candidate_len.max(target_len).max(1) as f64;

            if ceiling > threshold && best.is_none_or(|(score, _, _)| ceiling > score) {
                let score = similarity(&candidate, processed);
                if score > threshold && best.is_none_or(|(best_score, _, _)| score > best_score) {
                    best = Some((score, start, end));
                }
            }

            if candidate_len > target_len && ceiling <= threshold {
                break;
            }
            if ends_with_sentence_punctuation(&fragments[end]) {
                break;
            }
        }

        if best.is_some_and(|(score, _, _)| score >= 1.0) {
            break;
        }
    }

    best.map(|(_, start, end)| (start, end))
}

fn trimmed_spans(fragments: &[String]) -> Vec<String> {
    fragments
        .iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

fn unmatched(processed: &str) -> Vec<String> {
    tracing::trace!(text = processed, "no confident source match");
    vec![processed.to_string()]
}

/// Whether `processed` runs to the end of `fragment`: both end on the same
/// word.
fn consumes(processed: &str, fragment: &str) -> bool {
    let fragment_tail = last_word(fragment);
    fragment_tail.is_empty() || fragment_tail == last_word(processed)
}

fn last_word(text: &str) -> String {
    text.split_whitespace()
        .rev()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .find(|word| !word.is_empty())
        .unwrap_or_default()
}

/// Cut the source into fragments: each line is split after `.`, `!` or `?`
/// followed by whitespace. Fragments keep their original characters.
fn source_fragments(original: &str) -> Vec<String> {
    let mut fragments = Vec::new();

    for line in original.lines() {
        let mut current = String::new();
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            let at_boundary = matches!(c, '.' | '!' | '?')
                && chars.peek().is_some_and(|next| next.is_whitespace());
            if at_boundary {
                if current.trim().is_empty() {
                    current.clear();
                } else {
                    fragments.push(std::mem::take(&mut current));
                }
            }
        }

        if !current.trim().is_empty() {
            fragments.push(current);
        }
    }

    fragments
}

/// Join `fragment` onto `joined`, folding a trailing hyphen into the next
/// word instead of inserting a space.
fn append_fragment(joined: &mut String, fragment: &str) {
    let trimmed_end = joined.trim_end().len();
    joined.truncate(trimmed_end);

    if let Some(stripped) = joined.strip_suffix('-') {
        let keep = stripped.len();
        joined.truncate(keep);
        joined.push_str(fragment.trim_start());
    } else {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(fragment.trim());
    }
}
