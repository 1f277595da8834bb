//! Splits raw document text into ordered, speakable utterances.
//!
//! Lines are classified as titles or body text. Body lines accumulate into a
//! paragraph that is sentence-split when a title interrupts it or the input
//! ends; titles become standalone utterances. Words broken across lines with a
//! hyphen are rejoined first, and overly long sentences are chunked so the
//! synthesizer never receives more than [`MAX_CHUNK_CHARS`] at once.

use std::sync::LazyLock;

use regex::Regex;

use super::alignment::SpanAligner;
use super::words::{collapse_whitespace, ends_with_sentence_punctuation};
use crate::utterance::Utterance;

/// Maximum character length of a single utterance's speakable text.
pub const MAX_CHUNK_CHARS: usize = 400;

/// Maximum word count for a line to be considered a capitalized title.
const MAX_TITLE_WORDS: usize = 7;

/// Leading keywords that mark a structural heading regardless of case.
const TITLE_KEYWORDS: [&str; 2] = ["chapter", "book"];

/// Small words ignored when checking title capitalization.
const TITLE_STOPWORDS: [&str; 10] = ["a", "an", "the", "in", "on", "at", "to", "for", "of", "and"];

static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\s*\n\s*").expect("hyphen break pattern is valid"));

/// Segment `text` into utterances with no page reference.
#[must_use]
pub fn segment(text: &str) -> Vec<Utterance> {
    segment_with_page(text, None)
}

/// Segment `text` into utterances tagged with `page_reference`.
///
/// Utterance indices are dense and follow reading order. Each utterance's
/// `original_spans` is aligned against `text` as given.
#[must_use]
pub fn segment_with_page(text: &str, page_reference: Option<usize>) -> Vec<Utterance> {
    let units = split_units(text);
    let mut aligner = SpanAligner::new(text);

    let utterances: Vec<Utterance> = units
        .into_iter()
        .filter_map(|(speakable, is_title)| {
            let spans = aligner.align(&speakable);
            Utterance::new(0, speakable, spans, is_title)
        })
        .enumerate()
        .map(|(index, mut utterance)| {
            utterance.index = index;
            utterance.with_page_reference(page_reference)
        })
        .collect();

    tracing::debug!(
        utterances = utterances.len(),
        titles = utterances.iter().filter(|u| u.is_title).count(),
        "segmented text"
    );

    utterances
}

/// Speakable texts in reading order, each flagged as title or body.
///
/// This is the segmentation without alignment, useful when only the text
/// sent to synthesis matters.
#[must_use]
pub fn split_units(text: &str) -> Vec<(String, bool)> {
    let repaired = repair_hyphenation(text);
    let mut units = Vec::new();
    let mut paragraph = String::new();

    for line in repaired.lines() {
        let line = collapse_whitespace(line);
        if line.is_empty() {
            continue;
        }

        if is_title_line(&line) {
            flush_paragraph(&mut paragraph, &mut units);
            units.push((line, true));
        } else {
            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(&line);
        }
    }

    flush_paragraph(&mut paragraph, &mut units);
    units
}

/// Normalize whitespace inside each line and drop blank lines.
///
/// Segmentation depends on line structure, so line breaks survive; runs of
/// spaces, tabs and empty lines do not change the result.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold words split across lines with a trailing hyphen back together.
///
/// `"extra-\n  ordinary"` becomes `"extraordinary"`.
#[must_use]
pub fn repair_hyphenation(text: &str) -> String {
    HYPHEN_BREAK.replace_all(text, "").into_owned()
}

/// Heuristic title detection for a single whitespace-collapsed line.
///
/// A line is a title when it does not end in `.`, `!` or `?` and either starts
/// with a structural keyword (`Chapter`, `Book`) or is at most seven words
/// whose significant words all start with an uppercase letter.
#[must_use]
pub fn is_title_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || ends_with_sentence_punctuation(line) {
        return false;
    }

    let words: Vec<&str> = line.split_whitespace().collect();

    let starts_with_keyword = words.first().is_some_and(|first| {
        let first = first.to_lowercase();
        let first = first.trim_end_matches(|c: char| !c.is_alphanumeric());
        TITLE_KEYWORDS.contains(&first)
    });
    if starts_with_keyword {
        return true;
    }

    if words.len() > MAX_TITLE_WORDS {
        return false;
    }

    let mut significant = 0;
    for word in &words {
        if TITLE_STOPWORDS.contains(&word.to_lowercase().as_str()) {
            continue;
        }
        significant += 1;
        let leading_letter = word.chars().find(|c| c.is_alphabetic());
        if leading_letter.is_some_and(char::is_lowercase) {
            return false;
        }
    }

    significant > 0
}

/// Split a paragraph at `.`, `!` or `?` followed by whitespace.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if at_boundary {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

// ── Internal helpers ───────────────────────────────────────────────

fn flush_paragraph(paragraph: &mut String, units: &mut Vec<(String, bool)>) {
    if paragraph.is_empty() {
        return;
    }

    for sentence in split_sentences(paragraph) {
        if sentence.len() > MAX_CHUNK_CHARS {
            units.extend(split_long_sentence(&sentence).into_iter().map(|c| (c, false)));
        } else {
            units.push((sentence, false));
        }
    }

    paragraph.clear();
}

/// Split an overly long sentence at clause boundaries (, ; : — –).
fn split_long_sentence(sentence: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for part in sentence.split_inclusive(&[',', ';', ':', '—', '–'][..]) {
        if !current.is_empty() && current.len() + part.len() > MAX_CHUNK_CHARS {
            push_trimmed(&mut chunks, &std::mem::take(&mut current));
        }
        current.push_str(part);
    }
    push_trimmed(&mut chunks, &current);

    chunks
        .into_iter()
        .flat_map(|chunk| {
            if chunk.len() > MAX_CHUNK_CHARS {
                hard_split(&chunk)
            } else {
                vec![chunk]
            }
        })
        .collect()
}

/// Last-resort split at word boundaries.
fn hard_split(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > MAX_CHUNK_CHARS {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
