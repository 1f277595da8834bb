//! Text processing: segmentation, tokenization and source alignment.

pub mod alignment;
pub mod segmenter;
mod words;

pub use alignment::{SpanAligner, find_original_spans, levenshtein, match_threshold, similarity};
pub use segmenter::{
    MAX_CHUNK_CHARS, is_title_line, normalize_whitespace, repair_hyphenation, segment,
    segment_with_page, split_sentences, split_units,
};
pub use words::{
    CLAUSE_PUNCTUATION, SENTENCE_PUNCTUATION, collapse_whitespace, ends_with_sentence_punctuation,
    is_pause_punctuation, tokenize_words,
};
