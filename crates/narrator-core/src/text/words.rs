//! Word-level helpers shared by the segmenter, the alignment pass and the
//! timing estimator.

/// Punctuation that ends a sentence and earns the long schedule pause.
pub const SENTENCE_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Punctuation that ends a clause and earns the short schedule pause.
pub const CLAUSE_PUNCTUATION: [char; 3] = [',', ';', ':'];

/// Closing marks that may trail pause punctuation (`ran."`, `end.)`).
const CLOSING_MARKS: [char; 6] = ['"', '\'', ')', ']', '\u{201D}', '\u{2019}'];

/// Whether `c` carries a spoken pause.
#[must_use]
pub fn is_pause_punctuation(c: char) -> bool {
    SENTENCE_PUNCTUATION.contains(&c) || CLAUSE_PUNCTUATION.contains(&c)
}

/// Whether the text ends in `.`, `!` or `?` (ignoring trailing whitespace).
#[must_use]
pub fn ends_with_sentence_punctuation(text: &str) -> bool {
    text.trim_end().ends_with(SENTENCE_PUNCTUATION)
}

/// Collapse every whitespace run (including line breaks) to a single space
/// and trim both ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(c);
            prev_space = false;
        }
    }

    result.trim().to_string()
}

/// Split speakable text into word tokens.
///
/// Whitespace separates tokens. A trailing run of pause punctuation (plus any
/// closing quotes or brackets after it) is detached into its own token so the
/// timing estimator can give it a highlight window and a pause:
///
/// ```
/// use narrator_core::text::tokenize_words;
///
/// assert_eq!(tokenize_words("The dog ran."), ["The", "dog", "ran", "."]);
/// assert_eq!(tokenize_words("Wait, what?\""), ["Wait", ",", "what", "?\""]);
/// ```
///
/// Tokens made only of punctuation (`...`, `—`) are kept whole.
#[must_use]
pub fn tokenize_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();

    for raw in text.split_whitespace() {
        let split_at = trailing_pause_start(raw);
        match split_at {
            Some(idx) if idx > 0 => {
                words.push(raw[..idx].to_string());
                words.push(raw[idx..].to_string());
            }
            _ => words.push(raw.to_string()),
        }
    }

    words
}

/// Byte offset where the trailing pause-punctuation run of `word` begins, if
/// the word has one.
fn trailing_pause_start(word: &str) -> Option<usize> {
    let mut start = word.len();
    let mut saw_pause = false;

    for (idx, c) in word.char_indices().rev() {
        if is_pause_punctuation(c) {
            saw_pause = true;
        } else if !CLOSING_MARKS.contains(&c) {
            break;
        }
        start = idx;
    }

    saw_pause.then_some(start)
}
