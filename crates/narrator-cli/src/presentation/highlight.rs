//! Renders highlight commands as a running transcript.
//!
//! Each utterance opens with its source lines; words are then written one by
//! one as playback reaches them.

use std::io::Write;

use narrator_core::HighlightSink;

/// [`HighlightSink`] that writes to a terminal or any other writer.
#[derive(Debug)]
pub struct TerminalHighlighter<W> {
    out: W,
    words_on_line: usize,
}

impl TerminalHighlighter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalHighlighter<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            words_on_line: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn end_line(&mut self) {
        if self.words_on_line > 0 {
            self.write(format_args!("\n"));
            self.words_on_line = 0;
        }
    }

    fn write(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "highlight output failed");
        }
    }
}

impl<W: Write + Send> HighlightSink for TerminalHighlighter<W> {
    fn highlight_spans(&mut self, original_spans: &[String]) {
        self.end_line();
        self.write(format_args!("» {}\n  ", original_spans.join(" / ")));
    }

    fn highlight_word(&mut self, word: &str, _index: usize) {
        let sep = if self.words_on_line == 0 { "" } else { " " };
        self.write(format_args!("{sep}{word}"));
        self.words_on_line += 1;
    }

    fn clear_word_highlight(&mut self) {}

    fn clear_sentence_highlights(&mut self) {
        self.end_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(highlighter: TerminalHighlighter<Vec<u8>>) -> String {
        String::from_utf8(highlighter.into_inner()).unwrap()
    }

    #[test]
    fn test_transcript_layout() {
        let mut h = TerminalHighlighter::new(Vec::new());
        h.highlight_spans(&["The dog".to_string(), "ran.".to_string()]);
        h.highlight_word("The", 0);
        h.clear_word_highlight();
        h.highlight_word("dog", 1);
        h.clear_sentence_highlights();
        h.clear_sentence_highlights();

        assert_eq!(rendered(h), "» The dog / ran.\n  The dog\n");
    }

    #[test]
    fn test_new_utterance_closes_open_line() {
        let mut h = TerminalHighlighter::new(Vec::new());
        h.highlight_spans(&["One.".to_string()]);
        h.highlight_word("One", 0);
        h.highlight_spans(&["Two.".to_string()]);

        assert_eq!(rendered(h), "» One.\n  One\n» Two.\n  ");
    }
}
