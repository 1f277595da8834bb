//! Document highlight sink.

/// Receives highlight commands for the document being read aloud.
///
/// Calls arrive in playback order. Implementations keep their own highlight
/// state; nothing here is shared between sessions.
pub trait HighlightSink: Send {
    /// Mark the source fragments of the utterance now speaking.
    fn highlight_spans(&mut self, original_spans: &[String]);

    /// Mark the word now speaking within the current utterance.
    fn highlight_word(&mut self, word: &str, index: usize);

    fn clear_word_highlight(&mut self);

    /// Remove sentence highlights once an utterance has finished.
    fn clear_sentence_highlights(&mut self);
}

/// Discards every highlight command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHighlightSink;

impl HighlightSink for NoopHighlightSink {
    fn highlight_spans(&mut self, _original_spans: &[String]) {}

    fn highlight_word(&mut self, _word: &str, _index: usize) {}

    fn clear_word_highlight(&mut self) {}

    fn clear_sentence_highlights(&mut self) {}
}
