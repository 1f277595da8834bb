//! Delivery of session events to observers.
//!
//! [`spawn_event_bridge`] pumps the session's event receiver into any
//! [`SpeechObserver`] on a Tokio task. [`HighlightObserver`] is the observer
//! that turns playback events into document highlight commands.

use std::sync::Arc;

use narrator_core::{HighlightSink, PlaybackState, SpeechEvent, SpeechObserver, Utterance};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Forward every event from `events` to `observer` until the session is
/// dropped. The task returns the observer.
pub fn spawn_event_bridge<O>(
    mut events: mpsc::UnboundedReceiver<SpeechEvent>,
    mut observer: O,
) -> JoinHandle<O>
where
    O: SpeechObserver + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            observer.on_event(&event);
        }
        tracing::debug!("Speech event bridge closed");
        observer
    })
}

/// Forward events to `observer` until a terminal event arrives, returning
/// it. `None` if the session went away first.
pub async fn forward_until_terminal<O>(
    events: &mut mpsc::UnboundedReceiver<SpeechEvent>,
    observer: &mut O,
) -> Option<SpeechEvent>
where
    O: SpeechObserver + ?Sized,
{
    while let Some(event) = events.recv().await {
        observer.on_event(&event);
        if event.is_terminal() {
            return Some(event);
        }
    }
    None
}

/// Translates session events into [`HighlightSink`] commands.
///
/// Keeps track of the utterance being highlighted so word events from any
/// other utterance are ignored.
pub struct HighlightObserver<H> {
    sink: H,
    current: Option<usize>,
}

impl<H: HighlightSink> HighlightObserver<H> {
    pub const fn new(sink: H) -> Self {
        Self {
            sink,
            current: None,
        }
    }

    pub const fn sink(&self) -> &H {
        &self.sink
    }

    pub fn into_inner(self) -> H {
        self.sink
    }

    fn clear_all(&mut self) {
        if self.current.take().is_some() {
            self.sink.clear_word_highlight();
            self.sink.clear_sentence_highlights();
        }
    }
}

impl<H: HighlightSink> SpeechObserver for HighlightObserver<H> {
    fn on_will_speak_utterance(&mut self, utterance: &Arc<Utterance>) {
        self.current = Some(utterance.index);
        self.sink.highlight_spans(&utterance.original_spans);
    }

    fn on_will_speak_word(
        &mut self,
        utterance_index: usize,
        word: &str,
        word_index: Option<usize>,
    ) {
        if self.current != Some(utterance_index) {
            return;
        }
        match word_index {
            Some(index) => self.sink.highlight_word(word, index),
            None => self.sink.clear_word_highlight(),
        }
    }

    fn on_did_finish_utterance(&mut self, utterance: &Arc<Utterance>) {
        if self.current == Some(utterance.index) {
            self.clear_all();
        }
    }

    fn on_state_changed(&mut self, state: PlaybackState) {
        if state == PlaybackState::Stopped {
            self.clear_all();
        }
    }

    fn on_finished(&mut self) {
        self.clear_all();
    }

    fn on_error(&mut self, _message: &str) {
        self.clear_all();
    }
}
