//! Session observer interface.

use std::sync::Arc;

use crate::events::{PlaybackState, SpeechEvent};
use crate::utterance::Utterance;

/// Callback interface for session events.
///
/// Every method defaults to a no-op so observers implement only what they
/// need. [`on_event`](Self::on_event) routes a [`SpeechEvent`] to the matching
/// method.
pub trait SpeechObserver: Send {
    fn on_state_changed(&mut self, _state: PlaybackState) {}

    fn on_will_speak_utterance(&mut self, _utterance: &Arc<Utterance>) {}

    /// `word_index` of `None` means no word is current.
    fn on_will_speak_word(
        &mut self,
        _utterance_index: usize,
        _word: &str,
        _word_index: Option<usize>,
    ) {
    }

    fn on_did_finish_utterance(&mut self, _utterance: &Arc<Utterance>) {}

    fn on_utterance_skipped(&mut self, _index: usize, _reason: &str) {}

    fn on_nothing_to_speak(&mut self) {}

    fn on_finished(&mut self) {}

    fn on_error(&mut self, _message: &str) {}

    fn on_event(&mut self, event: &SpeechEvent) {
        match event {
            SpeechEvent::StateChanged(state) => self.on_state_changed(*state),
            SpeechEvent::WillSpeakUtterance(utterance) => self.on_will_speak_utterance(utterance),
            SpeechEvent::WillSpeakWord {
                utterance_index,
                word,
                word_index,
            } => self.on_will_speak_word(*utterance_index, word, *word_index),
            SpeechEvent::DidFinishUtterance(utterance) => self.on_did_finish_utterance(utterance),
            SpeechEvent::UtteranceSkipped { index, reason } => {
                self.on_utterance_skipped(*index, reason);
            }
            SpeechEvent::NothingToSpeak => self.on_nothing_to_speak(),
            SpeechEvent::Finished => self.on_finished(),
            SpeechEvent::Error(message) => self.on_error(message),
        }
    }
}
