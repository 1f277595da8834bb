//! Progress tracker: maps the sink's playback clock onto the word schedule of
//! the utterance now playing.
//!
//! The tracker is a plain state machine. The scheduler owns it, arms it when
//! an utterance starts, feeds it the sink position on every tick and finishes
//! it on the buffer's completion callback.
//!
//! The highlighted word only changes when playback enters another word's
//! window. Pauses between windows keep the previous word. The single "no
//! current word" event after arming is sent at the end of the audio, by
//! whichever comes first of the clock running out and the completion.

use std::sync::Arc;
use std::time::Duration;

use narrator_core::{SpeechEvent, SpeechSettings, Utterance};

struct Armed {
    utterance: Arc<Utterance>,
    last_index: Option<usize>,
}

/// Word-level progress for the current utterance.
pub struct ProgressTracker {
    end_slack: f64,
    output_latency: f64,
    armed: Option<Armed>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(settings: &SpeechSettings) -> Self {
        Self {
            end_slack: settings.tracker_end_slack.max(0.0),
            output_latency: settings.output_latency.max(0.0),
            armed: None,
        }
    }

    /// Start tracking `utterance`. Returns the initial "no current word"
    /// event.
    pub fn arm(&mut self, utterance: Arc<Utterance>) -> SpeechEvent {
        let event = SpeechEvent::clear_word(utterance.index);
        self.armed = Some(Armed {
            utterance,
            last_index: None,
        });
        event
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// The utterance's audio has ended. Returns the closing "no current
    /// word" event unless the clock already produced it.
    pub fn finish(&mut self) -> Option<SpeechEvent> {
        let armed = self.armed.take()?;
        Some(SpeechEvent::clear_word(armed.utterance.index))
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Advance with the sink's current playback position.
    ///
    /// Emits a word event only when playback enters a different word's
    /// window. An unknown position (an empty or restarting device) is
    /// skipped; running past the end of the audio disarms with a final
    /// "no current word" event.
    pub fn tick(&mut self, position: Option<Duration>) -> Option<SpeechEvent> {
        let armed = self.armed.as_mut()?;
        let position = position?;

        let elapsed = position.as_secs_f64() - self.output_latency;
        let utterance = &armed.utterance;

        if elapsed >= utterance.duration + self.end_slack {
            return self.finish();
        }

        let current = utterance.word_at(elapsed)?;
        if armed.last_index == Some(current) {
            return None;
        }
        armed.last_index = Some(current);

        Some(SpeechEvent::WillSpeakWord {
            utterance_index: utterance.index,
            word: utterance.words[current].clone(),
            word_index: Some(current),
        })
    }
}
