//! Events emitted by a speech session.
//!
//! Events are produced on the session's runtime tasks and delivered through an
//! unbounded channel in playback order. Receivers that drive UI state must hop
//! to their own UI context before touching widgets.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::utterance::Utterance;

/// Playback scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing scheduled.
    #[default]
    Idle,

    /// A buffer is playing (or about to).
    Playing,

    /// Output paused in place; resumable.
    Paused,

    /// Stop requested; transient before returning to `Idle`.
    Stopped,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Something that happened during a speech session.
#[derive(Debug, Clone)]
pub enum SpeechEvent {
    /// Scheduler state transition.
    StateChanged(PlaybackState),

    /// The utterance's audio is about to start.
    WillSpeakUtterance(Arc<Utterance>),

    /// The highlighted word changed.
    ///
    /// `word_index` is `None` (with an empty `word`) when no word is current,
    /// at the start of an utterance and once its audio has run out.
    WillSpeakWord {
        utterance_index: usize,
        word: String,
        word_index: Option<usize>,
    },

    /// The utterance's audio finished playing.
    DidFinishUtterance(Arc<Utterance>),

    /// Synthesis failed or returned no audio; playback moved on.
    UtteranceSkipped { index: usize, reason: String },

    /// `speak` was given text with no speakable content.
    NothingToSpeak,

    /// Every utterance of the session has been played or skipped.
    Finished,

    /// The audio sink failed and could not be restarted. The session is idle.
    Error(String),
}

impl SpeechEvent {
    /// The "no current word" event for an utterance.
    #[must_use]
    pub const fn clear_word(utterance_index: usize) -> Self {
        Self::WillSpeakWord {
            utterance_index,
            word: String::new(),
            word_index: None,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error(_) | Self::NothingToSpeak)
    }
}
