//! Speech engine error types.

use std::path::PathBuf;

use narrator_core::{PageSourceError, SettingsError};

/// Errors raised by the synthesis pipeline, audio sinks and the session.
///
/// Per-utterance failures (`SynthesisError`, `EmptyAudio`, `BufferAllocation`)
/// never escape the pipeline; they become skip events. Sink failures are the
/// only ones surfaced to observers.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// The synthesizer failed for one utterance.
    #[error("Speech synthesis failed: {0}")]
    SynthesisError(String),

    /// The synthesizer returned zero samples.
    #[error("Synthesizer returned no audio")]
    EmptyAudio,

    /// A PCM buffer could not be allocated for the returned samples.
    #[error("Could not allocate a PCM buffer of {samples} samples")]
    BufferAllocation { samples: usize },

    /// The audio output is not running or the device went away.
    #[error("Audio sink unavailable: {0}")]
    SinkUnavailable(String),

    /// The dedicated audio thread exited unexpectedly.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,

    /// TTS model not loaded.
    #[error("TTS model not loaded")]
    TtsModelNotLoaded,

    /// Model file not found at expected path.
    #[error("Voice model not found at {0}")]
    ModelNotFound(PathBuf),

    /// `speak` was called outside a Tokio runtime.
    #[error("No Tokio runtime available to run the speech session")]
    NoRuntime,

    /// Operation cancelled by `stop`.
    #[error("Speech operation cancelled")]
    Cancelled,

    /// IO error (model files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid setting passed to a runtime setter.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Paginated source error.
    #[error(transparent)]
    Page(#[from] PageSourceError),
}
