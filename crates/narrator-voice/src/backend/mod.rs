//! TTS backend trait: the engine-agnostic synthesis interface.
//!
//! The [`SpeechSession`](crate::session::SpeechSession) holds an
//! `Arc<dyn TtsBackend>` so engines can be swapped without touching the
//! pipeline.
//!
//! | Feature  | Module             |
//! |----------|--------------------|
//! | `sherpa` | `sherpa_tts`       |

#[cfg(feature = "sherpa")]
pub mod sherpa_tts;

use std::time::Duration;

use crate::error::SpeechError;

/// Audio produced by TTS synthesis.
#[derive(Debug, Clone)]
pub struct TtsAudio {
    /// Mono PCM f32 samples.
    pub samples: Vec<f32>,

    pub sample_rate: u32,

    pub duration: Duration,
}

impl TtsAudio {
    /// Build audio from samples, deriving the duration.
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration = samples_duration(samples.len(), sample_rate);
        Self {
            samples,
            sample_rate,
            duration,
        }
    }
}

/// Backend-agnostic text-to-speech engine.
///
/// Implementations must be `Send + Sync`: the pipeline may run several
/// synthesis calls concurrently. Blocking engines should offload inference
/// with `tokio::task::spawn_blocking`.
#[async_trait::async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize one utterance.
    ///
    /// `speed` is a multiplier (1.0 = normal). The call is treated as atomic:
    /// the pipeline may abandon the future on stop but never interrupts the
    /// engine itself.
    async fn synthesize(
        &self,
        text: &str,
        speaker_id: i32,
        speed: f32,
    ) -> Result<TtsAudio, SpeechError>;
}

/// Length of `samples` mono frames at `sample_rate`.
#[must_use]
pub fn samples_duration(samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    #[allow(clippy::cast_precision_loss)]
    let secs = samples as f64 / f64::from(sample_rate);
    Duration::from_secs_f64(secs)
}
