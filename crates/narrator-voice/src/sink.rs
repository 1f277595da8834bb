//! `AudioSink` abstraction and the PCM buffers handed to it.
//!
//! The trait decouples the playback scheduler from any audio backend:
//!
//! | Implementor | Where used |
//! |---|---|
//! | `LocalAudioSink` (feature `rodio`) | CLI: rodio output on a dedicated audio thread |
//! | test sinks | integration tests drive completions and the playback clock by hand |
//!
//! All methods take `&self`; implementations use interior mutability.

use std::sync::Arc;
use std::time::Duration;

use crate::error::SpeechError;

/// Callback invoked once a scheduled buffer has finished playing.
///
/// Never invoked for buffers discarded by `stop` or `reset`.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Interleaved f32 PCM ready for output.
///
/// Samples are shared so a buffer can be re-submitted after a sink restart
/// without copying.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    samples: Arc<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Copy mono synthesis output into a buffer with `channels` channels.
    ///
    /// The allocation is fallible: an oversized result is reported as
    /// [`SpeechError::BufferAllocation`] instead of aborting the process.
    pub fn from_mono(mono: &[f32], sample_rate: u32, channels: u16) -> Result<Self, SpeechError> {
        let channels = channels.max(1);
        let total = mono
            .len()
            .checked_mul(usize::from(channels))
            .ok_or(SpeechError::BufferAllocation {
                samples: usize::MAX,
            })?;

        let mut samples = Vec::new();
        samples
            .try_reserve_exact(total)
            .map_err(|_| SpeechError::BufferAllocation { samples: total })?;

        if channels == 1 {
            samples.extend_from_slice(mono);
        } else {
            for &sample in mono {
                samples.extend(std::iter::repeat_n(sample, usize::from(channels)));
            }
        }

        Ok(Self {
            samples: Arc::new(samples),
            channels,
            sample_rate,
        })
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        crate::backend::samples_duration(self.frames(), self.sample_rate)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Abstraction over an audio output (speech playback).
///
/// Buffers play in the order they were scheduled. A sink starts paused until
/// [`play`](Self::play) is called; `pause` keeps scheduled audio in place.
pub trait AudioSink: Send + Sync {
    /// Queue `buffer` after anything already scheduled. `on_complete` fires
    /// when it has fully played.
    fn schedule_buffer(
        &self,
        buffer: PcmBuffer,
        on_complete: CompletionCallback,
    ) -> Result<(), SpeechError>;

    fn play(&self) -> Result<(), SpeechError>;

    /// Pause in place. [`play`](Self::play) resumes from the same position.
    fn pause(&self) -> Result<(), SpeechError>;

    /// Halt output immediately.
    fn stop(&self) -> Result<(), SpeechError>;

    /// Drop every scheduled buffer without firing its completion.
    fn reset(&self) -> Result<(), SpeechError>;

    fn is_playing(&self) -> bool;

    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    /// Playback time elapsed within the buffer now playing.
    ///
    /// `None` when the sink cannot report a position.
    fn position(&self) -> Option<Duration>;

    /// Re-open the output after a failure. Scheduled audio is lost.
    fn restart(&self) -> Result<(), SpeechError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_copied_to_every_channel() {
        let buffer = PcmBuffer::from_mono(&[0.1, 0.2], 22_050, 2).unwrap();
        assert_eq!(buffer.samples(), &[0.1, 0.1, 0.2, 0.2]);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channels(), 2);
    }

    #[test]
    fn zero_channels_means_mono() {
        let buffer = PcmBuffer::from_mono(&[0.5; 4], 8_000, 0).unwrap();
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.samples().len(), 4);
    }

    #[test]
    fn duration_counts_frames() {
        let buffer = PcmBuffer::from_mono(&vec![0.0; 11_025], 22_050, 2).unwrap();
        assert_eq!(buffer.duration(), Duration::from_millis(500));
    }
}
