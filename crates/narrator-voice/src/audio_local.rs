//! Local rodio adapter for the [`AudioSink`] trait.
//!
//! Every method on [`AudioThreadHandle`] takes `&self`, so the adapter needs
//! no lock of its own.
//!
//! ```no_run
//! # use narrator_voice::SpeechError;
//! use narrator_voice::audio_local::LocalAudioSink;
//! let sink = LocalAudioSink::open(1.0)?;
//! # Ok::<(), SpeechError>(())
//! ```

use std::time::Duration;

use crate::audio_thread::AudioThreadHandle;
use crate::error::SpeechError;
use crate::sink::{AudioSink, CompletionCallback, PcmBuffer};

/// Default output device, driven through a dedicated audio thread.
pub struct LocalAudioSink {
    handle: AudioThreadHandle,
}

impl LocalAudioSink {
    /// Open the default output device.
    ///
    /// # Errors
    ///
    /// [`SpeechError::SinkUnavailable`] when no output device can be opened.
    pub fn open(volume: f32) -> Result<Self, SpeechError> {
        Ok(Self {
            handle: AudioThreadHandle::spawn(volume)?,
        })
    }
}

impl AudioSink for LocalAudioSink {
    fn schedule_buffer(
        &self,
        buffer: PcmBuffer,
        on_complete: CompletionCallback,
    ) -> Result<(), SpeechError> {
        self.handle.schedule(buffer, on_complete)
    }

    fn play(&self) -> Result<(), SpeechError> {
        self.handle.play()
    }

    fn pause(&self) -> Result<(), SpeechError> {
        self.handle.pause()
    }

    fn stop(&self) -> Result<(), SpeechError> {
        self.handle.stop()
    }

    fn reset(&self) -> Result<(), SpeechError> {
        self.handle.reset()
    }

    fn is_playing(&self) -> bool {
        self.handle.is_playing()
    }

    fn set_volume(&self, volume: f32) {
        self.handle.set_volume(volume);
    }

    fn volume(&self) -> f32 {
        self.handle.volume()
    }

    fn position(&self) -> Option<Duration> {
        self.handle.position()
    }

    fn restart(&self) -> Result<(), SpeechError> {
        self.handle.restart()
    }
}
