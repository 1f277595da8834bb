//! Speech output via `rodio`.
//!
//! [`RodioOutput`] owns the output stream and a single queue sink. Buffers
//! are appended in order, each followed by a zero-length marker source that
//! fires the buffer's completion callback once the mixer reaches it.
//! Dropping the sink drops any unreached markers, so `stop` and `reset`
//! never fire completions.

use std::sync::Mutex;
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::source::EmptyCallback;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::error::SpeechError;
use crate::sink::{CompletionCallback, PcmBuffer};

/// Rodio output stream plus the queue sink buffers are scheduled on.
///
/// `OutputStream` is `!Send` on some platforms, so this type lives on the
/// dedicated audio thread.
pub struct RodioOutput {
    /// Must stay alive for the sink to produce sound.
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Sink,
    volume: f32,
}

impl RodioOutput {
    /// Open the default output device with a paused, empty sink.
    pub fn open(volume: f32) -> Result<Self, SpeechError> {
        let (stream, stream_handle) = open_stream()?;
        let sink = new_sink(&stream_handle, volume)?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink,
            volume,
        })
    }

    /// Append `buffer` and its completion marker to the queue.
    pub fn schedule(&self, buffer: &PcmBuffer, on_complete: CompletionCallback) {
        let source = SamplesBuffer::new(
            buffer.channels(),
            buffer.sample_rate(),
            buffer.samples().to_vec(),
        );
        self.sink.append(source);

        let once = Mutex::new(Some(on_complete));
        let marker = EmptyCallback::<f32>::new(Box::new(move || {
            let callback = once
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take();
            if let Some(callback) = callback {
                callback();
            }
        }));
        self.sink.append(marker);

        tracing::trace!(
            frames = buffer.frames(),
            sample_rate = buffer.sample_rate(),
            queued = self.sink.len(),
            "Buffer scheduled"
        );
    }

    pub fn play(&self) {
        self.sink.play();
    }

    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Halt output and discard the queue. The replacement sink is paused.
    pub fn stop(&mut self) -> Result<(), SpeechError> {
        self.sink.stop();
        self.sink = new_sink(&self.stream_handle, self.volume)?;
        tracing::debug!("Audio playback stopped");
        Ok(())
    }

    /// Discard the queue, keeping the paused state.
    pub fn reset(&mut self) -> Result<(), SpeechError> {
        let paused = self.sink.is_paused();
        self.sink.stop();
        self.sink = new_sink(&self.stream_handle, self.volume)?;
        if !paused {
            self.sink.play();
        }
        Ok(())
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    #[must_use]
    pub const fn volume(&self) -> f32 {
        self.volume
    }

    /// Elapsed time within the source now playing.
    #[must_use]
    pub fn position(&self) -> Option<Duration> {
        if self.sink.empty() {
            return None;
        }
        Some(self.sink.get_pos())
    }

    /// Re-open the default output device. Queued audio is lost.
    pub fn restart(&mut self) -> Result<(), SpeechError> {
        self.sink.stop();
        let (stream, stream_handle) = open_stream()?;
        self.sink = new_sink(&stream_handle, self.volume)?;
        self._stream = stream;
        self.stream_handle = stream_handle;
        tracing::info!("Audio output restarted");
        Ok(())
    }
}

fn open_stream() -> Result<(OutputStream, OutputStreamHandle), SpeechError> {
    OutputStream::try_default().map_err(|e| SpeechError::SinkUnavailable(e.to_string()))
}

fn new_sink(handle: &OutputStreamHandle, volume: f32) -> Result<Sink, SpeechError> {
    let sink = Sink::try_new(handle).map_err(|e| SpeechError::SinkUnavailable(e.to_string()))?;
    sink.pause();
    sink.set_volume(volume.clamp(0.0, 1.0));
    Ok(sink)
}
