//! Synthesis pipeline: the producer half of the session.
//!
//! Utterances are synthesized ahead of playback by up to
//! `synthesis_workers` concurrent calls. Results are delivered in
//! segmentation order whatever order they complete in, because the stream
//! is `buffered`, not `buffer_unordered`.
//!
//! Lookahead is a semaphore with `max_lookahead` permits. A permit is taken
//! before synthesis starts and travels with the [`QueueEntry`] until the
//! scheduler drops the entry after playback, so at most `max_lookahead`
//! utterances are in flight, queued or playing at once.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{StreamExt, stream};
use narrator_core::{SpeechSettings, TimingEstimator, Utterance};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::backend::TtsBackend;
use crate::error::SpeechError;
use crate::scheduler::SchedulerCommand;
use crate::shared::SessionShared;
use crate::sink::PcmBuffer;

/// A synthesized utterance waiting for (or in) playback.
pub(crate) struct QueueEntry {
    pub(crate) utterance: Arc<Utterance>,
    pub(crate) buffer: PcmBuffer,
    _permit: OwnedSemaphorePermit,
}

enum Outcome {
    Ready(QueueEntry),
    Skipped { index: usize, reason: String },
    Cancelled,
}

pub(crate) struct Producer {
    shared: Arc<SessionShared>,
    backend: Arc<dyn TtsBackend>,
    commands: mpsc::UnboundedSender<SchedulerCommand>,
    token: CancellationToken,
    generation: u64,
    lookahead: Arc<Semaphore>,
    workers: usize,
    channels: u16,
    estimator: TimingEstimator,
}

impl Producer {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        backend: Arc<dyn TtsBackend>,
        settings: &SpeechSettings,
        commands: mpsc::UnboundedSender<SchedulerCommand>,
        token: CancellationToken,
        generation: u64,
    ) -> Self {
        Self {
            shared,
            backend,
            commands,
            token,
            generation,
            lookahead: Arc::new(Semaphore::new(settings.max_lookahead.max(1))),
            workers: settings.synthesis_workers.max(1),
            channels: settings.channels,
            estimator: settings.estimator(),
        }
    }

    /// Synthesize every utterance in order, handing results to the
    /// scheduler. Ends early on cancellation.
    pub(crate) async fn run(self, utterances: Vec<Utterance>) {
        let total = utterances.len();
        let this = &self;
        let mut outcomes = stream::iter(utterances)
            .map(move |utterance| this.prepare(utterance))
            .buffered(self.workers);

        let mut ready = 0_usize;
        let mut skipped = 0_usize;

        while let Some(outcome) = outcomes.next().await {
            if self.token.is_cancelled() {
                break;
            }
            match outcome {
                Outcome::Ready(entry) => {
                    if !self.shared.push_entry(self.generation, entry) {
                        break;
                    }
                    ready += 1;
                    self.notify(SchedulerCommand::EntryReady);
                }
                Outcome::Skipped { index, reason } => {
                    skipped += 1;
                    self.notify(SchedulerCommand::Skipped { index, reason });
                }
                Outcome::Cancelled => break,
            }
        }
        drop(outcomes);

        if self.token.is_cancelled() {
            tracing::debug!(total, ready, "Synthesis cancelled");
            return;
        }

        tracing::debug!(total, ready, skipped, "Synthesis finished");
        self.notify(SchedulerCommand::ProducerDone);
    }

    /// Synthesize one utterance and build its queue entry.
    ///
    /// Cancellation is checked before waiting for a permit, before calling
    /// the backend and after it returns. The backend call itself runs to
    /// completion or is abandoned; it is never interrupted.
    async fn prepare(&self, mut utterance: Utterance) -> Outcome {
        let index = utterance.index;

        let permit = tokio::select! {
            biased;
            () = self.token.cancelled() => return Outcome::Cancelled,
            permit = Arc::clone(&self.lookahead).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return Outcome::Cancelled,
            },
        };

        if self.token.is_cancelled() {
            return Outcome::Cancelled;
        }

        let speaker_id = self.shared.speaker_id();
        let rate = self.shared.rate();
        tracing::debug!(
            index,
            chars = utterance.speakable_text.len(),
            speaker_id,
            rate,
            "Synthesizing utterance"
        );

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            () = self.token.cancelled() => return Outcome::Cancelled,
            result = self.backend.synthesize(&utterance.speakable_text, speaker_id, rate) => result,
        };

        if self.token.is_cancelled() {
            return Outcome::Cancelled;
        }

        let audio = match result {
            Ok(audio) if audio.samples.is_empty() => return skip(index, &SpeechError::EmptyAudio),
            Ok(audio) => audio,
            Err(e) => return skip(index, &e),
        };

        let buffer = match PcmBuffer::from_mono(&audio.samples, audio.sample_rate, self.channels) {
            Ok(buffer) => buffer,
            Err(e) => return skip(index, &e),
        };

        utterance.apply_timing(buffer.duration().as_secs_f64(), &self.estimator);

        tracing::debug!(
            index,
            samples = audio.samples.len(),
            duration_ms = buffer.duration().as_millis(),
            synth_ms = started.elapsed().as_millis(),
            "Utterance synthesized"
        );

        Outcome::Ready(QueueEntry {
            utterance: Arc::new(utterance),
            buffer,
            _permit: permit,
        })
    }

    fn notify(&self, command: SchedulerCommand) {
        if self.commands.send(command).is_err() {
            tracing::trace!("Scheduler gone, dropping command");
        }
    }
}

fn skip(index: usize, error: &SpeechError) -> Outcome {
    tracing::warn!(index, error = %error, "Skipping utterance");
    Outcome::Skipped {
        index,
        reason: error.to_string(),
    }
}
