//! Playback scheduler: the consumer half of the session.
//!
//! One task per `speak`. It pops entries from the pending queue strictly in
//! order, hands each buffer to the sink, advances on the sink's completion
//! callback and drives the progress tracker from a periodic tick.
//!
//! ```text
//!   Idle ──first entry──▶ Playing ──pause()──▶ Paused
//!    ▲                     │  ▲                  │
//!    │   queue empty,      │  └────resume()──────┘
//!    └── producer busy ────┘
//!                          │ queue empty, producer done
//!                          ▼
//!                       Finished (Idle)
//! ```
//!
//! Completions carry the generation and utterance index they were scheduled
//! with; anything that does not match the utterance now playing is dropped.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use narrator_core::{PlaybackState, SpeechEvent, SpeechSettings};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::SpeechError;
use crate::pipeline::QueueEntry;
use crate::shared::SessionShared;
use crate::tracker::ProgressTracker;

/// Messages from the producer and from sink completion callbacks.
#[derive(Debug)]
pub(crate) enum SchedulerCommand {
    /// An entry was pushed onto the pending queue.
    EntryReady,

    /// Synthesis of an utterance failed; it will never be queued.
    Skipped { index: usize, reason: String },

    /// The sink finished playing a buffer.
    BufferFinished { generation: u64, index: usize },

    /// The producer has delivered everything it will deliver.
    ProducerDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub(crate) struct Scheduler {
    shared: Arc<SessionShared>,
    generation: u64,
    token: CancellationToken,
    commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    /// Cloned into every completion callback.
    completions: mpsc::UnboundedSender<SchedulerCommand>,
    tracker: ProgressTracker,
    tick_interval: Duration,
    playing: Option<QueueEntry>,
    producer_done: bool,
}

impl Scheduler {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        settings: &SpeechSettings,
        token: CancellationToken,
        generation: u64,
        commands: mpsc::UnboundedReceiver<SchedulerCommand>,
        completions: mpsc::UnboundedSender<SchedulerCommand>,
    ) -> Self {
        Self {
            shared,
            generation,
            token,
            commands,
            completions,
            tracker: ProgressTracker::new(settings),
            tick_interval: settings.tick_interval(),
            playing: None,
            producer_done: false,
        }
    }

    pub(crate) async fn run(mut self) {
        let token = self.token.clone();
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let tracking = self.tracker.is_armed();
            let flow = tokio::select! {
                biased;
                () = token.cancelled() => Flow::Exit,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => Flow::Exit,
                },
                _ = ticker.tick(), if tracking => {
                    self.on_tick();
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }

        tracing::debug!(generation = self.generation, "Playback scheduler exited");
    }

    fn handle(&mut self, command: SchedulerCommand) -> Flow {
        match command {
            SchedulerCommand::EntryReady => {
                if self.playing.is_none() {
                    return self.advance();
                }
                Flow::Continue
            }
            SchedulerCommand::Skipped { index, reason } => {
                self.shared
                    .emit_for(self.generation, SpeechEvent::UtteranceSkipped { index, reason });
                Flow::Continue
            }
            SchedulerCommand::BufferFinished { generation, index } => {
                self.on_buffer_finished(generation, index)
            }
            SchedulerCommand::ProducerDone => {
                self.producer_done = true;
                if self.playing.is_none() {
                    return self.advance();
                }
                Flow::Continue
            }
        }
    }

    fn on_buffer_finished(&mut self, generation: u64, index: usize) -> Flow {
        let matches_playing = self
            .playing
            .as_ref()
            .is_some_and(|entry| entry.utterance.index == index);

        if generation != self.generation
            || !matches_playing
            || self.shared.stop_requested.load(Ordering::SeqCst)
        {
            tracing::trace!(generation, index, "Dropping stale completion");
            return Flow::Continue;
        }

        if let Some(event) = self.tracker.finish() {
            self.shared.emit_for(self.generation, event);
        }
        if let Some(entry) = self.playing.take() {
            tracing::debug!(index, "Utterance finished");
            self.shared.emit_for(
                self.generation,
                SpeechEvent::DidFinishUtterance(Arc::clone(&entry.utterance)),
            );
        }
        self.shared.clear_current();
        self.advance()
    }

    /// Start the next queued entry, or go idle / finish when there is none.
    fn advance(&mut self) -> Flow {
        match self.shared.pop_entry() {
            Some(entry) => self.start(entry),
            None if self.producer_done => {
                self.finish();
                Flow::Exit
            }
            None => {
                tracing::debug!("Playback underrun, waiting for synthesis");
                self.shared
                    .set_state_for(self.generation, PlaybackState::Idle);
                Flow::Continue
            }
        }
    }

    fn start(&mut self, entry: QueueEntry) -> Flow {
        let utterance = Arc::clone(&entry.utterance);

        if !self.shared.begin_utterance(self.generation, &utterance) {
            return Flow::Exit;
        }

        let paused = match self.hand_to_sink(&entry) {
            Ok(paused) => paused,
            Err(SpeechError::Cancelled) => return Flow::Exit,
            Err(e) => {
                self.fail(&e);
                return Flow::Exit;
            }
        };

        tracing::debug!(
            index = utterance.index,
            duration_ms = entry.buffer.duration().as_millis(),
            words = utterance.words.len(),
            "Playing utterance"
        );

        self.playing = Some(entry);
        if !paused {
            self.shared
                .set_state_for(self.generation, PlaybackState::Playing);
        }

        let event = self.tracker.arm(utterance);
        self.shared.emit_for(self.generation, event);
        Flow::Continue
    }

    /// Schedule the entry's buffer and start output unless paused.
    ///
    /// A sink that reports itself unavailable gets one restart and one
    /// retry. Returns whether the session is paused.
    fn hand_to_sink(&self, entry: &QueueEntry) -> Result<bool, SpeechError> {
        let transport = self.shared.lock_transport();
        if !self.shared.is_current(self.generation) {
            return Err(SpeechError::Cancelled);
        }

        match self.schedule_and_play(entry, transport.paused) {
            Ok(()) => Ok(transport.paused),
            Err(SpeechError::SinkUnavailable(reason)) => {
                tracing::warn!(
                    index = entry.utterance.index,
                    reason = %reason,
                    "Audio sink unavailable, restarting"
                );
                self.shared.sink.restart()?;
                self.schedule_and_play(entry, transport.paused)?;
                Ok(transport.paused)
            }
            Err(e) => Err(e),
        }
    }

    fn schedule_and_play(&self, entry: &QueueEntry, paused: bool) -> Result<(), SpeechError> {
        let completions = self.completions.clone();
        let generation = self.generation;
        let index = entry.utterance.index;

        self.shared.sink.schedule_buffer(
            entry.buffer.clone(),
            Box::new(move || {
                let _ = completions.send(SchedulerCommand::BufferFinished { generation, index });
            }),
        )?;

        if !paused {
            self.shared.sink.play()?;
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        let position = self.shared.sink.position();
        if let Some(event) = self.tracker.tick(position) {
            self.shared.emit_for(self.generation, event);
        }
    }

    /// Fatal sink failure: report it, drop everything and go idle.
    fn fail(&mut self, error: &SpeechError) {
        self.tracker.disarm();
        self.playing = None;
        self.token.cancel();

        let mut transport = self.shared.lock_transport();
        if !self.shared.is_current(self.generation) {
            return;
        }

        tracing::error!(error = %error, "Audio sink failed, ending session");
        self.shared
            .emit_for(self.generation, SpeechEvent::Error(error.to_string()));

        self.shared.clear_queue();
        self.shared.silence_sink(&mut transport);
        self.shared.clear_current();
        self.shared.is_speaking.store(false, Ordering::SeqCst);
        self.shared
            .set_state_for(self.generation, PlaybackState::Idle);
    }

    fn finish(&mut self) {
        self.tracker.disarm();
        self.shared.finish_for(self.generation);
        tracing::info!(generation = self.generation, "Speech finished");
    }
}
