//! Session controller: the public façade over segmentation, synthesis,
//! playback and progress tracking.
//!
//! [`SpeechSession::speak`] segments the text and spawns two tasks on the
//! current Tokio runtime: the synthesis producer and the playback
//! scheduler. Everything after that is reported through [`SpeechEvent`]s on
//! the receiver returned by [`SpeechSession::new`].
//!
//! Events are sent from runtime worker threads. A receiver that drives UI
//! state must hop to its UI context before touching widgets.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use narrator_core::{
    PageSource, PageSourceError, PlaybackState, SpeechEvent, SpeechSettings, Utterance,
    segment_with_page, validate_settings,
};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::TtsBackend;
use crate::error::SpeechError;
use crate::pipeline::Producer;
use crate::scheduler::Scheduler;
use crate::shared::SessionShared;
use crate::sink::AudioSink;

/// Point-in-time copy of the session's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub is_speaking: bool,
    pub is_paused: bool,
    pub playback_state: PlaybackState,
    pub speaker_id: i32,
    pub rate: f32,
    pub volume: f32,
    /// Index of the utterance now playing.
    pub current_index: Option<usize>,
    /// Synthesized entries waiting behind the current one.
    pub pending: usize,
}

/// Tasks of the running `speak` call.
struct Run {
    token: CancellationToken,
    producer: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

/// A text-to-speech playback session.
///
/// Only one text is spoken at a time: `speak` fully stops the previous run
/// before starting a new one. All methods take `&self`, so the session can
/// be shared behind an `Arc`.
pub struct SpeechSession {
    settings: SpeechSettings,
    backend: Arc<dyn TtsBackend>,
    shared: Arc<SessionShared>,
    run: Mutex<Option<Run>>,
}

impl SpeechSession {
    /// Create a session over `backend` and `sink`.
    ///
    /// Returns the session and the receiver for its events.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Settings`] if `settings` fail validation.
    pub fn new(
        settings: SpeechSettings,
        backend: Arc<dyn TtsBackend>,
        sink: Arc<dyn AudioSink>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SpeechEvent>), SpeechError> {
        validate_settings(&settings)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        sink.set_volume(settings.volume);

        let shared = Arc::new(SessionShared::new(
            sink,
            settings.speaker_id,
            settings.rate,
            settings.volume,
            event_tx,
        ));

        tracing::debug!(
            speaker_id = settings.speaker_id,
            rate = settings.rate,
            max_lookahead = settings.max_lookahead,
            workers = settings.synthesis_workers,
            "Speech session created"
        );

        let session = Self {
            settings,
            backend,
            shared,
            run: Mutex::new(None),
        };
        Ok((session, event_rx))
    }

    // ── Control ────────────────────────────────────────────────────

    /// Start speaking `text`, replacing anything already being spoken.
    ///
    /// Returns the number of utterances queued for synthesis. Text with
    /// nothing speakable emits [`SpeechEvent::NothingToSpeak`] and returns
    /// `Ok(0)`.
    ///
    /// # Errors
    ///
    /// [`SpeechError::NoRuntime`] when called outside a Tokio runtime.
    pub fn speak(&self, text: &str, page_reference: Option<usize>) -> Result<usize, SpeechError> {
        let runtime = Handle::try_current().map_err(|_| SpeechError::NoRuntime)?;

        let mut run = self.lock_run();
        self.stop_locked(&mut run);

        let utterances = segment_with_page(text, page_reference);
        if utterances.is_empty() {
            tracing::debug!("Nothing to speak");
            self.shared.emit(SpeechEvent::NothingToSpeak);
            return Ok(0);
        }

        let count = utterances.len();
        let generation = self.shared.generation();
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared.is_speaking.store(true, Ordering::SeqCst);

        let token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let producer = Producer::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.backend),
            &self.settings,
            command_tx.clone(),
            token.clone(),
            generation,
        );
        let scheduler = Scheduler::new(
            Arc::clone(&self.shared),
            &self.settings,
            token.clone(),
            generation,
            command_rx,
            command_tx,
        );

        *run = Some(Run {
            token,
            producer: runtime.spawn(producer.run(utterances)),
            scheduler: runtime.spawn(scheduler.run()),
        });

        tracing::info!(utterances = count, page = ?page_reference, generation, "Speaking");
        Ok(count)
    }

    /// Speak one page of `source`, tagging utterances with the page index.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Page`] if the page does not exist, otherwise as
    /// [`speak`](Self::speak).
    pub fn speak_page(
        &self,
        source: &mut dyn PageSource,
        page_index: usize,
    ) -> Result<usize, SpeechError> {
        source.set_current_page(page_index)?;
        let text = source
            .page_text(page_index)
            .ok_or_else(|| PageSourceError::PageOutOfRange {
                index: page_index,
                count: source.page_count(),
            })?;
        self.speak(text, Some(page_index))
    }

    /// Stop speaking immediately.
    ///
    /// On return the speaking and paused flags are cleared, the pending
    /// queue is empty and no further event of the stopped run will be
    /// delivered.
    pub fn stop_speaking(&self) {
        let mut run = self.lock_run();
        self.stop_locked(&mut run);
    }

    /// Pause output in place. Returns `false` if nothing is speaking or the
    /// session is already paused.
    pub fn pause_speaking(&self) -> bool {
        let mut transport = self.shared.lock_transport();
        if !self.shared.is_speaking.load(Ordering::SeqCst) || transport.paused {
            return false;
        }

        if let Err(e) = self.shared.sink.pause() {
            tracing::warn!(error = %e, "Failed to pause audio sink");
            return false;
        }

        transport.paused = true;
        self.shared.is_paused.store(true, Ordering::SeqCst);
        self.shared
            .set_state_for(self.shared.generation(), PlaybackState::Paused);
        tracing::debug!("Speech paused");
        true
    }

    /// Resume from the paused position. Returns `false` if not paused.
    pub fn continue_speaking(&self) -> bool {
        let mut transport = self.shared.lock_transport();
        if !self.shared.is_speaking.load(Ordering::SeqCst) || !transport.paused {
            return false;
        }

        if let Err(e) = self.shared.sink.play() {
            tracing::warn!(error = %e, "Failed to resume audio sink");
            return false;
        }

        transport.paused = false;
        self.shared.is_paused.store(false, Ordering::SeqCst);
        let state = if self.shared.current_index().is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        };
        self.shared.set_state_for(self.shared.generation(), state);
        tracing::debug!("Speech resumed");
        true
    }

    // ── Runtime settings ───────────────────────────────────────────

    /// Change the speaking rate from the next synthesized utterance on.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Settings`] if `rate` is outside 0.5–2.0.
    pub fn set_rate(&self, rate: f32) -> Result<(), SpeechError> {
        let candidate = SpeechSettings {
            rate,
            ..self.settings.clone()
        };
        validate_settings(&candidate)?;
        self.shared.set_rate(rate);
        Ok(())
    }

    /// Change the output volume immediately.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Settings`] if `volume` is outside 0.0–1.0.
    pub fn set_volume(&self, volume: f32) -> Result<(), SpeechError> {
        let candidate = SpeechSettings {
            volume,
            ..self.settings.clone()
        };
        validate_settings(&candidate)?;
        self.shared.set_volume(volume);
        self.shared.sink.set_volume(volume);
        Ok(())
    }

    /// Change the voice from the next synthesized utterance on.
    pub fn set_speaker_id(&self, speaker_id: i32) {
        self.shared.set_speaker_id(speaker_id);
    }

    // ── Observable state ───────────────────────────────────────────

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_speaking: self.is_speaking(),
            is_paused: self.is_paused(),
            playback_state: self.shared.state(),
            speaker_id: self.shared.speaker_id(),
            rate: self.shared.rate(),
            volume: self.shared.volume(),
            current_index: self.shared.current_index(),
            pending: self.shared.pending_len(),
        }
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.shared.is_speaking.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.is_paused.load(Ordering::SeqCst)
    }

    /// The utterance now playing, if it is still alive.
    #[must_use]
    pub fn current_utterance(&self) -> Option<Arc<Utterance>> {
        self.shared.current_utterance()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.pending_len()
    }

    #[must_use]
    pub const fn settings(&self) -> &SpeechSettings {
        &self.settings
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn lock_run(&self) -> MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_locked(&self, run: &mut Option<Run>) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);

        if let Some(run) = run.take() {
            run.token.cancel();
            run.producer.abort();
            run.scheduler.abort();
        }

        let was_active = self.shared.begin_stop();
        let dropped = self.shared.clear_queue();

        {
            let mut transport = self.shared.lock_transport();
            self.shared.silence_sink(&mut transport);
        }

        self.shared.clear_current();
        self.shared.is_speaking.store(false, Ordering::SeqCst);
        self.shared.is_paused.store(false, Ordering::SeqCst);

        if was_active {
            self.shared.set_state(PlaybackState::Stopped);
            self.shared.set_state(PlaybackState::Idle);
            tracing::info!(dropped, "Speech stopped");
        }
    }
}

impl Drop for SpeechSession {
    fn drop(&mut self) {
        self.stop_speaking();
    }
}
