//! State shared between the session handle, the synthesis producer and the
//! playback scheduler.
//!
//! Flags and counters are atomics so observers can snapshot them without
//! blocking playback. Three locks serialize the rest:
//!
//! | Lock        | Guards                                                   |
//! |-------------|----------------------------------------------------------|
//! | `events`    | event delivery and generation changes                    |
//! | `queue`     | the pending queue (push by producer, pop by scheduler, clear by stop) |
//! | `transport` | every call that drives the audio sink                    |
//!
//! Each `speak` runs under a generation number. `stop` bumps it while holding
//! `events`, so once `stop` returns no task of the old run can emit, start a
//! buffer or enqueue anything.

use std::collections::VecDeque;
use std::sync::atomic::{
    AtomicBool, AtomicI32, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use narrator_core::{PlaybackState, SpeechEvent, Utterance};
use tokio::sync::mpsc;

use crate::pipeline::QueueEntry;
use crate::sink::AudioSink;

const NO_INDEX: usize = usize::MAX;

pub(crate) struct Transport {
    pub(crate) paused: bool,
}

pub(crate) struct SessionShared {
    pub(crate) sink: Arc<dyn AudioSink>,

    speaker_id: AtomicI32,
    rate_bits: AtomicU32,
    volume_bits: AtomicU32,

    pub(crate) is_speaking: AtomicBool,
    pub(crate) is_paused: AtomicBool,
    pub(crate) stop_requested: AtomicBool,
    state: AtomicU8,
    generation: AtomicU64,
    current_index: AtomicUsize,
    pending: AtomicUsize,

    current: Mutex<Weak<Utterance>>,
    queue: Mutex<VecDeque<QueueEntry>>,
    transport: Mutex<Transport>,
    events: Mutex<mpsc::UnboundedSender<SpeechEvent>>,
}

impl SessionShared {
    pub(crate) fn new(
        sink: Arc<dyn AudioSink>,
        speaker_id: i32,
        rate: f32,
        volume: f32,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Self {
        Self {
            sink,
            speaker_id: AtomicI32::new(speaker_id),
            rate_bits: AtomicU32::new(rate.to_bits()),
            volume_bits: AtomicU32::new(volume.to_bits()),
            is_speaking: AtomicBool::new(false),
            is_paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            state: AtomicU8::new(state_to_u8(PlaybackState::Idle)),
            generation: AtomicU64::new(0),
            current_index: AtomicUsize::new(NO_INDEX),
            pending: AtomicUsize::new(0),
            current: Mutex::new(Weak::new()),
            queue: Mutex::new(VecDeque::new()),
            transport: Mutex::new(Transport { paused: false }),
            events: Mutex::new(events),
        }
    }

    // ── Voice parameters ───────────────────────────────────────────

    pub(crate) fn speaker_id(&self) -> i32 {
        self.speaker_id.load(Ordering::Relaxed)
    }

    pub(crate) fn set_speaker_id(&self, speaker_id: i32) {
        self.speaker_id.store(speaker_id, Ordering::Relaxed);
    }

    pub(crate) fn rate(&self) -> f32 {
        f32::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }

    pub(crate) fn set_rate(&self, rate: f32) {
        self.rate_bits.store(rate.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    pub(crate) fn set_volume(&self, volume: f32) {
        self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    // ── Generations and events ─────────────────────────────────────

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation && !self.stop_requested.load(Ordering::SeqCst)
    }

    /// Invalidate the running generation. Returns whether anything was
    /// active.
    pub(crate) fn begin_stop(&self) -> bool {
        let _events = self.lock_events();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.is_speaking.load(Ordering::SeqCst) || self.state() != PlaybackState::Idle
    }

    /// Emit regardless of generation. Used by the session handle itself.
    pub(crate) fn emit(&self, event: SpeechEvent) {
        Self::send(&self.lock_events(), event);
    }

    /// Emit only if `generation` is still the running one.
    pub(crate) fn emit_for(&self, generation: u64, event: SpeechEvent) {
        let events = self.lock_events();
        if self.is_current(generation) {
            Self::send(&events, event);
        }
    }

    pub(crate) fn state(&self) -> PlaybackState {
        state_from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Transition unconditionally.
    pub(crate) fn set_state(&self, new: PlaybackState) {
        let events = self.lock_events();
        self.transition(&events, new);
    }

    /// Transition only if `generation` is still the running one.
    pub(crate) fn set_state_for(&self, generation: u64, new: PlaybackState) {
        let events = self.lock_events();
        if self.is_current(generation) {
            self.transition(&events, new);
        }
    }

    /// Publish the utterance about to play. Returns `false` if the
    /// generation has been stopped.
    pub(crate) fn begin_utterance(&self, generation: u64, utterance: &Arc<Utterance>) -> bool {
        let events = self.lock_events();
        if !self.is_current(generation) {
            return false;
        }
        *lock(&self.current) = Arc::downgrade(utterance);
        self.current_index.store(utterance.index, Ordering::SeqCst);
        Self::send(&events, SpeechEvent::WillSpeakUtterance(Arc::clone(utterance)));
        true
    }

    /// Mark the run finished: clear the speaking flags, go idle, then emit
    /// `Finished`.
    pub(crate) fn finish_for(&self, generation: u64) {
        let events = self.lock_events();
        if !self.is_current(generation) {
            return;
        }
        self.clear_current();
        self.is_speaking.store(false, Ordering::SeqCst);
        self.is_paused.store(false, Ordering::SeqCst);
        self.transition(&events, PlaybackState::Idle);
        Self::send(&events, SpeechEvent::Finished);
    }

    fn transition(&self, events: &mpsc::UnboundedSender<SpeechEvent>, new: PlaybackState) {
        let old = state_from_u8(self.state.swap(state_to_u8(new), Ordering::SeqCst));
        if old != new {
            tracing::debug!(old = ?old, new = ?new, "Playback state transition");
            Self::send(events, SpeechEvent::StateChanged(new));
        }
    }

    fn send(events: &mpsc::UnboundedSender<SpeechEvent>, event: SpeechEvent) {
        if events.send(event).is_err() {
            tracing::trace!("Speech event receiver dropped");
        }
    }

    fn lock_events(&self) -> MutexGuard<'_, mpsc::UnboundedSender<SpeechEvent>> {
        lock(&self.events)
    }

    // ── Current utterance ──────────────────────────────────────────

    pub(crate) fn current_utterance(&self) -> Option<Arc<Utterance>> {
        lock(&self.current).upgrade()
    }

    pub(crate) fn current_index(&self) -> Option<usize> {
        let index = self.current_index.load(Ordering::SeqCst);
        (index != NO_INDEX).then_some(index)
    }

    pub(crate) fn clear_current(&self) {
        *lock(&self.current) = Weak::new();
        self.current_index.store(NO_INDEX, Ordering::SeqCst);
    }

    // ── Pending queue ──────────────────────────────────────────────

    /// Append a synthesized entry. Rejected once `generation` is stopped.
    pub(crate) fn push_entry(&self, generation: u64, entry: QueueEntry) -> bool {
        let mut queue = lock(&self.queue);
        if !self.is_current(generation) {
            return false;
        }
        queue.push_back(entry);
        self.pending.store(queue.len(), Ordering::SeqCst);
        true
    }

    pub(crate) fn pop_entry(&self) -> Option<QueueEntry> {
        let mut queue = lock(&self.queue);
        let entry = queue.pop_front();
        self.pending.store(queue.len(), Ordering::SeqCst);
        entry
    }

    /// Drop every pending entry, releasing their lookahead permits.
    pub(crate) fn clear_queue(&self) -> usize {
        let drained: Vec<QueueEntry> = {
            let mut queue = lock(&self.queue);
            self.pending.store(0, Ordering::SeqCst);
            queue.drain(..).collect()
        };
        drained.len()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    // ── Transport ──────────────────────────────────────────────────

    pub(crate) fn lock_transport(&self) -> MutexGuard<'_, Transport> {
        lock(&self.transport)
    }

    /// Stop and reset the sink, leaving it unpaused. Failures are logged.
    pub(crate) fn silence_sink(&self, transport: &mut Transport) {
        if let Err(e) = self.sink.stop() {
            tracing::warn!(error = %e, "Audio sink stop failed");
        }
        if let Err(e) = self.sink.reset() {
            tracing::warn!(error = %e, "Audio sink reset failed");
        }
        transport.paused = false;
        self.is_paused.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

const fn state_to_u8(state: PlaybackState) -> u8 {
    match state {
        PlaybackState::Idle => 0,
        PlaybackState::Playing => 1,
        PlaybackState::Paused => 2,
        PlaybackState::Stopped => 3,
    }
}

const fn state_from_u8(value: u8) -> PlaybackState {
    match value {
        1 => PlaybackState::Playing,
        2 => PlaybackState::Paused,
        3 => PlaybackState::Stopped,
        _ => PlaybackState::Idle,
    }
}
