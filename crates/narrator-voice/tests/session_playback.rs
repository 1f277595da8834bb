//! End-to-end session behavior against a scripted synthesizer and a sink
//! whose completions and clock are driven by the test.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use narrator_core::{PlaybackState, SpeechEvent, SpeechSettings, TextFilePageSource};
use narrator_voice::{
    AudioSink, CompletionCallback, PcmBuffer, SpeechError, SpeechSession, TtsAudio, TtsBackend,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);
const SAMPLE_RATE: u32 = 1_000;

// ── Scripted synthesizer ───────────────────────────────────────────

#[derive(Default)]
struct ScriptedBackend {
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    empties: HashSet<String>,
    samples: HashMap<String, usize>,
    started: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn delay(mut self, text: &str, millis: u64) -> Self {
        self.delays
            .insert(text.to_string(), Duration::from_millis(millis));
        self
    }

    fn fail(mut self, text: &str) -> Self {
        self.failures.insert(text.to_string());
        self
    }

    fn empty(mut self, text: &str) -> Self {
        self.empties.insert(text.to_string());
        self
    }

    fn samples(mut self, text: &str, count: usize) -> Self {
        self.samples.insert(text.to_string(), count);
        self
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TtsBackend for ScriptedBackend {
    async fn synthesize(
        &self,
        text: &str,
        _speaker_id: i32,
        _speed: f32,
    ) -> Result<TtsAudio, SpeechError> {
        self.started.lock().unwrap().push(text.to_string());

        if let Some(delay) = self.delays.get(text) {
            sleep(*delay).await;
        }
        if self.failures.contains(text) {
            return Err(SpeechError::SynthesisError("scripted failure".into()));
        }
        if self.empties.contains(text) {
            return Ok(TtsAudio::new(Vec::new(), SAMPLE_RATE));
        }

        let count = self.samples.get(text).copied().unwrap_or(1_000);
        Ok(TtsAudio::new(vec![0.1; count], SAMPLE_RATE))
    }
}

// ── Manual sink ────────────────────────────────────────────────────

struct SinkState {
    scheduled: Vec<CompletionCallback>,
    discarded: Vec<CompletionCallback>,
    scheduled_total: usize,
    playing: bool,
    volume: f32,
    position: Option<Duration>,
    unavailable: bool,
    restart_fails: bool,
    restarts: usize,
}

struct ManualSink {
    state: Mutex<SinkState>,
}

impl ManualSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SinkState {
                scheduled: Vec::new(),
                discarded: Vec::new(),
                scheduled_total: 0,
                playing: false,
                volume: 1.0,
                position: Some(Duration::ZERO),
                unavailable: false,
                restart_fails: false,
                restarts: 0,
            }),
        })
    }

    /// A sink whose device is gone until restarted.
    fn unavailable(restart_fails: bool) -> Arc<Self> {
        let sink = Self::new();
        {
            let mut state = sink.state.lock().unwrap();
            state.unavailable = true;
            state.restart_fails = restart_fails;
        }
        sink
    }

    fn scheduled_total(&self) -> usize {
        self.state.lock().unwrap().scheduled_total
    }

    fn restarts(&self) -> usize {
        self.state.lock().unwrap().restarts
    }

    fn set_position(&self, millis: u64) {
        self.state.lock().unwrap().position = Some(Duration::from_millis(millis));
    }

    /// Report no position, as a device whose queue has just drained does.
    fn lose_position(&self) {
        self.state.lock().unwrap().position = None;
    }

    fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    /// Wait for a scheduled buffer, then fire its completion.
    async fn complete_next(&self) {
        let callback = timeout(WAIT, async {
            loop {
                let next = {
                    let mut state = self.state.lock().unwrap();
                    (!state.scheduled.is_empty()).then(|| state.scheduled.remove(0))
                };
                if let Some(callback) = next {
                    return callback;
                }
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no buffer was scheduled");

        {
            let mut state = self.state.lock().unwrap();
            if state.position.is_some() {
                state.position = Some(Duration::ZERO);
            }
        }
        callback();
    }

    /// Fire completions discarded by stop/reset, as a late device would.
    fn fire_discarded(&self) -> usize {
        let callbacks: Vec<_> = self.state.lock().unwrap().discarded.drain(..).collect();
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }
}

impl AudioSink for ManualSink {
    fn schedule_buffer(
        &self,
        _buffer: PcmBuffer,
        on_complete: CompletionCallback,
    ) -> Result<(), SpeechError> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(SpeechError::SinkUnavailable("device lost".into()));
        }
        state.scheduled.push(on_complete);
        state.scheduled_total += 1;
        Ok(())
    }

    fn play(&self) -> Result<(), SpeechError> {
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&self) -> Result<(), SpeechError> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn stop(&self) -> Result<(), SpeechError> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn reset(&self) -> Result<(), SpeechError> {
        let mut state = self.state.lock().unwrap();
        let dropped: Vec<_> = state.scheduled.drain(..).collect();
        state.discarded.extend(dropped);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing()
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn position(&self) -> Option<Duration> {
        self.state.lock().unwrap().position
    }

    fn restart(&self) -> Result<(), SpeechError> {
        let mut state = self.state.lock().unwrap();
        state.restarts += 1;
        if state.restart_fails {
            return Err(SpeechError::SinkUnavailable("restart failed".into()));
        }
        state.unavailable = false;
        Ok(())
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn settings(max_lookahead: usize, synthesis_workers: usize) -> SpeechSettings {
    SpeechSettings {
        max_lookahead,
        synthesis_workers,
        ..SpeechSettings::with_defaults()
    }
}

fn session(
    settings: SpeechSettings,
    backend: &Arc<ScriptedBackend>,
    sink: &Arc<ManualSink>,
) -> (SpeechSession, UnboundedReceiver<SpeechEvent>) {
    let backend: Arc<dyn TtsBackend> = backend.clone();
    let sink: Arc<dyn AudioSink> = sink.clone();
    SpeechSession::new(settings, backend, sink).unwrap()
}

async fn next_event(rx: &mut UnboundedReceiver<SpeechEvent>) -> SpeechEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Collect events up to and including the first one matching `done`.
async fn events_until(
    rx: &mut UnboundedReceiver<SpeechEvent>,
    done: impl Fn(&SpeechEvent) -> bool,
) -> Vec<SpeechEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx).await;
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

fn drain(rx: &mut UnboundedReceiver<SpeechEvent>) -> Vec<SpeechEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn spoken(events: &[SpeechEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            SpeechEvent::WillSpeakUtterance(utterance) => Some(utterance.index),
            _ => None,
        })
        .collect()
}

fn is_started(event: &SpeechEvent, index: usize) -> bool {
    matches!(event, SpeechEvent::WillSpeakUtterance(u) if u.index == index)
}

async fn wait_until(condition: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

const THREE: &str = "First one. Second two. Third three.";

// ── Ordering and backpressure ──────────────────────────────────────

#[tokio::test]
async fn playback_follows_segmentation_order_when_synthesis_finishes_out_of_order() {
    let backend = Arc::new(ScriptedBackend::default().delay("First one.", 150));
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(3, 2), &backend, &sink);

    assert_eq!(session.speak(THREE, None).unwrap(), 3);

    for _ in 0..3 {
        sink.complete_next().await;
    }
    let events = events_until(&mut rx, |e| matches!(e, SpeechEvent::Finished)).await;

    assert_eq!(spoken(&events), vec![0, 1, 2]);
    let finished: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::DidFinishUtterance(u) => Some(u.index),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![0, 1, 2]);

    // Both workers were busy before the delayed first utterance returned.
    let started = backend.started();
    assert_eq!(&started[..2], ["First one.", "Second two."]);
    assert!(!session.is_speaking());
    assert_eq!(session.snapshot().playback_state, PlaybackState::Idle);
}

#[tokio::test]
async fn lookahead_blocks_synthesis_until_playback_consumes_an_entry() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    session
        .speak("One here. Two here. Three here. Four here.", None)
        .unwrap();

    events_until(&mut rx, |e| is_started(e, 0)).await;
    wait_until(|| backend.started().len() == 2 && session.pending_len() == 1).await;

    sleep(Duration::from_millis(150)).await;
    assert_eq!(backend.started().len(), 2, "third synthesis must wait");

    sink.complete_next().await;
    wait_until(|| backend.started().len() == 3).await;
    assert_eq!(backend.started()[2], "Three here.");
}

// ── Stop ───────────────────────────────────────────────────────────

#[tokio::test]
async fn stop_is_synchronous_and_silences_late_work() {
    let backend = Arc::new(ScriptedBackend::default().delay("Second two.", 200));
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 2), &backend, &sink);

    session.speak(THREE, None).unwrap();
    events_until(&mut rx, |e| is_started(e, 0)).await;
    wait_until(|| sink.scheduled_total() == 1).await;

    assert!(session.pause_speaking());
    session.stop_speaking();

    let snapshot = session.snapshot();
    assert!(!snapshot.is_speaking);
    assert!(!snapshot.is_paused);
    assert_eq!(snapshot.pending, 0);
    assert_eq!(snapshot.current_index, None);
    assert_eq!(snapshot.playback_state, PlaybackState::Idle);
    assert!(session.current_utterance().is_none());

    let after_stop = drain(&mut rx);
    let states: Vec<PlaybackState> = after_stop
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect();
    assert!(states.ends_with(&[PlaybackState::Stopped, PlaybackState::Idle]));

    // The device reports the old buffer done and the slow synthesis lands.
    assert_eq!(sink.fire_discarded(), 1);
    sleep(Duration::from_millis(350)).await;

    let late = drain(&mut rx);
    assert!(
        late.iter().all(|e| !matches!(
            e,
            SpeechEvent::WillSpeakUtterance(_)
                | SpeechEvent::WillSpeakWord { .. }
                | SpeechEvent::DidFinishUtterance(_)
                | SpeechEvent::Finished
        )),
        "unexpected events after stop: {late:?}"
    );
    assert_eq!(sink.scheduled_total(), 1);
}

#[tokio::test]
async fn speaking_again_replaces_the_previous_run() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    session.speak("Old text here.", None).unwrap();
    events_until(&mut rx, |e| is_started(e, 0)).await;
    wait_until(|| sink.scheduled_total() == 1).await;

    session.speak("New text here.", None).unwrap();
    let events = events_until(&mut rx, |e| is_started(e, 0)).await;
    let replacement = events
        .iter()
        .find_map(|e| match e {
            SpeechEvent::WillSpeakUtterance(u) => Some(u.speakable_text.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(replacement, "New text here.");
    wait_until(|| sink.scheduled_total() == 2).await;

    // The old buffer's completion arrives after the new run started.
    assert_eq!(sink.fire_discarded(), 1);
    sleep(Duration::from_millis(100)).await;
    assert!(
        drain(&mut rx)
            .iter()
            .all(|e| !matches!(e, SpeechEvent::DidFinishUtterance(_))),
    );
    assert_eq!(session.snapshot().current_index, Some(0));

    sink.complete_next().await;
    let events = events_until(&mut rx, |e| matches!(e, SpeechEvent::Finished)).await;
    assert!(events.iter().any(|e| matches!(
        e,
        SpeechEvent::DidFinishUtterance(u) if u.speakable_text == "New text here."
    )));
}

// ── Failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn failed_and_empty_synthesis_are_skipped() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .fail("Second two.")
            .empty("Third three."),
    );
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    session
        .speak("First one. Second two. Third three. Fourth four.", None)
        .unwrap();

    sink.complete_next().await;
    sink.complete_next().await;
    let events = events_until(&mut rx, |e| matches!(e, SpeechEvent::Finished)).await;

    assert_eq!(spoken(&events), vec![0, 3]);
    let skipped: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::UtteranceSkipped { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![1, 2]);
    assert_eq!(backend.started().len(), 4);
}

#[tokio::test]
async fn unavailable_sink_is_restarted_once() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::unavailable(false);
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    session.speak("Just one.", None).unwrap();
    sink.complete_next().await;
    let events = events_until(&mut rx, |e| matches!(e, SpeechEvent::Finished)).await;

    assert_eq!(sink.restarts(), 1);
    assert_eq!(spoken(&events), vec![0]);
    assert!(events.iter().all(|e| !matches!(e, SpeechEvent::Error(_))));
}

#[tokio::test]
async fn failed_restart_ends_the_session_with_an_error() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::unavailable(true);
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    session.speak(THREE, None).unwrap();
    let events = events_until(&mut rx, |e| matches!(e, SpeechEvent::Error(_))).await;
    assert_eq!(spoken(&events), vec![0]);

    wait_until(|| !session.is_speaking()).await;
    assert_eq!(sink.restarts(), 1);
    assert_eq!(session.pending_len(), 0);
    assert_eq!(session.snapshot().playback_state, PlaybackState::Idle);
}

// ── Pause, words, misc ─────────────────────────────────────────────

#[tokio::test]
async fn pause_and_continue_are_guarded() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    assert!(!session.pause_speaking(), "nothing to pause yet");

    session.speak("Hold on.", None).unwrap();
    events_until(&mut rx, |e| is_started(e, 0)).await;
    wait_until(|| sink.playing()).await;

    assert!(session.pause_speaking());
    assert!(!session.pause_speaking());
    assert!(session.is_paused());
    assert!(!sink.playing());

    assert!(session.continue_speaking());
    assert!(!session.continue_speaking());
    assert!(sink.playing());

    let states: Vec<PlaybackState> = drain(&mut rx)
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect();
    assert!(states.ends_with(&[PlaybackState::Paused, PlaybackState::Playing]));
}

#[tokio::test]
async fn word_events_follow_the_sink_clock() {
    let backend = Arc::new(ScriptedBackend::default().samples("The dog ran.", 1_200));
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    session.speak("The dog ran.", None).unwrap();
    events_until(&mut rx, |e| {
        matches!(e, SpeechEvent::WillSpeakWord { word_index: Some(0), .. })
    })
    .await;

    // Starts are 0.0, 0.25, 0.55, 0.85 with the default lead time.
    sink.set_position(400);
    let events = events_until(&mut rx, |e| {
        matches!(e, SpeechEvent::WillSpeakWord { word_index: Some(_), .. })
    })
    .await;
    match events.last() {
        Some(SpeechEvent::WillSpeakWord { word, word_index, .. }) => {
            assert_eq!(word, "dog");
            assert_eq!(*word_index, Some(1));
        }
        other => panic!("unexpected event {other:?}"),
    }

    sink.set_position(900);
    events_until(&mut rx, |e| {
        matches!(e, SpeechEvent::WillSpeakWord { word_index: Some(3), .. })
    })
    .await;

    sink.set_position(2_000);
    events_until(&mut rx, |e| {
        matches!(e, SpeechEvent::WillSpeakWord { word_index: None, .. })
    })
    .await;

    let utterance = session.current_utterance().unwrap();
    assert_eq!(utterance.word_schedule.len(), 4);
    assert!((utterance.duration - 1.2).abs() < 1e-9);
}

#[tokio::test]
async fn completion_clears_the_word_once_when_the_clock_is_gone() {
    let backend = Arc::new(ScriptedBackend::default().samples("The dog ran.", 1_200));
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    session.speak("The dog ran.", None).unwrap();
    sink.set_position(400);
    events_until(&mut rx, |e| {
        matches!(e, SpeechEvent::WillSpeakWord { word_index: Some(1), .. })
    })
    .await;

    sink.lose_position();
    sleep(Duration::from_millis(50)).await;
    assert!(
        drain(&mut rx).is_empty(),
        "no event while the position is unknown"
    );

    sink.complete_next().await;
    let events = events_until(&mut rx, |e| matches!(e, SpeechEvent::Finished)).await;

    let finished_at = events
        .iter()
        .position(|e| matches!(e, SpeechEvent::DidFinishUtterance(_)))
        .unwrap();
    assert!(matches!(
        events[finished_at - 1],
        SpeechEvent::WillSpeakWord {
            utterance_index: 0,
            word_index: None,
            ..
        }
    ));
    let clears = events
        .iter()
        .filter(|e| matches!(e, SpeechEvent::WillSpeakWord { word_index: None, .. }))
        .count();
    assert_eq!(clears, 1);
}

#[tokio::test]
async fn blank_text_reports_nothing_to_speak() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);

    assert_eq!(session.speak(" \n\t ", None).unwrap(), 0);
    assert!(matches!(next_event(&mut rx).await, SpeechEvent::NothingToSpeak));
    assert!(!session.is_speaking());
    assert!(backend.started().is_empty());
}

#[tokio::test]
async fn speak_page_tags_utterances_with_the_page() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::new();
    let (session, mut rx) = session(settings(2, 1), &backend, &sink);
    let mut pages = TextFilePageSource::from_text("Page one.\x0cPage two.");

    session.speak_page(&mut pages, 1).unwrap();
    let events = events_until(&mut rx, |e| is_started(e, 0)).await;
    match events.last() {
        Some(SpeechEvent::WillSpeakUtterance(u)) => {
            assert_eq!(u.speakable_text, "Page two.");
            assert_eq!(u.page_reference, Some(1));
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert!(matches!(
        session.speak_page(&mut pages, 9),
        Err(SpeechError::Page(_))
    ));
}

#[tokio::test]
async fn runtime_setters_validate_and_apply() {
    let backend = Arc::new(ScriptedBackend::default());
    let sink = ManualSink::new();
    let (session, _rx) = session(settings(2, 1), &backend, &sink);

    assert!(matches!(session.set_rate(3.0), Err(SpeechError::Settings(_))));
    session.set_rate(1.5).unwrap();
    session.set_volume(0.25).unwrap();
    session.set_speaker_id(4);

    let snapshot = session.snapshot();
    assert!((snapshot.rate - 1.5).abs() < f32::EPSILON);
    assert!((snapshot.volume - 0.25).abs() < f32::EPSILON);
    assert_eq!(snapshot.speaker_id, 4);
    assert!((sink.volume() - 0.25).abs() < f32::EPSILON);
}

#[test]
fn invalid_settings_are_rejected() {
    let backend: Arc<dyn TtsBackend> = Arc::new(ScriptedBackend::default());
    let sink: Arc<dyn AudioSink> = ManualSink::new();
    let result = SpeechSession::new(settings(0, 1), backend, sink);
    assert!(matches!(result, Err(SpeechError::Settings(_))));
}

#[test]
fn speak_outside_a_runtime_fails() {
    let backend: Arc<dyn TtsBackend> = Arc::new(ScriptedBackend::default());
    let sink: Arc<dyn AudioSink> = ManualSink::new();
    let (session, _rx) = SpeechSession::new(settings(2, 1), backend, sink).unwrap();
    assert!(matches!(
        session.speak("Hello there.", None),
        Err(SpeechError::NoRuntime)
    ));
}
