//! Dedicated audio output thread.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. It is confined to one
//! OS thread and every operation is proxied through an [`AudioCommand`].
//! [`AudioThreadHandle`] is the `Send + Sync` side held by the sink adapter.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::SpeechError;
use crate::playback::RodioOutput;
use crate::sink::{CompletionCallback, PcmBuffer};

// ── Commands ───────────────────────────────────────────────────────

type Reply<T> = mpsc::Sender<Result<T, SpeechError>>;

enum AudioCommand {
    Schedule {
        buffer: PcmBuffer,
        on_complete: CompletionCallback,
        reply: Reply<()>,
    },
    Play {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Stop {
        reply: Reply<()>,
    },
    Reset {
        reply: Reply<()>,
    },
    Restart {
        reply: Reply<()>,
    },
    SetVolume {
        volume: f32,
    },
    Volume {
        reply: mpsc::Sender<f32>,
    },
    Position {
        reply: mpsc::Sender<Option<Duration>>,
    },
    IsPlaying {
        reply: mpsc::Sender<bool>,
    },
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the audio output thread.
///
/// Request/reply methods block the caller until the thread answers, which is
/// a local channel round trip plus the rodio call itself.
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Spawn the audio thread and open the default output device on it.
    pub fn spawn(volume: f32) -> Result<Self, SpeechError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), SpeechError>>();

        let thread = thread::Builder::new()
            .name("narrator-audio".into())
            .spawn(move || Self::run(volume, &cmd_rx, &init_tx))
            .map_err(|e| {
                SpeechError::SinkUnavailable(format!("failed to spawn audio thread: {e}"))
            })?;

        init_rx.recv().map_err(|_| SpeechError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    pub fn schedule(
        &self,
        buffer: PcmBuffer,
        on_complete: CompletionCallback,
    ) -> Result<(), SpeechError> {
        self.send_and_recv(|reply| AudioCommand::Schedule {
            buffer,
            on_complete,
            reply,
        })
    }

    pub fn play(&self) -> Result<(), SpeechError> {
        self.send_and_recv(|reply| AudioCommand::Play { reply })
    }

    pub fn pause(&self) -> Result<(), SpeechError> {
        self.send_and_recv(|reply| AudioCommand::Pause { reply })
    }

    pub fn stop(&self) -> Result<(), SpeechError> {
        self.send_and_recv(|reply| AudioCommand::Stop { reply })
    }

    pub fn reset(&self) -> Result<(), SpeechError> {
        self.send_and_recv(|reply| AudioCommand::Reset { reply })
    }

    pub fn restart(&self) -> Result<(), SpeechError> {
        self.send_and_recv(|reply| AudioCommand::Restart { reply })
    }

    /// Fire-and-forget.
    pub fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(AudioCommand::SetVolume { volume });
    }

    pub fn volume(&self) -> f32 {
        self.query(|reply| AudioCommand::Volume { reply })
            .unwrap_or(0.0)
    }

    pub fn position(&self) -> Option<Duration> {
        self.query(|reply| AudioCommand::Position { reply })
            .flatten()
    }

    pub fn is_playing(&self) -> bool {
        self.query(|reply| AudioCommand::IsPlaying { reply })
            .unwrap_or(false)
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Send a command expecting a `Result` reply and block for it. Channel
    /// failures map to [`SpeechError::AudioThreadDied`].
    fn send_and_recv<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> AudioCommand,
    ) -> Result<T, SpeechError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| SpeechError::AudioThreadDied)?;
        rx.recv().map_err(|_| SpeechError::AudioThreadDied)?
    }

    /// Bare-value query. `None` if the thread is dead.
    fn query<T>(&self, build: impl FnOnce(mpsc::Sender<T>) -> AudioCommand) -> Option<T> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx.send(build(tx)).ok()?;
        rx.recv().ok()
    }

    // ── Audio thread event loop ────────────────────────────────────

    fn run(
        volume: f32,
        cmd_rx: &mpsc::Receiver<AudioCommand>,
        init_tx: &mpsc::Sender<Result<(), SpeechError>>,
    ) {
        let mut output = match RodioOutput::open(volume) {
            Ok(output) => output,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Schedule {
                    buffer,
                    on_complete,
                    reply,
                } => {
                    output.schedule(&buffer, on_complete);
                    let _ = reply.send(Ok(()));
                }
                AudioCommand::Play { reply } => {
                    output.play();
                    let _ = reply.send(Ok(()));
                }
                AudioCommand::Pause { reply } => {
                    output.pause();
                    let _ = reply.send(Ok(()));
                }
                AudioCommand::Stop { reply } => {
                    let _ = reply.send(output.stop());
                }
                AudioCommand::Reset { reply } => {
                    let _ = reply.send(output.reset());
                }
                AudioCommand::Restart { reply } => {
                    let _ = reply.send(output.restart());
                }
                AudioCommand::SetVolume { volume } => output.set_volume(volume),
                AudioCommand::Volume { reply } => {
                    let _ = reply.send(output.volume());
                }
                AudioCommand::Position { reply } => {
                    let _ = reply.send(output.position());
                }
                AudioCommand::IsPlaying { reply } => {
                    let _ = reply.send(output.is_playing());
                }
                AudioCommand::Shutdown => break,
            }
        }

        tracing::debug!("Audio thread shutting down");
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
