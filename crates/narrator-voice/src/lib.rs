#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

pub mod backend;
pub mod bridge;
pub mod error;
mod pipeline;
mod scheduler;
pub mod session;
mod shared;
pub mod sink;
pub mod tracker;

#[cfg(feature = "rodio")]
pub mod audio_local;
#[cfg(feature = "rodio")]
mod audio_thread;
#[cfg(feature = "rodio")]
mod playback;

// Re-export key types for convenience
pub use backend::{TtsAudio, TtsBackend};
pub use bridge::{HighlightObserver, forward_until_terminal, spawn_event_bridge};
pub use error::SpeechError;
pub use session::{SessionSnapshot, SpeechSession};
pub use sink::{AudioSink, CompletionCallback, PcmBuffer};
pub use tracker::ProgressTracker;
