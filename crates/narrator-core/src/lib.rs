#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod events;
pub mod pages;
pub mod ports;
pub mod settings;
pub mod text;
pub mod timing;
pub mod utterance;

// Re-export commonly used types for convenience
pub use events::{PlaybackState, SpeechEvent};
pub use pages::{PAGE_SEPARATOR, TextFilePageSource};
pub use ports::{HighlightSink, NoopHighlightSink, PageSource, PageSourceError, SpeechObserver};
pub use settings::{
    DEFAULT_MAX_LOOKAHEAD, DEFAULT_TRACKER_TICK_HZ, SettingsError,
    SettingsUpdate, SpeechSettings, validate_settings,
};
pub use text::{SpanAligner, find_original_spans, segment, segment_with_page, tokenize_words};
pub use timing::{
    DEFAULT_LEAD_TIME, TimingConfig, TimingEstimator, WeightingStrategy, estimate_word_timing,
    syllable_count,
};
pub use utterance::{Utterance, WordTiming};
