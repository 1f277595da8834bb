//! Speech settings and validation.
//!
//! Pure domain types: the binary loads them from JSON, applies overrides and
//! hands a validated copy to the session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timing::{DEFAULT_LEAD_TIME, TimingConfig, TimingEstimator};

/// Default number of synthesized-but-unplayed utterances.
pub const DEFAULT_MAX_LOOKAHEAD: usize = 2;

/// Default progress tracker refresh rate.
pub const DEFAULT_TRACKER_TICK_HZ: u32 = 60;

/// Playback, synthesis and highlight tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Voice index passed to the synthesizer.
    pub speaker_id: i32,

    /// Speaking speed multiplier (0.5–2.0).
    pub rate: f32,

    /// Output volume (0.0–1.0).
    pub volume: f32,

    /// Synthesized-but-not-yet-played utterances kept at once.
    pub max_lookahead: usize,

    /// Seconds each word highlight is pulled ahead of its estimated onset.
    pub word_highlight_lead_time: f64,

    /// Concurrent synthesis calls. Results still play in reading order.
    pub synthesis_workers: usize,

    /// Progress tracker polls per second.
    pub tracker_tick_hz: u32,

    /// Seconds past an utterance's end before the tracker gives up on it.
    pub tracker_end_slack: f64,

    /// Measured output device latency subtracted from the playback clock.
    pub output_latency: f64,

    /// Output channel count; mono synthesis is copied to every channel.
    pub channels: u16,

    pub timing: TimingConfig,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SpeechSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            speaker_id: 0,
            rate: 1.0,
            volume: 1.0,
            max_lookahead: DEFAULT_MAX_LOOKAHEAD,
            word_highlight_lead_time: DEFAULT_LEAD_TIME,
            synthesis_workers: 1,
            tracker_tick_hz: DEFAULT_TRACKER_TICK_HZ,
            tracker_end_slack: 0.1,
            output_latency: 0.0,
            channels: 1,
            timing: TimingConfig::default(),
        }
    }

    /// Read settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded speech settings");
        Ok(settings)
    }

    /// Apply every field that is `Some` in `update`.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(speaker_id) = update.speaker_id {
            self.speaker_id = speaker_id;
        }
        if let Some(rate) = update.rate {
            self.rate = rate;
        }
        if let Some(volume) = update.volume {
            self.volume = volume;
        }
        if let Some(lookahead) = update.max_lookahead {
            self.max_lookahead = lookahead;
        }
        if let Some(lead) = update.word_highlight_lead_time {
            self.word_highlight_lead_time = lead;
        }
        if let Some(workers) = update.synthesis_workers {
            self.synthesis_workers = workers;
        }
        if let Some(latency) = update.output_latency {
            self.output_latency = latency;
        }
    }

    /// Word timing estimator configured from these settings.
    #[must_use]
    pub fn estimator(&self) -> TimingEstimator {
        TimingEstimator::new(self.timing, self.word_highlight_lead_time)
    }

    /// Period between progress tracker polls.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tracker_tick_hz.max(1)))
    }
}

/// Partial settings update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub speaker_id: Option<i32>,
    pub rate: Option<f32>,
    pub volume: Option<f32>,
    pub max_lookahead: Option<usize>,
    pub word_highlight_lead_time: Option<f64>,
    pub synthesis_workers: Option<usize>,
    pub output_latency: Option<f64>,
}

/// Settings load or validation error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Rate must be between 0.5 and 2.0, got {0}")]
    InvalidRate(f32),

    #[error("Volume must be between 0.0 and 1.0, got {0}")]
    InvalidVolume(f32),

    #[error("Max lookahead must be at least 1")]
    InvalidLookahead,

    #[error("Synthesis workers must be at least 1")]
    InvalidWorkers,

    #[error("{field} cannot be negative, got {value}")]
    NegativeDuration { field: &'static str, value: f64 },

    #[error("Tracker tick rate must be between 1 and 240 Hz, got {0}")]
    InvalidTickRate(u32),

    #[error("Output needs at least one channel")]
    InvalidChannels,

    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Validate settings values.
pub fn validate_settings(settings: &SpeechSettings) -> Result<(), SettingsError> {
    if !(0.5..=2.0).contains(&settings.rate) {
        return Err(SettingsError::InvalidRate(settings.rate));
    }

    if !(0.0..=1.0).contains(&settings.volume) {
        return Err(SettingsError::InvalidVolume(settings.volume));
    }

    if settings.max_lookahead == 0 {
        return Err(SettingsError::InvalidLookahead);
    }

    if settings.synthesis_workers == 0 {
        return Err(SettingsError::InvalidWorkers);
    }

    if !(1..=240).contains(&settings.tracker_tick_hz) {
        return Err(SettingsError::InvalidTickRate(settings.tracker_tick_hz));
    }

    if settings.channels == 0 {
        return Err(SettingsError::InvalidChannels);
    }

    let durations = [
        ("word_highlight_lead_time", settings.word_highlight_lead_time),
        ("tracker_end_slack", settings.tracker_end_slack),
        ("output_latency", settings.output_latency),
        ("timing.min_word_duration", settings.timing.min_word_duration),
        ("timing.sentence_pause", settings.timing.sentence_pause),
        ("timing.clause_pause", settings.timing.clause_pause),
    ];
    if let Some((field, value)) = durations
        .into_iter()
        .find(|(_, v)| v.is_nan() || *v < 0.0)
    {
        return Err(SettingsError::NegativeDuration { field, value });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::timing::WeightingStrategy;

    #[test]
    fn test_default_settings() {
        let settings = SpeechSettings::with_defaults();
        assert_eq!(settings.max_lookahead, 2);
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.tracker_tick_hz, 60);
        assert!((settings.word_highlight_lead_time - 0.05).abs() < f64::EPSILON);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_validate_rate_out_of_range() {
        let settings = SpeechSettings {
            rate: 3.0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_validate_volume_out_of_range() {
        let settings = SpeechSettings {
            volume: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidVolume(_))
        ));
    }

    #[test]
    fn test_validate_zero_channels() {
        let settings = SpeechSettings {
            channels: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidChannels)
        ));
    }

    #[test]
    fn test_validate_zero_lookahead_and_workers() {
        let settings = SpeechSettings {
            max_lookahead: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidLookahead)
        ));

        let settings = SpeechSettings {
            synthesis_workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidWorkers)
        ));
    }

    #[test]
    fn test_validate_negative_lead_time() {
        let settings = SpeechSettings {
            word_highlight_lead_time: -0.2,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::NegativeDuration {
                field: "word_highlight_lead_time",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_tick_rate() {
        for hz in [0, 500] {
            let settings = SpeechSettings {
                tracker_tick_hz: hz,
                ..Default::default()
            };
            assert!(matches!(
                validate_settings(&settings),
                Err(SettingsError::InvalidTickRate(_))
            ));
        }
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = SpeechSettings::with_defaults();
        let update = SettingsUpdate {
            rate: Some(1.5),
            speaker_id: Some(7),
            ..Default::default()
        };
        settings.merge(&update);

        assert!((settings.rate - 1.5).abs() < f32::EPSILON);
        assert_eq!(settings.speaker_id, 7);
        assert_eq!(settings.max_lookahead, DEFAULT_MAX_LOOKAHEAD);
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "rate": 1.25, "max_lookahead": 3, "timing": {{ "strategy": "characters" }} }}"#
        )
        .unwrap();

        let settings = SpeechSettings::load(file.path()).unwrap();
        assert!((settings.rate - 1.25).abs() < f32::EPSILON);
        assert_eq!(settings.max_lookahead, 3);
        assert_eq!(settings.timing.strategy, WeightingStrategy::Characters);
        assert!((settings.timing.sentence_pause - 0.15).abs() < f64::EPSILON);
        assert!((settings.volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            SpeechSettings::load(&missing),
            Err(SettingsError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            SpeechSettings::load(&bad),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_tick_interval() {
        let settings = SpeechSettings {
            tracker_tick_hz: 50,
            ..Default::default()
        };
        assert_eq!(settings.tick_interval(), Duration::from_millis(20));
    }
}
