//! `narrator schedule`: estimate word timings for a known audio length.

use std::fmt::Write;

use anyhow::Result;
use narrator_core::{SpeechSettings, TimingEstimator, Utterance};

use crate::error::CliError;
use crate::presentation::format_seconds;

pub fn execute(
    settings: &SpeechSettings,
    text: &str,
    duration: f64,
    lead_time: Option<f64>,
) -> Result<()> {
    let utterance = timed_utterance(settings, text, duration, lead_time)?;
    print!("{}", render_schedule(&utterance));
    Ok(())
}

/// Build a single utterance from `text` and time it against `duration`.
pub fn timed_utterance(
    settings: &SpeechSettings,
    text: &str,
    duration: f64,
    lead_time: Option<f64>,
) -> Result<Utterance, CliError> {
    if !(duration.is_finite() && duration >= 0.0) {
        return Err(CliError::Arguments(format!(
            "duration must be a non-negative number of seconds, got {duration}"
        )));
    }
    let lead = lead_time.unwrap_or(settings.word_highlight_lead_time);
    if !(lead.is_finite() && lead >= 0.0) {
        return Err(CliError::Arguments(format!("lead time cannot be negative, got {lead}")));
    }

    let mut utterance = Utterance::new(0, text.trim(), Vec::new(), false)
        .ok_or_else(|| CliError::Arguments("text has no words to schedule".to_string()))?;
    utterance.apply_timing(duration, &TimingEstimator::new(settings.timing, lead));
    Ok(utterance)
}

pub fn render_schedule(utterance: &Utterance) -> String {
    let mut out = format!("{:>3}  {:<20}  {:>8}  {:>8}  SYL\n", "#", "WORD", "START", "LENGTH");
    for (i, timing) in utterance.word_schedule.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<20}  {:>8}  {:>8}  {:>3}",
            i,
            timing.word,
            format_seconds(timing.start_offset),
            format_seconds(timing.duration),
            timing.syllable_count
        );
    }
    let _ = writeln!(out, "total {}", format_seconds(utterance.duration));
    out
}
