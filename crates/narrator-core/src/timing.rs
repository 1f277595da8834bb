//! Word timing estimation.
//!
//! The synthesizer hands back a finished waveform with no alignment data, so
//! per-word highlight windows are derived from the utterance's total audio
//! duration. Each word receives a share proportional to its weight (syllables
//! by default), words ending in punctuation push the following word back by a
//! short pause, and every start is pulled forward by a small lead time so the
//! highlight lands slightly before the sound.
//!
//! The result is approximate and drifts on long utterances. Nothing corrects
//! it against the audio.

use serde::{Deserialize, Serialize};

use crate::text::{CLAUSE_PUNCTUATION, SENTENCE_PUNCTUATION};
use crate::utterance::WordTiming;

/// Default highlight lead time in seconds.
pub const DEFAULT_LEAD_TIME: f64 = 0.05;

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'y'];

/// How the utterance duration is shared out between words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingStrategy {
    /// Proportional to the vowel-run syllable estimate.
    #[default]
    Syllables,
    /// Proportional to the number of alphanumeric characters.
    Characters,
}

/// Tunables for [`TimingEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub strategy: WeightingStrategy,

    /// Floor for a single word's highlight duration, in seconds.
    pub min_word_duration: f64,

    /// Schedule gap after a word ending in `.`, `!` or `?`.
    pub sentence_pause: f64,

    /// Schedule gap after a word ending in `,`, `;` or `:`.
    pub clause_pause: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            strategy: WeightingStrategy::Syllables,
            min_word_duration: 0.05,
            sentence_pause: 0.15,
            clause_pause: 0.08,
        }
    }
}

/// Builds word schedules from a total duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingEstimator {
    config: TimingConfig,
    lead_time: f64,
}

impl Default for TimingEstimator {
    fn default() -> Self {
        Self::new(TimingConfig::default(), DEFAULT_LEAD_TIME)
    }
}

impl TimingEstimator {
    /// Negative lead times are treated as zero.
    #[must_use]
    pub fn new(config: TimingConfig, lead_time: f64) -> Self {
        Self {
            config,
            lead_time: lead_time.max(0.0),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &TimingConfig {
        &self.config
    }

    #[must_use]
    pub const fn lead_time(&self) -> f64 {
        self.lead_time
    }

    /// Produce one [`WordTiming`] per word, in order.
    ///
    /// Start offsets are non-decreasing. Every window ends at or before
    /// `total_duration`: when pauses and minimum durations would push the
    /// last word past the end, the whole schedule is compressed to fit. A
    /// non-positive duration yields an all-zero schedule.
    #[must_use]
    pub fn estimate(&self, words: &[String], total_duration: f64) -> Vec<WordTiming> {
        let syllables: Vec<u32> = words.iter().map(|w| syllable_count(w)).collect();

        if total_duration.is_nan() || total_duration <= 0.0 {
            return words
                .iter()
                .zip(&syllables)
                .map(|(word, &syllable_count)| WordTiming {
                    word: word.clone(),
                    start_offset: 0.0,
                    duration: 0.0,
                    syllable_count,
                })
                .collect();
        }

        let weights: Vec<u32> = match self.config.strategy {
            WeightingStrategy::Syllables => syllables.clone(),
            WeightingStrategy::Characters => words.iter().map(|w| character_weight(w)).collect(),
        };
        let total_weight: u32 = weights.iter().sum();
        let per_unit = total_duration / f64::from(total_weight.max(1));

        let mut raw = Vec::with_capacity(words.len());
        let mut current_time = 0.0_f64;
        let mut end = 0.0_f64;

        for (word, &weight) in words.iter().zip(&weights) {
            let duration = (per_unit * f64::from(weight)).max(self.config.min_word_duration);
            raw.push((current_time, duration));
            end = current_time + duration;
            current_time = end + self.pause_after(word);
        }

        let scale = if end > total_duration {
            total_duration / end
        } else {
            1.0
        };

        words
            .iter()
            .zip(&syllables)
            .zip(raw)
            .map(|((word, &syllable_count), (start, duration))| WordTiming {
                word: word.clone(),
                start_offset: start.mul_add(scale, -self.lead_time).max(0.0),
                duration: duration * scale,
                syllable_count,
            })
            .collect()
    }

    fn pause_after(&self, word: &str) -> f64 {
        let last = word
            .trim_end_matches(['"', '\'', ')', ']', '\u{201D}', '\u{2019}'])
            .chars()
            .next_back();

        match last {
            Some(c) if SENTENCE_PUNCTUATION.contains(&c) => self.config.sentence_pause,
            Some(c) if CLAUSE_PUNCTUATION.contains(&c) => self.config.clause_pause,
            _ => 0.0,
        }
    }
}

/// Estimate word timing with the default configuration and lead time.
#[must_use]
pub fn estimate_word_timing(words: &[String], total_duration: f64) -> Vec<WordTiming> {
    TimingEstimator::default().estimate(words, total_duration)
}

/// Vowel-run syllable heuristic.
///
/// Each run of `a e i o u y` counts once; a trailing `e` is treated as silent.
/// Every token, punctuation included, counts at least one.
#[must_use]
pub fn syllable_count(word: &str) -> u32 {
    let lower = word.to_lowercase();
    let letters: String = lower.chars().filter(|c| c.is_alphabetic()).collect();

    let mut count = 0_u32;
    let mut in_vowel_run = false;
    for c in letters.chars() {
        let is_vowel = VOWELS.contains(&c);
        if is_vowel && !in_vowel_run {
            count += 1;
        }
        in_vowel_run = is_vowel;
    }

    if letters.ends_with('e') {
        count = count.saturating_sub(1).max(1);
    }

    count.max(1)
}

fn character_weight(word: &str) -> u32 {
    let chars = word.chars().filter(|c| c.is_alphanumeric()).count();
    u32::try_from(chars).unwrap_or(u32::MAX).max(1)
}
