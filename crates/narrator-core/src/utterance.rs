//! The unit of speech carried through synthesis and playback.

use serde::{Deserialize, Serialize};

use crate::text::tokenize_words;
use crate::timing::TimingEstimator;

/// One entry of an utterance's word schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    /// Seconds from the start of the utterance's audio (lead time applied).
    pub start_offset: f64,
    /// Seconds the word stays highlighted.
    pub duration: f64,
    pub syllable_count: u32,
}

impl WordTiming {
    /// Whether `elapsed` falls inside `[start_offset, start_offset + duration)`.
    #[must_use]
    pub fn contains(&self, elapsed: f64) -> bool {
        elapsed >= self.start_offset && elapsed < self.start_offset + self.duration
    }
}

/// A speakable unit of text (a sentence, a chunk of a long sentence, or a
/// title line).
///
/// Created by the segmenter without audio fields. The synthesis pipeline
/// fills in [`duration`](Self::duration) and [`word_schedule`](Self::word_schedule)
/// through [`apply_timing`](Self::apply_timing) once the audio length is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Position in segmentation order (0-based, dense).
    pub index: usize,
    /// Verbatim source fragments this utterance was aligned to.
    pub original_spans: Vec<String>,
    /// Normalized text sent to the synthesizer.
    pub speakable_text: String,
    pub words: Vec<String>,
    pub is_title: bool,
    /// Opaque locator into a paginated source, passed through untouched.
    pub page_reference: Option<usize>,
    /// Audio length in seconds. `0.0` until synthesized.
    pub duration: f64,
    /// One entry per word once timed, empty before.
    pub word_schedule: Vec<WordTiming>,
}

impl Utterance {
    /// Build an untimed utterance.
    ///
    /// Returns `None` when the text has no words; such units never enter the
    /// pipeline. An empty `original_spans` falls back to the speakable text.
    #[must_use]
    pub fn new(
        index: usize,
        speakable_text: impl Into<String>,
        original_spans: Vec<String>,
        is_title: bool,
    ) -> Option<Self> {
        let speakable_text = speakable_text.into();
        let words = tokenize_words(&speakable_text);
        if words.is_empty() {
            return None;
        }

        let original_spans = if original_spans.is_empty() {
            vec![speakable_text.clone()]
        } else {
            original_spans
        };

        Some(Self {
            index,
            original_spans,
            speakable_text,
            words,
            is_title,
            page_reference: None,
            duration: 0.0,
            word_schedule: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_page_reference(mut self, page_reference: Option<usize>) -> Self {
        self.page_reference = page_reference;
        self
    }

    /// Whether synthesis has populated the duration and schedule.
    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.word_schedule.len() == self.words.len() && !self.word_schedule.is_empty()
    }

    /// Record the synthesized duration and compute the word schedule.
    pub fn apply_timing(&mut self, duration: f64, estimator: &TimingEstimator) {
        self.duration = duration.max(0.0);
        self.word_schedule = estimator.estimate(&self.words, self.duration);
    }

    /// Index of the word whose window contains `elapsed`, if any.
    ///
    /// Windows may overlap slightly because of the lead time; the latest
    /// started word wins. Gaps between windows (pauses) and time before the
    /// first window yield `None`.
    #[must_use]
    pub fn word_at(&self, elapsed: f64) -> Option<usize> {
        let started = self
            .word_schedule
            .partition_point(|w| w.start_offset <= elapsed);
        let candidate = started.checked_sub(1)?;
        self.word_schedule[candidate]
            .contains(elapsed)
            .then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::TimingConfig;

    fn timed(text: &str, duration: f64, lead: f64) -> Utterance {
        let mut utterance = Utterance::new(0, text, Vec::new(), false).unwrap();
        utterance.apply_timing(duration, &TimingEstimator::new(TimingConfig::default(), lead));
        utterance
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(Utterance::new(0, "  \n ", Vec::new(), false).is_none());
    }

    #[test]
    fn missing_spans_fall_back_to_speakable_text() {
        let utterance = Utterance::new(3, "Hello there.", Vec::new(), false).unwrap();
        assert_eq!(utterance.original_spans, vec!["Hello there."]);
        assert_eq!(utterance.words, vec!["Hello", "there", "."]);
        assert_eq!(utterance.index, 3);
        assert!(!utterance.is_timed());
    }

    #[test]
    fn apply_timing_fills_one_entry_per_word() {
        let utterance = timed("The dog ran.", 1.2, 0.05);
        assert!(utterance.is_timed());
        assert_eq!(utterance.word_schedule.len(), utterance.words.len());
        assert!((utterance.duration - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn word_at_walks_the_schedule() {
        let utterance = timed("The dog ran.", 1.2, 0.0);
        assert_eq!(utterance.word_at(0.0), Some(0));
        assert_eq!(utterance.word_at(0.31), Some(1));
        assert_eq!(utterance.word_at(0.65), Some(2));
        assert_eq!(utterance.word_at(1.0), Some(3));
        assert_eq!(utterance.word_at(1.25), None);
    }

    #[test]
    fn word_at_prefers_later_word_on_overlap() {
        let utterance = timed("The dog ran.", 1.2, 0.05);
        // "dog" starts at 0.25 while "The" runs until 0.3
        assert_eq!(utterance.word_at(0.27), Some(1));
    }

    #[test]
    fn word_at_is_none_inside_a_pause() {
        let estimator = TimingEstimator::new(TimingConfig::default(), 0.0);
        let mut utterance = Utterance::new(0, "Stop, go", Vec::new(), false).unwrap();
        utterance.apply_timing(30.0, &estimator);

        let comma = &utterance.word_schedule[1];
        let gap = comma.start_offset + comma.duration + 0.01;
        assert!(gap < utterance.word_schedule[2].start_offset);
        assert_eq!(utterance.word_at(gap), None);
    }
}
