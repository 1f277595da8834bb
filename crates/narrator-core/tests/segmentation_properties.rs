//! Segmentation and timing properties over a corpus of awkward inputs.

use std::fmt::Write;
use std::time::{Duration, Instant};

use narrator_core::text::{normalize_whitespace, split_units};
use narrator_core::{TimingEstimator, segment};

const CORPUS: &[&str] = &[
    "Chapter One\nThe dog ran. It was fast!",
    "  The   night was\n\n\tdark and   cold.  Nobody\ncame. ",
    "BOOK II\n\nIn the beginning, there was\nlight; then\tthere was sound.",
    "An extra-\n   ordinary claim: it works!   Really? Yes.",
    "no punctuation at all just words",
    "\n\n\n",
    "Short Title\nA paragraph follows here. And continues\nacross lines without end",
    "Wait... what? \"Quoted.\" (Bracketed!) Done",
];

#[test]
fn segmentation_ignores_redundant_whitespace() {
    for text in CORPUS {
        let raw: Vec<String> = segment(text).into_iter().map(|u| u.speakable_text).collect();
        let clean: Vec<String> = segment(&normalize_whitespace(text))
            .into_iter()
            .map(|u| u.speakable_text)
            .collect();
        assert_eq!(raw, clean, "input: {text:?}");
    }
}

#[test]
fn utterances_are_dense_and_never_empty() {
    for text in CORPUS {
        let utterances = segment(text);
        for (expected, utterance) in utterances.iter().enumerate() {
            assert_eq!(utterance.index, expected);
            assert!(!utterance.words.is_empty());
            assert!(!utterance.original_spans.is_empty());
            assert_eq!(utterance.duration, 0.0);
            assert!(utterance.word_schedule.is_empty());
        }
    }
}

#[test]
fn schedules_are_monotonic_and_contained() {
    let estimator = TimingEstimator::default();

    for text in CORPUS {
        for mut utterance in segment(text) {
            for duration in [0.05, 0.7, 2.5, 9.0] {
                utterance.apply_timing(duration, &estimator);
                let schedule = &utterance.word_schedule;

                assert_eq!(schedule.len(), utterance.words.len());
                for (timing, word) in schedule.iter().zip(&utterance.words) {
                    assert_eq!(&timing.word, word);
                    assert!(timing.start_offset >= 0.0);
                    assert!(timing.start_offset + timing.duration <= duration + 0.2);
                }
                for pair in schedule.windows(2) {
                    assert!(pair[0].start_offset <= pair[1].start_offset);
                }
            }
        }
    }
}

#[test]
fn chapter_example_end_to_end() {
    let mut utterances = segment("Chapter One\nThe dog ran. It was fast!");
    let texts: Vec<&str> = utterances.iter().map(|u| u.speakable_text.as_str()).collect();
    assert_eq!(texts, ["Chapter One", "The dog ran.", "It was fast!"]);
    assert!(utterances[0].is_title);

    let dog = &mut utterances[1];
    dog.apply_timing(1.2, &TimingEstimator::default());

    let syllables: Vec<u32> = dog.word_schedule.iter().map(|w| w.syllable_count).collect();
    assert_eq!(syllables, [1, 1, 1, 1]);

    let expected = [0.0, 0.25, 0.55, 0.85];
    for (timing, want) in dog.word_schedule.iter().zip(expected) {
        assert!((timing.start_offset - want).abs() < 1e-6);
        assert!((timing.duration - 0.3).abs() < 1e-6);
    }
}

#[test]
fn titles_are_standalone_units() {
    let units = split_units("Intro text\nChapter 2\nBody one. Body two.");
    assert_eq!(
        units,
        vec![
            ("Intro text".to_string(), false),
            ("Chapter 2".to_string(), true),
            ("Body one.".to_string(), false),
            ("Body two.".to_string(), false),
        ]
    );
}

#[test]
fn large_document_segments_quickly_and_aligns_every_line() {
    let mut text = String::new();
    for line in 0..1_600 {
        writeln!(text, "Line {line}  tells how the quick brown fox jumped over the lazy dog.")
            .unwrap();
    }
    assert!(text.len() > 100_000);

    let started = Instant::now();
    let utterances = segment(&text);
    let elapsed = started.elapsed();

    assert_eq!(utterances.len(), 1_600);
    assert!(elapsed < Duration::from_secs(2), "segmentation took {elapsed:?}");

    for (line, utterance) in utterances.iter().enumerate() {
        let source = format!("Line {line}  tells how the quick brown fox jumped over the lazy dog.");
        assert_eq!(utterance.original_spans, vec![source]);
    }
}

#[test]
fn repeated_paragraphs_align_to_their_own_lines() {
    let text = "The bell rang.\n\nThe  bell rang.\n\nThe   bell rang.";
    let spans: Vec<Vec<String>> = segment(text).into_iter().map(|u| u.original_spans).collect();
    assert_eq!(spans, vec![
        vec!["The bell rang.".to_string()],
        vec!["The  bell rang.".to_string()],
        vec!["The   bell rang.".to_string()],
    ]);
}
