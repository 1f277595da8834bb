//! `narrator segment`: show the utterances a text splits into.

use std::fmt::Write;

use anyhow::Result;
use narrator_core::{Utterance, segment};

use crate::presentation::truncate_string;
use crate::utils::input::read_input;

const TEXT_WIDTH: usize = 60;

pub fn execute(input: &str, json: bool) -> Result<()> {
    let text = read_input(input)?;
    let utterances = segment(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&utterances)?);
    } else if utterances.is_empty() {
        println!("Nothing to speak.");
    } else {
        print!("{}", render_table(&utterances));
    }
    Ok(())
}

/// One row per utterance: index, kind, word count, source line count, text.
pub fn render_table(utterances: &[Utterance]) -> String {
    let mut out = format!("{:>4}  {:<5}  {:>5}  {:>5}  TEXT\n", "#", "KIND", "WORDS", "SPANS");
    for u in utterances {
        let kind = if u.is_title { "title" } else { "body" };
        let _ = writeln!(
            out,
            "{:>4}  {:<5}  {:>5}  {:>5}  {}",
            u.index,
            kind,
            u.words.len(),
            u.original_spans.len(),
            truncate_string(&u.speakable_text, TEXT_WIDTH)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rows_follow_reading_order() {
        let table = render_table(&segment("Chapter One\nThe dog ran. It was fast!"));
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("title") && lines[1].ends_with("Chapter One"));
        assert!(lines[2].contains("body") && lines[2].ends_with("The dog ran."));
        assert!(lines[3].trim_start().starts_with('2'));
    }
}
