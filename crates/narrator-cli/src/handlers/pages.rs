//! `narrator pages`: list the pages of a paginated text file.

use std::path::Path;

use anyhow::Result;
use narrator_core::{PageSource, TextFilePageSource, segment_with_page};

use crate::error::CliError;
use crate::presentation::{print_separator, truncate_string};

const PREVIEW_WIDTH: usize = 50;

pub fn execute(file: &Path) -> Result<()> {
    let source = TextFilePageSource::load(file).map_err(CliError::from)?;

    println!("{} ({} pages)", file.display(), source.page_count());
    print_separator(72);
    println!("{:>4}  {:>10}  FIRST LINE", "PAGE", "UTTERANCES");
    for summary in summarize(&source) {
        println!(
            "{:>4}  {:>10}  {}",
            summary.index,
            summary.utterances,
            truncate_string(&summary.first_line, PREVIEW_WIDTH)
        );
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub struct PageSummary {
    pub index: usize,
    pub utterances: usize,
    pub first_line: String,
}

pub fn summarize(source: &dyn PageSource) -> Vec<PageSummary> {
    (0..source.page_count())
        .filter_map(|index| {
            let text = source.page_text(index)?;
            let first_line = text
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default()
                .to_string();
            Some(PageSummary {
                index,
                utterances: segment_with_page(text, Some(index)).len(),
                first_line,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summaries_per_page() {
        let source =
            TextFilePageSource::from_text("Chapter One\nIt began. Then more.\x0c\n\n  Last page.\x0c");
        let summaries = summarize(&source);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].utterances, 3);
        assert_eq!(summaries[0].first_line, "Chapter One");
        assert_eq!(
            summaries[1],
            PageSummary {
                index: 1,
                utterances: 1,
                first_line: "Last page.".to_string()
            }
        );
    }
}
