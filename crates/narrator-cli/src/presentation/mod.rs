//! Terminal rendering for CLI output.

pub mod highlight;
pub mod tables;

pub use highlight::TerminalHighlighter;
pub use tables::{format_seconds, print_separator, truncate_string};
