//! Paginated text source interface.

use std::path::PathBuf;

/// A document split into pages of plain text.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Text of page `index`, if it exists.
    fn page_text(&self, index: usize) -> Option<&str>;

    fn current_page(&self) -> usize;

    fn set_current_page(&mut self, index: usize) -> Result<(), PageSourceError>;
}

/// Paginated source error.
#[derive(Debug, thiserror::Error)]
pub enum PageSourceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
}
