//! Plain-text paginated documents.

use std::path::{Path, PathBuf};

use crate::ports::{PageSource, PageSourceError};

/// Page separator in text exports (form feed, as written by `pdftotext`).
pub const PAGE_SEPARATOR: char = '\x0c';

/// A UTF-8 text file whose pages are separated by form feeds.
///
/// A file without separators is a single page. A trailing separator does not
/// create an extra empty page.
#[derive(Debug, Clone)]
pub struct TextFilePageSource {
    path: PathBuf,
    pages: Vec<String>,
    current: usize,
}

impl TextFilePageSource {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PageSourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PageSourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let source = Self::from_text(&content).with_path(path);
        tracing::debug!(path = %path.display(), pages = source.pages.len(), "loaded text pages");
        Ok(source)
    }

    /// Paginate in-memory text.
    #[must_use]
    pub fn from_text(content: &str) -> Self {
        let mut pages: Vec<String> = content.split(PAGE_SEPARATOR).map(str::to_string).collect();
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }

        Self {
            path: PathBuf::new(),
            pages,
            current: 0,
        }
    }

    fn with_path(mut self, path: &Path) -> Self {
        self.path = path.to_path_buf();
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn pages(&self) -> &[String] {
        &self.pages
    }
}

impl PageSource for TextFilePageSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(String::as_str)
    }

    fn current_page(&self) -> usize {
        self.current
    }

    fn set_current_page(&mut self, index: usize) -> Result<(), PageSourceError> {
        if index >= self.pages.len() {
            return Err(PageSourceError::PageOutOfRange {
                index,
                count: self.pages.len(),
            });
        }
        self.current = index;
        Ok(())
    }
}
