//! Collaborator interfaces the speech engine talks to.
//!
//! Implementations live in adapter crates or in the embedding application.

mod highlight;
mod observer;
mod page_source;

pub use highlight::{HighlightSink, NoopHighlightSink};
pub use observer::SpeechObserver;
pub use page_source::{PageSource, PageSourceError};
