//! Storage traits and error types
//!
//! This module defines the trait interface for page storage backends and
//! the errors shared by every on-disk structure of the crawl store.

use crate::state::DocId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt docid log record at line {line}: {content:?}")]
    Corrupt { line: usize, content: String },

    #[error("URL cannot be stored on one log line: {url:?}")]
    MultilineUrl { url: String },

    #[error("Storage unavailable at {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata written next to every stored page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    /// Name of the detected text encoding
    pub encoding: String,

    /// Whether links on the page may be followed
    pub follow: bool,

    /// Whether the page may be indexed
    pub index: bool,
}

impl PageMeta {
    /// Renders the `meta` file contents
    ///
    /// ```text
    /// encoding: utf-8
    /// robots: follow,noindex
    /// ```
    pub fn render(&self) -> String {
        format!(
            "encoding: {}\nrobots: {},{}\n",
            self.encoding,
            if self.follow { "follow" } else { "nofollow" },
            if self.index { "index" } else { "noindex" },
        )
    }
}

/// Trait for page storage implementations
///
/// Implementations must be safe to share between worker threads. Each
/// docid is written by exactly one worker, so implementations need no
/// per-page locking.
pub trait PageStore: Send + Sync {
    /// Stores the bytes and metadata of a downloaded page
    ///
    /// # Arguments
    ///
    /// * `docid` - The document id the page was registered under
    /// * `meta` - Encoding and robots directives
    /// * `data` - The raw bytes as fetched
    ///
    /// The page must only be reported complete (see [`PageStore::has_page`])
    /// once both parts are written.
    fn write_page(&self, docid: DocId, meta: &PageMeta, data: &[u8]) -> StorageResult<()>;

    /// Returns true if the page for `docid` was completely written
    fn has_page(&self, docid: DocId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_render_defaults() {
        let meta = PageMeta {
            encoding: "utf-8".to_string(),
            follow: true,
            index: true,
        };
        assert_eq!(meta.render(), "encoding: utf-8\nrobots: follow,index\n");
    }

    #[test]
    fn test_meta_render_restricted() {
        let meta = PageMeta {
            encoding: "iso-8859-1".to_string(),
            follow: false,
            index: false,
        };
        assert_eq!(
            meta.render(),
            "encoding: iso-8859-1\nrobots: nofollow,noindex\n"
        );
    }
}
