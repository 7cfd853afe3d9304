use crate::url::CanonicalUrl;
use crate::UrlResult;

/// Document id: dense, starts at 1, never reused
pub type DocId = u64;

/// A URL waiting to be fetched, with the docid it was registered under
///
/// Pages are created once by their [`Domain`](super::Domain) and consumed
/// exactly once by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Page {
    /// Canonical URL string
    pub url: String,

    pub docid: DocId,
}

impl Page {
    pub fn new(url: impl Into<String>, docid: DocId) -> Self {
        Self {
            url: url.into(),
            docid,
        }
    }

    /// Parses the page URL back into its canonical form
    pub fn canonical_url(&self) -> UrlResult<CanonicalUrl> {
        CanonicalUrl::parse(&self.url)
    }
}
