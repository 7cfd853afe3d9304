//! Crawl policy gate
//!
//! Every freshly discovered URL passes through a [`CrawlPolicy`] before it
//! receives a docid. The crawler does not enforce robots.txt; the default
//! gate admits everything.

use crate::url::CanonicalUrl;

/// Decides whether a discovered URL may be scheduled
pub trait CrawlPolicy: Send + Sync {
    /// Returns true if `url` may be fetched
    fn allows(&self, url: &CanonicalUrl) -> bool;
}

/// Policy that permits every URL
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl CrawlPolicy for AllowAll {
    fn allows(&self, _url: &CanonicalUrl) -> bool {
        true
    }
}
