use crate::robots::CrawlPolicy;
use crate::state::{DocId, Page};
use crate::storage::DocIdRegistry;
use crate::url::CanonicalUrl;

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

/// How a URL reached [`Domain::add_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrigin {
    /// Newly found: gets a fresh docid if the policy gate admits it
    Discovered,

    /// Replayed from the docid log and already downloaded
    Fetched,

    /// Replayed from the docid log but not yet downloaded
    Pending(DocId),
}

/// Per-host crawl state
///
/// A `Domain` is owned by the scheduler and only touched under its lock.
/// `known_pages` only grows; it is the dedup set for the host.
#[derive(Debug)]
pub struct Domain {
    name: String,
    known_pages: HashSet<String>,
    pending: VecDeque<Page>,
    next_allowed: Instant,
    in_queue: bool,
}

impl Domain {
    /// Creates the state for a host seen for the first time
    ///
    /// A new domain may be crawled immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            known_pages: HashSet::new(),
            pending: VecDeque::new(),
            next_allowed: Instant::now(),
            in_queue: false,
        }
    }

    /// Records a URL of this host
    ///
    /// # Arguments
    ///
    /// * `url` - The canonical URL (its host is this domain)
    /// * `origin` - Whether the URL is new or replayed from the log
    /// * `registry` - Assigns and persists docids for new URLs
    /// * `policy` - Gate consulted for new URLs
    ///
    /// # Returns
    ///
    /// `true` if a new [`Page`] was appended to the pending queue
    ///
    /// A URL already known to the domain is ignored. A URL rejected by the
    /// gate is remembered as known but never queued. If its docid record
    /// cannot be persisted, the URL is left unknown so a later sighting can
    /// retry.
    pub fn add_page(
        &mut self,
        url: &CanonicalUrl,
        origin: PageOrigin,
        registry: &DocIdRegistry,
        policy: &dyn CrawlPolicy,
    ) -> bool {
        let key = url.to_string();
        if self.known_pages.contains(&key) {
            return false;
        }

        match origin {
            PageOrigin::Fetched => {
                self.known_pages.insert(key);
                false
            }
            PageOrigin::Pending(docid) => {
                self.pending.push_back(Page::new(key.clone(), docid));
                self.known_pages.insert(key);
                true
            }
            PageOrigin::Discovered => {
                if !policy.allows(url) {
                    tracing::trace!("Policy rejected {} on {}", key, self.name);
                    self.known_pages.insert(key);
                    return false;
                }

                match registry.register(&key) {
                    Ok(docid) => {
                        tracing::trace!("Registered docid {} for {}", docid, key);
                        self.pending.push_back(Page::new(key.clone(), docid));
                        self.known_pages.insert(key);
                        true
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to persist docid for {} on {}: {}",
                            key,
                            self.name,
                            e
                        );
                        false
                    }
                }
            }
        }
    }

    /// Removes the oldest pending page
    pub fn pop_page(&mut self) -> Option<Page> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if `url` (canonical string form) was ever seen
    pub fn knows(&self, url: &str) -> bool {
        self.known_pages.contains(url)
    }

    pub fn known_len(&self) -> usize {
        self.known_pages.len()
    }

    pub fn next_allowed(&self) -> Instant {
        self.next_allowed
    }

    /// Postpones the next fetch of this host
    pub fn set_next_allowed(&mut self, at: Instant) {
        self.next_allowed = at;
    }

    pub fn is_queued(&self) -> bool {
        self.in_queue
    }

    pub fn set_queued(&mut self, queued: bool) {
        self.in_queue = queued;
    }

    /// Returns true if the domain has work but is not in the ready queue
    pub fn needs_queueing(&self) -> bool {
        self.has_pending() && !self.in_queue
    }
}
