//! Scheduler for the crawl frontier and per-host politeness
//!
//! This module handles:
//! - Grouping discovered URLs by host and deduplicating them per host
//! - Assigning docids to new URLs through the registry
//! - A min-heap of hosts ordered by the time they may next be fetched
//! - Blocking hand-out of pages to worker threads
//! - Replaying the docid log after a restart

use crate::output::CrawlStatistics;
use crate::robots::{AllowAll, CrawlPolicy};
use crate::state::{DocId, Domain, Page, PageOrigin};
use crate::storage::{DocIdRegistry, StorageResult};
use crate::url::CanonicalUrl;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Minimum delay between two fetches from the same host
pub const POLITENESS_INTERVAL: Duration = Duration::from_secs(30);

/// A host waiting in the ready queue
///
/// The key is frozen when the entry is pushed. A domain whose next-allowed
/// time changes is popped and pushed again, never updated in place.
#[derive(Debug, PartialEq, Eq)]
struct QueuedDomain {
    ready_at: Instant,
    seq: u64,
    name: String,
}

// BinaryHeap is a max-heap; reverse so the earliest ready time pops first,
// with ties served in insertion order
impl Ord for QueuedDomain {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .ready_at
            .cmp(&self.ready_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedDomain {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct SchedulerState {
    domains: HashMap<String, Domain>,
    queue: BinaryHeap<QueuedDomain>,
    next_seq: u64,
}

impl SchedulerState {
    /// Puts the domain in the ready queue if it has work and is not queued
    fn push_if_needed(&mut self, name: &str) -> bool {
        let Some(domain) = self.domains.get_mut(name) else {
            return false;
        };
        if !domain.needs_queueing() {
            return false;
        }

        domain.set_queued(true);
        let ready_at = domain.next_allowed();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(QueuedDomain {
            ready_at,
            seq,
            name: name.to_string(),
        });
        true
    }

    /// Takes the next page of a domain just popped from the queue
    fn take_page(&mut self, name: &str, next_allowed: Instant) -> Option<Page> {
        let domain = self.domains.get_mut(name)?;
        domain.set_queued(false);
        domain.set_next_allowed(next_allowed);
        let page = domain.pop_page();
        self.push_if_needed(name);
        page
    }
}

/// Outcome of replaying the docid log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    /// Entries whose page was already downloaded
    pub fetched: usize,

    /// Entries queued again for download
    pub pending: usize,

    /// Highest docid found in the log
    pub last_id: DocId,
}

/// Scheduler hands out pages to workers
///
/// The scheduler coordinates:
/// - Per-host dedup (through each [`Domain`])
/// - Per-host politeness (a host is served at most once per interval)
/// - Fairness across hosts (the host ready the earliest is served first)
///
/// All domain and queue state sits behind one mutex; blocked workers wait
/// on the paired condition variable. Independent schedulers share nothing.
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    ready: Condvar,
    registry: Arc<DocIdRegistry>,
    policy: Arc<dyn CrawlPolicy>,
    politeness: Duration,
    running: AtomicBool,
    downloaded: AtomicU64,
    failed: AtomicU64,
}

impl Scheduler {
    /// Creates a scheduler using the standard politeness interval
    pub fn new(registry: Arc<DocIdRegistry>) -> Self {
        Self::with_politeness(registry, POLITENESS_INTERVAL)
    }

    /// Creates a scheduler with an explicit politeness interval
    ///
    /// # Arguments
    ///
    /// * `registry` - Assigns and persists docids
    /// * `politeness` - Minimum delay between two fetches from one host
    pub fn with_politeness(registry: Arc<DocIdRegistry>, politeness: Duration) -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
            ready: Condvar::new(),
            registry,
            policy: Arc::new(AllowAll),
            politeness,
            running: AtomicBool::new(true),
            downloaded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Replaces the policy gate consulted for new URLs
    pub fn with_policy(mut self, policy: Arc<dyn CrawlPolicy>) -> Self {
        self.policy = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds URLs to the frontier
    ///
    /// Invalid URLs, relative references and unsupported schemes are
    /// dropped silently. Each canonical URL gets at most one docid for
    /// the lifetime of the scheduler.
    ///
    /// # Returns
    ///
    /// The number of new pages queued
    pub fn enqueue<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed: Vec<(CanonicalUrl, PageOrigin)> = urls
            .into_iter()
            .filter_map(|text| {
                let text = text.as_ref();
                match CanonicalUrl::parse(text) {
                    Ok(url) if url.is_crawlable() => Some((url, PageOrigin::Discovered)),
                    Ok(_) => {
                        tracing::trace!("Dropping relative URL {}", text);
                        None
                    }
                    Err(e) => {
                        tracing::trace!("Dropping {}: {}", text, e);
                        None
                    }
                }
            })
            .collect();

        self.insert(parsed)
    }

    /// Inserts canonical URLs grouped by host, under a single lock
    fn insert(&self, urls: Vec<(CanonicalUrl, PageOrigin)>) -> usize {
        let mut groups: Vec<(String, Vec<(CanonicalUrl, PageOrigin)>)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for (url, origin) in urls {
            let Some(host) = url.host().map(str::to_string) else {
                continue;
            };
            let slot = *slots.entry(host.clone()).or_insert_with(|| {
                groups.push((host, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push((url, origin));
        }

        let mut added = 0;
        let mut woke = false;
        {
            let mut state = self.lock();
            for (host, entries) in groups {
                let domain = state
                    .domains
                    .entry(host.clone())
                    .or_insert_with(|| Domain::new(host.clone()));
                for (url, origin) in entries {
                    if domain.add_page(&url, origin, &self.registry, self.policy.as_ref()) {
                        added += 1;
                    }
                }
                woke |= state.push_if_needed(&host);
            }
        }

        if woke {
            self.ready.notify_all();
        }
        added
    }

    /// Returns the next page to fetch, blocking until one is allowed
    ///
    /// Blocks while the ready queue is empty, and while the host at its
    /// head is still inside its politeness interval. The served host may
    /// not be served again before `now + politeness`.
    ///
    /// # Returns
    ///
    /// * `Some(Page)` - A page whose host may be fetched now
    /// * `None` - The scheduler was stopped
    pub fn dequeue(&self) -> Option<Page> {
        let mut state = self.lock();

        loop {
            if !self.running.load(AtomicOrdering::SeqCst) {
                return None;
            }

            let Some(ready_at) = state.queue.peek().map(|head| head.ready_at) else {
                state = self
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let now = Instant::now();
            if ready_at > now {
                state = self
                    .ready
                    .wait_timeout(state, ready_at - now)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
                continue;
            }

            let Some(head) = state.queue.pop() else {
                continue;
            };
            if let Some(page) = state.take_page(&head.name, now + self.politeness) {
                tracing::debug!("Dequeued docid {} {}", page.docid, page.url);
                return Some(page);
            }
        }
    }

    /// Rebuilds the frontier from the docid log
    ///
    /// Downloaded pages are replayed first as known-only; the rest are
    /// queued again under their original docids. The registry counter is
    /// moved past the highest logged id.
    pub fn restore(&self) -> StorageResult<RestoreSummary> {
        let records = self.registry.read_log()?;
        let mut fetched = Vec::new();
        let mut pending = Vec::new();
        let mut last_id = 0;

        for record in records {
            last_id = last_id.max(record.docid);
            let url = match CanonicalUrl::parse(&record.url) {
                Ok(url) if url.is_crawlable() => url,
                _ => {
                    tracing::warn!(
                        "Skipping unusable docid record {} {}",
                        record.docid,
                        record.url
                    );
                    continue;
                }
            };

            if self.was_fetched(record.docid) {
                fetched.push((url, PageOrigin::Fetched));
            } else {
                pending.push((url, PageOrigin::Pending(record.docid)));
            }
        }

        self.registry.advance_to(last_id);
        let fetched_count = fetched.len();
        self.insert(fetched);
        let pending_count = self.insert(pending);

        tracing::info!(
            "Restored {} downloaded and {} pending pages (last docid {})",
            fetched_count,
            pending_count,
            last_id
        );

        Ok(RestoreSummary {
            fetched: fetched_count,
            pending: pending_count,
            last_id,
        })
    }

    /// Returns true if the page of `docid` is already on disk
    pub fn was_fetched(&self, docid: DocId) -> bool {
        self.registry.exists(docid)
    }

    /// Returns true if the canonical form of `url` was ever seen
    pub fn knows(&self, url: &str) -> bool {
        let Ok(url) = CanonicalUrl::parse(url) else {
            return false;
        };
        let Some(host) = url.host() else {
            return false;
        };
        let state = self.lock();
        state
            .domains
            .get(host)
            .is_some_and(|domain| domain.knows(&url.to_string()))
    }

    /// Begins a graceful shutdown
    ///
    /// Every blocked and future [`Scheduler::dequeue`] call returns `None`.
    pub fn stop(&self) {
        let _state = self.lock();
        self.running.store(false, AtomicOrdering::SeqCst);
        self.ready.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(AtomicOrdering::SeqCst)
    }

    /// Sleeps up to `timeout`, waking early when the scheduler stops
    ///
    /// # Returns
    ///
    /// `true` if the scheduler is still running
    pub fn wait_while_running(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if !self.running.load(AtomicOrdering::SeqCst) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            state = self
                .ready
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    pub fn record_download(&self) {
        self.downloaded.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Current counters and frontier sizes
    pub fn snapshot(&self) -> CrawlStatistics {
        let state = self.lock();
        CrawlStatistics {
            downloaded: self.downloaded.load(AtomicOrdering::Relaxed),
            failed: self.failed.load(AtomicOrdering::Relaxed),
            found: self.registry.last_id(),
            domains: state.domains.len(),
            pending_pages: state.domains.values().map(Domain::pending_len).sum(),
            queued_domains: state.queue.len(),
        }
    }

    pub fn politeness(&self) -> Duration {
        self.politeness
    }
}
