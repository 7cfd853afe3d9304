//! Crawler coordinator - crawl bootstrap and shutdown
//!
//! This module wires the crawl together:
//! - Opening the store (docid log, error log, page tree)
//! - Replaying the docid log and enqueueing the seeds
//! - Starting the worker pool and the stats reporter
//! - Stopping everything and joining the threads

use crate::config::{validate, Config};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::parser::{Extractor, HtmlExtractor};
use crate::crawler::scheduler::{Scheduler, POLITENESS_INTERVAL};
use crate::crawler::worker::{Collaborators, WorkerPool};
use crate::output::{CrawlStatistics, StatsReporter};
use crate::robots::CrawlPolicy;
use crate::storage::{DiskPageStore, DocIdRegistry, ErrorLog, PageStore, STATS_FILE};
use crate::Result;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builds and starts a crawl
///
/// The default collaborators (`HttpFetcher`, `HtmlExtractor`,
/// `DiskPageStore`) can be replaced before [`Coordinator::start`].
pub struct Coordinator {
    config: Config,
    politeness: Duration,
    fetcher: Option<Arc<dyn Fetcher>>,
    extractor: Option<Arc<dyn Extractor>>,
    store: Option<Arc<dyn PageStore>>,
    policy: Option<Arc<dyn CrawlPolicy>>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            politeness: POLITENESS_INTERVAL,
            fetcher: None,
            extractor: None,
            store: None,
            policy: None,
        }
    }

    /// Overrides the per-host politeness interval
    pub fn politeness(mut self, interval: Duration) -> Self {
        self.politeness = interval;
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn store(mut self, store: Arc<dyn PageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn policy(mut self, policy: Arc<dyn CrawlPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Starts the crawl
    ///
    /// This method:
    /// 1. Validates the configuration and opens the docid registry and
    ///    error log (failure here is fatal)
    /// 2. Replays the docid log into the scheduler
    /// 3. Enqueues the configured seeds
    /// 4. Starts the stats reporter (unless disabled) and the workers
    ///
    /// # Returns
    ///
    /// * `Ok(RunningCrawl)` - Handle used to stop the crawl
    /// * `Err(CrawlError)` - Invalid configuration, or the store or the HTTP
    ///   client could not be set up
    pub fn start(self) -> Result<RunningCrawl> {
        validate(&self.config)?;
        let store_dir = PathBuf::from(&self.config.storage.store_dir);

        let registry = Arc::new(DocIdRegistry::open(&store_dir)?);
        let errors = Arc::new(ErrorLog::open(&store_dir)?);

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(&self.config.user_agent)?),
        };
        let extractor: Arc<dyn Extractor> = match self.extractor {
            Some(extractor) => extractor,
            None => Arc::new(HtmlExtractor::new()?),
        };
        let store: Arc<dyn PageStore> = self
            .store
            .unwrap_or_else(|| Arc::new(DiskPageStore::new(&store_dir)));

        let mut scheduler = Scheduler::with_politeness(registry, self.politeness);
        if let Some(policy) = self.policy {
            scheduler = scheduler.with_policy(policy);
        }
        let scheduler = Arc::new(scheduler);

        scheduler.restore()?;
        let seeded = scheduler.enqueue(&self.config.crawler.seeds);
        tracing::info!(
            "Enqueued {} new pages from {} seeds",
            seeded,
            self.config.crawler.seeds.len()
        );

        let reporter = match self.config.stats.interval_secs {
            0 => None,
            secs => Some(StatsReporter::spawn(
                Arc::clone(&scheduler),
                Duration::from_secs(secs),
                Some(store_dir.join(STATS_FILE)),
            )?),
        };

        let collaborators = Collaborators {
            fetcher,
            extractor,
            store,
            errors,
        };
        let pool = WorkerPool::spawn(
            self.config.crawler.workers,
            Arc::clone(&scheduler),
            collaborators,
        )?;

        Ok(RunningCrawl {
            scheduler,
            pool,
            reporter,
        })
    }
}

/// Handle to a crawl in progress
pub struct RunningCrawl {
    scheduler: Arc<Scheduler>,
    pool: WorkerPool,
    reporter: Option<StatsReporter>,
}

impl RunningCrawl {
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Stops the crawl and waits for all threads
    ///
    /// Workers finish the page they are on; nothing in flight is aborted.
    pub fn stop(self) -> CrawlStatistics {
        tracing::info!("Stopping crawl");
        self.scheduler.stop();
        self.pool.join();
        if let Some(reporter) = self.reporter {
            reporter.join();
        }

        let stats = self.scheduler.snapshot();
        tracing::info!(
            "Crawl stopped: {} downloaded, {} failed, {} docids",
            stats.downloaded,
            stats.failed,
            stats.found
        );
        stats
    }
}

/// Runs a crawl until a line (or end of input) arrives on stdin
///
/// # Example
///
/// ```no_run
/// use spinneret::config::load_config;
/// use spinneret::crawler::run_crawl;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let stats = run_crawl(config)?;
/// println!("{} pages downloaded", stats.downloaded);
/// # Ok(())
/// # }
/// ```
pub fn run_crawl(config: Config) -> Result<CrawlStatistics> {
    let crawl = Coordinator::new(config).start()?;
    tracing::info!("Crawling; press Enter to stop");

    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        tracing::warn!("Failed to read stdin: {}", e);
    }

    Ok(crawl.stop())
}
