//! Live crawl statistics
//!
//! This module provides the counters snapshot taken from the scheduler and
//! the reporter thread that logs throughput at a fixed interval.

use crate::crawler::Scheduler;

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlStatistics {
    /// Pages fetched and stored in this run
    pub downloaded: u64,

    /// Pages that ended in the error log in this run
    pub failed: u64,

    /// Highest docid handed out, across all runs
    pub found: u64,

    /// Number of hosts seen
    pub domains: usize,

    /// Pages waiting to be fetched
    pub pending_pages: usize,

    /// Hosts currently in the ready queue
    pub queued_domains: usize,
}

/// Formats one throughput line
///
/// # Examples
///
/// ```
/// use spinneret::output::format_stats_line;
///
/// assert_eq!(
///     format_stats_line(12, 345),
///     "Stats: 0000000012 downloaded, 0000000345 found"
/// );
/// ```
pub fn format_stats_line(downloaded: u64, found: u64) -> String {
    format!("Stats: {downloaded:010} downloaded, {found:010} found")
}

/// Background thread logging crawl throughput
pub struct StatsReporter {
    handle: JoinHandle<()>,
}

impl StatsReporter {
    /// Starts the reporter
    ///
    /// # Arguments
    ///
    /// * `scheduler` - Source of the counters; the reporter exits when it stops
    /// * `interval` - Time between two lines
    /// * `log_path` - File the timestamped lines are appended to, if any
    pub fn spawn(
        scheduler: Arc<Scheduler>,
        interval: Duration,
        log_path: Option<PathBuf>,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("stats".to_string())
            .spawn(move || report_loop(&scheduler, interval, log_path.as_deref()))?;
        Ok(Self { handle })
    }

    /// Waits for the reporter to notice the scheduler stopped
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("Stats reporter panicked");
        }
    }
}

fn report_loop(scheduler: &Scheduler, interval: Duration, log_path: Option<&Path>) {
    let mut last = scheduler.snapshot();

    while scheduler.wait_while_running(interval) {
        let current = scheduler.snapshot();
        let line = format_stats_line(
            current.downloaded.saturating_sub(last.downloaded),
            current.found.saturating_sub(last.found),
        );
        tracing::info!("{}", line);

        if let Some(path) = log_path {
            if let Err(e) = append_line(path, &line) {
                tracing::warn!("Failed to write {}: {}", path.display(), e);
            }
        }
        last = current;
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{} {}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"), line)
}

/// Prints the statistics of a finished run to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");
    println!("  Downloaded: {}", stats.downloaded);
    println!("  Failed: {}", stats.failed);
    println!("  Docids assigned: {}", stats.found);
    println!("  Domains: {}", stats.domains);
    println!("  Pending pages: {}", stats.pending_pages);
}
