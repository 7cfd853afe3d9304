//! Output module for crawl statistics and store reports
//!
//! This module handles:
//! - Periodic throughput lines while a crawl runs
//! - Summaries of a finished run
//! - Offline totals and docid-log pruning for an existing store

pub mod stats;
mod store;

pub use stats::{format_stats_line, print_statistics, CrawlStatistics, StatsReporter};
pub use store::{print_store_summary, prune_docid_log, summarize_store, StoreSummary};
