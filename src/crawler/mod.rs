//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Per-host scheduling with a politeness interval
//! - HTTP fetching and charset detection
//! - HTML link and robots-meta extraction
//! - Worker threads and crawl coordination

mod charset;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod worker;

pub use charset::{charset_from_content_type, detect, Charset, Decoded};
pub use coordinator::{run_crawl, Coordinator, RunningCrawl};
pub use fetcher::{
    build_http_client, is_markup, user_agent, FetchedPage, Fetcher, HttpFetcher, MAX_REDIRECTS,
    REQUEST_TIMEOUT,
};
pub use parser::{Extracted, Extractor, HtmlExtractor};
pub use scheduler::{RestoreSummary, Scheduler, POLITENESS_INTERVAL};
pub use worker::{effective_base, resolve_links, Collaborators, Worker, WorkerPool};
