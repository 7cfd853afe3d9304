//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Page`: a URL waiting to be fetched, paired with its docid
//! - `Domain`: per-host dedup set, pending FIFO and next-allowed fetch time

mod domain;
mod page;

// Re-export main types
pub use domain::{Domain, PageOrigin};
pub use page::{DocId, Page};
