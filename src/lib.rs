//! Spinneret: a polite, persistent, multi-threaded web crawler
//!
//! This crate discovers URLs, groups them by host and fetches them while
//! respecting a per-host minimum revisit interval. Every distinct canonical
//! URL receives a document id from a dense, monotonically increasing
//! sequence that survives process restarts.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("BAD REDIRECT from {url} to unsupported target {target}")]
    UnsupportedRedirect { url: String, target: String },

    #[error("Not an HTML or XML document: {content_type}")]
    NotHtml { content_type: String },

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// Both variants are dropped silently at the scheduler boundary; they only
/// surface to callers that parse URLs directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid URL: {0}")]
    Invalid(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, Scheduler};
pub use state::{DocId, Domain, Page};
pub use storage::DocIdRegistry;
pub use url::CanonicalUrl;
