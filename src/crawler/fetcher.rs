//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the blocking HTTP client with a descriptive user agent
//! - Following redirects (at most 10 hops)
//! - Rejecting redirect targets the crawler cannot canonicalize
//! - Rejecting non-markup content

use crate::config::UserAgentConfig;
use crate::url::CanonicalUrl;
use crate::{CrawlError, Result};

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::time::Duration;

/// Overall time allowed for a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum number of redirects followed for a single page
pub const MAX_REDIRECTS: usize = 10;

/// A successfully downloaded document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Canonical URL after redirects
    pub final_url: CanonicalUrl,

    /// Content-Type header value (empty if absent)
    pub content_type: String,

    /// Raw body bytes
    pub body: Vec<u8>,
}

/// Downloads pages for the workers
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, following redirects
    ///
    /// # Errors
    ///
    /// * `CrawlError::Transport` - network failure or a non-200 final status
    /// * `CrawlError::UnsupportedRedirect` - the final URL is not a crawlable http URL
    /// * `CrawlError::NotHtml` - the Content-Type is neither HTML nor XML
    fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage>;
}

/// Formats the user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds the blocking HTTP client shared by all workers
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent(config))
        .timeout(REQUEST_TIMEOUT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if the Content-Type names an HTML or XML document
pub fn is_markup(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("html") || lowered.contains("xml")
}

/// Fetcher backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage> {
        let requested = url.to_string();
        let transport = |message: String| CrawlError::Transport {
            url: requested.clone(),
            message,
        };

        let response = self
            .client
            .get(&requested)
            .send()
            .map_err(|e| transport(e.to_string()))?;

        let target = response.url().to_string();
        let final_url = match CanonicalUrl::parse(&target) {
            Ok(parsed) if parsed.is_crawlable() => parsed,
            _ => {
                return Err(CrawlError::UnsupportedRedirect {
                    url: requested.clone(),
                    target,
                })
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(transport(format!("unexpected status {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_markup(&content_type) {
            return Err(CrawlError::NotHtml { content_type });
        }

        let body = response
            .bytes()
            .map_err(|e| transport(e.to_string()))?
            .to_vec();

        tracing::debug!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(FetchedPage {
            final_url,
            content_type,
            body,
        })
    }
}
