use serde::Deserialize;

/// Main configuration structure for Spinneret
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of worker threads, fixed for the whole run
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// URLs enqueued at startup
    #[serde(default)]
    pub seeds: Vec<String>,
}

fn default_workers() -> usize {
    10
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Crawl store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the docid log, error log, stats and page tree
    #[serde(rename = "store-dir")]
    pub store_dir: String,
}

/// Periodic statistics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Seconds between two stats lines; 0 disables the reporter
    #[serde(rename = "interval-secs", default = "default_stats_interval")]
    pub interval_secs: u64,
}

fn default_stats_interval() -> u64 {
    10
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_stats_interval(),
        }
    }
}
