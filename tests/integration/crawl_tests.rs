//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end. The crawler itself is blocking, so
//! every crawl runs inside `spawn_blocking` while the mock server keeps
//! serving on the async runtime.

use spinneret::config::{Config, CrawlerConfig, StatsConfig, StorageConfig, UserAgentConfig};
use spinneret::crawler::{Coordinator, RunningCrawl};
use spinneret::output::CrawlStatistics;
use spinneret::storage::{docid_path, read_docid_log, DATA_FILE, ERROR_LOG_FILE, META_FILE};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `seeds` into `store_dir`
fn create_test_config(store_dir: &Path, seeds: Vec<String>) -> Config {
    Config {
        crawler: CrawlerConfig { workers: 3, seeds },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            store_dir: store_dir.to_string_lossy().into_owned(),
        },
        stats: StatsConfig { interval_secs: 0 },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

/// Waits until `processed` pages have either been stored or logged as failed
fn wait_for_processed(crawl: &RunningCrawl, processed: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let stats = crawl.scheduler().snapshot();
        if stats.downloaded + stats.failed >= processed || Instant::now() >= deadline {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Runs a crawl until `processed` pages are done, then stops it
async fn crawl_until(config: Config, processed: u64) -> CrawlStatistics {
    tokio::task::spawn_blocking(move || {
        let crawl = Coordinator::new(config)
            .politeness(Duration::ZERO)
            .start()
            .expect("Failed to start crawl");
        wait_for_processed(&crawl, processed);
        crawl.stop()
    })
    .await
    .expect("Crawl thread panicked")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_crawl_single_host() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home</title></head><body>
            <a href="/page1">Page 1</a>
            <a href="page2#top">Page 2</a>
            <a href="mailto:someone@example.com">Mail</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(
            r#"<html><body><a href="/">Home</a><a href="./page2">Again</a></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(
            r#"<html><head><meta name="robots" content="noindex"></head><body>Content 2</body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = TempDir::new().unwrap();
    let config = create_test_config(store.path(), vec![format!("{}/", base_url)]);

    let stats = crawl_until(config, 3).await;

    assert_eq!(stats.downloaded, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.found, 3);

    let records = read_docid_log(&store.path().join("docids")).unwrap();
    let urls: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls[0], format!("{}/", base_url));
    assert!(urls.contains(&format!("{}/page1", base_url)));
    assert!(urls.contains(&format!("{}/page2", base_url)));

    for record in &records {
        let dir = docid_path(store.path(), record.docid);
        assert!(dir.join(DATA_FILE).is_file(), "missing data for {}", record.url);
        assert!(dir.join(META_FILE).is_file(), "missing meta for {}", record.url);
    }

    let page2 = records
        .iter()
        .find(|r| r.url.ends_with("/page2"))
        .unwrap();
    let meta = fs::read_to_string(docid_path(store.path(), page2.docid).join(META_FILE)).unwrap();
    assert!(meta.contains("robots: follow,noindex"), "meta was {meta:?}");

    let errors = fs::read_to_string(store.path().join(ERROR_LOG_FILE)).unwrap();
    assert!(errors.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failures_go_to_error_log() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/missing">Missing</a><a href="/document.pdf">PDF</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/document.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0x25, 0x50, 0x44, 0x46], "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let store = TempDir::new().unwrap();
    let config = create_test_config(store.path(), vec![format!("{}/", base_url)]);

    let stats = crawl_until(config, 3).await;

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.failed, 2);

    let errors = fs::read_to_string(store.path().join(ERROR_LOG_FILE)).unwrap();
    let lines: Vec<&str> = errors.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines
        .iter()
        .any(|line| line.contains("/missing ERR") && line.contains("404")));
    assert!(lines
        .iter()
        .any(|line| line.contains("/document.pdf ERR") && line.contains("application/pdf")));

    let records = read_docid_log(&store.path().join("docids")).unwrap();
    let missing = records.iter().find(|r| r.url.ends_with("/missing")).unwrap();
    assert!(!docid_path(store.path(), missing.docid).join(DATA_FILE).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_does_not_redownload() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/a">A</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<p>leaf</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<p>second run</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = TempDir::new().unwrap();

    let first = create_test_config(store.path(), vec![format!("{}/", base_url)]);
    let stats = crawl_until(first, 2).await;
    assert_eq!(stats.downloaded, 2);

    let second = create_test_config(
        store.path(),
        vec![format!("{}/", base_url), format!("{}/b", base_url)],
    );
    let stats = crawl_until(second, 1).await;

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.found, 3);

    let records = read_docid_log(&store.path().join("docids")).unwrap();
    let ids: Vec<u64> = records.iter().map(|r| r.docid).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(records[2].url, format!("{}/b", base_url));
}
