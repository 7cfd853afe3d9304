//! Worker threads
//!
//! Each worker loops on [`Scheduler::dequeue`]: fetch the page, extract its
//! links, feed them back to the scheduler and store the page. A failing page
//! becomes one record in the error log and never stops the worker.

use crate::crawler::charset::charset_from_content_type;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::Extractor;
use crate::crawler::scheduler::Scheduler;
use crate::state::Page;
use crate::storage::{ErrorLog, PageMeta, PageStore};
use crate::url::CanonicalUrl;
use crate::Result;

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// External collaborators shared by every worker
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn Extractor>,
    pub store: Arc<dyn PageStore>,
    pub errors: Arc<ErrorLog>,
}

/// Picks the URL relative links are resolved against
///
/// A `<base href>` replaces the final URL when it resolves to a crawlable
/// URL; otherwise it is ignored.
pub fn effective_base(final_url: &CanonicalUrl, base_href: Option<&str>) -> CanonicalUrl {
    base_href
        .and_then(|href| final_url.join(href).ok())
        .filter(CanonicalUrl::is_crawlable)
        .unwrap_or_else(|| final_url.clone())
}

/// Resolves raw link strings into canonical absolute URLs
///
/// Links that fail to parse or do not resolve to a crawlable URL are
/// dropped. Fragments are removed.
pub fn resolve_links(base: &CanonicalUrl, links: &[String]) -> Vec<String> {
    links
        .iter()
        .filter_map(|link| base.join(link).ok())
        .filter(CanonicalUrl::is_crawlable)
        .map(|url| url.without_fragment().to_string())
        .collect()
}

pub struct Worker {
    id: usize,
    scheduler: Arc<Scheduler>,
    collaborators: Collaborators,
}

impl Worker {
    pub fn new(id: usize, scheduler: Arc<Scheduler>, collaborators: Collaborators) -> Self {
        Self {
            id,
            scheduler,
            collaborators,
        }
    }

    /// Processes pages until the scheduler stops
    pub fn run(&self) {
        tracing::debug!("Worker {} started", self.id);
        while let Some(page) = self.scheduler.dequeue() {
            self.process_page(&page);
        }
        tracing::debug!("Worker {} stopped", self.id);
    }

    /// Crawls one page, recording the outcome
    pub fn process_page(&self, page: &Page) {
        match self.crawl_page(page) {
            Ok(found) => {
                self.scheduler.record_download();
                tracing::debug!(
                    "Stored docid {} {} ({} new links)",
                    page.docid,
                    page.url,
                    found
                );
            }
            Err(e) => {
                self.scheduler.record_failure();
                tracing::warn!("Failed docid {} {}: {}", page.docid, page.url, e);
                if let Err(log_err) =
                    self.collaborators
                        .errors
                        .record(page.docid, &page.url, &e.to_string())
                {
                    tracing::error!("Failed to write error log: {}", log_err);
                }
            }
        }
    }

    fn crawl_page(&self, page: &Page) -> Result<usize> {
        let url = page.canonical_url()?;
        let fetched = self.collaborators.fetcher.fetch(&url)?;

        let hints: Vec<String> = charset_from_content_type(&fetched.content_type)
            .into_iter()
            .collect();
        let extracted = self.collaborators.extractor.extract(&fetched.body, &hints)?;

        let mut found = 0;
        if extracted.follow {
            let base = effective_base(&fetched.final_url, extracted.base.as_deref());
            found = self.scheduler.enqueue(resolve_links(&base, &extracted.links));
        }

        let meta = PageMeta {
            encoding: extracted.encoding,
            follow: extracted.follow,
            index: extracted.index,
        };
        self.collaborators
            .store
            .write_page(page.docid, &meta, &fetched.body)?;

        Ok(found)
    }
}

/// Fixed-size pool of named worker threads
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `count` workers named `worker-0` .. `worker-{count-1}`
    pub fn spawn(
        count: usize,
        scheduler: Arc<Scheduler>,
        collaborators: Collaborators,
    ) -> io::Result<Self> {
        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let worker = Worker::new(id, Arc::clone(&scheduler), collaborators.clone());
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }

        tracing::info!("Started {} workers", count);
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to finish its current page and exit
    pub fn join(self) {
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::error!("{} panicked", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchedPage;
    use crate::crawler::parser::HtmlExtractor;
    use crate::storage::{DiskPageStore, DocIdRegistry};
    use crate::CrawlError;
    use std::collections::HashMap;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Serves canned pages; unknown URLs fail like a 404
    struct StaticFetcher {
        pages: HashMap<String, (String, String)>,
    }

    impl StaticFetcher {
        fn new(pages: &[(&str, &str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, ct, body)| (url.to_string(), (ct.to_string(), body.to_string())))
                    .collect(),
            }
        }
    }

    impl Fetcher for StaticFetcher {
        fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage> {
            let key = url.to_string();
            let (content_type, body) = self.pages.get(&key).ok_or_else(|| CrawlError::Transport {
                url: key.clone(),
                message: "unexpected status 404".to_string(),
            })?;
            Ok(FetchedPage {
                final_url: url.clone(),
                content_type: content_type.clone(),
                body: body.clone().into_bytes(),
            })
        }
    }

    fn setup(fetcher: StaticFetcher) -> (TempDir, Arc<Scheduler>, Collaborators) {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(DocIdRegistry::open(dir.path()).unwrap());
        let scheduler = Arc::new(Scheduler::with_politeness(registry, Duration::ZERO));
        let collaborators = Collaborators {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(HtmlExtractor::new().unwrap()),
            store: Arc::new(DiskPageStore::new(dir.path())),
            errors: Arc::new(ErrorLog::open(dir.path()).unwrap()),
        };
        (dir, scheduler, collaborators)
    }

    fn single_worker(fetcher: StaticFetcher) -> (TempDir, Arc<Scheduler>, Worker) {
        let (dir, scheduler, collaborators) = setup(fetcher);
        let worker = Worker::new(0, Arc::clone(&scheduler), collaborators);
        (dir, scheduler, worker)
    }

    #[test]
    fn test_effective_base() {
        let final_url = CanonicalUrl::parse("http://a.test/dir/page.html").unwrap();
        assert_eq!(effective_base(&final_url, None), final_url);
        assert_eq!(
            effective_base(&final_url, Some("/other/")).to_string(),
            "http://a.test/other/"
        );
        assert_eq!(
            effective_base(&final_url, Some("https://secure.test/")),
            final_url
        );
    }

    #[test]
    fn test_resolve_links() {
        let base = CanonicalUrl::parse("http://a.test/dir/").unwrap();
        let links = vec![
            "x.html#part".to_string(),
            "../up".to_string(),
            "mailto:a@b.c".to_string(),
            "https://secure.test/".to_string(),
            "//other.test/y".to_string(),
        ];
        assert_eq!(
            resolve_links(&base, &links),
            vec![
                "http://a.test/dir/x.html",
                "http://a.test/up",
                "http://other.test/y"
            ]
        );
    }

    #[test]
    fn test_link_with_newline_keeps_docid_log_readable() {
        let (dir, scheduler, worker) = single_worker(StaticFetcher::new(&[(
            "http://a.test/",
            "text/html",
            "<a href=\"/search?q=a\nb\">s</a><a href=\"/p\tq\">t</a>",
        )]));
        scheduler.enqueue(["http://a.test/"]);

        let page = scheduler.dequeue().unwrap();
        worker.process_page(&page);
        assert_eq!(scheduler.snapshot().downloaded, 1);

        let reopened = DocIdRegistry::open(dir.path()).unwrap();
        let urls: Vec<String> = reopened
            .read_log()
            .unwrap()
            .into_iter()
            .map(|record| record.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://a.test/",
                "http://a.test/search?q=ab",
                "http://a.test/pq"
            ]
        );
        assert_eq!(reopened.last_id(), 3);
    }

    #[test]
    fn test_process_page_stores_and_enqueues() {
        let (dir, scheduler, worker) = single_worker(StaticFetcher::new(&[(
            "http://a.test/",
            "text/html; charset=utf-8",
            r#"<a href="/next">n</a><a href="http://b.test/">b</a>"#,
        )]));
        scheduler.enqueue(["http://a.test/"]);

        let page = scheduler.dequeue().unwrap();
        worker.process_page(&page);

        assert!(scheduler.knows("http://a.test/next"));
        assert!(scheduler.knows("http://b.test/"));
        let page_dir = dir.path().join("00/00/00/01");
        assert_eq!(
            fs::read_to_string(page_dir.join("meta")).unwrap(),
            "encoding: utf-8\nrobots: follow,index\n"
        );
        assert!(page_dir.join("data").is_file());
        assert_eq!(scheduler.snapshot().downloaded, 1);
    }

    #[test]
    fn test_nofollow_page_is_stored_without_links() {
        let (dir, scheduler, worker) = single_worker(StaticFetcher::new(&[(
            "http://a.test/",
            "text/html",
            r#"<meta name="robots" content="nofollow"><a href="/next">n</a>"#,
        )]));
        scheduler.enqueue(["http://a.test/"]);

        let page = scheduler.dequeue().unwrap();
        worker.process_page(&page);

        assert!(!scheduler.knows("http://a.test/next"));
        assert_eq!(
            fs::read_to_string(dir.path().join("00/00/00/01/meta")).unwrap(),
            "encoding: utf-8\nrobots: nofollow,index\n"
        );
    }

    #[test]
    fn test_failure_goes_to_error_log() {
        let (dir, scheduler, worker) = single_worker(StaticFetcher::new(&[]));
        scheduler.enqueue(["http://a.test/missing"]);

        let page = scheduler.dequeue().unwrap();
        worker.process_page(&page);

        let errors = fs::read_to_string(dir.path().join("err.txt")).unwrap();
        assert_eq!(
            errors,
            "1 http://a.test/missing ERR Transport error for http://a.test/missing: unexpected status 404\n"
        );
        assert!(!dir.path().join("00/00/00/01/data").exists());
        assert_eq!(scheduler.snapshot().failed, 1);
    }

    #[test]
    fn test_pool_drains_and_stops() {
        let (dir, scheduler, collaborators) = setup(StaticFetcher::new(&[
            ("http://a.test/", "text/html", r#"<a href="/2">2</a><a href="/3">3</a>"#),
            ("http://a.test/2", "text/html", "two"),
            ("http://a.test/3", "text/html", "three"),
        ]));
        scheduler.enqueue(["http://a.test/"]);

        let pool = WorkerPool::spawn(3, Arc::clone(&scheduler), collaborators).unwrap();
        assert_eq!(pool.len(), 3);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while scheduler.snapshot().downloaded < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        scheduler.stop();
        pool.join();

        assert_eq!(scheduler.snapshot().downloaded, 3);
        for docid in 1..=3 {
            assert!(scheduler.was_fetched(docid));
        }
        assert!(fs::read_to_string(dir.path().join("err.txt"))
            .unwrap()
            .is_empty());
    }
}
