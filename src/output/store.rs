//! Offline inspection of a crawl store

use crate::storage::{
    count_error_records, docid_path, read_docid_log, StorageResult, DATA_FILE, DOCID_LOG_FILE,
    ERROR_LOG_FILE,
};

use std::io::Write;
use std::path::Path;

/// Totals of a crawl store, computed from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreSummary {
    /// Records in the docid log
    pub docids: u64,

    /// Docids whose `data` file exists
    pub downloaded: u64,

    /// Docids not downloaded yet
    pub pending: u64,

    /// Records in the error log
    pub errors: u64,
}

/// Scans the docid log, page tree and error log of `store_dir`
///
/// A store without a docid log is reported as empty.
pub fn summarize_store(store_dir: &Path) -> StorageResult<StoreSummary> {
    let log_path = store_dir.join(DOCID_LOG_FILE);
    let records = if log_path.exists() {
        read_docid_log(&log_path)?
    } else {
        Vec::new()
    };

    let docids = records.len() as u64;
    let downloaded = records
        .iter()
        .filter(|record| docid_path(store_dir, record.docid).join(DATA_FILE).is_file())
        .count() as u64;

    Ok(StoreSummary {
        docids,
        downloaded,
        pending: docids - downloaded,
        errors: count_error_records(&store_dir.join(ERROR_LOG_FILE))?,
    })
}

/// Writes the docid log lines whose page was downloaded
///
/// # Returns
///
/// The number of lines written
pub fn prune_docid_log(store_dir: &Path, out: &mut dyn Write) -> StorageResult<usize> {
    let records = read_docid_log(&store_dir.join(DOCID_LOG_FILE))?;
    let mut kept = 0;

    for record in records {
        if docid_path(store_dir, record.docid).join(DATA_FILE).is_file() {
            out.write_all(record.to_line().as_bytes())?;
            kept += 1;
        }
    }

    out.flush()?;
    Ok(kept)
}

/// Prints a store summary to stdout
pub fn print_store_summary(store_dir: &Path, summary: &StoreSummary) {
    println!("=== Store {} ===\n", store_dir.display());
    println!("  Docids: {}", summary.docids);
    println!("  Downloaded: {}", summary.downloaded);
    println!("  Pending: {}", summary.pending);
    println!("  Error records: {}", summary.errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocIdRegistry, ErrorLog};
    use std::fs;
    use tempfile::TempDir;

    fn create_test_store() -> TempDir {
        let dir = TempDir::new().unwrap();
        let registry = DocIdRegistry::open(dir.path()).unwrap();
        for url in ["http://a.test/1", "http://a.test/2", "http://b.test/3"] {
            registry.register(url).unwrap();
        }
        let page_dir = registry.path_for(2);
        fs::create_dir_all(&page_dir).unwrap();
        fs::write(page_dir.join(DATA_FILE), b"page").unwrap();

        let errors = ErrorLog::open(dir.path()).unwrap();
        errors.record(3, "http://b.test/3", "unexpected status 500").unwrap();
        dir
    }

    #[test]
    fn test_summarize_store() {
        let dir = create_test_store();
        let summary = summarize_store(dir.path()).unwrap();
        assert_eq!(
            summary,
            StoreSummary {
                docids: 3,
                downloaded: 1,
                pending: 2,
                errors: 1,
            }
        );
    }

    #[test]
    fn test_summarize_empty_store() {
        let dir = TempDir::new().unwrap();
        assert_eq!(summarize_store(dir.path()).unwrap(), StoreSummary::default());
    }

    #[test]
    fn test_prune_keeps_downloaded_lines() {
        let dir = create_test_store();
        let mut out = Vec::new();

        let kept = prune_docid_log(dir.path(), &mut out).unwrap();

        assert_eq!(kept, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "2\thttp://a.test/2\n");
    }
}
