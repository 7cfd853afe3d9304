//! Append-only docid registry
//!
//! Every distinct canonical URL gets one record `<docid>\t<url>\n` in the
//! `docids` file of the store directory. The record is written before the
//! id is handed out, so a page can never be fetched under an id that a
//! restart would not know about.

use crate::state::DocId;
use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::{docid_path, DATA_FILE, DOCID_LOG_FILE};

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One line of the docid log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocIdRecord {
    pub docid: DocId,
    pub url: String,
}

impl DocIdRecord {
    /// Renders the record as a log line, including the trailing newline
    pub fn to_line(&self) -> String {
        format!("{}\t{}\n", self.docid, self.url)
    }
}

struct RegistryInner {
    last_id: DocId,
    log: File,
}

/// Hands out document ids and records them durably
///
/// The counter and the log file share one lock, separate from the
/// scheduler's lock.
pub struct DocIdRegistry {
    root: PathBuf,
    log_path: PathBuf,
    inner: Mutex<RegistryInner>,
}

impl DocIdRegistry {
    /// Opens (or creates) the registry inside `store_dir`
    ///
    /// The counter resumes after the highest id already in the log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the store directory or the log
    /// cannot be created or opened, and `StorageError::Corrupt` if an
    /// existing log contains an unparseable record.
    pub fn open(store_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let root = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StorageError::Unavailable {
            path: root.clone(),
            source,
        })?;

        let log_path = root.join(DOCID_LOG_FILE);
        let last_id = if log_path.exists() {
            read_docid_log(&log_path)?
                .iter()
                .map(|record| record.docid)
                .max()
                .unwrap_or(0)
        } else {
            0
        };

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|source| StorageError::Unavailable {
                path: log_path.clone(),
                source,
            })?;

        tracing::debug!("Opened docid log {} (last id {})", log_path.display(), last_id);

        Ok(Self {
            root,
            log_path,
            inner: Mutex::new(RegistryInner { last_id, log }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a fresh id; ids are never reused and never decrease
    pub fn next_id(&self) -> DocId {
        let mut inner = self.lock();
        inner.last_id += 1;
        inner.last_id
    }

    /// Appends the `(docid, url)` record to the log
    pub fn persist(&self, docid: DocId, url: &str) -> StorageResult<()> {
        let mut inner = self.lock();
        write_record(&mut inner.log, docid, url)
    }

    /// Assigns the next id to `url` and persists it under a single lock
    ///
    /// A URL containing a line break is refused before an id is taken. Once
    /// the write starts, the id is consumed even if the write fails.
    pub fn register(&self, url: &str) -> StorageResult<DocId> {
        check_single_line(url)?;
        let mut inner = self.lock();
        inner.last_id += 1;
        let docid = inner.last_id;
        write_record(&mut inner.log, docid, url)?;
        Ok(docid)
    }

    /// Raises the counter so that the next id is above `docid`
    pub fn advance_to(&self, docid: DocId) {
        let mut inner = self.lock();
        inner.last_id = inner.last_id.max(docid);
    }

    /// Returns the highest id handed out so far
    pub fn last_id(&self) -> DocId {
        self.lock().last_id
    }

    /// Directory holding the page files for `docid`
    pub fn path_for(&self, docid: DocId) -> PathBuf {
        docid_path(&self.root, docid)
    }

    /// Returns true if the page for `docid` was completely downloaded
    pub fn exists(&self, docid: DocId) -> bool {
        self.path_for(docid).join(DATA_FILE).is_file()
    }

    /// Reads back every record of the log, in append order
    pub fn read_log(&self) -> StorageResult<Vec<DocIdRecord>> {
        read_docid_log(&self.log_path)
    }
}

fn check_single_line(url: &str) -> StorageResult<()> {
    if url.contains(['\n', '\r']) {
        return Err(StorageError::MultilineUrl {
            url: url.to_string(),
        });
    }
    Ok(())
}

fn write_record(log: &mut File, docid: DocId, url: &str) -> StorageResult<()> {
    check_single_line(url)?;
    let record = DocIdRecord {
        docid,
        url: url.to_string(),
    };
    log.write_all(record.to_line().as_bytes())?;
    log.flush()?;
    Ok(())
}

/// Parses a docid log file
///
/// Blank lines are skipped; any other line that is not
/// `<decimal id>\t<url>` is reported as corrupt.
pub fn read_docid_log(path: &Path) -> StorageResult<Vec<DocIdRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = line
            .split_once('\t')
            .and_then(|(id, url)| {
                let docid = id.trim().parse::<DocId>().ok()?;
                Some(DocIdRecord {
                    docid,
                    url: url.to_string(),
                })
            })
            .ok_or_else(|| StorageError::Corrupt {
                line: index + 1,
                content: line.clone(),
            })?;
        records.push(record);
    }

    Ok(records)
}
