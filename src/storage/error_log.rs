//! Per-page failure log

use crate::state::DocId;
use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::ERROR_LOG_FILE;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only `err.txt` with one `<docid> <url> ERR <message>` line per failure
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ErrorLog {
    /// Opens (or creates) the error log inside `store_dir`
    pub fn open(store_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let path = store_dir.as_ref().join(ERROR_LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::Unavailable {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Appends one failure record
    ///
    /// Line breaks and tabs inside `url` and `message` are replaced by
    /// spaces so every record stays on one line.
    pub fn record(&self, docid: DocId, url: &str, message: &str) -> StorageResult<()> {
        let line = format_record(docid, url, message);
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn format_record(docid: DocId, url: &str, message: &str) -> String {
    format!("{docid} {} ERR {}\n", flatten(url), flatten(message))
}

fn flatten(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

/// Counts the records of an error log; a missing file counts as empty
pub fn count_error_records(path: &Path) -> StorageResult<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for line in reader.lines() {
        if line?.contains(" ERR ") {
            count += 1;
        }
    }
    Ok(count)
}
