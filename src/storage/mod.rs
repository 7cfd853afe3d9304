//! Storage module for the crawl store
//!
//! Everything the crawler persists lives under one store directory:
//! - `docids`: the append-only docid log
//! - `err.txt`: one record per failed page
//! - `stats`: periodic throughput lines
//! - `XX/XX/XX/XX/{meta,data}`: downloaded pages, fanned out by docid

mod docids;
mod error_log;
mod page_store;
mod traits;

pub use docids::{read_docid_log, DocIdRecord, DocIdRegistry};
pub use error_log::{count_error_records, ErrorLog};
pub use page_store::DiskPageStore;
pub use traits::{PageMeta, PageStore, StorageError, StorageResult};

use crate::state::DocId;

use std::path::{Path, PathBuf};

/// Name of the docid log inside the store directory
pub const DOCID_LOG_FILE: &str = "docids";

/// Name of the error log inside the store directory
pub const ERROR_LOG_FILE: &str = "err.txt";

/// Name of the stats log inside the store directory
pub const STATS_FILE: &str = "stats";

/// Page bytes; its presence marks a page as downloaded
pub const DATA_FILE: &str = "data";

/// Page metadata
pub const META_FILE: &str = "meta";

/// Returns the fan-out directory of a docid
///
/// The id is written as (at least) 8 uppercase hex digits and split into
/// two-character directory names, so id 42 maps to `00/00/00/2A`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use spinneret::storage::docid_path;
///
/// let path = docid_path(Path::new("/store"), 0x1234ABCD);
/// assert_eq!(path, Path::new("/store/12/34/AB/CD"));
/// ```
pub fn docid_path(root: &Path, docid: DocId) -> PathBuf {
    let mut hex = format!("{docid:08X}");
    if hex.len() % 2 == 1 {
        hex.insert(0, '0');
    }

    let mut path = root.to_path_buf();
    for start in (0..hex.len()).step_by(2) {
        path.push(&hex[start..start + 2]);
    }
    path
}
