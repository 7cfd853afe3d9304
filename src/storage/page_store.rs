//! Disk-backed page store

use crate::state::DocId;
use crate::storage::traits::{PageMeta, PageStore, StorageResult};
use crate::storage::{docid_path, DATA_FILE, META_FILE};

use std::fs;
use std::path::{Path, PathBuf};

/// Stores pages in the docid directory tree of the store root
///
/// Each page gets `meta` and `data` files under its fan-out directory.
#[derive(Debug, Clone)]
pub struct DiskPageStore {
    root: PathBuf,
}

impl DiskPageStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl PageStore for DiskPageStore {
    fn write_page(&self, docid: DocId, meta: &PageMeta, data: &[u8]) -> StorageResult<()> {
        let dir = docid_path(&self.root, docid);
        // Several workers may create the shared upper levels at once
        fs::create_dir_all(&dir)?;

        // `data` marks the page complete, so it goes last
        fs::write(dir.join(META_FILE), meta.render())?;
        fs::write(dir.join(DATA_FILE), data)?;

        tracing::trace!("Stored docid {} in {}", docid, dir.display());
        Ok(())
    }

    fn has_page(&self, docid: DocId) -> bool {
        docid_path(&self.root, docid).join(DATA_FILE).is_file()
    }
}
