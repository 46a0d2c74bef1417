//! Thread-safe handle around a [`DefaultMapper`].
//!
//! Load and unload take the write lock; lookups and reads take the read lock.
//! `load_archive` lists the archive before taking the write lock, so only the
//! in-memory merge blocks readers. File reads keep the read lock until the
//! bytes are copied, so an unload never overlaps a read of the same leaf.

use std::io::Write;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::archive::ArchiveResult;
use crate::error::MapperResult;
use crate::mapper::{DefaultMapper, LoadSummary, NodeStat, UnloadSummary};

/// Cloneable, lock-protected mapper handle.
#[derive(Debug, Clone)]
pub struct SharedMapper {
    inner: Arc<RwLock<DefaultMapper>>,
}

impl SharedMapper {
    /// Wrap a mapper for shared use.
    pub fn new(mapper: DefaultMapper) -> Self {
        Self {
            inner: Arc::new(RwLock::new(mapper)),
        }
    }

    /// Load an archive, listing it without holding any lock.
    pub fn load_archive(&self, archive: &str) -> ArchiveResult<LoadSummary> {
        let lister = self.inner.read().lister();
        let entries = lister.list(archive)?;
        Ok(self.inner.write().load_entries(archive, entries))
    }

    /// Unload an archive.
    pub fn unload(&self, archive: &str) -> MapperResult<UnloadSummary> {
        self.inner.write().unload(archive)
    }

    pub fn stat(&self, path: &str) -> Option<NodeStat> {
        self.inner.read().stat(path)
    }

    pub fn readdir(&self, path: &str) -> Vec<String> {
        self.inner.read().readdir(path)
    }

    /// Read a file under the read lock.
    pub fn readfile(&self, path: &str) -> MapperResult<Vec<u8>> {
        self.inner.read().readfile(path)
    }

    /// Stream a file into `out` under the read lock.
    pub fn read_into(&self, path: &str, out: &mut dyn Write) -> MapperResult<u64> {
        self.inner.read().read_into(path, out)
    }

    pub fn archives(&self) -> Vec<String> {
        self.inner.read().archives()
    }

    /// Hold the read lock for several lookups at once.
    pub fn read(&self) -> RwLockReadGuard<'_, DefaultMapper> {
        self.inner.read()
    }
}

impl From<DefaultMapper> for SharedMapper {
    fn from(mapper: DefaultMapper) -> Self {
        Self::new(mapper)
    }
}
