//! Archive reader capability.
//!
//! The mapper never touches archive bytes itself. It asks an
//! [`ArchiveReader`] for an archive's entry list at load time and for an
//! entry's bytes at read time. Every call re-opens the archive; nothing is
//! cached between calls.
//!
//! # Implementations
//!
//! - [`ZipArchiveReader`] - zip files on the local filesystem
//! - [`MemoryArchiveReader`] - archives held in memory, for embedding and tests

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Write};

use parking_lot::RwLock;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Result type for archive reader operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors reported by an archive reader.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive does not exist.
    #[error("`{archive}` does not exist")]
    NotFound { archive: String },

    /// The archive exists but could not be parsed.
    #[error("`{archive}` appears to be an invalid archive file: {reason}")]
    InvalidFormat { archive: String, reason: String },

    /// The archive opened but has no entry with the requested name.
    #[error("`{entry}` not found in `{archive}`")]
    EntryNotFound { archive: String, entry: String },

    /// Any other I/O failure.
    #[error("I/O error on `{archive}`: {source}")]
    Io {
        archive: String,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    /// The archive the error refers to.
    pub fn archive(&self) -> &str {
        match self {
            Self::NotFound { archive }
            | Self::InvalidFormat { archive, .. }
            | Self::EntryNotFound { archive, .. }
            | Self::Io { archive, .. } => archive,
        }
    }

    fn from_io(archive: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                archive: archive.to_string(),
            }
        } else {
            Self::Io {
                archive: archive.to_string(),
                source,
            }
        }
    }
}

/// One entry as listed by an archive reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name, `/`-separated; a trailing `/` marks a directory.
    pub name: String,

    /// Uncompressed size in bytes.
    pub size: u64,
}

impl ArchiveEntry {
    /// Create a new archive entry.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Lists and streams archive entries.
pub trait ArchiveReader: Send + Sync + fmt::Debug {
    /// List the entries of an archive in the archive's own order.
    fn entries(&self, archive: &str) -> ArchiveResult<Vec<ArchiveEntry>>;

    /// Stream one entry into `out`, returning the number of bytes written.
    fn copy_entry(&self, archive: &str, entry: &str, out: &mut dyn Write) -> ArchiveResult<u64>;

    /// Read one entry fully into memory.
    fn read_entry(&self, archive: &str, entry: &str) -> ArchiveResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.copy_entry(archive, entry, &mut buf)?;
        Ok(buf)
    }
}

/// Reads zip archives from the local filesystem.
///
/// The archive identifier is the path of the zip file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ZipArchiveReader {
    /// Create a new zip archive reader.
    pub fn new() -> Self {
        Self
    }

    fn open(&self, archive: &str) -> ArchiveResult<ZipArchive<BufReader<File>>> {
        let file = File::open(archive).map_err(|e| ArchiveError::from_io(archive, e))?;
        ZipArchive::new(BufReader::new(file)).map_err(|e| map_zip_error(archive, None, e))
    }
}

impl ArchiveReader for ZipArchiveReader {
    fn entries(&self, archive: &str) -> ArchiveResult<Vec<ArchiveEntry>> {
        let mut zip = self.open(archive)?;
        let mut entries = Vec::with_capacity(zip.len());

        for index in 0..zip.len() {
            let file = zip
                .by_index_raw(index)
                .map_err(|e| map_zip_error(archive, None, e))?;
            entries.push(ArchiveEntry::new(file.name(), file.size()));
        }

        Ok(entries)
    }

    fn copy_entry(&self, archive: &str, entry: &str, out: &mut dyn Write) -> ArchiveResult<u64> {
        let mut zip = self.open(archive)?;
        let mut file = zip
            .by_name(entry)
            .map_err(|e| map_zip_error(archive, Some(entry), e))?;

        io::copy(&mut file, out).map_err(|source| ArchiveError::Io {
            archive: archive.to_string(),
            source,
        })
    }
}

fn map_zip_error(archive: &str, entry: Option<&str>, err: ZipError) -> ArchiveError {
    match (err, entry) {
        (ZipError::Io(source), _) => ArchiveError::from_io(archive, source),
        (ZipError::FileNotFound, Some(entry)) => ArchiveError::EntryNotFound {
            archive: archive.to_string(),
            entry: entry.to_string(),
        },
        (other, _) => ArchiveError::InvalidFormat {
            archive: archive.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Contents of an in-memory archive.
#[derive(Debug, Clone)]
enum MemoryArchive {
    Entries(Vec<(String, Vec<u8>)>),
    Corrupt,
}

/// Archive reader serving archives held in memory.
///
/// Archives can be added and removed while the reader is shared, which lets
/// callers simulate an archive vanishing between load and read.
#[derive(Debug, Default)]
pub struct MemoryArchiveReader {
    archives: RwLock<HashMap<String, MemoryArchive>>,
}

impl MemoryArchiveReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an archive, builder style.
    pub fn with_archive<N, D>(self, archive: &str, entries: impl IntoIterator<Item = (N, D)>) -> Self
    where
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        self.insert(archive, entries);
        self
    }

    /// Add or replace an archive.
    ///
    /// Entry sizes are the lengths of the given contents; names ending in `/`
    /// are directory markers and should carry empty contents.
    pub fn insert<N, D>(&self, archive: &str, entries: impl IntoIterator<Item = (N, D)>)
    where
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, data)| (name.into(), data.into()))
            .collect();
        self.archives
            .write()
            .insert(archive.to_string(), MemoryArchive::Entries(entries));
    }

    /// Register an archive that exists but cannot be parsed.
    pub fn insert_corrupt(&self, archive: &str) {
        self.archives
            .write()
            .insert(archive.to_string(), MemoryArchive::Corrupt);
    }

    /// Remove an archive, so later calls report it as missing.
    pub fn remove(&self, archive: &str) -> bool {
        self.archives.write().remove(archive).is_some()
    }

    fn with_entries<T>(
        &self,
        archive: &str,
        f: impl FnOnce(&[(String, Vec<u8>)]) -> ArchiveResult<T>,
    ) -> ArchiveResult<T> {
        match self.archives.read().get(archive) {
            Some(MemoryArchive::Entries(entries)) => f(entries),
            Some(MemoryArchive::Corrupt) => Err(ArchiveError::InvalidFormat {
                archive: archive.to_string(),
                reason: "not a zip archive".to_string(),
            }),
            None => Err(ArchiveError::NotFound {
                archive: archive.to_string(),
            }),
        }
    }
}

impl ArchiveReader for MemoryArchiveReader {
    fn entries(&self, archive: &str) -> ArchiveResult<Vec<ArchiveEntry>> {
        self.with_entries(archive, |entries| {
            Ok(entries
                .iter()
                .map(|(name, data)| ArchiveEntry::new(name.clone(), data.len() as u64))
                .collect())
        })
    }

    fn copy_entry(&self, archive: &str, entry: &str, out: &mut dyn Write) -> ArchiveResult<u64> {
        self.with_entries(archive, |entries| {
            let (_, data) = entries
                .iter()
                .find(|(name, _)| name == entry)
                .ok_or_else(|| ArchiveError::EntryNotFound {
                    archive: archive.to_string(),
                    entry: entry.to_string(),
                })?;
            out.write_all(data).map_err(|source| ArchiveError::Io {
                archive: archive.to_string(),
                source,
            })?;
            Ok(data.len() as u64)
        })
    }
}
