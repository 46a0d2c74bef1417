//! Error types for mapper operations.

use thiserror::Error;

use crate::archive::ArchiveError;

/// Result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

/// Errors surfaced by the mapper to its caller.
///
/// Lookups that simply find nothing return `None` or an empty listing
/// instead; these errors are reserved for calls that cannot do what was
/// asked.
#[derive(Debug, Error)]
pub enum MapperError {
    /// Unload was asked for an archive that is not loaded.
    #[error("archive `{0}` is not loaded")]
    NotLoaded(String),

    /// No node exists at the path.
    #[error("no such file or directory: `{0}`")]
    NotFound(String),

    /// The path resolves to a directory where a file was needed.
    #[error("`{0}` is a directory, not a file")]
    NotAFile(String),

    /// The archive backing a file could not be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
