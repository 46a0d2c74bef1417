//! CLI error type.

use std::path::PathBuf;

use archivefs::{ConfigError, MapperError};
use thiserror::Error;

/// Errors surfaced to the user by the `archivefs` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("no archive could be loaded ({0} given)")]
    NoArchivesLoaded(usize),

    #[error(transparent)]
    Mapper(#[from] MapperError),

    #[error("no such file or directory: `{0}`")]
    NotFound(String),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
