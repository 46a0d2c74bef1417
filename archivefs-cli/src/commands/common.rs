//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use archivefs::{default_config_path, DefaultMapper, Layout, MapperConfig, ZipArchiveReader};
use clap::ValueEnum;
use tracing::{debug, info};

use crate::error::CliError;

/// Layout selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LayoutArg {
    /// Keep the directory structure stored in the archive
    Default,
    /// Join every path segment into one top-level file name
    Flatten,
    /// Drop directories and keep only the base name
    Junk,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Default => Layout::Default,
            LayoutArg::Flatten => Layout::Flatten,
            LayoutArg::Junk => Layout::Junk,
        }
    }
}

/// Mapper options given on the command line.
///
/// Each field overrides the configuration file only when set.
#[derive(Debug, Clone, Default)]
pub struct MapperOverrides {
    pub overwrite: bool,
    pub include_arcname: bool,
    pub layout: Option<LayoutArg>,
}

/// Resolve mapper settings from the config file and CLI flags.
///
/// An explicit `--config` path must exist; the default path is only read
/// when present.
pub fn resolve_config(
    config_path: Option<&Path>,
    overrides: &MapperOverrides,
) -> Result<MapperConfig, CliError> {
    let mut config = match config_path {
        Some(path) if !path.exists() => return Err(CliError::ConfigNotFound(path.to_path_buf())),
        Some(path) => MapperConfig::from_file(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                debug!(path = %path.display(), "Reading default configuration");
                MapperConfig::from_file(&path)?
            }
            None => MapperConfig::default(),
        },
    };

    // CLI takes precedence
    if overrides.overwrite {
        config.overwrite = true;
    }
    if overrides.include_arcname {
        config.include_arcname = true;
    }
    if let Some(layout) = overrides.layout {
        config.layout = layout.into();
    }

    Ok(config)
}

/// Build a mapper over zip files and load every archive in order.
///
/// Archives that fail to open are reported and skipped. Fails only when
/// archives were given and none could be loaded.
pub fn load_mapper(config: MapperConfig, archives: &[String]) -> Result<DefaultMapper, CliError> {
    let mut mapper = DefaultMapper::new(config, Arc::new(ZipArchiveReader::new()));

    let loaded = archives
        .iter()
        .filter(|archive| mapper.load_archive(archive).is_ok())
        .count();

    if loaded == 0 && !archives.is_empty() {
        return Err(CliError::NoArchivesLoaded(archives.len()));
    }

    info!(
        loaded,
        skipped = archives.len() - loaded,
        files = mapper.root().file_count(),
        "Namespace ready"
    );
    Ok(mapper)
}
