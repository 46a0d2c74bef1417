//! Mapper configuration.
//!
//! Configuration can be built in code or read from an INI file:
//!
//! ```ini
//! [mapper]
//! overwrite = false
//! include_arcname = false
//! layout = default
//! ```

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::pathmaker::{Layout, UnknownLayout};

/// INI section holding mapper settings.
pub const CONFIG_SECTION: &str = "mapper";

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A key holds a value of the wrong shape.
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings controlling how archives are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapperConfig {
    /// Later archives replace existing leaves at the same path.
    ///
    /// When false (the default) the first archive to claim a path keeps it.
    pub overwrite: bool,

    /// Prefix every entry with the archive's base name.
    pub include_arcname: bool,

    /// Strategy turning entry names into tree paths.
    pub layout: Layout,
}

impl MapperConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable replacing existing leaves.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Enable or disable archive base name prefixing.
    pub fn with_include_arcname(mut self, include_arcname: bool) -> Self {
        self.include_arcname = include_arcname;
        self
    }

    /// Set the layout.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Load settings from an INI file.
    ///
    /// Keys missing from the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_ini_str(&contents)
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        let Some(section) = ini.section(Some(CONFIG_SECTION)) else {
            return Ok(config);
        };

        if let Some(value) = section.get("overwrite") {
            config.overwrite = parse_bool("overwrite", value)?;
        }
        if let Some(value) = section.get("include_arcname") {
            config.include_arcname = parse_bool("include_arcname", value)?;
        }
        if let Some(value) = section.get("layout") {
            config.layout = value
                .parse()
                .map_err(|e: UnknownLayout| ConfigError::InvalidValue {
                    key: "layout".to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(config)
    }
}

/// Default location of the configuration file (`~/.archivefs/config.ini`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".archivefs").join("config.ini"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
