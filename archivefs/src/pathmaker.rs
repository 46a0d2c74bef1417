//! Strategies turning an archive entry name into tree path fragments.
//!
//! A [`PathMaker`] receives the effective entry name (the name as stored in
//! the archive, optionally prefixed with the archive's base name) and decides
//! where in the namespace tree that entry lands. The mapper never splits names
//! itself, so alternative archive naming conventions only need a new strategy.
//!
//! # Layouts
//!
//! | Layout | `demo/dir1/file1` | `demo/dir1/` |
//! |--------|-------------------|--------------|
//! | `default` | `demo/dir1` + `file1` | `demo/dir1` (no leaf) |
//! | `flatten` | root + `demo_dir1_file1` | nothing |
//! | `junk` | root + `file1` | nothing |

use std::fmt;
use std::str::FromStr;

/// Directory fragments plus an optional leaf name for one entry.
///
/// `leaf` is `None` when the entry only marks a directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryPath {
    /// Directories leading to the entry, outermost first.
    pub fragments: Vec<String>,

    /// File name inside the innermost directory.
    pub leaf: Option<String>,
}

impl EntryPath {
    /// Create an entry path from its parts.
    pub fn new(fragments: Vec<String>, leaf: Option<String>) -> Self {
        Self { fragments, leaf }
    }

    /// Check if the entry only marks a directory.
    pub fn is_dir_marker(&self) -> bool {
        self.leaf.is_none()
    }
}

/// Converts an effective entry name into an [`EntryPath`].
///
/// Implementations must be pure: the same name always yields the same path.
pub trait PathMaker: Send + Sync + fmt::Debug {
    /// Resolve one effective entry name.
    fn make_path(&self, name: &str) -> EntryPath;
}

/// Split on `/`; a trailing `/` marks a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPathMaker;

impl PathMaker for DefaultPathMaker {
    fn make_path(&self, name: &str) -> EntryPath {
        let mut fragments: Vec<String> = name.split('/').map(str::to_string).collect();
        // split always yields at least one segment
        let last = fragments.pop().unwrap_or_default();

        if last.is_empty() {
            EntryPath::new(fragments, None)
        } else {
            EntryPath::new(fragments, Some(last))
        }
    }
}

/// Place every file in the root, joining its path segments with `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenPathMaker;

impl PathMaker for FlattenPathMaker {
    fn make_path(&self, name: &str) -> EntryPath {
        if name.is_empty() || name.ends_with('/') {
            return EntryPath::default();
        }
        let joined = name
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        EntryPath::new(Vec::new(), Some(joined))
    }
}

/// Place every file in the root under its last path segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct JunkPathMaker;

impl PathMaker for JunkPathMaker {
    fn make_path(&self, name: &str) -> EntryPath {
        match name.rsplit('/').next() {
            Some(leaf) if !leaf.is_empty() => EntryPath::new(Vec::new(), Some(leaf.to_string())),
            _ => EntryPath::default(),
        }
    }
}

/// Named PathMaker selection, as used in configuration files and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// Keep the archive's directory structure.
    #[default]
    Default,

    /// Everything in the root, segments joined with `_`.
    Flatten,

    /// Everything in the root, directories dropped.
    Junk,
}

impl Layout {
    /// All layouts, in the order they are documented.
    pub const ALL: [Layout; 3] = [Layout::Default, Layout::Flatten, Layout::Junk];

    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Layout::Default => "default",
            Layout::Flatten => "flatten",
            Layout::Junk => "junk",
        }
    }

    /// Build the PathMaker for this layout.
    pub fn path_maker(&self) -> Box<dyn PathMaker> {
        match self {
            Layout::Default => Box::new(DefaultPathMaker),
            Layout::Flatten => Box::new(FlattenPathMaker),
            Layout::Junk => Box::new(JunkPathMaker),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a layout name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown layout `{0}` (expected one of: default, flatten, junk)")]
pub struct UnknownLayout(pub String);

impl FromStr for Layout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Layout::ALL
            .into_iter()
            .find(|layout| layout.name() == wanted)
            .ok_or_else(|| UnknownLayout(s.to_string()))
    }
}
