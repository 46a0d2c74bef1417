//! archivefs - a merged directory namespace over zip archives
//!
//! This library maintains one directory tree built from the entries of any
//! number of archives. Archives can be loaded and unloaded at runtime; the
//! tree always reflects the archives currently loaded, and collisions between
//! archives are resolved deterministically. A filesystem adapter (FUSE or
//! otherwise) sits on top and turns readdir/stat/read calls into
//! [`DefaultMapper::readdir`], [`DefaultMapper::traverse`] and
//! [`DefaultMapper::readfile`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                DefaultMapper                 │
//! │                                              │
//! │  load_archive ──► ArchiveReader::entries     │
//! │        │                                     │
//! │        ▼                                     │
//! │  PathMaker ──► Directory tree  (root)        │
//! │        └─────► ArchiveRegistry (ledger)      │
//! │                                              │
//! │  readfile ─────► ArchiveReader::copy_entry   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! [`SharedMapper`] wraps a mapper in a read/write lock for concurrent
//! embedding.

pub mod archive;
pub mod config;
pub mod error;
pub mod mapper;
pub mod pathmaker;
pub mod registry;
pub mod shared;
pub mod sink;
pub mod tree;

pub use archive::{
    ArchiveEntry, ArchiveError, ArchiveReader, ArchiveResult, MemoryArchiveReader,
    ZipArchiveReader,
};
pub use config::{default_config_path, ConfigError, MapperConfig};
pub use error::{MapperError, MapperResult};
pub use mapper::{ArchiveLister, DefaultMapper, LoadSummary, NodeKind, NodeStat, UnloadSummary};
pub use pathmaker::{
    DefaultPathMaker, EntryPath, FlattenPathMaker, JunkPathMaker, Layout, PathMaker,
    UnknownLayout,
};
pub use registry::ArchiveRegistry;
pub use shared::SharedMapper;
pub use sink::{Event, EventLevel, EventSink, MemorySink, NullSink, TracingSink};
pub use tree::{ArchiveId, Directory, FileEntry, Node, NodeRef, PathConflict};

/// Library version, from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
