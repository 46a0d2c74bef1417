//! The namespace engine.
//!
//! [`DefaultMapper`] merges the entries of every loaded archive into one
//! directory tree and unwinds them again on unload.
//!
//! # Merge rules
//!
//! - Entries are applied in the order the archive reader lists them.
//! - The first archive to claim a leaf keeps it, unless `overwrite` is set.
//! - A directory can never replace a file: entries whose parent path runs
//!   through an existing file are skipped with a warning.
//! - Every attempt is recorded in the occupancy ledger, winning or not.
//!
//! # Unload rules
//!
//! - Only leaves the archive currently occupies are removed.
//! - A removed leaf is not refilled from another archive that also
//!   contributed it; it reappears only when some archive is loaded again.
//! - Directories are never removed, even when they end up empty.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use archivefs::{DefaultMapper, MapperConfig, MemoryArchiveReader};
//!
//! let reader = MemoryArchiveReader::new()
//!     .with_archive("a.zip", [("demo/", ""), ("demo/hello", "hello\n")]);
//!
//! let mut mapper = DefaultMapper::new(MapperConfig::default(), Arc::new(reader));
//! mapper.load_archive("a.zip").unwrap();
//!
//! assert_eq!(mapper.readdir("demo"), vec!["hello"]);
//! assert_eq!(mapper.readfile("demo/hello").unwrap(), b"hello\n");
//! ```

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::archive::{ArchiveEntry, ArchiveError, ArchiveReader, ArchiveResult};
use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::pathmaker::PathMaker;
use crate::registry::ArchiveRegistry;
use crate::sink::{Event, EventSink, TracingSink};
use crate::tree::{ArchiveId, Directory, FileEntry, Node, NodeRef, PathConflict};

/// Outcome counts for one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entries listed by the archive reader.
    pub entries: usize,

    /// File leaves written (new or replacing).
    pub files: usize,

    /// File leaves that replaced an existing node (overwrite mode).
    pub replaced: usize,

    /// Directory marker entries.
    pub directories: usize,

    /// Files skipped because the leaf was already occupied.
    pub shadowed: usize,

    /// Entries skipped because a parent path is a file.
    pub conflicts: usize,
}

/// Outcome counts for one unload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnloadSummary {
    /// Effective names the archive had contributed.
    pub names: usize,

    /// File leaves removed from the tree.
    pub removed: usize,
}

/// Kind of a node reported by [`DefaultMapper::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Owned summary of a node, for callers that cannot hold a borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStat {
    pub kind: NodeKind,

    /// Uncompressed size for files, 0 for directories.
    pub size: u64,

    /// Number of children for directories, 0 for files.
    pub children: usize,

    /// Occupying archive for files.
    pub archive: Option<String>,
}

impl NodeStat {
    fn from_node(node: NodeRef<'_>) -> Self {
        match node {
            NodeRef::Directory(dir) => Self {
                kind: NodeKind::Directory,
                size: 0,
                children: dir.len(),
                archive: None,
            },
            NodeRef::File(file) => Self {
                kind: NodeKind::File,
                size: file.size,
                children: 0,
                archive: Some(file.archive.to_string()),
            },
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// Lists archives and reports open failures.
///
/// Split out of the mapper so an embedding layer can list an archive without
/// holding any lock on the mapper.
#[derive(Debug, Clone)]
pub struct ArchiveLister {
    reader: Arc<dyn ArchiveReader>,
    sink: Arc<dyn EventSink>,
}

impl ArchiveLister {
    /// List an archive's entries, reporting any failure to the sink.
    pub fn list(&self, archive: &str) -> ArchiveResult<Vec<ArchiveEntry>> {
        self.reader.entries(archive).inspect_err(|err| {
            let event = match err {
                ArchiveError::NotFound { .. } => {
                    Event::warning(format!("`{}` does not exist.", archive))
                }
                ArchiveError::InvalidFormat { .. } => Event::warning(format!(
                    "`{}` appears to be an invalid archive file",
                    archive
                )),
                ArchiveError::EntryNotFound { .. } | ArchiveError::Io { .. } => {
                    Event::exception(format!("failed to open `{}`: {}", archive, err))
                }
            };
            self.sink.emit(event.with_archive(archive));
        })
    }
}

/// Merged namespace over the entries of all loaded archives.
#[derive(Debug)]
pub struct DefaultMapper {
    config: MapperConfig,
    path_maker: Box<dyn PathMaker>,
    reader: Arc<dyn ArchiveReader>,
    sink: Arc<dyn EventSink>,
    root: Directory,
    registry: ArchiveRegistry,
}

impl DefaultMapper {
    /// Create an empty mapper reporting events through `tracing`.
    pub fn new(config: MapperConfig, reader: Arc<dyn ArchiveReader>) -> Self {
        Self::with_sink(config, reader, Arc::new(TracingSink))
    }

    /// Create an empty mapper reporting events to `sink`.
    pub fn with_sink(
        config: MapperConfig,
        reader: Arc<dyn ArchiveReader>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            path_maker: config.layout.path_maker(),
            config,
            reader,
            sink,
            root: Directory::new(),
            registry: ArchiveRegistry::new(),
        }
    }

    /// Create a mapper and load one archive into it.
    ///
    /// A failed load leaves the mapper empty; the failure is reported to the
    /// sink.
    pub fn with_archive(
        config: MapperConfig,
        reader: Arc<dyn ArchiveReader>,
        sink: Arc<dyn EventSink>,
        archive: &str,
    ) -> Self {
        let mut mapper = Self::with_sink(config, reader, sink);
        // failure already reported to the sink
        let _ = mapper.load_archive(archive);
        mapper
    }

    /// Replace the layout's PathMaker with a custom strategy.
    ///
    /// Must be called before anything is loaded; unload resolves paths with
    /// the same strategy that load used.
    pub fn with_path_maker(mut self, path_maker: Box<dyn PathMaker>) -> Self {
        self.path_maker = path_maker;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// The root directory of the merged tree.
    pub fn root(&self) -> &Directory {
        &self.root
    }

    pub fn registry(&self) -> &ArchiveRegistry {
        &self.registry
    }

    /// Lister sharing this mapper's reader and sink.
    pub fn lister(&self) -> ArchiveLister {
        ArchiveLister {
            reader: Arc::clone(&self.reader),
            sink: Arc::clone(&self.sink),
        }
    }

    /// Ensure a directory exists at `fragments`, creating missing parents.
    pub fn mkdir<S: AsRef<str>>(&mut self, fragments: &[S]) -> Result<&mut Directory, PathConflict> {
        self.root.mkdir(fragments)
    }

    /// Load an archive through the archive reader.
    ///
    /// On failure nothing is mutated, the failure is reported to the sink and
    /// returned; the mapper stays usable.
    pub fn load_archive(&mut self, archive: &str) -> ArchiveResult<LoadSummary> {
        let entries = self.lister().list(archive)?;
        Ok(self.load_entries(archive, entries))
    }

    /// Merge an already-listed set of entries for `archive`.
    ///
    /// Loading an archive that is already loaded merges the new entries into
    /// its existing record.
    pub fn load_entries(
        &mut self,
        archive: &str,
        entries: impl IntoIterator<Item = ArchiveEntry>,
    ) -> LoadSummary {
        if self.registry.is_loaded(archive) {
            self.sink.emit(
                Event::info(format!("`{}` is already loaded; merging entries", archive))
                    .with_archive(archive),
            );
        }

        let id = self.registry.register(archive);

        let mut summary = LoadSummary::default();
        for entry in entries {
            summary.entries += 1;
            self.load_entry(&id, entry, &mut summary);
        }

        self.sink.emit(
            Event::info(format!(
                "loaded `{}` ({} entries, {} files)",
                archive, summary.entries, summary.files
            ))
            .with_archive(archive),
        );
        summary
    }

    /// Name an entry is merged and recorded under.
    ///
    /// This is the entry name itself, prefixed with the archive's base name
    /// when `include_arcname` is set.
    pub fn effective_name(&self, archive: &str, entry: &str) -> String {
        if self.config.include_arcname {
            format!("{}/{}", archive_basename(archive), entry)
        } else {
            entry.to_string()
        }
    }

    fn load_entry(&mut self, id: &ArchiveId, entry: ArchiveEntry, summary: &mut LoadSummary) {
        let effective = self.effective_name(id, &entry.name);
        let path = self.path_maker.make_path(&effective);

        self.registry.record_attempt(id, &effective);

        let target = match self.root.mkdir(&path.fragments) {
            Ok(dir) => dir,
            Err(conflict) => {
                summary.conflicts += 1;
                self.sink.emit(
                    Event::warning(format!("`{}` could not be created: {}", entry.name, conflict))
                        .with_archive(&**id)
                        .with_entry(&entry.name),
                );
                return;
            }
        };

        let Some(leaf) = path.leaf else {
            summary.directories += 1;
            return;
        };

        match target.get(&leaf) {
            Some(Node::Directory(_)) => {
                summary.conflicts += 1;
                self.sink.emit(
                    Event::warning(format!(
                        "`{}` could not be created: directory entry exists.",
                        entry.name
                    ))
                    .with_archive(&**id)
                    .with_entry(&entry.name),
                );
                return;
            }
            Some(Node::File(_)) if !self.config.overwrite => {
                summary.shadowed += 1;
                self.sink.emit(
                    Event::info(format!("`{}` already exists; ignoring", entry.name))
                        .with_archive(&**id)
                        .with_entry(&entry.name),
                );
                return;
            }
            Some(Node::File(_)) => summary.replaced += 1,
            None => {}
        }

        target.insert(
            leaf,
            Node::File(FileEntry::new(Arc::clone(id), entry.name, entry.size)),
        );
        summary.files += 1;
    }

    /// Unload an archive, removing every leaf it currently occupies.
    ///
    /// Fails with [`MapperError::NotLoaded`] when the archive is not loaded.
    pub fn unload(&mut self, archive: &str) -> MapperResult<UnloadSummary> {
        let (id, names) = self
            .registry
            .unregister(archive)
            .ok_or_else(|| MapperError::NotLoaded(archive.to_string()))?;

        let mut summary = UnloadSummary {
            names: names.len(),
            removed: 0,
        };

        for name in &names {
            let path = self.path_maker.make_path(name);
            let Some(leaf) = path.leaf else {
                continue;
            };
            let Some(dir) = self.root.dir_mut(&path.fragments) else {
                continue;
            };
            let occupied = matches!(dir.get(&leaf), Some(Node::File(file)) if file.archive == id);
            if occupied {
                dir.remove(&leaf);
                summary.removed += 1;
            }
        }

        self.sink.emit(
            Event::info(format!(
                "unloaded `{}` ({} files removed)",
                archive, summary.removed
            ))
            .with_archive(archive),
        );
        Ok(summary)
    }

    /// Resolve a path to a node.
    ///
    /// The empty path resolves to the root directory. Paths are taken
    /// literally: `/x` names `x` inside a directory called `""`, which is
    /// where an entry stored as `/x` lands.
    pub fn traverse(&self, path: &str) -> Option<NodeRef<'_>> {
        self.root.resolve(path)
    }

    /// Names in the directory at `path`, sorted.
    ///
    /// Empty when the path is a file or does not exist.
    pub fn readdir(&self, path: &str) -> Vec<String> {
        match self.traverse(path) {
            Some(NodeRef::Directory(dir)) => dir.names().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Owned summary of the node at `path`.
    pub fn stat(&self, path: &str) -> Option<NodeStat> {
        self.traverse(path).map(NodeStat::from_node)
    }

    /// Resolve `path` to the file leaf occupying it.
    pub fn resolve_file(&self, path: &str) -> MapperResult<&FileEntry> {
        match self.traverse(path) {
            Some(NodeRef::File(file)) => Ok(file),
            Some(NodeRef::Directory(_)) => Err(MapperError::NotAFile(path.to_string())),
            None => Err(MapperError::NotFound(path.to_string())),
        }
    }

    /// Read the complete contents of the file at `path`.
    ///
    /// The archive is re-opened on every call.
    pub fn readfile(&self, path: &str) -> MapperResult<Vec<u8>> {
        let file = self.resolve_file(path)?;
        Ok(self.reader.read_entry(&file.archive, &file.name)?)
    }

    /// Stream the file at `path` into `out`, returning the bytes written.
    pub fn read_into(&self, path: &str, out: &mut dyn Write) -> MapperResult<u64> {
        let file = self.resolve_file(path)?;
        Ok(self.reader.copy_entry(&file.archive, &file.name, out)?)
    }

    /// Loaded archives in first-load order.
    pub fn archives(&self) -> Vec<String> {
        self.registry.archives().map(|a| a.to_string()).collect()
    }

    pub fn is_loaded(&self, archive: &str) -> bool {
        self.registry.is_loaded(archive)
    }

    /// Effective names an archive contributed, in reader order.
    pub fn contributed(&self, archive: &str) -> Option<&[String]> {
        self.registry.contributed(archive)
    }

    /// Archives that attempted to claim an effective name, oldest first.
    pub fn occupants(&self, name: &str) -> Vec<String> {
        self.registry
            .occupants(name)
            .map(|ids| ids.iter().map(|a| a.to_string()).collect())
            .unwrap_or_default()
    }
}

fn archive_basename(archive: &str) -> String {
    Path::new(archive)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchiveReader;
    use crate::pathmaker::Layout;
    use crate::sink::{EventLevel, MemorySink};

    const HASH1: &str = "b026324c6904b2a9cb4b88d6d61c81d1\n";

    fn entries(names: &[(&str, u64)]) -> Vec<ArchiveEntry> {
        names
            .iter()
            .map(|(name, size)| ArchiveEntry::new(*name, *size))
            .collect()
    }

    fn demo2_entries() -> Vec<ArchiveEntry> {
        entries(&[
            ("demo/", 0),
            ("demo/file4", 33),
            ("demo/file3", 33),
            ("demo/file5", 33),
            ("demo/file6", 33),
            ("demo/file1", 33),
            ("demo/file2", 33),
        ])
    }

    fn mapper_with(config: MapperConfig) -> (DefaultMapper, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let mapper = DefaultMapper::with_sink(
            config,
            Arc::new(MemoryArchiveReader::new()),
            sink.clone(),
        );
        (mapper, sink)
    }

    fn owner(mapper: &DefaultMapper, path: &str) -> Option<String> {
        mapper
            .traverse(path)
            .and_then(|n| n.as_file())
            .map(|f| f.archive.to_string())
    }

    #[test]
    fn test_null_traverse() {
        let (mapper, _) = mapper_with(MapperConfig::default());
        let root = mapper.traverse("").unwrap();
        assert!(std::ptr::eq(root.as_dir().unwrap(), mapper.root()));
        assert!(mapper.traverse("/").is_none());
        assert!(mapper.traverse("nowhere").is_none());
    }

    #[test]
    fn test_readdir() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        assert!(mapper.readdir("").is_empty());

        mapper.mkdir(&["1"]).unwrap();
        assert_eq!(mapper.readdir(""), vec!["1"]);

        mapper.mkdir(&["2"]).unwrap();
        mapper.mkdir(&["3", "4", "5"]).unwrap();
        assert_eq!(mapper.readdir(""), vec!["1", "2", "3"]);
        assert_eq!(mapper.readdir("3"), vec!["4"]);
        assert_eq!(mapper.readdir("3/4"), vec!["5"]);
    }

    #[test]
    fn test_readdir_file_and_missing() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        mapper.mkdir(&["1"]).unwrap();
        mapper.load_entries("somezip.zip", entries(&[("notdir", 1)]));

        assert_eq!(mapper.readdir(""), vec!["1", "notdir"]);
        assert!(mapper.readdir("notdir").is_empty());
        assert!(mapper.readdir("nowhere").is_empty());
    }

    #[test]
    fn test_load_entries_flat() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        let names: Vec<_> = (1..=6).map(|i| format!("file{}", i)).collect();
        let listing: Vec<_> = names.iter().map(|n| ArchiveEntry::new(n.clone(), 33)).collect();

        let summary = mapper.load_entries("/tmp/demo1.zip", listing);
        assert_eq!(summary.entries, 6);
        assert_eq!(summary.files, 6);

        assert_eq!(mapper.readdir(""), names);
        let leaf = mapper.traverse("file1").unwrap().as_file().unwrap();
        assert_eq!(leaf, &FileEntry::new(Arc::from("/tmp/demo1.zip"), "file1", 33));

        // one identifier allocation shared by every leaf and the registry
        let id = mapper.registry().id("/tmp/demo1.zip").unwrap();
        for name in &names {
            let leaf = mapper.traverse(name).unwrap().as_file().unwrap();
            assert!(Arc::ptr_eq(&leaf.archive, id));
        }

        assert_eq!(mapper.contributed("/tmp/demo1.zip").unwrap(), names.as_slice());
        for name in &names {
            assert_eq!(mapper.occupants(name), vec!["/tmp/demo1.zip"]);
        }
    }

    #[test]
    fn test_load_entries_nested() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        let summary = mapper.load_entries("/tmp/demo2.zip", demo2_entries());
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.files, 6);

        assert_eq!(
            mapper.readdir("demo"),
            vec!["file1", "file2", "file3", "file4", "file5", "file6"]
        );
        let leaf = mapper.traverse("demo/file1").unwrap().as_file().unwrap();
        assert_eq!(leaf.name, "demo/file1");
        assert_eq!(&*leaf.archive, "/tmp/demo2.zip");

        assert_eq!(
            mapper.contributed("/tmp/demo2.zip").unwrap(),
            &[
                "demo/",
                "demo/file4",
                "demo/file3",
                "demo/file5",
                "demo/file6",
                "demo/file1",
                "demo/file2"
            ]
        );
        assert_eq!(mapper.occupants("demo/"), vec!["/tmp/demo2.zip"]);
    }

    #[test]
    fn test_load_dirfile_conflict() {
        let (mut mapper, sink) = mapper_with(MapperConfig::default());
        mapper.load_entries("/tmp/conflict.zip", entries(&[("demo", 0)]));
        let summary = mapper.load_entries("/tmp/demo2.zip", demo2_entries());

        assert_eq!(summary.conflicts, 7);
        assert_eq!(summary.files, 0);
        assert_eq!(mapper.readdir(""), vec!["demo"]);
        assert_eq!(owner(&mapper, "demo").as_deref(), Some("/tmp/conflict.zip"));

        // attempts are still recorded
        assert_eq!(mapper.contributed("/tmp/demo2.zip").unwrap().len(), 7);
        assert_eq!(mapper.occupants("demo/file1"), vec!["/tmp/demo2.zip"]);
        assert_eq!(mapper.occupants("demo"), vec!["/tmp/conflict.zip"]);

        let warnings = sink.messages(EventLevel::Warning);
        assert_eq!(warnings.len(), 7);
        assert_eq!(
            warnings[1],
            "`demo/file4` could not be created: cannot create directory `demo` at `/`: file entry exists."
        );

        // the rejected archive owns nothing, so unloading it leaves the tree alone
        let summary = mapper.unload("/tmp/demo2.zip").unwrap();
        assert_eq!(summary, UnloadSummary { names: 7, removed: 0 });
        assert_eq!(mapper.readdir(""), vec!["demo"]);
        assert_eq!(owner(&mapper, "demo").as_deref(), Some("/tmp/conflict.zip"));
        assert_eq!(mapper.registry().ledger_len(), 1);
        assert_eq!(mapper.occupants("demo"), vec!["/tmp/conflict.zip"]);
        assert!(mapper.occupants("demo/file1").is_empty());
        assert_eq!(mapper.archives(), vec!["/tmp/conflict.zip"]);
    }

    #[test]
    fn test_leading_slash_is_not_stripped() {
        let reader = Arc::new(
            MemoryArchiveReader::new().with_archive("a.zip", [("/abs", "A"), ("abs", "B")]),
        );
        let mut mapper = DefaultMapper::with_sink(
            MapperConfig::default(),
            reader,
            Arc::new(MemorySink::new()),
        );
        mapper.load_archive("a.zip").unwrap();

        assert_eq!(mapper.readdir(""), vec!["", "abs"]);
        assert_eq!(mapper.readfile("/abs").unwrap(), b"A");
        assert_eq!(mapper.readfile("abs").unwrap(), b"B");
        assert!(mapper.traverse("//abs").is_none());

        mapper.unload("a.zip").unwrap();
        assert!(mapper.traverse("/abs").is_none());
        assert!(mapper.traverse("abs").is_none());
    }

    #[test]
    fn test_overwrite_false_keeps_first() {
        let (mut mapper, sink) = mapper_with(MapperConfig::default());
        mapper.load_entries("dummy.zip", entries(&[("file5", 1), ("file6", 1), ("file7", 1)]));
        let summary = mapper.load_entries(
            "demo1.zip",
            entries(&[("file1", 33), ("file5", 33), ("file6", 33)]),
        );

        assert_eq!(summary.shadowed, 2);
        assert_eq!(owner(&mapper, "file1").as_deref(), Some("demo1.zip"));
        assert_eq!(owner(&mapper, "file5").as_deref(), Some("dummy.zip"));
        assert_eq!(owner(&mapper, "file7").as_deref(), Some("dummy.zip"));
        assert!(sink
            .messages(EventLevel::Info)
            .contains(&"`file5` already exists; ignoring".to_string()));
    }

    #[test]
    fn test_overwrite_true_replaces() {
        let (mut mapper, _) = mapper_with(MapperConfig::new().with_overwrite(true));
        mapper.load_entries("dummy.zip", entries(&[("file5", 1), ("file7", 1)]));
        let summary = mapper.load_entries("demo1.zip", entries(&[("file1", 33), ("file5", 33)]));

        assert_eq!(summary.replaced, 1);
        assert_eq!(summary.files, 2);
        let leaf = mapper.traverse("file5").unwrap().as_file().unwrap();
        assert_eq!(&*leaf.archive, "demo1.zip");
        assert_eq!(leaf.size, 33);
        assert_eq!(owner(&mapper, "file7").as_deref(), Some("dummy.zip"));
    }

    #[test]
    fn test_overwrite_never_turns_directory_into_file() {
        let (mut mapper, sink) = mapper_with(MapperConfig::new().with_overwrite(true));
        mapper.load_entries("a.zip", entries(&[("demo/file1", 1)]));
        let summary =
            mapper.load_entries("b.zip", entries(&[("demo", 1), ("demo/file1/x", 1)]));

        assert_eq!(summary.conflicts, 2);
        assert!(mapper.traverse("demo").unwrap().is_dir());
        assert_eq!(owner(&mapper, "demo/file1").as_deref(), Some("a.zip"));
        assert_eq!(
            sink.messages(EventLevel::Warning)[0],
            "`demo` could not be created: directory entry exists."
        );
    }

    #[test]
    fn test_include_arcname() {
        let (mut mapper, _) = mapper_with(MapperConfig::new().with_include_arcname(true));
        mapper.load_entries("/tmp/demo2.zip", demo2_entries());

        assert_eq!(mapper.readdir(""), vec!["demo2.zip"]);
        assert_eq!(mapper.readdir("demo2.zip"), vec!["demo"]);
        let leaf = mapper
            .traverse("demo2.zip/demo/file1")
            .unwrap()
            .as_file()
            .unwrap();
        // the leaf keeps the name inside the archive
        assert_eq!(leaf.name, "demo/file1");

        assert_eq!(mapper.occupants("demo2.zip/demo/file1"), vec!["/tmp/demo2.zip"]);
        assert!(mapper.occupants("demo/file1").is_empty());

        mapper.unload("/tmp/demo2.zip").unwrap();
        assert!(mapper.readdir("demo2.zip/demo").is_empty());
        assert_eq!(mapper.registry().ledger_len(), 0);
    }

    #[test]
    fn test_layout_junk() {
        let (mut mapper, _) = mapper_with(MapperConfig::new().with_layout(Layout::Junk));
        mapper.load_entries("a.zip", entries(&[("x/", 0), ("x/one", 1), ("y/z/two", 2)]));

        assert_eq!(mapper.readdir(""), vec!["one", "two"]);
        mapper.unload("a.zip").unwrap();
        assert!(mapper.readdir("").is_empty());
    }

    #[derive(Debug)]
    struct UpperPathMaker;

    impl PathMaker for UpperPathMaker {
        fn make_path(&self, name: &str) -> crate::pathmaker::EntryPath {
            crate::pathmaker::EntryPath::new(Vec::new(), Some(name.to_uppercase()))
        }
    }

    #[test]
    fn test_custom_path_maker() {
        let (mapper, _) = mapper_with(MapperConfig::default());
        let mut mapper = mapper.with_path_maker(Box::new(UpperPathMaker));
        mapper.load_entries("a.zip", entries(&[("readme", 1)]));

        assert_eq!(mapper.readdir(""), vec!["README"]);
        mapper.unload("a.zip").unwrap();
        assert!(mapper.readdir("").is_empty());
    }

    #[test]
    fn test_unload_simple() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        mapper.load_entries("/tmp/demo1.zip", entries(&[("file1", 33), ("file2", 33)]));

        let summary = mapper.unload("/tmp/demo1.zip").unwrap();
        assert_eq!(summary, UnloadSummary { names: 2, removed: 2 });

        assert!(mapper.root().is_empty());
        assert_eq!(mapper.registry().ledger_len(), 0);
        assert!(mapper.archives().is_empty());
    }

    #[test]
    fn test_unload_not_loaded() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        mapper.load_entries("a.zip", entries(&[("x", 1)]));

        let err = mapper.unload("b.zip").unwrap_err();
        assert!(matches!(err, MapperError::NotLoaded(ref a) if a == "b.zip"));
        assert_eq!(owner(&mapper, "x").as_deref(), Some("a.zip"));

        mapper.unload("a.zip").unwrap();
        assert!(matches!(mapper.unload("a.zip"), Err(MapperError::NotLoaded(_))));
    }

    #[test]
    fn test_unload_multiple_keeps_directories() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        mapper.load_entries("/tmp/demo1.zip", demo2_entries());
        mapper.load_entries("/tmp/demo2.zip", demo2_entries());
        mapper.load_entries("/tmp/demo3.zip", demo2_entries());

        assert_eq!(
            mapper.occupants("demo/"),
            vec!["/tmp/demo1.zip", "/tmp/demo2.zip", "/tmp/demo3.zip"]
        );

        // not the occupant: tree unchanged
        mapper.unload("/tmp/demo2.zip").unwrap();
        assert_eq!(mapper.readdir("demo").len(), 6);
        assert_eq!(owner(&mapper, "demo/file1").as_deref(), Some("/tmp/demo1.zip"));
        assert_eq!(mapper.archives(), vec!["/tmp/demo1.zip", "/tmp/demo3.zip"]);

        // the occupant: leaves removed, not refilled from demo3
        mapper.unload("/tmp/demo1.zip").unwrap();
        assert_eq!(mapper.readdir(""), vec!["demo"]);
        assert!(mapper.readdir("demo").is_empty());
        assert_eq!(mapper.occupants("demo/"), vec!["/tmp/demo3.zip"]);

        mapper.unload("/tmp/demo3.zip").unwrap();
        assert_eq!(mapper.readdir(""), vec!["demo"]);
        assert!(mapper.traverse("demo").unwrap().is_dir());
        assert_eq!(mapper.registry().ledger_len(), 0);
        assert!(mapper.registry().is_empty());
    }

    #[test]
    fn test_unload_reload_into_vacated_paths() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        mapper.load_entries("/tmp/demo1.zip", demo2_entries());
        mapper.load_entries("/tmp/demo2.zip", demo2_entries());
        mapper.load_entries("/tmp/demo3.zip", demo2_entries());

        mapper.unload("/tmp/demo1.zip").unwrap();
        assert!(mapper.readdir("demo").is_empty());

        mapper.load_entries("/tmp/demo4.zip", demo2_entries());
        assert_eq!(owner(&mapper, "demo/file3").as_deref(), Some("/tmp/demo4.zip"));

        // demo2 never occupied anything
        mapper.unload("/tmp/demo2.zip").unwrap();
        assert_eq!(mapper.readdir("demo").len(), 6);
        assert_eq!(
            mapper.occupants("demo/"),
            vec!["/tmp/demo3.zip", "/tmp/demo4.zip"]
        );

        // demo4 is the occupant, so its leaves go
        mapper.unload("/tmp/demo4.zip").unwrap();
        assert!(mapper.readdir("demo").is_empty());

        mapper.unload("/tmp/demo3.zip").unwrap();
        assert!(mapper.readdir("demo").is_empty());
    }

    #[test]
    fn test_unload_overwrite_latest() {
        let (mut mapper, _) = mapper_with(MapperConfig::new().with_overwrite(true));
        mapper.load_entries("/tmp/demo1.zip", demo2_entries());
        mapper.load_entries("/tmp/demo2.zip", demo2_entries());
        mapper.load_entries("/tmp/demo3.zip", demo2_entries());

        mapper.unload("/tmp/demo3.zip").unwrap();
        assert!(mapper.readdir("demo").is_empty());
        assert_eq!(
            mapper.occupants("demo/"),
            vec!["/tmp/demo1.zip", "/tmp/demo2.zip"]
        );

        mapper.load_entries("/tmp/demo4.zip", demo2_entries());
        mapper.unload("/tmp/demo1.zip").unwrap();
        assert_eq!(mapper.readdir("demo").len(), 6);
        assert_eq!(owner(&mapper, "demo/file6").as_deref(), Some("/tmp/demo4.zip"));
        assert_eq!(
            mapper.occupants("demo/"),
            vec!["/tmp/demo2.zip", "/tmp/demo4.zip"]
        );
    }

    #[test]
    fn test_reload_same_archive_merges() {
        let (mut mapper, sink) = mapper_with(MapperConfig::default());
        mapper.load_entries("a.zip", entries(&[("x", 1)]));
        let summary = mapper.load_entries("a.zip", entries(&[("x", 1), ("y", 1)]));

        // `x` is already occupied, by this very archive
        assert_eq!(summary.shadowed, 1);
        assert_eq!(summary.files, 1);
        assert_eq!(mapper.archives(), vec!["a.zip"]);
        assert_eq!(mapper.contributed("a.zip").unwrap(), &["x", "x", "y"]);
        assert_eq!(mapper.occupants("x"), vec!["a.zip", "a.zip"]);
        assert!(sink
            .messages(EventLevel::Info)
            .iter()
            .any(|m| m.contains("already loaded")));

        // a single unload drains everything
        let summary = mapper.unload("a.zip").unwrap();
        assert_eq!(summary.names, 3);
        assert!(mapper.root().is_empty());
        assert_eq!(mapper.registry().ledger_len(), 0);
        assert!(!mapper.is_loaded("a.zip"));
    }

    #[test]
    fn test_load_archive_failures_leave_state_untouched() {
        let reader = Arc::new(MemoryArchiveReader::new());
        reader.insert("good.zip", [("file1", HASH1)]);
        reader.insert_corrupt("bad.zip");
        let sink = Arc::new(MemorySink::new());
        let mut mapper = DefaultMapper::with_sink(MapperConfig::default(), reader, sink.clone());

        mapper.load_archive("good.zip").unwrap();
        assert!(matches!(
            mapper.load_archive("bad.zip"),
            Err(ArchiveError::InvalidFormat { .. })
        ));
        assert!(matches!(
            mapper.load_archive("nosuchzip.zip"),
            Err(ArchiveError::NotFound { .. })
        ));

        assert_eq!(mapper.archives(), vec!["good.zip"]);
        assert_eq!(mapper.readdir(""), vec!["file1"]);
        assert_eq!(
            sink.messages(EventLevel::Warning),
            vec![
                "`bad.zip` appears to be an invalid archive file",
                "`nosuchzip.zip` does not exist."
            ]
        );
    }

    #[test]
    fn test_readfile() {
        let reader = Arc::new(
            MemoryArchiveReader::new().with_archive("z1.zip", [("demo/", ""), ("demo/file1", HASH1)]),
        );
        let mut mapper = DefaultMapper::new(MapperConfig::default(), reader.clone());
        mapper.load_archive("z1.zip").unwrap();

        assert_eq!(mapper.readfile("demo/file1").unwrap(), HASH1.as_bytes());

        let mut out = Vec::new();
        assert_eq!(mapper.read_into("demo/file1", &mut out).unwrap(), 33);
        assert_eq!(out, HASH1.as_bytes());

        assert!(matches!(mapper.readfile("demo"), Err(MapperError::NotAFile(_))));
        assert!(matches!(mapper.readfile("demo/nope"), Err(MapperError::NotFound(_))));

        // archive vanished after load
        reader.remove("z1.zip");
        assert!(matches!(
            mapper.readfile("demo/file1"),
            Err(MapperError::Archive(ArchiveError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_stat() {
        let (mut mapper, _) = mapper_with(MapperConfig::default());
        mapper.load_entries("a.zip", entries(&[("demo/file1", 33), ("demo/file2", 7)]));

        let dir = mapper.stat("demo").unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.children, 2);

        let file = mapper.stat("demo/file2").unwrap();
        assert!(file.is_file());
        assert_eq!(file.size, 7);
        assert_eq!(file.archive.as_deref(), Some("a.zip"));

        assert!(mapper.stat("missing").is_none());
    }

    #[test]
    fn test_with_archive() {
        let reader = Arc::new(MemoryArchiveReader::new().with_archive("a.zip", [("f", "x")]));
        let sink = Arc::new(MemorySink::new());

        let mapper = DefaultMapper::with_archive(MapperConfig::default(), reader.clone(), sink.clone(), "a.zip");
        assert_eq!(mapper.readdir(""), vec!["f"]);

        let empty = DefaultMapper::with_archive(MapperConfig::default(), reader, sink.clone(), "missing.zip");
        assert!(empty.root().is_empty());
        assert_eq!(sink.count(EventLevel::Warning), 1);
    }

    #[test]
    fn test_effective_name() {
        let (plain, _) = mapper_with(MapperConfig::default());
        assert_eq!(plain.effective_name("/tmp/a.zip", "demo/x"), "demo/x");

        let (prefixed, _) = mapper_with(MapperConfig::new().with_include_arcname(true));
        assert_eq!(prefixed.effective_name("/tmp/a.zip", "demo/x"), "a.zip/demo/x");
    }

    #[test]
    fn test_archive_basename() {
        assert_eq!(archive_basename("/tmp/demo1.zip"), "demo1.zip");
        assert_eq!(archive_basename("demo1.zip"), "demo1.zip");
    }
}
