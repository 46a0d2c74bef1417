//! Namespace tree nodes.
//!
//! The tree is a plain owned structure: every [`Directory`] owns its children
//! and nothing points back up. All mutation goes through the mapper, which
//! always walks from the root down a path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of a loaded archive, shared by every leaf the archive owns.
pub type ArchiveId = Arc<str>;

/// A file leaf: which archive holds the bytes and under what entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Archive currently occupying this leaf.
    pub archive: ArchiveId,

    /// Entry name inside the archive, as reported by the archive reader.
    pub name: String,

    /// Uncompressed size in bytes.
    pub size: u64,
}

impl FileEntry {
    /// Create a new file leaf.
    pub fn new(archive: ArchiveId, name: impl Into<String>, size: u64) -> Self {
        Self {
            archive,
            name: name.into(),
            size,
        }
    }

    /// Check if this leaf belongs to the given archive.
    pub fn is_owned_by(&self, archive: &str) -> bool {
        &*self.archive == archive
    }
}

/// A node in the namespace tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(Directory),
    File(FileEntry),
}

impl Node {
    /// Borrow this node as a [`NodeRef`].
    pub fn view(&self) -> NodeRef<'_> {
        match self {
            Node::Directory(dir) => NodeRef::Directory(dir),
            Node::File(file) => NodeRef::File(file),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File(_))
    }
}

/// Borrowed view of a node, returned by lookups.
///
/// The root is a bare [`Directory`], so lookups hand out this view rather
/// than `&Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Directory(&'a Directory),
    File(&'a FileEntry),
}

impl<'a> NodeRef<'a> {
    pub fn as_dir(&self) -> Option<&'a Directory> {
        match *self {
            NodeRef::Directory(dir) => Some(dir),
            NodeRef::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&'a FileEntry> {
        match *self {
            NodeRef::File(file) => Some(file),
            NodeRef::Directory(_) => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.as_dir().is_some()
    }

    pub fn is_file(&self) -> bool {
        self.as_file().is_some()
    }
}

/// A directory fragment collided with an existing file leaf.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot create directory `{name}` at `{parent}/`: file entry exists.")]
pub struct PathConflict {
    /// The fragment that could not become a directory.
    pub name: String,

    /// Path of the directory holding the conflicting file, `""` for root.
    pub parent: String,
}

/// A directory: names mapped to child nodes.
///
/// Children are kept in a `BTreeMap` so listings come out sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directory {
    entries: BTreeMap<String, Node>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Bind `name` to `node`, returning the node previously bound there.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) -> Option<Node> {
        self.entries.insert(name.into(), node)
    }

    pub fn remove(&mut self, name: &str) -> Option<Node> {
        self.entries.remove(name)
    }

    /// Child names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ensure every fragment exists as a directory and return the innermost.
    ///
    /// Missing directories are created. Fails when a fragment is already
    /// bound to a file; a file can only sit in an existing directory, so a
    /// failed call never leaves new directories behind.
    pub fn mkdir<S: AsRef<str>>(&mut self, fragments: &[S]) -> Result<&mut Directory, PathConflict> {
        let mut current = self;

        for (depth, frag) in fragments.iter().enumerate() {
            let frag = frag.as_ref();
            let node = current
                .entries
                .entry(frag.to_string())
                .or_insert_with(|| Node::Directory(Directory::new()));

            current = match node {
                Node::Directory(dir) => dir,
                Node::File(_) => {
                    return Err(PathConflict {
                        name: frag.to_string(),
                        parent: join(&fragments[..depth]),
                    })
                }
            };
        }

        Ok(current)
    }

    /// Find an existing directory by fragments without creating anything.
    pub fn dir_mut<S: AsRef<str>>(&mut self, fragments: &[S]) -> Option<&mut Directory> {
        let mut current = self;
        for frag in fragments {
            current = match current.entries.get_mut(frag.as_ref()) {
                Some(Node::Directory(dir)) => dir,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Resolve a `/`-separated path relative to this directory.
    ///
    /// The empty path resolves to this directory itself.
    pub fn resolve(&self, path: &str) -> Option<NodeRef<'_>> {
        let mut current = NodeRef::Directory(self);
        if path.is_empty() {
            return Some(current);
        }

        for frag in path.split('/') {
            let dir = current.as_dir()?;
            current = dir.get(frag)?.view();
        }

        Some(current)
    }

    /// Count file leaves below this directory.
    pub fn file_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                Node::Directory(dir) => dir.file_count(),
                Node::File(_) => 1,
            })
            .sum()
    }

    /// Count directories below this directory, not including itself.
    pub fn dir_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                Node::Directory(dir) => 1 + dir.dir_count(),
                Node::File(_) => 0,
            })
            .sum()
    }
}

impl fmt::Display for Directory {
    /// Indented listing, one node per line, directories suffixed with `/`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(dir: &Directory, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for (name, node) in dir.iter() {
                let indent = "  ".repeat(depth);
                match node {
                    Node::Directory(child) => {
                        writeln!(f, "{}{}/", indent, name)?;
                        walk(child, depth + 1, f)?;
                    }
                    Node::File(file) => {
                        writeln!(f, "{}{} ({} bytes, {})", indent, name, file.size, file.archive)?;
                    }
                }
            }
            Ok(())
        }
        walk(self, 0, f)
    }
}

fn join<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/")
}
