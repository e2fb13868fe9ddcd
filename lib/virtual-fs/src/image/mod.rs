//! The packed image: a set of directory trees, each exposed to the guest as a
//! preopened directory, serialized into a data section of the module.
//!
//! Layout (little-endian, version 1):
//!
//! ```text
//! magic        "WVFS"
//! version      u16
//! reserved     u16, zero
//! root_count   u32
//! roots        { path_len u32, path, node u32 } * root_count
//! node_count   u32
//! nodes        node * node_count, in id order
//! checksum     u64, xxh64 (seed 0) of every preceding byte
//!
//! node:   tag u8, parent u32 (NO_PARENT for a root), name_len u32, name
//! file:   flags u8, len u64, bytes
//! dir:    child_count u32, child u32 * child_count
//! ```

mod builder;
mod decode;
mod encode;

pub use builder::{ImageBuilder, RootHandle};

use bytes::Bytes;
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

pub(crate) const MAGIC: &[u8; 4] = b"WVFS";
pub(crate) const VERSION: u16 = 1;
pub(crate) const NO_PARENT: u32 = u32::MAX;
pub(crate) const TAG_FILE: u8 = 1;
pub(crate) const TAG_DIR: u8 = 2;
pub(crate) const FILE_FLAG_READ_ONLY: u8 = 1 << 0;

/// Files must stay strictly below this size, packed or written at runtime.
pub const MAX_FILE_SIZE: u64 = u32::MAX as u64;

/// Stable identity of a node, in the packed image and in the overlay built on
/// top of it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn from_index(index: u32) -> Self {
        NodeId(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    /// Inode number reported to the guest. Zero is left unused.
    pub const fn ino(self) -> u64 {
        self.0 as u64 + 1
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedNode {
    File {
        name: String,
        parent: NodeId,
        content: Bytes,
        read_only: bool,
    },
    Directory {
        name: String,
        parent: Option<NodeId>,
        children: Vec<NodeId>,
    },
}

impl PackedNode {
    pub fn name(&self) -> &str {
        match self {
            PackedNode::File { name, .. } | PackedNode::Directory { name, .. } => name,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            PackedNode::File { parent, .. } => Some(*parent),
            PackedNode::Directory { parent, .. } => *parent,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            PackedNode::File { .. } => NodeKind::File,
            PackedNode::Directory { .. } => NodeKind::Directory,
        }
    }
}

/// A packed directory exposed to the guest at `guest_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRoot {
    pub guest_path: String,
    pub node: NodeId,
}

/// An immutable, validated image. Instances share it behind an `Arc` and
/// never mutate it.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PackedImage {
    roots: Vec<PackedRoot>,
    nodes: Vec<PackedNode>,
}

impl PackedImage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Roots in pack order.
    pub fn roots(&self) -> &[PackedRoot] {
        &self.roots
    }

    pub fn root(&self, guest_path: &str) -> Option<&PackedRoot> {
        self.roots.iter().find(|root| root.guest_path == guest_path)
    }

    pub fn node(&self, id: NodeId) -> Option<&PackedNode> {
        self.nodes.get(id.index() as usize)
    }

    /// Number of packed nodes. Ids below this value belong to the image.
    pub fn len(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds `name` among the children of the directory `dir`.
    pub fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        match self.node(dir)? {
            PackedNode::Directory { children, .. } => children
                .iter()
                .copied()
                .find(|child| self.node(*child).map(PackedNode::name) == Some(name)),
            PackedNode::File { .. } => None,
        }
    }

    /// Looks up a path such as `/mnt0/dir/file.txt`, starting from the root
    /// with the longest matching guest path.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let path = normalize_guest_path(path).ok()?;
        let root = self
            .roots
            .iter()
            .filter(|root| guest_path_strip_prefix(&path, &root.guest_path).is_some())
            .max_by_key(|root| root.guest_path.len())?;
        let rest = guest_path_strip_prefix(&path, &root.guest_path)?;
        rest.split('/')
            .filter(|c| !c.is_empty())
            .try_fold(root.node, |dir, name| self.child(dir, name))
    }

    pub(crate) fn from_parts(roots: Vec<PackedRoot>, nodes: Vec<PackedNode>) -> Self {
        Self { roots, nodes }
    }
}

impl fmt::Debug for PackedImage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "\n{id:<8}    {ty:<4}    name", id = "id", ty = "type")?;

        fn debug(
            image: &PackedImage,
            id: NodeId,
            name: &str,
            formatter: &mut fmt::Formatter<'_>,
            indentation: usize,
        ) -> fmt::Result {
            let Some(node) = image.node(id) else {
                return Ok(());
            };
            writeln!(
                formatter,
                "{id:<8}    {ty:<4}   {indentation_symbol:indentation_width$}{name}",
                id = id.index(),
                ty = match node {
                    PackedNode::File {
                        read_only: true, ..
                    } => "ro-file",
                    PackedNode::File { .. } => "file",
                    PackedNode::Directory { .. } => "dir",
                },
                indentation_symbol = " ",
                indentation_width = indentation * 2 + 1,
            )?;
            if let PackedNode::Directory { children, .. } = node {
                for child in children {
                    if let Some(child_node) = image.node(*child) {
                        debug(image, *child, child_node.name(), formatter, indentation + 1)?;
                    }
                }
            }
            Ok(())
        }

        for root in &self.roots {
            debug(self, root.node, &root.guest_path, formatter, 0)?;
        }
        Ok(())
    }
}

/// What to do when a later pack adds a path that already exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Fail with [`ImageError::DuplicatePath`].
    #[default]
    Reject,
    /// The later pack wins.
    Overwrite,
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("corrupt image at byte {offset}: {reason}")]
    CorruptImage { offset: usize, reason: String },
    #[error("`{0}` already exists in the image")]
    DuplicatePath(String),
    #[error("invalid guest path `{0}`")]
    InvalidGuestPath(String),
    #[error("`{0}` is not a directory")]
    NotADirectory(String),
    #[error("invalid directory mapping `{mapping}`: {reason}")]
    InvalidMapping { mapping: String, reason: &'static str },
    #[error("unable to export the tree: {0}")]
    Tree(#[from] crate::FsError),
    #[error("unable to pack `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ImageError {
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        ImageError::CorruptImage {
            offset,
            reason: reason.into(),
        }
    }
}

/// Normalizes an absolute guest path: repeated separators and `.` are
/// dropped, `..` pops a component. A result that would climb above `/` is
/// rejected, as is a relative path.
pub fn normalize_guest_path(path: &str) -> Result<String, ImageError> {
    if !path.starts_with('/') {
        return Err(ImageError::InvalidGuestPath(path.to_string()));
    }
    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if components.pop().is_none() {
                    return Err(ImageError::InvalidGuestPath(path.to_string()));
                }
            }
            name => components.push(name),
        }
    }
    Ok(format!("/{}", components.join("/")))
}

/// Returns the part of `path` below `prefix` when `prefix` is a
/// component-wise prefix of it (`/mnt` is a prefix of `/mnt/a`, not of
/// `/mnt2`). Both paths must be normalized.
pub fn guest_path_strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

/// A valid entry name: non-empty, no separator, not `.` or `..`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}
