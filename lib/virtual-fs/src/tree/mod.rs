//! The per-instance view of a packed image.
//!
//! A [`VirtualTree`] layers an overlay on top of a shared, immutable
//! [`PackedImage`]. Every mutation lands in the overlay; the packed bytes are
//! never touched, so other instances built from the same image never observe
//! them. Lookups consult the overlay first, then the image.

use crate::image::{
    ImageBuilder, ImageError, MAX_FILE_SIZE, MergePolicy, NodeId, NodeKind, PackedImage,
    PackedNode, PackedRoot, RootHandle, is_valid_name, normalize_guest_path,
};
use crate::{FsError, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::trace;

/// Metadata of a node, as reported by `fd_filestat_get` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    pub ino: u64,
    pub kind: NodeKind,
    pub size: u64,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub node: NodeId,
    pub kind: NodeKind,
}

/// Where a node currently lives, when that differs from the image.
#[derive(Debug, Clone)]
struct Link {
    parent: NodeId,
    name: String,
}

/// Changes made to the entries of one directory.
#[derive(Debug, Default)]
struct DirDelta {
    /// Entries created or moved in, in creation order.
    added: IndexMap<String, NodeId>,
    /// Packed children that were unlinked or moved away.
    removed: HashSet<NodeId>,
}

#[derive(Debug)]
struct Overlay {
    next_id: u32,
    kinds: HashMap<NodeId, NodeKind>,
    links: HashMap<NodeId, Link>,
    contents: HashMap<NodeId, Vec<u8>>,
    dirs: HashMap<NodeId, DirDelta>,
    /// Nodes no longer reachable from a root. Their data stays readable
    /// through descriptors that are still open.
    detached: HashSet<NodeId>,
}

impl Overlay {
    fn new(first_id: u32) -> Self {
        Self {
            next_id: first_id,
            kinds: HashMap::new(),
            links: HashMap::new(),
            contents: HashMap::new(),
            dirs: HashMap::new(),
            detached: HashSet::new(),
        }
    }
}

#[derive(Debug)]
pub struct VirtualTree {
    image: Arc<PackedImage>,
    overlay: Overlay,
}

impl VirtualTree {
    pub fn new(image: Arc<PackedImage>) -> Self {
        let overlay = Overlay::new(image.len());
        Self { image, overlay }
    }

    pub fn image(&self) -> &Arc<PackedImage> {
        &self.image
    }

    /// Packed roots, in pack order.
    pub fn roots(&self) -> &[PackedRoot] {
        self.image.roots()
    }

    pub fn root_of(&self, guest_path: &str) -> Option<NodeId> {
        let guest_path = normalize_guest_path(guest_path).ok()?;
        self.image.root(&guest_path).map(|root| root.node)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.image.roots().iter().any(|root| root.node == id)
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        if let Some(kind) = self.overlay.kinds.get(&id) {
            return Ok(*kind);
        }
        self.image
            .node(id)
            .map(PackedNode::kind)
            .ok_or(FsError::NoEntry)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.overlay.links.get(&id) {
            Some(link) => Some(&link.name),
            None => self.image.node(id).map(PackedNode::name),
        }
    }

    /// The directory containing `id`, `None` for a root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match self.overlay.links.get(&id) {
            Some(link) => Some(link.parent),
            None => self.image.node(id)?.parent(),
        }
    }

    /// Absolute guest path of a node that is still reachable from a root.
    pub fn guest_path(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::<&str>::new();
        let mut cursor = id;
        loop {
            if self.overlay.detached.contains(&cursor) {
                return None;
            }
            if let Some(root) = self.roots().iter().find(|root| root.node == cursor) {
                let mut path = root.guest_path.clone();
                for name in names.iter().rev() {
                    if !path.ends_with('/') {
                        path.push('/');
                    }
                    path.push_str(name);
                }
                return Some(path);
            }
            names.push(self.name(cursor)?);
            cursor = self.parent(cursor)?;
        }
    }

    pub fn child(&self, dir: NodeId, name: &str) -> Result<NodeId> {
        if self.kind(dir)? != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        let delta = self.overlay.dirs.get(&dir);
        if let Some(&id) = delta.and_then(|delta| delta.added.get(name)) {
            return Ok(id);
        }
        match self.image.child(dir, name) {
            Some(id) if !delta.is_some_and(|delta| delta.removed.contains(&id)) => Ok(id),
            _ => Err(FsError::NoEntry),
        }
    }

    /// Walks `path` from `base`, left to right.
    ///
    /// `.` stays in place and `..` moves to the parent, failing with
    /// [`FsError::InvalidPath`] at a root.
    pub fn lookup(&self, base: NodeId, path: &str) -> Result<NodeId> {
        let mut cursor = base;
        self.kind(cursor)?;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            cursor = match component {
                "." | ".." if self.kind(cursor)? != NodeKind::Directory => {
                    return Err(FsError::NotADirectory);
                }
                "." => cursor,
                ".." => self.parent(cursor).ok_or(FsError::InvalidPath)?,
                name => self.child(cursor, name)?,
            };
        }
        Ok(cursor)
    }

    pub fn stat(&self, id: NodeId) -> Result<NodeStat> {
        let kind = self.kind(id)?;
        let size = match kind {
            NodeKind::File => self.content(id).map_or(0, |content| content.len() as u64),
            NodeKind::Directory => 0,
        };
        Ok(NodeStat {
            ino: id.ino(),
            kind,
            size,
            read_only: self.is_read_only(id),
        })
    }

    /// Entries of `dir`: packed entries in pack order, then entries created
    /// during this session in creation order.
    pub fn readdir(&self, dir: NodeId) -> Result<Vec<DirEntry>> {
        if self.kind(dir)? != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        let delta = self.overlay.dirs.get(&dir);
        let mut entries = Vec::new();
        if let Some(PackedNode::Directory { children, .. }) = self.image.node(dir) {
            for &child in children {
                if delta.is_some_and(|delta| delta.removed.contains(&child)) {
                    continue;
                }
                if let Some(node) = self.image.node(child) {
                    entries.push(DirEntry {
                        name: node.name().to_string(),
                        node: child,
                        kind: node.kind(),
                    });
                }
            }
        }
        if let Some(delta) = delta {
            for (name, &node) in &delta.added {
                entries.push(DirEntry {
                    name: name.clone(),
                    node,
                    kind: self.kind(node)?,
                });
            }
        }
        Ok(entries)
    }

    /// Reads into `buf` starting at `offset`. Reading at or past the end
    /// returns 0.
    pub fn read_at(&self, id: NodeId, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if self.kind(id)? != NodeKind::File {
            return Err(FsError::IsADirectory);
        }
        let content = self.content(id).unwrap_or_default();
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= content.len() {
            return Ok(0);
        }
        let read = buf.len().min(content.len() - offset);
        buf[..read].copy_from_slice(&content[offset..offset + read]);
        Ok(read)
    }

    /// Writes `data` at `offset`, zero-filling any gap past the end.
    pub fn write_at(&mut self, id: NodeId, offset: u64, data: &[u8]) -> Result<usize> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(FsError::FileTooLarge)?;
        check_file_size(end)?;
        let (offset, end) = (offset as usize, end as usize);
        let content = self.content_mut(id)?;
        if content.len() < end {
            content.resize(end, 0);
        }
        content[offset..end].copy_from_slice(data);
        Ok(data.len())
    }

    pub fn set_len(&mut self, id: NodeId, len: u64) -> Result<()> {
        check_file_size(len)?;
        self.content_mut(id)?.resize(len as usize, 0);
        Ok(())
    }

    pub fn create_file(&mut self, dir: NodeId, name: &str) -> Result<NodeId> {
        self.check_new_entry(dir, name)?;
        let id = self.allocate(NodeKind::File)?;
        self.overlay.contents.insert(id, Vec::new());
        self.attach(dir, name, id);
        trace!(%dir, entry = name, %id, "created file");
        Ok(id)
    }

    pub fn create_dir(&mut self, dir: NodeId, name: &str) -> Result<NodeId> {
        self.check_new_entry(dir, name)?;
        let id = self.allocate(NodeKind::Directory)?;
        self.attach(dir, name, id);
        trace!(%dir, entry = name, %id, "created directory");
        Ok(id)
    }

    /// Creates the file at `path` below `dir` along with any missing
    /// intermediate directories.
    pub fn create_file_all(&mut self, dir: NodeId, path: &str) -> Result<NodeId> {
        let components = path.split('/').filter(|c| !c.is_empty()).collect::<Vec<_>>();
        let Some((name, intermediates)) = components.split_last() else {
            return Err(FsError::InvalidInput);
        };
        let mut cursor = dir;
        for component in intermediates {
            cursor = match self.child(cursor, component) {
                Ok(id) if self.kind(id)? == NodeKind::Directory => id,
                Ok(_) => return Err(FsError::NotADirectory),
                Err(FsError::NoEntry) => self.create_dir(cursor, component)?,
                Err(err) => return Err(err),
            };
        }
        self.create_file(cursor, name)
    }

    pub fn unlink_file(&mut self, dir: NodeId, name: &str) -> Result<()> {
        let id = self.child(dir, name)?;
        if self.kind(id)? == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }
        self.detach(dir, id);
        Ok(())
    }

    pub fn remove_dir(&mut self, dir: NodeId, name: &str) -> Result<()> {
        let id = self.child(dir, name)?;
        if self.kind(id)? != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        if !self.readdir(id)?.is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }
        self.detach(dir, id);
        Ok(())
    }

    /// Moves `from_dir/from_name` to `to_dir/to_name`, replacing a file or an
    /// empty directory already there.
    pub fn rename(
        &mut self,
        from_dir: NodeId,
        from_name: &str,
        to_dir: NodeId,
        to_name: &str,
    ) -> Result<()> {
        let source = self.child(from_dir, from_name)?;
        if !is_valid_name(to_name) {
            return Err(FsError::InvalidInput);
        }
        if self.kind(to_dir)? != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        if self.overlay.detached.contains(&to_dir) {
            return Err(FsError::NoEntry);
        }
        let source_kind = self.kind(source)?;

        // a directory cannot move below itself
        if source_kind == NodeKind::Directory {
            let mut cursor = Some(to_dir);
            while let Some(node) = cursor {
                if node == source {
                    return Err(FsError::InvalidInput);
                }
                cursor = self.parent(node);
            }
        }

        match self.child(to_dir, to_name) {
            Ok(target) if target == source => return Ok(()),
            Ok(target) => {
                match (source_kind, self.kind(target)?) {
                    (NodeKind::File, NodeKind::Directory) => return Err(FsError::IsADirectory),
                    (NodeKind::Directory, NodeKind::File) => return Err(FsError::NotADirectory),
                    (NodeKind::Directory, NodeKind::Directory) if !self.readdir(target)?.is_empty() => {
                        return Err(FsError::DirectoryNotEmpty);
                    }
                    _ => {}
                }
                self.detach(to_dir, target);
            }
            Err(FsError::NoEntry) => {}
            Err(err) => return Err(err),
        }

        self.detach(from_dir, source);
        self.attach(to_dir, to_name, source);
        trace!(%source, from_name, to_name, "renamed");
        Ok(())
    }

    /// Flattens the image and the overlay into a new image, e.g. to embed
    /// the state of a session into a module again.
    pub fn export(&self) -> std::result::Result<PackedImage, ImageError> {
        let mut builder = ImageBuilder::new();
        for root in self.roots() {
            let handle = builder.add_root(&root.guest_path, MergePolicy::Reject)?;
            self.export_dir(&mut builder, handle, root.node, "")?;
        }
        Ok(builder.build())
    }

    fn export_dir(
        &self,
        builder: &mut ImageBuilder,
        root: RootHandle,
        dir: NodeId,
        prefix: &str,
    ) -> std::result::Result<(), ImageError> {
        for entry in self.readdir(dir)? {
            let path = format!("{prefix}/{}", entry.name);
            match entry.kind {
                NodeKind::Directory => {
                    builder.add_dir(root, &path, MergePolicy::Reject)?;
                    self.export_dir(builder, root, entry.node, &path)?;
                }
                NodeKind::File => {
                    let content = match (self.overlay.contents.get(&entry.node), self.image.node(entry.node)) {
                        (Some(content), _) => Bytes::copy_from_slice(content),
                        (None, Some(PackedNode::File { content, .. })) => content.clone(),
                        (None, _) => Bytes::new(),
                    };
                    let read_only = self.is_read_only(entry.node);
                    builder.add_file(root, &path, content, read_only, MergePolicy::Reject)?;
                }
            }
        }
        Ok(())
    }

    fn content(&self, id: NodeId) -> Option<&[u8]> {
        if let Some(content) = self.overlay.contents.get(&id) {
            return Some(content);
        }
        match self.image.node(id)? {
            PackedNode::File { content, .. } => Some(content),
            PackedNode::Directory { .. } => None,
        }
    }

    /// Overlay copy of a file's content, copied from the image on first use.
    fn content_mut(&mut self, id: NodeId) -> Result<&mut Vec<u8>> {
        if self.kind(id)? != NodeKind::File {
            return Err(FsError::IsADirectory);
        }
        if self.is_read_only(id) {
            return Err(FsError::ReadOnly);
        }
        let image = &self.image;
        Ok(self.overlay.contents.entry(id).or_insert_with(|| {
            trace!(%id, "copying packed content into the overlay");
            match image.node(id) {
                Some(PackedNode::File { content, .. }) => content.to_vec(),
                _ => Vec::new(),
            }
        }))
    }

    fn is_read_only(&self, id: NodeId) -> bool {
        !self.overlay.kinds.contains_key(&id)
            && matches!(
                self.image.node(id),
                Some(PackedNode::File {
                    read_only: true,
                    ..
                })
            )
    }

    fn check_new_entry(&self, dir: NodeId, name: &str) -> Result<()> {
        if self.kind(dir)? != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        if self.overlay.detached.contains(&dir) {
            return Err(FsError::NoEntry);
        }
        if !is_valid_name(name) {
            return Err(FsError::InvalidInput);
        }
        match self.child(dir, name) {
            Ok(_) => Err(FsError::AlreadyExists),
            Err(FsError::NoEntry) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn allocate(&mut self, kind: NodeKind) -> Result<NodeId> {
        let id = NodeId::from_index(self.overlay.next_id);
        self.overlay.next_id = self
            .overlay
            .next_id
            .checked_add(1)
            .ok_or(FsError::UnknownError)?;
        self.overlay.kinds.insert(id, kind);
        Ok(id)
    }

    fn attach(&mut self, dir: NodeId, name: &str, id: NodeId) {
        self.overlay
            .dirs
            .entry(dir)
            .or_default()
            .added
            .insert(name.to_string(), id);
        self.overlay.links.insert(id, Link {
            parent: dir,
            name: name.to_string(),
        });
        self.overlay.detached.remove(&id);
    }

    fn detach(&mut self, dir: NodeId, id: NodeId) {
        let delta = self.overlay.dirs.entry(dir).or_default();
        match delta.added.iter().position(|(_, child)| *child == id) {
            Some(index) => {
                delta.added.shift_remove_index(index);
            }
            None => {
                delta.removed.insert(id);
            }
        }
        self.overlay.detached.insert(id);
    }
}

fn check_file_size(len: u64) -> Result<()> {
    if len >= MAX_FILE_SIZE {
        return Err(FsError::FileTooLarge);
    }
    Ok(())
}
