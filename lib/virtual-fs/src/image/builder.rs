use super::{
    ImageError, MergePolicy, NodeId, PackedImage, PackedNode, PackedRoot, is_valid_name,
    normalize_guest_path,
};
use bytes::Bytes;
use indexmap::IndexMap;
use slab::Slab;
use tracing::trace;

type Inode = usize;

#[derive(Debug)]
enum BuilderNode {
    File {
        content: Bytes,
        read_only: bool,
    },
    Directory {
        children: IndexMap<String, Inode>,
    },
}

/// Handle on a root added to an [`ImageBuilder`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RootHandle(Inode);

/// Mutable construction side of a [`PackedImage`], used when packing host
/// directories and when merging a later pack into an earlier one.
///
/// Children keep insertion order, which becomes the `readdir` order of the
/// built image.
#[derive(Debug, Default)]
pub struct ImageBuilder {
    storage: Slab<BuilderNode>,
    roots: IndexMap<String, Inode>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing image, e.g. the one already embedded in a
    /// module that is being packed a second time.
    pub fn from_image(image: &PackedImage) -> Self {
        let mut builder = Self::new();
        for root in image.roots() {
            let inode = builder.storage.insert(BuilderNode::Directory {
                children: IndexMap::new(),
            });
            builder.copy_children(image, root.node, inode);
            builder.roots.insert(root.guest_path.clone(), inode);
        }
        builder
    }

    pub fn root(&self, guest_path: &str) -> Option<RootHandle> {
        let guest_path = normalize_guest_path(guest_path).ok()?;
        self.roots.get(&guest_path).copied().map(RootHandle)
    }

    /// Adds an empty root directory at `guest_path`.
    ///
    /// With [`MergePolicy::Overwrite`] an existing root at the same path is
    /// emptied and keeps its position among the roots.
    pub fn add_root(
        &mut self,
        guest_path: &str,
        policy: MergePolicy,
    ) -> Result<RootHandle, ImageError> {
        let guest_path = normalize_guest_path(guest_path)?;
        if let Some(&existing) = self.roots.get(&guest_path) {
            if policy == MergePolicy::Reject {
                return Err(ImageError::DuplicatePath(guest_path));
            }
            trace!(%guest_path, "replacing packed root");
            self.remove_subtree(existing);
        }
        let inode = self.storage.insert(BuilderNode::Directory {
            children: IndexMap::new(),
        });
        self.roots.insert(guest_path, inode);
        Ok(RootHandle(inode))
    }

    /// Adds a directory at `path` (relative to `root`), creating missing
    /// intermediate directories. An existing directory is left as is.
    pub fn add_dir(
        &mut self,
        root: RootHandle,
        path: &str,
        policy: MergePolicy,
    ) -> Result<(), ImageError> {
        let (parent, name) = self.walk_to_parent(root, path)?;
        let node = BuilderNode::Directory {
            children: IndexMap::new(),
        };
        match self.child(parent, &name) {
            Some(existing) => {
                let is_dir = matches!(
                    self.storage.get(existing),
                    Some(BuilderNode::Directory { .. })
                );
                if is_dir {
                    return Ok(());
                }
                if policy == MergePolicy::Reject {
                    return Err(ImageError::DuplicatePath(self.display_path(root, path)));
                }
                self.replace_child(parent, name, node);
            }
            None => {
                self.insert_child(parent, name, node);
            }
        }
        Ok(())
    }

    /// Adds a file at `path` (relative to `root`), creating missing
    /// intermediate directories.
    pub fn add_file(
        &mut self,
        root: RootHandle,
        path: &str,
        content: impl Into<Bytes>,
        read_only: bool,
        policy: MergePolicy,
    ) -> Result<(), ImageError> {
        let (parent, name) = self.walk_to_parent(root, path)?;
        let node = BuilderNode::File {
            content: content.into(),
            read_only,
        };
        if self.child(parent, &name).is_some() {
            if policy == MergePolicy::Reject {
                return Err(ImageError::DuplicatePath(self.display_path(root, path)));
            }
            self.replace_child(parent, name, node);
        } else {
            self.insert_child(parent, name, node);
        }
        Ok(())
    }

    /// Merges every root of `image` into this builder.
    ///
    /// Under [`MergePolicy::Reject`] nothing is merged if any root of `image`
    /// already exists here.
    pub fn merge(&mut self, image: &PackedImage, policy: MergePolicy) -> Result<(), ImageError> {
        if policy == MergePolicy::Reject {
            if let Some(dup) = image
                .roots()
                .iter()
                .find(|root| self.roots.contains_key(&root.guest_path))
            {
                return Err(ImageError::DuplicatePath(dup.guest_path.clone()));
            }
        }
        for root in image.roots() {
            let RootHandle(inode) = self.add_root(&root.guest_path, policy)?;
            self.copy_children(image, root.node, inode);
        }
        Ok(())
    }

    /// Freezes the builder into an image. Node ids are assigned root by
    /// root, in pre-order, so building is deterministic.
    pub fn build(&self) -> PackedImage {
        let mut nodes = Vec::new();
        let mut roots = Vec::with_capacity(self.roots.len());
        for (guest_path, &inode) in &self.roots {
            let node = self.flatten_dir(inode, String::new(), None, &mut nodes);
            roots.push(PackedRoot {
                guest_path: guest_path.clone(),
                node,
            });
        }
        PackedImage::from_parts(roots, nodes)
    }

    fn flatten_dir(
        &self,
        inode: Inode,
        name: String,
        parent: Option<NodeId>,
        nodes: &mut Vec<PackedNode>,
    ) -> NodeId {
        let id = NodeId::from_index(nodes.len() as u32);
        nodes.push(PackedNode::Directory {
            name,
            parent,
            children: Vec::new(),
        });

        let mut child_ids = Vec::new();
        if let Some(BuilderNode::Directory { children }) = self.storage.get(inode) {
            for (child_name, &child) in children {
                match self.storage.get(child) {
                    Some(BuilderNode::File { content, read_only }) => {
                        child_ids.push(NodeId::from_index(nodes.len() as u32));
                        nodes.push(PackedNode::File {
                            name: child_name.clone(),
                            parent: id,
                            content: content.clone(),
                            read_only: *read_only,
                        });
                    }
                    Some(BuilderNode::Directory { .. }) => {
                        child_ids.push(self.flatten_dir(
                            child,
                            child_name.clone(),
                            Some(id),
                            nodes,
                        ));
                    }
                    None => {}
                }
            }
        }

        if let Some(PackedNode::Directory { children, .. }) = nodes.get_mut(id.index() as usize) {
            *children = child_ids;
        }
        id
    }

    fn copy_children(&mut self, image: &PackedImage, from: NodeId, to: Inode) {
        let Some(PackedNode::Directory { children, .. }) = image.node(from) else {
            return;
        };
        for &child in children {
            let Some(node) = image.node(child) else {
                continue;
            };
            match node {
                PackedNode::File {
                    name,
                    content,
                    read_only,
                    ..
                } => {
                    self.insert_child(to, name.clone(), BuilderNode::File {
                        content: content.clone(),
                        read_only: *read_only,
                    });
                }
                PackedNode::Directory { name, .. } => {
                    let inode = self.insert_child(to, name.clone(), BuilderNode::Directory {
                        children: IndexMap::new(),
                    });
                    self.copy_children(image, child, inode);
                }
            }
        }
    }

    fn walk_to_parent(&mut self, root: RootHandle, path: &str) -> Result<(Inode, String), ImageError> {
        let components = path
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect::<Vec<_>>();
        let Some((name, intermediates)) = components.split_last() else {
            return Err(ImageError::InvalidGuestPath(self.display_path(root, path)));
        };
        if !components.iter().all(|c| is_valid_name(c)) {
            return Err(ImageError::InvalidGuestPath(self.display_path(root, path)));
        }

        let mut cursor = root.0;
        for component in intermediates {
            cursor = match self.child(cursor, component) {
                Some(child) => {
                    if !matches!(self.storage.get(child), Some(BuilderNode::Directory { .. })) {
                        return Err(ImageError::NotADirectory(self.display_path(root, path)));
                    }
                    child
                }
                // create a new intermediate directory
                None => self.insert_child(cursor, component.to_string(), BuilderNode::Directory {
                    children: IndexMap::new(),
                }),
            };
        }
        Ok((cursor, name.to_string()))
    }

    fn child(&self, dir: Inode, name: &str) -> Option<Inode> {
        match self.storage.get(dir)? {
            BuilderNode::Directory { children } => children.get(name).copied(),
            BuilderNode::File { .. } => None,
        }
    }

    fn insert_child(&mut self, dir: Inode, name: String, node: BuilderNode) -> Inode {
        let inode = self.storage.insert(node);
        if let Some(BuilderNode::Directory { children }) = self.storage.get_mut(dir) {
            children.insert(name, inode);
        }
        inode
    }

    /// Replaces an existing child in place, keeping its position.
    fn replace_child(&mut self, dir: Inode, name: String, node: BuilderNode) {
        if let Some(old) = self.child(dir, &name) {
            self.remove_subtree(old);
        }
        self.insert_child(dir, name, node);
    }

    fn remove_subtree(&mut self, inode: Inode) {
        if let Some(BuilderNode::Directory { children }) = self.storage.try_remove(inode) {
            for (_, child) in children {
                self.remove_subtree(child);
            }
        }
    }

    fn display_path(&self, root: RootHandle, path: &str) -> String {
        let root_path = self
            .roots
            .iter()
            .find(|(_, inode)| **inode == root.0)
            .map(|(guest_path, _)| guest_path.as_str())
            .unwrap_or("");
        format!("{}/{}", root_path.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
