//! Mount-aware path resolution relative to a directory descriptor.

use super::{Backing, MountBacking, MountEntry, WasiFs};
use crate::state::fs_error_into_wasi_err;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::trace;
use wasi_vfs_fs::{FsError, HostDir, NodeId, NodeKind};
use wasi_vfs_types::{Errno, Fd as WasiFd};

/// A resolved location: a node of the virtual tree, or a path inside a host
/// preopen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Virtual(NodeId),
    Host { dir: HostDir, path: PathBuf },
}

impl Cursor {
    fn from_mount(entry: &MountEntry) -> Self {
        match &entry.backing {
            MountBacking::Virtual(node) => Cursor::Virtual(*node),
            MountBacking::Host(dir) => Cursor::Host {
                dir: dir.clone(),
                path: PathBuf::new(),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResolveMode {
    Final,
    Parent,
}

enum ResolveOutcome {
    Final(Cursor),
    Parent(Cursor, String),
}

struct WorkQueue<'a> {
    components: VecDeque<&'a str>,
}

impl<'a> WorkQueue<'a> {
    fn from_path(path: &'a str) -> Self {
        Self {
            components: path.split('/').filter(|c| !c.is_empty()).collect(),
        }
    }

    fn pop_front(&mut self) -> Option<&'a str> {
        self.components.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl WasiFs {
    /// Resolves `path` relative to the directory `dirfd`.
    pub fn resolve(&self, dirfd: WasiFd, path: &str) -> Result<Cursor, Errno> {
        match self.resolve_internal(dirfd, path, ResolveMode::Final)? {
            ResolveOutcome::Final(cursor) => Ok(cursor),
            ResolveOutcome::Parent(..) => Err(Errno::Inval),
        }
    }

    /// Resolves everything but the last component of `path`, for operations
    /// that create or remove that last component.
    pub fn resolve_parent(&self, dirfd: WasiFd, path: &str) -> Result<(Cursor, String), Errno> {
        match self.resolve_internal(dirfd, path, ResolveMode::Parent)? {
            ResolveOutcome::Parent(dir, name) => Ok((dir, name)),
            ResolveOutcome::Final(_) => Err(Errno::Inval),
        }
    }

    /// The mount installed at `dir/name`, when `dir` is a virtual directory
    /// with a known guest path.
    pub fn mount_point_below(&self, dir: &Cursor, name: &str) -> Option<&MountEntry> {
        let Cursor::Virtual(node) = dir else {
            return None;
        };
        let guest_path = self.tree.guest_path(*node)?;
        let candidate = if guest_path.ends_with('/') {
            format!("{guest_path}{name}")
        } else {
            format!("{guest_path}/{name}")
        };
        self.mounts.get(&candidate)
    }

    fn resolve_internal(
        &self,
        dirfd: WasiFd,
        path: &str,
        mode: ResolveMode,
    ) -> Result<ResolveOutcome, Errno> {
        if path.is_empty() {
            return Err(Errno::Noent);
        }
        if path.starts_with('/') {
            return Err(Errno::Notcapable);
        }

        let mut current = self.start_cursor(dirfd)?;
        let mut stack: Vec<Cursor> = Vec::new();
        let mut queue = WorkQueue::from_path(path);

        while let Some(component) = queue.pop_front() {
            let is_final = queue.is_empty();
            match component {
                "." | ".." if is_final && mode == ResolveMode::Parent => {
                    return Err(Errno::Inval);
                }
                "." => {
                    self.expect_dir(&current)?;
                }
                ".." => {
                    self.expect_dir(&current)?;
                    if let Some(prev) = stack.pop() {
                        current = prev;
                        continue;
                    }
                    current = self.parent_of(current)?;
                }
                name => {
                    self.expect_dir(&current)?;
                    if is_final && mode == ResolveMode::Parent {
                        return Ok(ResolveOutcome::Parent(current, name.to_string()));
                    }
                    if let Some(entry) = self.mount_point_below(&current, name) {
                        trace!(mount = %entry.guest_path, "crossing into mount");
                        let next = Cursor::from_mount(entry);
                        stack.push(std::mem::replace(&mut current, next));
                        continue;
                    }
                    let next = match &current {
                        Cursor::Virtual(node) => Cursor::Virtual(
                            self.tree
                                .child(*node, name)
                                .map_err(fs_error_into_wasi_err)?,
                        ),
                        Cursor::Host { dir, path } => Cursor::Host {
                            dir: dir.clone(),
                            path: path.join(name),
                        },
                    };
                    stack.push(std::mem::replace(&mut current, next));
                }
            }
        }

        match mode {
            ResolveMode::Final => Ok(ResolveOutcome::Final(current)),
            // a path of only separators has no last component
            ResolveMode::Parent => Err(Errno::Inval),
        }
    }

    fn start_cursor(&self, dirfd: WasiFd) -> Result<Cursor, Errno> {
        let fd = self.get_fd(dirfd)?;
        if !fd.is_dir() {
            return Err(Errno::Notdir);
        }
        match &fd.backing {
            Backing::Virtual(node) => Ok(Cursor::Virtual(*node)),
            Backing::Host(handle) => Ok(Cursor::Host {
                dir: handle.dir.clone(),
                path: handle.path.clone(),
            }),
            Backing::Stdio(_) => Err(Errno::Notdir),
        }
    }

    /// Host paths are only checked by the host when they are used.
    fn expect_dir(&self, cursor: &Cursor) -> Result<(), Errno> {
        match cursor {
            Cursor::Virtual(node) => match self.tree.kind(*node).map_err(fs_error_into_wasi_err)? {
                NodeKind::Directory => Ok(()),
                NodeKind::File => Err(Errno::Notdir),
            },
            Cursor::Host { .. } => Ok(()),
        }
    }

    fn parent_of(&self, cursor: Cursor) -> Result<Cursor, Errno> {
        match cursor {
            Cursor::Virtual(node) => self
                .tree
                .parent(node)
                .map(Cursor::Virtual)
                .ok_or_else(|| fs_error_into_wasi_err(FsError::InvalidPath)),
            Cursor::Host { dir, mut path } => {
                if !path.pop() {
                    return Err(fs_error_into_wasi_err(FsError::NotCapable));
                }
                Ok(Cursor::Host { dir, path })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;
    use wasi_vfs_fs::{ImageBuilder, MergePolicy, VirtualTree};

    struct Fixture {
        fs: WasiFs,
        _host: TempDir,
        host_fd: WasiFd,
        root_fd: WasiFd,
        mnt0_fd: WasiFd,
    }

    /// `/` and `/mnt0` and `/mnt0/mnt1` are packed, `/host` is a host directory.
    fn fixture() -> Fixture {
        let mut builder = ImageBuilder::new();
        let root = builder.add_root("/", MergePolicy::Reject).unwrap();
        builder
            .add_file(root, "hello.txt", b"hello".to_vec(), false, MergePolicy::Reject)
            .unwrap();
        builder
            .add_file(root, "host/shadowed.txt", Vec::new(), false, MergePolicy::Reject)
            .unwrap();
        let mnt0 = builder.add_root("/mnt0", MergePolicy::Reject).unwrap();
        builder
            .add_file(mnt0, "dir/a.txt", b"a".to_vec(), false, MergePolicy::Reject)
            .unwrap();
        let mnt1 = builder.add_root("/mnt0/mnt1", MergePolicy::Reject).unwrap();
        builder
            .add_file(mnt1, "goodbye.txt", b"bye".to_vec(), false, MergePolicy::Reject)
            .unwrap();
        let tree = VirtualTree::new(Arc::new(builder.build()));
        let roots = tree.roots().to_vec();

        let host = TempDir::new().unwrap();
        std::fs::write(host.path().join("real.txt"), b"real").unwrap();

        let mut fs = WasiFs::new(tree);
        let host_fd = fs
            .preopen_host_dir("/host", HostDir::new(host.path()).unwrap())
            .unwrap();
        let fds: Vec<WasiFd> = roots
            .iter()
            .map(|root| fs.preopen_virtual_dir(&root.guest_path, root.node).unwrap())
            .collect();
        let root_fd = fds[0];
        let mnt0_fd = fds[1];
        Fixture {
            fs,
            _host: host,
            host_fd,
            root_fd,
            mnt0_fd,
        }
    }

    fn node(f: &Fixture, path: &str) -> Cursor {
        f.fs.resolve(f.root_fd, path).unwrap()
    }

    #[test]
    fn resolves_dot_and_dot_dot() {
        let f = fixture();
        let hello = node(&f, "hello.txt");
        assert_eq!(f.fs.resolve(f.root_fd, "./mnt0/../hello.txt"), Ok(hello.clone()));
        assert_eq!(f.fs.resolve(f.root_fd, "hello.txt/"), Ok(hello));
        assert_eq!(f.fs.resolve(f.root_fd, "hello.txt/x"), Err(Errno::Notdir));
        assert_eq!(f.fs.resolve(f.root_fd, "missing"), Err(Errno::Noent));
        assert_eq!(f.fs.resolve(f.root_fd, ".."), Err(Errno::Notcapable));
        assert_eq!(f.fs.resolve(f.mnt0_fd, "../hello.txt"), Err(Errno::Notcapable));
        assert_eq!(f.fs.resolve(f.root_fd, ""), Err(Errno::Noent));
        assert_eq!(f.fs.resolve(f.root_fd, "/hello.txt"), Err(Errno::Notcapable));
        assert_eq!(f.fs.resolve(1, "hello.txt"), Err(Errno::Notdir));
        assert_eq!(f.fs.resolve(99, "hello.txt"), Err(Errno::Badf));
    }

    #[test]
    fn crosses_nested_mounts() {
        let f = fixture();
        let goodbye = f.fs.resolve(f.mnt0_fd, "mnt1/goodbye.txt").unwrap();
        assert_eq!(f.fs.resolve(f.root_fd, "mnt0/mnt1/goodbye.txt"), Ok(goodbye.clone()));
        assert_eq!(
            f.fs.resolve(f.mnt0_fd, "mnt1/../dir/a.txt"),
            f.fs.resolve(f.mnt0_fd, "dir/a.txt"),
            "`..` after crossing a mount returns to the mount point's parent"
        );
        assert!(matches!(goodbye, Cursor::Virtual(_)));
    }

    #[test]
    fn host_mount_shadows_packed_entries() {
        let f = fixture();
        let resolved = f.fs.resolve(f.root_fd, "host/real.txt").unwrap();
        match resolved {
            Cursor::Host { path, .. } => assert_eq!(path, PathBuf::from("real.txt")),
            other => panic!("expected a host path, got {other:?}"),
        }
        assert!(matches!(
            f.fs.resolve(f.root_fd, "host/shadowed.txt"),
            Ok(Cursor::Host { .. })
        ), "the host mount is consulted, not the packed `host` directory");
    }

    #[test]
    fn host_paths_stay_confined() {
        let f = fixture();
        assert!(matches!(
            f.fs.resolve(f.host_fd, "a/b/../../real.txt"),
            Ok(Cursor::Host { path, .. }) if path == PathBuf::from("real.txt")
        ));
        assert_eq!(f.fs.resolve(f.host_fd, "../etc"), Err(Errno::Notcapable));
        assert_eq!(
            f.fs.resolve(f.root_fd, "host/../hello.txt"),
            Ok(node(&f, "hello.txt")),
            "leaving a host mount through `..` returns to the packed tree"
        );
    }

    #[test]
    fn resolves_parents() {
        let f = fixture();
        let (dir, name) = f.fs.resolve_parent(f.mnt0_fd, "dir/new.txt").unwrap();
        assert_eq!(dir, f.fs.resolve(f.mnt0_fd, "dir").unwrap());
        assert_eq!(name, "new.txt");
        assert_eq!(f.fs.resolve_parent(f.mnt0_fd, "dir/.."), Err(Errno::Inval));
        assert_eq!(
            f.fs.resolve_parent(f.mnt0_fd, "nope/new.txt"),
            Err(Errno::Noent)
        );

        let (dir, name) = f.fs.resolve_parent(f.mnt0_fd, "mnt1").unwrap();
        assert!(f.fs.mount_point_below(&dir, &name).is_some());
    }
}
