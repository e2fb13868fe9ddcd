mod fd;
mod mount;
mod resolver;

pub use self::fd::{Backing, Fd, HostHandle, Stdio};
pub use self::mount::{MountBacking, MountEntry, MountError, MountTable};
pub use self::resolver::Cursor;

use std::collections::HashMap;
use tracing::{debug, trace};
use wasi_vfs_fs::{HostDir, NodeId, VirtualTree};
use wasi_vfs_types::{Errno, Fd as WasiFd, Prestat, Rights};

/// Rights granted to a preopened directory.
pub const ALL_RIGHTS: Rights = Rights::all();

/// The filesystem side of one guest instance: the tree with its overlay, the
/// mount table and the descriptor table.
#[derive(Debug)]
pub struct WasiFs {
    pub tree: VirtualTree,
    pub mounts: MountTable,
    fd_map: HashMap<WasiFd, Fd>,
    preopen_fds: Vec<WasiFd>,
    next_fd: WasiFd,
}

impl WasiFs {
    /// Creates the filesystem with the standard streams installed at 0, 1
    /// and 2.
    pub fn new(tree: VirtualTree) -> Self {
        let mut fs = WasiFs {
            tree,
            mounts: MountTable::new(),
            fd_map: HashMap::new(),
            preopen_fds: Vec::new(),
            next_fd: 0,
        };
        for stdio in [Stdio::In, Stdio::Out, Stdio::Err] {
            fs.fd_map.insert(fs.next_fd, Fd::stdio(stdio));
            fs.next_fd += 1;
        }
        fs
    }

    /// Mounts a host directory at `guest_path` and opens it as a preopen.
    pub fn preopen_host_dir(&mut self, guest_path: &str, dir: HostDir) -> Result<WasiFd, MountError> {
        self.mounts
            .insert(guest_path, MountBacking::Host(dir.clone()))?;
        let backing = Backing::Host(HostHandle {
            dir,
            path: Default::default(),
            file: None,
        });
        Ok(self.install_preopen(guest_path, backing))
    }

    /// Mounts a packed root at `guest_path` and opens it as a preopen.
    pub fn preopen_virtual_dir(&mut self, guest_path: &str, node: NodeId) -> Result<WasiFd, MountError> {
        self.mounts
            .insert(guest_path, MountBacking::Virtual(node))?;
        Ok(self.install_preopen(guest_path, Backing::Virtual(node)))
    }

    fn install_preopen(&mut self, guest_path: &str, backing: Backing) -> WasiFd {
        let fd = self.next_fd;
        self.next_fd += 1;
        debug!(fd, guest_path, virtual_backing = backing.is_virtual(), "preopened directory");
        self.fd_map
            .insert(fd, Fd::preopen(guest_path, backing, ALL_RIGHTS));
        self.preopen_fds.push(fd);
        fd
    }

    /// Allocates a new descriptor. Ids are handed out in increasing order and
    /// never reused.
    pub fn create_fd(&mut self, fd: Fd) -> Result<WasiFd, Errno> {
        let id = self.next_fd;
        self.next_fd = self.next_fd.checked_add(1).ok_or(Errno::Mfile)?;
        trace!(fd = id, guest_path = %fd.guest_path, "opened descriptor");
        self.fd_map.insert(id, fd);
        Ok(id)
    }

    pub fn get_fd(&self, fd: WasiFd) -> Result<&Fd, Errno> {
        self.fd_map.get(&fd).ok_or(Errno::Badf)
    }

    pub fn get_fd_mut(&mut self, fd: WasiFd) -> Result<&mut Fd, Errno> {
        self.fd_map.get_mut(&fd).ok_or(Errno::Badf)
    }

    pub fn close_fd(&mut self, fd: WasiFd) -> Result<(), Errno> {
        match self.fd_map.remove(&fd) {
            Some(closed) => {
                if closed.is_preopen {
                    self.preopen_fds.retain(|preopen| *preopen != fd);
                }
                trace!(fd, guest_path = %closed.guest_path, "closed descriptor");
                Ok(())
            }
            None => Err(Errno::Badf),
        }
    }

    /// Moves `from` over `to`, closing whatever `to` referred to. Both
    /// descriptors must be open.
    pub fn renumber(&mut self, from: WasiFd, to: WasiFd) -> Result<(), Errno> {
        if !self.fd_map.contains_key(&to) {
            return Err(Errno::Badf);
        }
        if from == to {
            return self.get_fd(from).map(|_| ());
        }
        let moved = self.fd_map.remove(&from).ok_or(Errno::Badf)?;
        self.preopen_fds.retain(|preopen| *preopen != to);
        for preopen in self.preopen_fds.iter_mut() {
            if *preopen == from {
                *preopen = to;
            }
        }
        self.fd_map.insert(to, moved);
        Ok(())
    }

    /// Preopened descriptors in installation order.
    pub fn preopens(&self) -> impl Iterator<Item = (WasiFd, &Fd)> {
        self.preopen_fds
            .iter()
            .filter_map(|fd| self.fd_map.get(fd).map(|entry| (*fd, entry)))
    }

    pub fn prestat_fd(&self, fd: WasiFd) -> Result<Prestat, Errno> {
        let entry = self.get_fd(fd)?;
        if !entry.is_preopen {
            return Err(Errno::Badf);
        }
        Ok(Prestat::Dir {
            pr_name_len: entry.guest_path.len() as u32,
        })
    }

    pub fn fd_count(&self) -> usize {
        self.fd_map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use wasi_vfs_fs::{ImageBuilder, MergePolicy};

    fn fs() -> WasiFs {
        let mut builder = ImageBuilder::new();
        builder.add_root("/", MergePolicy::Reject).unwrap();
        let tree = VirtualTree::new(Arc::new(builder.build()));
        let root = tree.roots()[0].node;
        let mut fs = WasiFs::new(tree);
        fs.preopen_virtual_dir("/", root).unwrap();
        fs
    }

    fn dummy(fs: &WasiFs) -> Fd {
        let root = fs.tree.roots()[0].node;
        let mut fd = Fd::preopen("/", Backing::Virtual(root), Rights::empty());
        fd.is_preopen = false;
        fd
    }

    #[test]
    fn test_stdio_and_preopens() {
        let fs = fs();
        assert!(!fs.get_fd(0).unwrap().backing.is_virtual());
        assert!(matches!(fs.get_fd(2).unwrap().backing, Backing::Stdio(Stdio::Err)));
        let preopens = fs.preopens().map(|(fd, entry)| (fd, entry.guest_path.clone())).collect::<Vec<_>>();
        assert_eq!(preopens, vec![(3, "/".to_string())]);
        assert_eq!(fs.prestat_fd(3), Ok(Prestat::Dir { pr_name_len: 1 }));
        assert_eq!(fs.prestat_fd(1), Err(Errno::Badf));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut fs = fs();
        let first = fs.create_fd(dummy(&fs)).unwrap();
        fs.close_fd(first).unwrap();
        let second = fs.create_fd(dummy(&fs)).unwrap();
        assert!(second > first);
        assert_eq!(fs.close_fd(first), Err(Errno::Badf));
        assert_eq!(fs.get_fd(first).map(|_| ()), Err(Errno::Badf));
    }

    #[test]
    fn test_renumber() {
        let mut fs = fs();
        let a = fs.create_fd(dummy(&fs)).unwrap();
        let b = fs.create_fd(dummy(&fs)).unwrap();
        assert_eq!(fs.renumber(a, 99), Err(Errno::Badf), "target must be open");
        fs.renumber(a, b).unwrap();
        assert_eq!(fs.get_fd(a).map(|_| ()), Err(Errno::Badf));
        assert!(fs.get_fd(b).is_ok());

        fs.renumber(3, b).unwrap();
        let preopens = fs.preopens().map(|(fd, _)| fd).collect::<Vec<_>>();
        assert_eq!(preopens, vec![b], "a renumbered preopen stays a preopen");
    }
}
