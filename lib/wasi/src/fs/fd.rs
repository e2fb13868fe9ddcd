use std::fs::File;
use std::path::PathBuf;
use wasi_vfs_fs::{HostDir, NodeId};
use wasi_vfs_types::{Fdflags, Filetype, Rights};

/// One of the three standard streams, passed through to the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stdio {
    In,
    Out,
    Err,
}

/// An open host file or directory.
#[derive(Debug)]
pub struct HostHandle {
    /// The host preopen this handle was resolved through.
    pub dir: HostDir,
    /// Path relative to `dir`.
    pub path: PathBuf,
    /// Open file for regular files, `None` for directories.
    pub file: Option<File>,
}

/// What a descriptor reads from and writes to.
#[derive(Debug)]
pub enum Backing {
    Stdio(Stdio),
    Virtual(NodeId),
    Host(HostHandle),
}

impl Backing {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Backing::Virtual(_))
    }
}

#[derive(Debug)]
pub struct Fd {
    pub rights: Rights,
    pub rights_inheriting: Rights,
    pub flags: Fdflags,
    pub offset: u64,
    /// Flags that determine how the [`Fd`] can be used.
    pub open_flags: u16,
    pub filetype: Filetype,
    pub backing: Backing,
    /// Guest path the descriptor was opened at, for preopens the mount point.
    pub guest_path: String,
    pub is_preopen: bool,
}

impl Fd {
    /// This [`Fd`] can be used with read system calls.
    pub const READ: u16 = 1;
    /// This [`Fd`] can be used with write system calls.
    pub const WRITE: u16 = 2;
    /// This [`Fd`] can append in write system calls. Note that the append
    /// permission implies the write permission.
    pub const APPEND: u16 = 4;
    /// This [`Fd`] truncated its file when it was opened.
    pub const TRUNCATE: u16 = 8;
    /// This [`Fd`] may have created its file when it was opened.
    pub const CREATE: u16 = 16;

    pub fn is_dir(&self) -> bool {
        self.filetype == Filetype::Directory
    }

    pub(crate) fn stdio(stdio: Stdio) -> Self {
        let rights = match stdio {
            Stdio::In => Rights::FD_READ | Rights::FD_FDSTAT_SET_FLAGS | Rights::POLL_FD_READWRITE,
            Stdio::Out | Stdio::Err => {
                Rights::FD_WRITE
                    | Rights::FD_DATASYNC
                    | Rights::FD_SYNC
                    | Rights::FD_FDSTAT_SET_FLAGS
                    | Rights::POLL_FD_READWRITE
            }
        };
        let (open_flags, guest_path) = match stdio {
            Stdio::In => (Fd::READ, "<stdin>"),
            Stdio::Out => (Fd::WRITE, "<stdout>"),
            Stdio::Err => (Fd::WRITE, "<stderr>"),
        };
        Fd {
            rights,
            rights_inheriting: Rights::empty(),
            flags: Fdflags::empty(),
            offset: 0,
            open_flags,
            filetype: Filetype::CharacterDevice,
            backing: Backing::Stdio(stdio),
            guest_path: guest_path.to_string(),
            is_preopen: false,
        }
    }

    pub(crate) fn preopen(guest_path: &str, backing: Backing, rights: Rights) -> Self {
        Fd {
            rights,
            rights_inheriting: rights,
            flags: Fdflags::empty(),
            offset: 0,
            open_flags: Fd::READ,
            filetype: Filetype::Directory,
            backing,
            guest_path: guest_path.to_string(),
            is_preopen: true,
        }
    }
}
