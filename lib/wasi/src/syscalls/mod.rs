//! The WASI `preview1` filesystem calls.
//!
//! Each call takes the [`WasiVfs`] of the calling instance and the already
//! decoded arguments, and returns the result or the [`Errno`] handed back to
//! the guest. Guest memory access is left to the embedder.

pub mod wasi;

pub use self::wasi::*;

pub(crate) use crate::{
    WasiVfs,
    fs::{Backing, Cursor, Fd, HostHandle, Stdio, WasiFs},
    state::fs_error_into_wasi_err,
};
pub(crate) use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};
pub(crate) use tracing::{debug, field, instrument, trace};
pub(crate) use wasi_vfs_fs::{
    FsError, HostDir, HostFileType, HostMetadata, NodeId, NodeKind, OpenOptionsConfig,
    normalize_guest_path,
};
pub(crate) use wasi_vfs_types::{
    Advice, Device, Dircookie, Dirent, Errno, Fd as WasiFd, Fdflags, Fdstat,
    Filedelta, Filesize, Filestat, Filetype, Lookupflags, Oflags, Prestat, Rights, Whence,
    dirent_to_le_bytes,
};

/// Device id reported for every node of the packed tree.
pub(crate) const VIRTUAL_DEVICE: Device = 0;

pub(crate) fn node_filetype(kind: NodeKind) -> Filetype {
    match kind {
        NodeKind::File => Filetype::RegularFile,
        NodeKind::Directory => Filetype::Directory,
    }
}

pub(crate) fn host_filetype(file_type: HostFileType) -> Filetype {
    match file_type {
        HostFileType::Directory => Filetype::Directory,
        HostFileType::RegularFile => Filetype::RegularFile,
        HostFileType::Symlink => Filetype::SymbolicLink,
        HostFileType::Other => Filetype::Unknown,
    }
}

pub(crate) fn node_filestat(fs: &WasiFs, node: NodeId) -> Result<Filestat, Errno> {
    let stat = wasi_try!(fs.tree.stat(node));
    Ok(Filestat {
        st_dev: VIRTUAL_DEVICE,
        st_ino: stat.ino,
        st_filetype: node_filetype(stat.kind),
        st_nlink: 1,
        st_size: stat.size,
        ..Default::default()
    })
}

pub(crate) fn host_filestat(metadata: HostMetadata) -> Filestat {
    Filestat {
        st_dev: metadata.dev,
        st_ino: metadata.ino,
        st_filetype: host_filetype(metadata.file_type),
        st_nlink: metadata.nlink,
        st_size: metadata.len,
        st_atim: metadata.accessed,
        st_mtim: metadata.modified,
        st_ctim: metadata.created,
    }
}

/// Attributes of a resolved path. Host symlinks are only followed when
/// `follow_symlinks` is set.
pub(crate) fn cursor_filestat(
    fs: &WasiFs,
    cursor: &Cursor,
    follow_symlinks: bool,
) -> Result<Filestat, Errno> {
    match cursor {
        Cursor::Virtual(node) => node_filestat(fs, *node),
        Cursor::Host { dir, path } => {
            let metadata = if follow_symlinks {
                wasi_try!(dir.metadata(path))
            } else {
                wasi_try!(dir.symlink_metadata(path))
            };
            Ok(host_filestat(metadata))
        }
    }
}

/// Fails with [`Errno::Access`] unless `fd` holds every right in `rights`.
pub(crate) fn check_rights(fd: &Fd, rights: Rights) -> Result<(), Errno> {
    if fd.rights.contains(rights) {
        return Ok(());
    }
    debug!(
        guest_path = %fd.guest_path,
        missing = ?(rights - fd.rights).names(),
        "descriptor lacks rights"
    );
    Err(Errno::Access)
}

/// Guest path of `path` opened relative to a descriptor at `base`, for
/// diagnostics.
pub(crate) fn join_guest_path(base: &str, path: &str) -> String {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path);
    normalize_guest_path(&joined).unwrap_or(joined)
}
