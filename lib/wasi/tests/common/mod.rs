//! What a guest's libc does on top of the preview1 calls: find the preopen
//! covering an absolute path, then open relative to it.

#![allow(dead_code)]

use anyhow::Context;
use wasi_vfs::{WasiVfs, syscalls};
use wasi_vfs_fs::{ImageBuilder, MergePolicy, RootHandle};
use wasi_vfs_types::{
    DIRCOOKIE_START, Errno, Fd, Fdflags, Filetype, Lookupflags, Oflags, Prestat, Rights,
};

pub const READ_RIGHTS: Rights = Rights::from_bits_truncate(
    Rights::FD_READ.bits()
        | Rights::FD_SEEK.bits()
        | Rights::FD_TELL.bits()
        | Rights::FD_FILESTAT_GET.bits()
        | Rights::FD_READDIR.bits(),
);

pub const WRITE_RIGHTS: Rights = Rights::from_bits_truncate(
    READ_RIGHTS.bits() | Rights::FD_WRITE.bits() | Rights::FD_FILESTAT_SET_SIZE.bits(),
);

/// Builds an encoded image from `(guest root, relative path, content)`
/// triples. A path ending in `/` is a directory.
pub fn image(entries: &[(&str, &str, &[u8])]) -> anyhow::Result<Vec<u8>> {
    let mut builder = ImageBuilder::new();
    for (root, path, content) in entries {
        let handle: RootHandle = match builder.root(root) {
            Some(handle) => handle,
            None => builder.add_root(root, MergePolicy::Reject)?,
        };
        if path.is_empty() {
            continue;
        }
        if let Some(dir) = path.strip_suffix('/') {
            builder.add_dir(handle, dir, MergePolicy::Reject)?;
        } else {
            builder.add_file(handle, path, content.to_vec(), false, MergePolicy::Reject)?;
        }
    }
    Ok(builder.build().encode())
}

/// Preopens as `(fd, guest path)`, probing descriptors from 3 upwards the
/// way libc does at startup.
pub fn preopens(vfs: &WasiVfs) -> Vec<(Fd, String)> {
    let mut found = Vec::new();
    for fd in 3.. {
        let Ok(Prestat::Dir { pr_name_len }) = syscalls::fd_prestat_get(vfs, fd) else {
            break;
        };
        let mut name = vec![0u8; pr_name_len as usize];
        if syscalls::fd_prestat_dir_name(vfs, fd, &mut name).is_ok() {
            found.push((fd, String::from_utf8_lossy(&name).into_owned()));
        }
    }
    found
}

/// The preopen with the longest guest path covering `path`, and `path`
/// relative to it.
pub fn find_relpath(vfs: &WasiVfs, path: &str) -> Result<(Fd, String), Errno> {
    let mut best: Option<(Fd, usize, String)> = None;
    for (fd, prefix) in preopens(vfs) {
        let rest = if prefix == "/" {
            Some(path.trim_start_matches('/'))
        } else {
            path.strip_prefix(prefix.as_str()).and_then(|rest| {
                if rest.is_empty() {
                    Some(rest)
                } else {
                    rest.strip_prefix('/')
                }
            })
        };
        let Some(rest) = rest else { continue };
        if best.as_ref().is_none_or(|(_, len, _)| prefix.len() > *len) {
            let rest = if rest.is_empty() { "." } else { rest };
            best = Some((fd, prefix.len(), rest.to_string()));
        }
    }
    best.map(|(fd, _, rest)| (fd, rest)).ok_or(Errno::Noent)
}

pub fn open(vfs: &mut WasiVfs, path: &str, oflags: Oflags, rights: Rights) -> Result<Fd, Errno> {
    let (dirfd, relpath) = find_relpath(vfs, path)?;
    syscalls::path_open(
        vfs,
        dirfd,
        Lookupflags::SYMLINK_FOLLOW,
        &relpath,
        oflags,
        rights,
        Rights::all(),
        Fdflags::empty(),
    )
}

pub fn read_to_string(vfs: &mut WasiVfs, path: &str) -> Result<String, Errno> {
    let fd = open(vfs, path, Oflags::empty(), READ_RIGHTS)?;
    let mut content = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        let n = syscalls::fd_read(vfs, fd, &mut [&mut buf[..]])?;
        if n == 0 {
            break;
        }
        content.extend_from_slice(&buf[..n]);
    }
    syscalls::fd_close(vfs, fd)?;
    String::from_utf8(content).map_err(|_| Errno::Ilseq)
}

pub fn write_file(vfs: &mut WasiVfs, path: &str, content: &str) -> Result<(), Errno> {
    let fd = open(vfs, path, Oflags::CREATE | Oflags::TRUNC, WRITE_RIGHTS)?;
    let written = syscalls::fd_write(vfs, fd, &[content.as_bytes()])?;
    assert_eq!(written, content.len());
    syscalls::fd_close(vfs, fd)
}

/// Names in a directory, read with a small buffer so that `fd_readdir`
/// has to be called repeatedly with cookies.
pub fn list_dir(vfs: &mut WasiVfs, path: &str) -> anyhow::Result<Vec<(String, Filetype)>> {
    let fd = open(vfs, path, Oflags::DIRECTORY, READ_RIGHTS)?;
    let mut entries = Vec::new();
    let mut cookie = DIRCOOKIE_START;
    loop {
        let mut buf = [0u8; 256];
        let used = syscalls::fd_readdir(vfs, fd, &mut buf, cookie)?;
        let mut offset = 0;
        let mut progressed = false;
        while offset + 24 <= used {
            let header = &buf[offset..offset + 24];
            let d_next = u64::from_le_bytes(header[0..8].try_into()?);
            let d_namlen = u32::from_le_bytes(header[16..20].try_into()?) as usize;
            let d_type = Filetype::try_from(header[20]).map_err(|_| anyhow::anyhow!("bad d_type"))?;
            if offset + 24 + d_namlen > used {
                // truncated entry, read it again from its cookie
                break;
            }
            let name = std::str::from_utf8(&buf[offset + 24..offset + 24 + d_namlen])
                .context("entry name is not UTF-8")?;
            entries.push((name.to_string(), d_type));
            cookie = d_next;
            offset += 24 + d_namlen;
            progressed = true;
        }
        if used < buf.len() {
            break;
        }
        anyhow::ensure!(progressed, "entry larger than the buffer");
    }
    syscalls::fd_close(vfs, fd)?;
    Ok(entries)
}

pub fn names(entries: &[(String, Filetype)]) -> Vec<&str> {
    entries.iter().map(|(name, _)| name.as_str()).collect()
}
