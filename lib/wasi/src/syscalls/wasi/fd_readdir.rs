use crate::syscalls::*;

/// ### `fd_readdir()`
/// Read data from directory specified by file descriptor
/// Inputs:
/// - `Fd fd`
///     File descriptor from which directory data will be read
/// - `&mut [u8] buf`
///     Buffer where directory entries are stored
/// - `Dircookie cookie`
///     Where the directory reading should start from
/// Output:
/// - `usize`
///     The number of bytes stored in `buf`; if less than the length of `buf`
///     there are no more entries
/// Errors:
/// - `Errno::Notdir`
///     If `fd` is not a directory
#[instrument(level = "trace", skip_all, fields(%fd, %cookie, buf_len = buf.len()), ret, err)]
pub fn fd_readdir(
    vfs: &WasiVfs,
    fd: WasiFd,
    buf: &mut [u8],
    cookie: Dircookie,
) -> Result<usize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    check_rights(fd_entry, Rights::FD_READDIR)?;
    if !fd_entry.is_dir() {
        return Err(Errno::Notdir);
    }

    let entries = match &fd_entry.backing {
        Backing::Virtual(node) => wasi_try!(vfs.fs.tree.readdir(*node))
            .into_iter()
            .map(|entry| (entry.name, entry.node.ino(), node_filetype(entry.kind)))
            .collect::<Vec<_>>(),
        Backing::Host(HostHandle { dir, path, .. }) => host_entries(dir, path)?,
        Backing::Stdio(_) => return Err(Errno::Notdir),
    };

    let skip = usize::try_from(cookie).unwrap_or(usize::MAX);
    let mut buf_idx = 0usize;
    for (index, (name, ino, filetype)) in entries.iter().enumerate().skip(skip) {
        let dirent = Dirent {
            d_next: index as u64 + 1,
            d_ino: *ino,
            d_namlen: name.len() as u32,
            d_type: *filetype,
        };
        let header = dirent_to_le_bytes(&dirent);
        // an entry that does not fit is truncated and fills the buffer
        for chunk in [header.as_slice(), name.as_bytes()] {
            let upper_limit = chunk.len().min(buf.len() - buf_idx);
            buf[buf_idx..buf_idx + upper_limit].copy_from_slice(&chunk[..upper_limit]);
            buf_idx += upper_limit;
            if buf_idx == buf.len() {
                return Ok(buf_idx);
            }
        }
    }
    Ok(buf_idx)
}

/// `.` and `..` followed by the entries of a host directory, sorted by name.
fn host_entries(dir: &HostDir, path: &Path) -> Result<Vec<(String, u64, Filetype)>, Errno> {
    let this = wasi_try!(dir.metadata(path));
    let parent = match path.parent() {
        Some(parent) => wasi_try!(dir.metadata(parent)),
        None => this,
    };
    let mut entries = vec![
        (".".to_string(), this.ino, Filetype::Directory),
        ("..".to_string(), parent.ino, Filetype::Directory),
    ];
    entries.extend(
        wasi_try!(dir.read_dir(path))
            .into_iter()
            .map(|entry| (entry.name, entry.ino, host_filetype(entry.file_type))),
    );
    Ok(entries)
}
