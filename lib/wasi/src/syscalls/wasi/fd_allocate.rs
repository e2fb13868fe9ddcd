use crate::syscalls::*;

/// ### `fd_allocate`
/// Allocate extra space for a file descriptor
/// Inputs:
/// - `Fd fd`
///     The file descriptor to allocate for
/// - `Filesize offset`
///     The offset from the start marking the beginning of the allocation
/// - `Filesize len`
///     The length from the offset marking the end of the allocation
/// Errors:
/// - `Errno::Inval`
///     If `offset + len` overflows
#[instrument(level = "debug", skip_all, fields(%fd, %offset, %len), ret, err)]
pub fn fd_allocate(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    offset: Filesize,
    len: Filesize,
) -> Result<(), Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    if let Backing::Stdio(_) = fd_entry.backing {
        return Err(Errno::Spipe);
    }
    check_rights(fd_entry, Rights::FD_ALLOCATE)?;
    if fd_entry.is_dir() {
        return Err(Errno::Isdir);
    }
    let new_size = offset.checked_add(len).ok_or(Errno::Inval)?;
    let current_size = super::fd_seek::file_size(&vfs.fs, fd_entry)?;
    if new_size <= current_size {
        return Ok(());
    }

    match &fd_entry.backing {
        Backing::Virtual(node) => {
            let node = *node;
            wasi_try!(vfs.fs.tree.set_len(node, new_size));
        }
        Backing::Host(HostHandle { file, .. }) => {
            let file = wasi_try!(file.as_ref(); Errno::Isdir);
            wasi_try_io!(file.set_len(new_size));
        }
        Backing::Stdio(_) => return Err(Errno::Spipe),
    }
    Ok(())
}
