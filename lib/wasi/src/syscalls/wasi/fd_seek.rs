use crate::syscalls::*;

/// ### `fd_seek()`
/// Update file descriptor offset
/// Inputs:
/// - `Fd fd`
///     File descriptor to mutate
/// - `Filedelta offset`
///     Number of bytes to adjust offset by
/// - `Whence whence`
///     What the offset is relative to
/// Output:
/// - `Filesize`
///     The new offset relative to the start of the file
/// Errors:
/// - `Errno::Inval`
///     If the new offset would be negative, or for `Whence::End` on a directory
/// - `Errno::Spipe`
///     If `fd` is one of the standard streams
#[instrument(level = "trace", skip_all, fields(%fd, %offset, ?whence), ret, err)]
pub fn fd_seek(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    offset: Filedelta,
    whence: Whence,
) -> Result<Filesize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    if let Backing::Stdio(_) = fd_entry.backing {
        return Err(Errno::Spipe);
    }
    check_rights(fd_entry, Rights::FD_SEEK)?;

    let base = match whence {
        Whence::Set => 0,
        Whence::Cur => fd_entry.offset,
        Whence::End => {
            if fd_entry.is_dir() {
                return Err(Errno::Inval);
            }
            file_size(&vfs.fs, fd_entry)?
        }
    };
    // seeking past the end is allowed, reads there return nothing
    let new_offset = base.checked_add_signed(offset).ok_or(Errno::Inval)?;
    vfs.fs.get_fd_mut(fd)?.offset = new_offset;
    Ok(new_offset)
}

/// Current size of the regular file behind `fd_entry`.
pub(crate) fn file_size(fs: &WasiFs, fd_entry: &Fd) -> Result<Filesize, Errno> {
    match &fd_entry.backing {
        Backing::Virtual(node) => Ok(wasi_try!(fs.tree.stat(*node)).size),
        Backing::Host(HostHandle {
            file: Some(file), ..
        }) => Ok(wasi_try_io!(file.metadata()).len()),
        Backing::Host(HostHandle { file: None, .. }) => Err(Errno::Isdir),
        Backing::Stdio(_) => Err(Errno::Spipe),
    }
}
