use crate::syscalls::*;

/// ### `fd_tell()`
/// Get the offset of the file descriptor
/// Inputs:
/// - `Fd fd`
///     The file descriptor to access
/// Output:
/// - `Filesize`
///     The current offset of `fd`
/// Errors:
/// - `Errno::Spipe`
///     If `fd` is one of the standard streams
#[instrument(level = "trace", skip_all, fields(%fd), ret, err)]
pub fn fd_tell(vfs: &WasiVfs, fd: WasiFd) -> Result<Filesize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    if let Backing::Stdio(_) = fd_entry.backing {
        return Err(Errno::Spipe);
    }
    check_rights(fd_entry, Rights::FD_TELL)?;
    Ok(fd_entry.offset)
}
