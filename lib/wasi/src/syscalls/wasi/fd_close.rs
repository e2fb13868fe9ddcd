use crate::syscalls::*;

/// ### `fd_close()`
/// Close an open file descriptor
/// Inputs:
/// - `Fd fd`
///     A file descriptor mapping to an open file to close
/// Errors:
/// - `Errno::Badf`
///     If `fd` is invalid or not open
#[instrument(level = "debug", skip_all, fields(%fd), ret, err)]
pub fn fd_close(vfs: &mut WasiVfs, fd: WasiFd) -> Result<(), Errno> {
    vfs.fs.close_fd(fd)
}
