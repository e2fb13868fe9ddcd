use crate::syscalls::*;

/// ### `fd_prestat_get()`
/// Get metadata about a preopened file descriptor
/// Input:
/// - `Fd fd`
///     The preopened file descriptor to query
/// Output:
/// - `Prestat`
///     The metadata, naming the length of the preopen's guest path
/// Errors:
/// - `Errno::Badf`
///     If `fd` is not open or not a preopen
#[instrument(level = "trace", skip_all, fields(%fd), ret, err)]
pub fn fd_prestat_get(vfs: &WasiVfs, fd: WasiFd) -> Result<Prestat, Errno> {
    vfs.fs.prestat_fd(fd).map_err(|code| {
        debug!("fd_prestat_get failed (fd={}) - errno={}", fd, code);
        code
    })
}
