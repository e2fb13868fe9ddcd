use crate::syscalls::*;

/// ### `fd_renumber()`
/// Atomically replace a file descriptor by renumbering another one
/// Inputs:
/// - `Fd from`
///     File descriptor to move
/// - `Fd to`
///     File descriptor to replace, it is closed first
/// Errors:
/// - `Errno::Badf`
///     If either descriptor is not open
#[instrument(level = "debug", skip_all, fields(%from, %to), ret, err)]
pub fn fd_renumber(vfs: &mut WasiVfs, from: WasiFd, to: WasiFd) -> Result<(), Errno> {
    vfs.fs.renumber(from, to)
}
