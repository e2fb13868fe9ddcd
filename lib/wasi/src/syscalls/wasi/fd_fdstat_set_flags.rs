use crate::syscalls::*;

/// ### `fd_fdstat_set_flags()`
/// Set file descriptor flags for a file descriptor
/// Inputs:
/// - `Fd fd`
///     The file descriptor to apply the new flags to
/// - `Fdflags flags`
///     The flags to apply to `fd`
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_FDSTAT_SET_FLAGS`
#[instrument(level = "debug", skip_all, fields(%fd, ?flags), ret, err)]
pub fn fd_fdstat_set_flags(vfs: &mut WasiVfs, fd: WasiFd, flags: Fdflags) -> Result<(), Errno> {
    let fd_entry = vfs.fs.get_fd_mut(fd)?;
    check_rights(fd_entry, Rights::FD_FDSTAT_SET_FLAGS)?;
    fd_entry.flags = flags;
    Ok(())
}
