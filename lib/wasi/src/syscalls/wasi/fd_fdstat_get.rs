use crate::syscalls::*;

/// ### `fd_fdstat_get()`
/// Get metadata of a file descriptor
/// Input:
/// - `Fd fd`
///     The file descriptor whose metadata will be accessed
/// Output:
/// - `Fdstat`
///     The type, flags and rights of the descriptor
#[instrument(level = "trace", skip_all, fields(%fd), ret, err)]
pub fn fd_fdstat_get(vfs: &WasiVfs, fd: WasiFd) -> Result<Fdstat, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    Ok(Fdstat {
        fs_filetype: fd_entry.filetype,
        fs_flags: fd_entry.flags,
        fs_rights_base: fd_entry.rights,
        fs_rights_inheriting: fd_entry.rights_inheriting,
    })
}
