use crate::syscalls::*;

/// ### `path_filestat_get()`
/// Access metadata about a file or directory
/// Inputs:
/// - `Fd fd`
///     The directory that `path` is relative to
/// - `LookupFlags flags`
///     Flags to control how `path` is understood
/// - `&str path`
///     String containing the file path
/// Output:
/// - `Filestat`
///     The metadata of the file
#[instrument(level = "trace", skip_all, fields(%fd, path), ret, err)]
pub fn path_filestat_get(
    vfs: &WasiVfs,
    fd: WasiFd,
    flags: Lookupflags,
    path: &str,
) -> Result<Filestat, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    check_rights(fd_entry, Rights::PATH_FILESTAT_GET)?;

    let cursor = vfs.fs.resolve(fd, path)?;
    cursor_filestat(&vfs.fs, &cursor, flags.contains(Lookupflags::SYMLINK_FOLLOW))
}
