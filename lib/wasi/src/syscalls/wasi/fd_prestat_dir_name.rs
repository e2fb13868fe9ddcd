use crate::syscalls::*;

/// ### `fd_prestat_dir_name()`
/// Get the guest path of a preopened directory
/// Inputs:
/// - `Fd fd`
///     The preopened file descriptor to query
/// - `char *path`
///     Buffer the path is written to, without a trailing nul byte
/// Errors:
/// - `Errno::Badf`
///     If `fd` is not open or not a preopen
/// - `Errno::Nametoolong`
///     If `path` is shorter than the length reported by `fd_prestat_get`
#[instrument(level = "trace", skip_all, fields(%fd, path = field::Empty), ret, err)]
pub fn fd_prestat_dir_name(vfs: &WasiVfs, fd: WasiFd, path: &mut [u8]) -> Result<(), Errno> {
    let Prestat::Dir { pr_name_len } = vfs.fs.prestat_fd(fd)?;
    let name = vfs.fs.get_fd(fd)?.guest_path.as_bytes();
    tracing::Span::current().record("path", String::from_utf8_lossy(name).as_ref());

    if path.len() < pr_name_len as usize {
        return Err(Errno::Nametoolong);
    }
    path[..name.len()].copy_from_slice(name);
    Ok(())
}
