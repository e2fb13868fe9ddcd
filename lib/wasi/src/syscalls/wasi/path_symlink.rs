use crate::syscalls::*;

/// ### `path_symlink()`
/// Create a symlink
/// Inputs:
/// - `&str old_path`
///     The target of the symlink
/// - `Fd fd`
///     The base directory from which `new_path` is understood
/// - `&str new_path`
///     Path of the symlink to create
/// Errors:
/// - `Errno::Notsup`
///     Always once `new_path` resolves: neither the packed tree nor the
///     confined host directories support symlinks
#[instrument(level = "debug", skip_all, fields(old_path, %fd, new_path), ret, err)]
pub fn path_symlink(vfs: &WasiVfs, old_path: &str, fd: WasiFd, new_path: &str) -> Result<(), Errno> {
    check_rights(vfs.fs.get_fd(fd)?, Rights::PATH_SYMLINK)?;
    let (parent, name) = vfs.fs.resolve_parent(fd, new_path)?;
    if vfs.fs.mount_point_below(&parent, &name).is_some() {
        return Err(Errno::Exist);
    }
    trace!(target_path = old_path, "symlinks are not supported");
    Err(Errno::Notsup)
}
