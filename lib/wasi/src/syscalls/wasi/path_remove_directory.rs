use crate::syscalls::*;

/// ### `path_remove_directory()`
/// Remove an empty directory
/// Inputs:
/// - `Fd fd`
///     The base file descriptor from which the path is understood
/// - `&str path`
///     The path to the directory to remove
/// Errors:
/// - `Errno::Notdir`
///     If `path` does not name a directory
/// - `Errno::Notempty`
///     If the directory still has entries
/// - `Errno::Busy`
///     If `path` is a mount point
#[instrument(level = "debug", skip_all, fields(%fd, path), ret, err)]
pub fn path_remove_directory(vfs: &mut WasiVfs, fd: WasiFd, path: &str) -> Result<(), Errno> {
    let base_dir = vfs.fs.get_fd(fd)?;
    check_rights(base_dir, Rights::PATH_REMOVE_DIRECTORY)?;

    let (parent, name) = vfs.fs.resolve_parent(fd, path)?;
    if vfs.fs.mount_point_below(&parent, &name).is_some() {
        return Err(Errno::Busy);
    }
    match parent {
        Cursor::Virtual(dir) => {
            wasi_try!(vfs.fs.tree.remove_dir(dir, &name));
        }
        Cursor::Host { dir, path } => {
            wasi_try!(dir.remove_dir(&path.join(name)));
        }
    }
    Ok(())
}
