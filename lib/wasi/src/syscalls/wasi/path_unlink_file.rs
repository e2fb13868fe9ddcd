use crate::syscalls::*;

/// ### `path_unlink_file()`
/// Unlink a file, deleting if the number of hardlinks is 1
/// Inputs:
/// - `Fd fd`
///     The base file descriptor from which the path is understood
/// - `&str path`
///     The path to the file to unlink
/// Errors:
/// - `Errno::Isdir`
///     If `path` names a directory
#[instrument(level = "debug", skip_all, fields(%fd, path), ret, err)]
pub fn path_unlink_file(vfs: &mut WasiVfs, fd: WasiFd, path: &str) -> Result<(), Errno> {
    let base_dir = vfs.fs.get_fd(fd)?;
    check_rights(base_dir, Rights::PATH_UNLINK_FILE)?;

    let (parent, name) = vfs.fs.resolve_parent(fd, path)?;
    if vfs.fs.mount_point_below(&parent, &name).is_some() {
        return Err(Errno::Isdir);
    }
    match parent {
        Cursor::Virtual(dir) => {
            wasi_try!(vfs.fs.tree.unlink_file(dir, &name));
        }
        Cursor::Host { dir, path } => {
            wasi_try!(dir.remove_file(&path.join(name)));
        }
    }
    Ok(())
}
