use crate::syscalls::*;

/// ### `path_create_directory()`
/// Create directory at a path
/// Inputs:
/// - `Fd fd`
///     The directory that the path is relative to
/// - `&str path`
///     String containing path data
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `PATH_CREATE_DIRECTORY`
/// - `Errno::Exist`
///     If an entry or a mount point already exists at `path`
#[instrument(level = "debug", skip_all, fields(%fd, path), ret, err)]
pub fn path_create_directory(vfs: &mut WasiVfs, fd: WasiFd, path: &str) -> Result<(), Errno> {
    let working_dir = vfs.fs.get_fd(fd)?;
    check_rights(working_dir, Rights::PATH_CREATE_DIRECTORY)?;

    let (parent, name) = vfs.fs.resolve_parent(fd, path)?;
    if vfs.fs.mount_point_below(&parent, &name).is_some() {
        return Err(Errno::Exist);
    }
    match parent {
        Cursor::Virtual(dir) => {
            wasi_try!(vfs.fs.tree.create_dir(dir, &name));
        }
        Cursor::Host { dir, path } => {
            wasi_try!(dir.create_dir(&path.join(name)));
        }
    }
    Ok(())
}
