use crate::syscalls::*;

/// ### `path_rename()`
/// Rename a file or directory
/// Inputs:
/// - `Fd old_fd`
///     The base directory for `old_path`
/// - `&str old_path`
///     The path of the entry to move
/// - `Fd new_fd`
///     The base directory for `new_path`
/// - `&str new_path`
///     The new path of the entry
/// Errors:
/// - `Errno::Xdev`
///     If the two paths live on different backings
/// - `Errno::Busy`
///     If either path is a mount point
#[instrument(level = "debug", skip_all, fields(%old_fd, old_path, %new_fd, new_path), ret, err)]
pub fn path_rename(
    vfs: &mut WasiVfs,
    old_fd: WasiFd,
    old_path: &str,
    new_fd: WasiFd,
    new_path: &str,
) -> Result<(), Errno> {
    check_rights(vfs.fs.get_fd(old_fd)?, Rights::PATH_RENAME_SOURCE)?;
    check_rights(vfs.fs.get_fd(new_fd)?, Rights::PATH_RENAME_TARGET)?;

    let (source_dir, source_name) = vfs.fs.resolve_parent(old_fd, old_path)?;
    let (target_dir, target_name) = vfs.fs.resolve_parent(new_fd, new_path)?;
    if vfs.fs.mount_point_below(&source_dir, &source_name).is_some()
        || vfs.fs.mount_point_below(&target_dir, &target_name).is_some()
    {
        return Err(Errno::Busy);
    }

    match (source_dir, target_dir) {
        (Cursor::Virtual(from), Cursor::Virtual(to)) => {
            wasi_try!(vfs.fs.tree.rename(from, &source_name, to, &target_name));
        }
        (
            Cursor::Host {
                dir: from_dir,
                path: from,
            },
            Cursor::Host { dir: to_dir, path: to },
        ) if from_dir == to_dir => {
            wasi_try!(from_dir.rename(&from.join(source_name), &to.join(target_name)));
        }
        _ => {
            debug!("rename across backings");
            return Err(Errno::Xdev);
        }
    }
    Ok(())
}
