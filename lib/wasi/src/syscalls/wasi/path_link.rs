use crate::syscalls::*;

/// ### `path_link()`
/// Create a hard link
/// Inputs:
/// - `Fd old_fd`
///     The directory relative to which the `old_path` is
/// - `LookupFlags old_flags`
///     Flags to control how `old_path` is understood
/// - `&str old_path`
///     String containing the old file path
/// - `Fd new_fd`
///     The directory relative to which the `new_path` is
/// - `&str new_path`
///     String containing the new file path
/// Errors:
/// - `Errno::Notsup`
///     If either path is in the packed tree
/// - `Errno::Xdev`
///     If the paths live in different host directories
#[instrument(level = "debug", skip_all, fields(%old_fd, old_path, %new_fd, new_path), ret, err)]
pub fn path_link(
    vfs: &mut WasiVfs,
    old_fd: WasiFd,
    old_flags: Lookupflags,
    old_path: &str,
    new_fd: WasiFd,
    new_path: &str,
) -> Result<(), Errno> {
    if old_flags.contains(Lookupflags::SYMLINK_FOLLOW) {
        trace!("will follow symlinks when linking");
    }
    check_rights(vfs.fs.get_fd(old_fd)?, Rights::PATH_LINK_SOURCE)?;
    check_rights(vfs.fs.get_fd(new_fd)?, Rights::PATH_LINK_TARGET)?;

    let source = vfs.fs.resolve(old_fd, old_path)?;
    let (target_dir, target_name) = vfs.fs.resolve_parent(new_fd, new_path)?;
    if vfs.fs.mount_point_below(&target_dir, &target_name).is_some() {
        return Err(Errno::Exist);
    }

    match (source, target_dir) {
        (Cursor::Virtual(_), _) | (_, Cursor::Virtual(_)) => Err(Errno::Notsup),
        (
            Cursor::Host {
                dir: from_dir,
                path: from,
            },
            Cursor::Host { dir: to_dir, path: to },
        ) => {
            if from_dir != to_dir {
                return Err(Errno::Xdev);
            }
            wasi_try!(from_dir.hard_link(&from, &to.join(target_name)));
            Ok(())
        }
    }
}
