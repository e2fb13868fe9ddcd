use crate::syscalls::*;

/// ### `fd_filestat_set_size()`
/// Change the size of an open file, zeroing out any new bytes
/// Inputs:
/// - `Fd fd`
///     File descriptor to adjust
/// - `Filesize st_size`
///     New size that `fd` will be set to
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_FILESTAT_SET_SIZE`, or the file was packed read-only
/// - `Errno::Isdir`
///     If `fd` is a directory
#[instrument(level = "debug", skip_all, fields(%fd, %st_size), ret, err)]
pub fn fd_filestat_set_size(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    st_size: Filesize,
) -> Result<(), Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    check_rights(fd_entry, Rights::FD_FILESTAT_SET_SIZE)?;
    if fd_entry.is_dir() {
        return Err(Errno::Isdir);
    }

    match &fd_entry.backing {
        Backing::Virtual(node) => {
            let node = *node;
            wasi_try!(vfs.fs.tree.set_len(node, st_size));
        }
        Backing::Host(HostHandle { file, .. }) => {
            let file = wasi_try!(file.as_ref(); Errno::Isdir);
            wasi_try_io!(file.set_len(st_size));
        }
        Backing::Stdio(_) => return Err(Errno::Inval),
    }
    Ok(())
}
