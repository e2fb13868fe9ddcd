use crate::syscalls::*;

/// ### `fd_advise()`
/// Advise the system about how a file will be used
/// Inputs:
/// - `Fd fd`
///     The file descriptor the advice applies to
/// - `Filesize offset`
///     The offset from which the advice applies
/// - `Filesize len`
///     The length from the offset to which the advice applies
/// - `Advice advice`
///     The advice to give
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_ADVISE`
#[instrument(level = "debug", skip_all, fields(%fd, %offset, %len, ?advice), ret, err)]
pub fn fd_advise(
    vfs: &WasiVfs,
    fd: WasiFd,
    offset: Filesize,
    len: Filesize,
    advice: Advice,
) -> Result<(), Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    if let Backing::Stdio(_) = fd_entry.backing {
        return Err(Errno::Spipe);
    }
    check_rights(fd_entry, Rights::FD_ADVISE)?;
    if fd_entry.is_dir() {
        return Err(Errno::Isdir);
    }

    // advice is a hint; there is nothing to do with it
    Ok(())
}
