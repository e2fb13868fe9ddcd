use crate::syscalls::*;

/// ### `fd_datasync()`
/// Synchronize the file data to disk
/// Inputs:
/// - `Fd fd`
///     The file descriptor to sync
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_DATASYNC`
#[instrument(level = "debug", skip_all, fields(%fd), ret, err)]
pub fn fd_datasync(vfs: &WasiVfs, fd: WasiFd) -> Result<(), Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    check_rights(fd_entry, Rights::FD_DATASYNC)?;

    match &fd_entry.backing {
        Backing::Host(HostHandle {
            file: Some(file), ..
        }) => {
            wasi_try_io!(file.sync_data());
        }
        Backing::Stdio(Stdio::Out) => wasi_try_io!(io::stdout().flush()),
        Backing::Stdio(Stdio::Err) => wasi_try_io!(io::stderr().flush()),
        // the packed tree only lives in memory
        _ => {}
    }
    Ok(())
}
