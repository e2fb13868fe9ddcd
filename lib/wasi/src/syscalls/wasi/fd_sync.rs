use crate::syscalls::*;

/// ### `fd_sync()`
/// Synchronize file and metadata to disk
/// Inputs:
/// - `Fd fd`
///     The file descriptor to sync
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_SYNC`
#[instrument(level = "debug", skip_all, fields(%fd), ret, err)]
pub fn fd_sync(vfs: &WasiVfs, fd: WasiFd) -> Result<(), Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    check_rights(fd_entry, Rights::FD_SYNC)?;

    match &fd_entry.backing {
        Backing::Host(HostHandle {
            file: Some(file), ..
        }) => {
            wasi_try_io!(file.sync_all());
        }
        Backing::Stdio(Stdio::Out) => wasi_try_io!(io::stdout().flush()),
        Backing::Stdio(Stdio::Err) => wasi_try_io!(io::stderr().flush()),
        _ => {}
    }
    Ok(())
}
