use crate::syscalls::*;

/// ### `fd_filestat_get()`
/// Get the metadata of an open file
/// Input:
/// - `Fd fd`
///     The open file descriptor whose metadata will be read
/// Output:
/// - `Filestat`
///     The metadata of the file
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_FILESTAT_GET`
#[instrument(level = "trace", skip_all, fields(%fd), ret, err)]
pub fn fd_filestat_get(vfs: &WasiVfs, fd: WasiFd) -> Result<Filestat, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    if let Backing::Stdio(_) = fd_entry.backing {
        return Ok(Filestat {
            st_filetype: Filetype::CharacterDevice,
            ..Default::default()
        });
    }
    check_rights(fd_entry, Rights::FD_FILESTAT_GET)?;

    match &fd_entry.backing {
        Backing::Virtual(node) => node_filestat(&vfs.fs, *node),
        Backing::Host(HostHandle {
            file: Some(file), ..
        }) => Ok(host_filestat(wasi_try_io!(file.metadata()).into())),
        Backing::Host(HostHandle { dir, path, .. }) => {
            Ok(host_filestat(wasi_try!(dir.metadata(path))))
        }
        Backing::Stdio(_) => Err(Errno::Badf),
    }
}
