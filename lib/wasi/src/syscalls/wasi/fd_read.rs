use crate::syscalls::*;

/// ### `fd_read()`
/// Read data from file descriptor
/// Inputs:
/// - `Fd fd`
///     File descriptor from which data will be read
/// - `&mut [&mut [u8]] iovs`
///     Buffers where data will be stored, filled in order
/// Output:
/// - `usize`
///     Number of bytes read, 0 at the end of the file
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_READ`
/// - `Errno::Isdir`
///     If `fd` is a directory
#[instrument(level = "trace", skip_all, fields(%fd, nread = field::Empty), ret, err)]
pub fn fd_read(vfs: &mut WasiVfs, fd: WasiFd, iovs: &mut [&mut [u8]]) -> Result<usize, Errno> {
    let offset = vfs.fs.get_fd(fd)?.offset;
    let bytes_read = fd_read_internal(vfs, fd, iovs, offset)?;

    let fd_entry = vfs.fs.get_fd_mut(fd)?;
    if !matches!(fd_entry.backing, Backing::Stdio(_)) {
        fd_entry.offset = offset + bytes_read as u64;
    }
    tracing::Span::current().record("nread", bytes_read);
    Ok(bytes_read)
}

/// ### `fd_pread()`
/// Read from the file at the given offset without updating the file cursor.
/// This acts like a stateless version of Seek + Read
/// Inputs:
/// - `Fd fd`
///     The file descriptor to read the data with
/// - `&mut [&mut [u8]] iovs`
///     Buffers to read the data into
/// - `Filesize offset`
///     The file cursor to use: the starting position from which data will be read
/// Output:
/// - `usize`
///     The number of bytes read
/// Errors:
/// - `Errno::Spipe`
///     If `fd` is one of the standard streams
#[instrument(level = "trace", skip_all, fields(%fd, %offset, nread = field::Empty), ret, err)]
pub fn fd_pread(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    iovs: &mut [&mut [u8]],
    offset: Filesize,
) -> Result<usize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    if let Backing::Stdio(_) = fd_entry.backing {
        return Err(Errno::Spipe);
    }
    check_rights(fd_entry, Rights::FD_SEEK)?;

    let bytes_read = fd_read_internal(vfs, fd, iovs, offset)?;
    tracing::Span::current().record("nread", bytes_read);
    Ok(bytes_read)
}

fn fd_read_internal(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    iovs: &mut [&mut [u8]],
    offset: Filesize,
) -> Result<usize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    check_rights(fd_entry, Rights::FD_READ)?;
    if fd_entry.is_dir() {
        return Err(Errno::Isdir);
    }

    let mut bytes_read = 0usize;
    match &fd_entry.backing {
        Backing::Stdio(Stdio::In) => {
            let mut stdin = io::stdin().lock();
            for iov in iovs.iter_mut() {
                let n = wasi_try_io!(stdin.read(iov));
                bytes_read += n;
                if n < iov.len() {
                    break;
                }
            }
        }
        Backing::Stdio(_) => return Err(Errno::Badf),
        Backing::Virtual(node) => {
            for iov in iovs.iter_mut() {
                let n = wasi_try!(vfs.fs.tree.read_at(*node, offset + bytes_read as u64, iov));
                bytes_read += n;
                if n < iov.len() {
                    break;
                }
            }
        }
        Backing::Host(HostHandle { file, .. }) => {
            let mut file: &File = wasi_try!(file.as_ref(); Errno::Isdir);
            wasi_try_io!(file.seek(SeekFrom::Start(offset)));
            for iov in iovs.iter_mut() {
                let n = wasi_try_io!(file.read(iov));
                bytes_read += n;
                if n < iov.len() {
                    break;
                }
            }
        }
    }
    Ok(bytes_read)
}
