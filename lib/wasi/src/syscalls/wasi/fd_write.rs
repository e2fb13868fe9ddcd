use crate::syscalls::*;

/// ### `fd_write()`
/// Write data to the file descriptor
/// Inputs:
/// - `Fd fd`
///     File descriptor (opened with writing) to write to
/// - `&[&[u8]] iovs`
///     Buffers of data to write, in order
/// Output:
/// - `usize`
///     Number of bytes written
/// Errors:
/// - `Errno::Access`
///     If `fd` lacks `FD_WRITE`, or the file was packed read-only
/// - `Errno::Isdir`
///     If `fd` is a directory
#[instrument(level = "trace", skip_all, fields(%fd, nwritten = field::Empty), ret, err)]
pub fn fd_write(vfs: &mut WasiVfs, fd: WasiFd, iovs: &[&[u8]]) -> Result<usize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    let offset = if fd_entry.flags.contains(Fdflags::APPEND) && !fd_entry.is_dir() {
        match fd_entry.backing {
            Backing::Stdio(_) => 0,
            _ => super::fd_seek::file_size(&vfs.fs, fd_entry)?,
        }
    } else {
        fd_entry.offset
    };
    let bytes_written = fd_write_internal(vfs, fd, iovs, offset)?;

    let fd_entry = vfs.fs.get_fd_mut(fd)?;
    if !matches!(fd_entry.backing, Backing::Stdio(_)) {
        fd_entry.offset = offset + bytes_written as u64;
    }
    tracing::Span::current().record("nwritten", bytes_written);
    Ok(bytes_written)
}

/// ### `fd_pwrite()`
/// Write to a file without adjusting its offset
/// Inputs:
/// - `Fd fd`
///     File descriptor (opened with writing) to write to
/// - `&[&[u8]] iovs`
///     Buffers of data to write, in order
/// - `Filesize offset`
///     The offset to write at
/// Output:
/// - `usize`
///     Number of bytes written
/// Errors:
/// - `Errno::Spipe`
///     If `fd` is one of the standard streams
#[instrument(level = "trace", skip_all, fields(%fd, %offset, nwritten = field::Empty), ret, err)]
pub fn fd_pwrite(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    iovs: &[&[u8]],
    offset: Filesize,
) -> Result<usize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    if let Backing::Stdio(_) = fd_entry.backing {
        return Err(Errno::Spipe);
    }
    check_rights(fd_entry, Rights::FD_SEEK)?;

    let bytes_written = fd_write_internal(vfs, fd, iovs, offset)?;
    tracing::Span::current().record("nwritten", bytes_written);
    Ok(bytes_written)
}

fn fd_write_internal(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    iovs: &[&[u8]],
    offset: Filesize,
) -> Result<usize, Errno> {
    let fd_entry = vfs.fs.get_fd(fd)?;
    check_rights(fd_entry, Rights::FD_WRITE)?;
    if fd_entry.is_dir() {
        return Err(Errno::Isdir);
    }

    let mut bytes_written = 0usize;
    match &fd_entry.backing {
        Backing::Stdio(stdio) => {
            let mut out: Box<dyn Write> = match stdio {
                Stdio::Out => Box::new(io::stdout().lock()),
                Stdio::Err => Box::new(io::stderr().lock()),
                Stdio::In => return Err(Errno::Badf),
            };
            for iov in iovs {
                wasi_try_io!(out.write_all(iov));
                bytes_written += iov.len();
            }
            wasi_try_io!(out.flush());
        }
        Backing::Virtual(node) => {
            let node = *node;
            for iov in iovs {
                bytes_written += wasi_try!(vfs.fs.tree.write_at(
                    node,
                    offset + bytes_written as u64,
                    iov
                ));
            }
        }
        Backing::Host(HostHandle { file, .. }) => {
            let mut file: &File = wasi_try!(file.as_ref(); Errno::Isdir);
            wasi_try_io!(file.seek(SeekFrom::Start(offset)));
            for iov in iovs {
                wasi_try_io!(file.write_all(iov));
                bytes_written += iov.len();
            }
        }
    }
    Ok(bytes_written)
}
