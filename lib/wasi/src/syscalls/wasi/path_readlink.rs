use crate::syscalls::*;

/// ### `path_readlink()`
/// Read the value of a symlink
/// Inputs:
/// - `Fd dir_fd`
///     The base directory from which `path` is understood
/// - `&str path`
///     The path to the symlink
/// - `&mut [u8] buf`
///     Buffer the contents of the symlink are written to, truncated if needed
/// Output:
/// - `usize`
///     The number of bytes written to `buf`
/// Errors:
/// - `Errno::Inval`
///     If `path` is not a symlink; the packed tree holds none
#[instrument(level = "debug", skip_all, fields(%dir_fd, path), ret, err)]
pub fn path_readlink(
    vfs: &WasiVfs,
    dir_fd: WasiFd,
    path: &str,
    buf: &mut [u8],
) -> Result<usize, Errno> {
    check_rights(vfs.fs.get_fd(dir_fd)?, Rights::PATH_READLINK)?;

    match vfs.fs.resolve(dir_fd, path)? {
        Cursor::Virtual(node) => {
            // existence is still reported before the kind
            wasi_try!(vfs.fs.tree.stat(node));
            Err(Errno::Inval)
        }
        Cursor::Host { dir, path } => {
            let target = wasi_try!(dir.read_link(&path));
            let target = target.to_string_lossy();
            let bytes = target.as_bytes();
            let len = bytes.len().min(buf.len());
            buf[..len].copy_from_slice(&bytes[..len]);
            Ok(len)
        }
    }
}
