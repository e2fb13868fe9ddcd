use crate::syscalls::*;

/// ### `path_open()`
/// Open file located at the given path
/// Inputs:
/// - `Fd dirfd`
///     The fd corresponding to the directory that the file is in
/// - `LookupFlags dirflags`
///     Flags specifying how the path will be resolved
/// - `&str path`
///     The path of the file or directory to open
/// - `Oflags o_flags`
///     How the file will be opened
/// - `Rights fs_rights_base`
///     The rights of the created file descriptor
/// - `Rights fs_rights_inheriting`
///     The rights of file descriptors derived from the created file descriptor
/// - `Fdflags fs_flags`
///     The flags of the file descriptor
/// Output:
/// - `Fd`
///     The new file descriptor
/// Possible Errors:
/// - `Errno::Access`, `Errno::Badf`, `Errno::Exist`, `Errno::Inval`, `Errno::Io`, `Errno::Isdir`,
///   `Errno::Mfile`, `Errno::Noent`, `Errno::Notdir` and `Errno::Notcapable`
#[allow(clippy::too_many_arguments)]
#[instrument(level = "debug", skip_all, fields(%dirfd, path, fd = field::Empty), ret, err)]
pub fn path_open(
    vfs: &mut WasiVfs,
    dirfd: WasiFd,
    dirflags: Lookupflags,
    path: &str,
    o_flags: Oflags,
    fs_rights_base: Rights,
    fs_rights_inheriting: Rights,
    fs_flags: Fdflags,
) -> Result<WasiFd, Errno> {
    if dirflags.contains(Lookupflags::SYMLINK_FOLLOW) {
        trace!("will follow symlinks when opening path");
    }

    let working_dir = vfs.fs.get_fd(dirfd)?;
    // open rights apply recursively
    check_rights(working_dir, Rights::PATH_OPEN)?;
    if o_flags.contains(Oflags::CREATE) {
        check_rights(working_dir, Rights::PATH_CREATE_FILE)?;
    }

    // never more than what the directory hands down
    let rights = fs_rights_base & working_dir.rights_inheriting;
    let rights_inheriting = fs_rights_inheriting & working_dir.rights_inheriting;
    let guest_path = join_guest_path(&working_dir.guest_path, path);

    let (backing, filetype) = match vfs.fs.resolve(dirfd, path) {
        Ok(Cursor::Virtual(node)) => open_virtual(&mut vfs.fs, node, o_flags, rights)?,
        Ok(Cursor::Host { dir, path }) => open_host(dir, path, o_flags, rights)?,
        Err(Errno::Noent) if o_flags.contains(Oflags::CREATE) => {
            match vfs.fs.resolve_parent(dirfd, path)? {
                (Cursor::Virtual(parent), name) => {
                    check_truncate(o_flags, rights)?;
                    let node = wasi_try!(vfs.fs.tree.create_file(parent, &name));
                    (Backing::Virtual(node), Filetype::RegularFile)
                }
                (Cursor::Host { dir, path }, name) => {
                    open_host(dir, path.join(name), o_flags, rights)?
                }
            }
        }
        Err(err) => return Err(err),
    };

    let mut open_flags = 0;
    if rights.contains(Rights::FD_READ) {
        open_flags |= Fd::READ;
    }
    if rights.contains(Rights::FD_WRITE) {
        open_flags |= Fd::WRITE;
    }
    if fs_flags.contains(Fdflags::APPEND) {
        open_flags |= Fd::APPEND;
    }
    if o_flags.contains(Oflags::TRUNC) {
        open_flags |= Fd::TRUNCATE;
    }
    if o_flags.contains(Oflags::CREATE) {
        open_flags |= Fd::CREATE;
    }

    let fd = vfs.fs.create_fd(Fd {
        rights,
        rights_inheriting,
        flags: fs_flags,
        offset: 0,
        open_flags,
        filetype,
        backing,
        guest_path,
        is_preopen: false,
    })?;
    tracing::Span::current().record("fd", fd);
    Ok(fd)
}

fn open_virtual(
    fs: &mut WasiFs,
    node: NodeId,
    o_flags: Oflags,
    rights: Rights,
) -> Result<(Backing, Filetype), Errno> {
    let stat = wasi_try!(fs.tree.stat(node));
    if o_flags.contains(Oflags::CREATE | Oflags::EXCL) {
        return Err(Errno::Exist);
    }
    check_truncate(o_flags, rights)?;
    match stat.kind {
        NodeKind::Directory => {
            if rights.contains(Rights::FD_WRITE) || o_flags.contains(Oflags::TRUNC) {
                return Err(Errno::Isdir);
            }
            Ok((Backing::Virtual(node), Filetype::Directory))
        }
        NodeKind::File => {
            if o_flags.contains(Oflags::DIRECTORY) {
                return Err(Errno::Notdir);
            }
            // packed files are always readable, writable unless packed read-only
            if stat.read_only && rights.contains(Rights::FD_WRITE) {
                debug!(%node, "file was packed read-only");
                return Err(Errno::Access);
            }
            if o_flags.contains(Oflags::TRUNC) {
                wasi_try!(fs.tree.set_len(node, 0));
            }
            Ok((Backing::Virtual(node), Filetype::RegularFile))
        }
    }
}

fn open_host(
    dir: HostDir,
    path: PathBuf,
    o_flags: Oflags,
    rights: Rights,
) -> Result<(Backing, Filetype), Errno> {
    let metadata = match dir.metadata(&path) {
        Ok(metadata) => Some(metadata),
        Err(FsError::NoEntry) => None,
        Err(err) => return Err(fs_error_into_wasi_err(err)),
    };

    let write = rights.contains(Rights::FD_WRITE);
    let open_options = match metadata {
        Some(metadata) => {
            if o_flags.contains(Oflags::CREATE | Oflags::EXCL) {
                return Err(Errno::Exist);
            }
            check_truncate(o_flags, rights)?;
            if metadata.file_type == HostFileType::Directory {
                if write || o_flags.contains(Oflags::TRUNC) {
                    return Err(Errno::Isdir);
                }
                let handle = HostHandle {
                    dir,
                    path,
                    file: None,
                };
                return Ok((Backing::Host(handle), Filetype::Directory));
            }
            if o_flags.contains(Oflags::DIRECTORY) {
                return Err(Errno::Notdir);
            }
            OpenOptionsConfig {
                // at least one access mode is needed to open anything
                read: rights.contains(Rights::FD_READ) || !write,
                write,
                create_new: false,
                create: false,
                append: false,
                truncate: o_flags.contains(Oflags::TRUNC),
            }
        }
        None => {
            if !o_flags.contains(Oflags::CREATE) {
                return Err(Errno::Noent);
            }
            check_truncate(o_flags, rights)?;
            if o_flags.contains(Oflags::DIRECTORY) {
                return Err(Errno::Inval);
            }
            OpenOptionsConfig {
                read: rights.contains(Rights::FD_READ),
                // creating a file needs write access on the host
                write: true,
                create_new: o_flags.contains(Oflags::EXCL),
                create: true,
                append: false,
                truncate: o_flags.contains(Oflags::TRUNC),
            }
        }
    };

    let file = wasi_try!(dir.open(&path, &open_options));
    let filetype = match &metadata {
        Some(metadata) => host_filetype(metadata.file_type),
        None => Filetype::RegularFile,
    };
    let handle = HostHandle {
        dir,
        path,
        file: Some(file),
    };
    Ok((Backing::Host(handle), filetype))
}

/// Checked once the target is known, so a missing path reports `Noent`.
fn check_truncate(o_flags: Oflags, rights: Rights) -> Result<(), Errno> {
    if o_flags.contains(Oflags::TRUNC) && !rights.contains(Rights::FD_WRITE) {
        debug!("truncation requires FD_WRITE");
        return Err(Errno::Access);
    }
    Ok(())
}
