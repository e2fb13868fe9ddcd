use crate::syscalls::*;

/// ### `fd_fdstat_set_rights()`
/// Set the rights of a file descriptor. This can only be used to remove rights
/// Inputs:
/// - `Fd fd`
///     The file descriptor to apply the new rights to
/// - `Rights fs_rights_base`
///     The rights to apply to `fd`
/// - `Rights fs_rights_inheriting`
///     The inheriting rights to apply to `fd`
/// Errors:
/// - `Errno::Notcapable`
///     If either set of rights holds a right `fd` does not have
#[instrument(level = "debug", skip_all, fields(%fd), ret, err)]
pub fn fd_fdstat_set_rights(
    vfs: &mut WasiVfs,
    fd: WasiFd,
    fs_rights_base: Rights,
    fs_rights_inheriting: Rights,
) -> Result<(), Errno> {
    let fd_entry = vfs.fs.get_fd_mut(fd)?;

    // ensure new rights are a subset of the current rights
    if !fd_entry.rights.contains(fs_rights_base)
        || !fd_entry.rights_inheriting.contains(fs_rights_inheriting)
    {
        return Err(Errno::Notcapable);
    }

    fd_entry.rights = fs_rights_base;
    fd_entry.rights_inheriting = fs_rights_inheriting;
    Ok(())
}
