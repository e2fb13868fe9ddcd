use crate::{Filetype, Inode};
use byteorder::{LittleEndian, WriteBytesExt};

pub type Dircookie = u64;
pub const DIRCOOKIE_START: Dircookie = 0;

/// A directory entry header, as written by `fd_readdir`. The entry's name
/// follows it directly in the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Dirent {
    /// The offset of the next directory entry stored in this directory.
    pub d_next: Dircookie,
    /// The serial number of the file referred to by this directory entry.
    pub d_ino: Inode,
    /// The length of the name of the directory entry.
    pub d_namlen: u32,
    /// The type of the file referred to by this directory entry.
    pub d_type: Filetype,
}

impl Dirent {
    pub const SIZE: usize = 24;
}

pub fn dirent_to_le_bytes(ent: &Dirent) -> Vec<u8> {
    let mut out = Vec::with_capacity(Dirent::SIZE);
    // Writes into a Vec never fail.
    let _ = out.write_u64::<LittleEndian>(ent.d_next);
    let _ = out.write_u64::<LittleEndian>(ent.d_ino);
    let _ = out.write_u32::<LittleEndian>(ent.d_namlen);
    out.push(ent.d_type.into());
    out.extend_from_slice(&[0, 0, 0]);
    debug_assert_eq!(out.len(), Dirent::SIZE);
    out
}
