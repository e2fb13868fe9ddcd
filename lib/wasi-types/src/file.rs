use crate::{Device, Fd, Filesize, Inode, Linkcount, Rights, Timestamp};
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const STDIN_FILENO: Fd = 0;
pub const STDOUT_FILENO: Fd = 1;
pub const STDERR_FILENO: Fd = 2;

bitflags! {
    /// Open flags used by `path_open`.
    pub struct Oflags: u16 {
        const CREATE = 1 << 0;
        const DIRECTORY = 1 << 1;
        const EXCL = 1 << 2;
        const TRUNC = 1 << 3;
    }
}

bitflags! {
    /// File descriptor flags.
    pub struct Fdflags: u16 {
        const APPEND = 1 << 0;
        const DSYNC = 1 << 1;
        const NONBLOCK = 1 << 2;
        const RSYNC = 1 << 3;
        const SYNC = 1 << 4;
    }
}

bitflags! {
    /// Flags determining the method of how paths are resolved.
    pub struct Lookupflags: u32 {
        const SYMLINK_FOLLOW = 1 << 0;
    }
}

bitflags! {
    /// Which file time attributes to adjust.
    pub struct Fstflags: u16 {
        const SET_ATIM = 1 << 0;
        const SET_ATIM_NOW = 1 << 1;
        const SET_MTIM = 1 << 2;
        const SET_MTIM_NOW = 1 << 3;
    }
}

/// The position relative to which to set the offset of the file descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

/// File or memory access pattern advisory information.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Advice {
    Normal = 0,
    Sequential = 1,
    Random = 2,
    Willneed = 3,
    Dontneed = 4,
    Noreuse = 5,
}

/// The type of a file descriptor or file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Filetype {
    Unknown = 0,
    BlockDevice = 1,
    CharacterDevice = 2,
    Directory = 3,
    RegularFile = 4,
    SocketDgram = 5,
    SocketStream = 6,
    SymbolicLink = 7,
}

/// File attributes, as returned by `fd_filestat_get` and `path_filestat_get`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Filestat {
    pub st_dev: Device,
    pub st_ino: Inode,
    pub st_filetype: Filetype,
    pub st_nlink: Linkcount,
    pub st_size: Filesize,
    pub st_atim: Timestamp,
    pub st_mtim: Timestamp,
    pub st_ctim: Timestamp,
}

impl Default for Filestat {
    fn default() -> Self {
        Self {
            st_dev: Default::default(),
            st_ino: Default::default(),
            st_filetype: Filetype::Unknown,
            st_nlink: 1,
            st_size: Default::default(),
            st_atim: Default::default(),
            st_mtim: Default::default(),
            st_ctim: Default::default(),
        }
    }
}

impl Filestat {
    pub const SIZE: usize = 64;

    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        LittleEndian::write_u64(&mut out[0..8], self.st_dev);
        LittleEndian::write_u64(&mut out[8..16], self.st_ino);
        out[16] = self.st_filetype.into();
        LittleEndian::write_u64(&mut out[24..32], self.st_nlink);
        LittleEndian::write_u64(&mut out[32..40], self.st_size);
        LittleEndian::write_u64(&mut out[40..48], self.st_atim);
        LittleEndian::write_u64(&mut out[48..56], self.st_mtim);
        LittleEndian::write_u64(&mut out[56..64], self.st_ctim);
        out
    }
}

/// File descriptor attributes, as returned by `fd_fdstat_get`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Fdstat {
    pub fs_filetype: Filetype,
    pub fs_flags: Fdflags,
    pub fs_rights_base: Rights,
    pub fs_rights_inheriting: Rights,
}

impl Fdstat {
    pub const SIZE: usize = 24;

    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.fs_filetype.into();
        LittleEndian::write_u16(&mut out[2..4], self.fs_flags.bits());
        LittleEndian::write_u64(&mut out[8..16], self.fs_rights_base.bits());
        LittleEndian::write_u64(&mut out[16..24], self.fs_rights_inheriting.bits());
        out
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Preopentype {
    Dir = 0,
}

/// Information about a pre-opened capability, as returned by `fd_prestat_get`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Prestat {
    Dir { pr_name_len: u32 },
}

impl Prestat {
    pub const SIZE: usize = 8;

    pub fn pr_type(&self) -> Preopentype {
        match self {
            Prestat::Dir { .. } => Preopentype::Dir,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.pr_type().into();
        match self {
            Prestat::Dir { pr_name_len } => {
                LittleEndian::write_u32(&mut out[4..8], *pr_name_len);
            }
        }
        out
    }
}
