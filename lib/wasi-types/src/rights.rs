use bitflags::bitflags;

bitflags! {
    /// File descriptor rights, determining which actions may be performed.
    pub struct Rights: u64 {
        const FD_DATASYNC = 1 << 0;
        const FD_READ = 1 << 1;
        const FD_SEEK = 1 << 2;
        const FD_FDSTAT_SET_FLAGS = 1 << 3;
        const FD_SYNC = 1 << 4;
        const FD_TELL = 1 << 5;
        const FD_WRITE = 1 << 6;
        const FD_ADVISE = 1 << 7;
        const FD_ALLOCATE = 1 << 8;
        const PATH_CREATE_DIRECTORY = 1 << 9;
        const PATH_CREATE_FILE = 1 << 10;
        const PATH_LINK_SOURCE = 1 << 11;
        const PATH_LINK_TARGET = 1 << 12;
        const PATH_OPEN = 1 << 13;
        const FD_READDIR = 1 << 14;
        const PATH_READLINK = 1 << 15;
        const PATH_RENAME_SOURCE = 1 << 16;
        const PATH_RENAME_TARGET = 1 << 17;
        const PATH_FILESTAT_GET = 1 << 18;
        const PATH_FILESTAT_SET_SIZE = 1 << 19;
        const PATH_FILESTAT_SET_TIMES = 1 << 20;
        const FD_FILESTAT_GET = 1 << 21;
        const FD_FILESTAT_SET_SIZE = 1 << 22;
        const FD_FILESTAT_SET_TIMES = 1 << 23;
        const PATH_SYMLINK = 1 << 24;
        const PATH_REMOVE_DIRECTORY = 1 << 25;
        const PATH_UNLINK_FILE = 1 << 26;
        const POLL_FD_READWRITE = 1 << 27;
        const SOCK_SHUTDOWN = 1 << 28;
    }
}

impl Rights {
    /// Rights of a descriptor that can only observe what it points at.
    pub const fn read_only() -> Self {
        Self::from_bits_truncate(
            Self::FD_READ.bits()
                | Self::FD_ADVISE.bits()
                | Self::PATH_OPEN.bits()
                | Self::FD_READDIR.bits()
                | Self::FD_FILESTAT_GET.bits(),
        )
    }

    /// Rights that only make sense on a regular file.
    pub const fn file_only() -> Self {
        Self::from_bits_truncate(
            Self::FD_DATASYNC.bits()
                | Self::FD_READ.bits()
                | Self::FD_SEEK.bits()
                | Self::FD_SYNC.bits()
                | Self::FD_TELL.bits()
                | Self::FD_WRITE.bits()
                | Self::FD_ADVISE.bits()
                | Self::FD_ALLOCATE.bits()
                | Self::FD_FILESTAT_SET_SIZE.bits()
                | Self::POLL_FD_READWRITE.bits(),
        )
    }

    /// Rights that mutate the object behind a descriptor.
    pub const fn write_like() -> Self {
        Self::from_bits_truncate(
            Self::FD_WRITE.bits()
                | Self::FD_ALLOCATE.bits()
                | Self::FD_DATASYNC.bits()
                | Self::FD_FILESTAT_SET_SIZE.bits()
                | Self::FD_FILESTAT_SET_TIMES.bits(),
        )
    }

    /// expects a single right, returns None if out of bounds or > 1 bit set
    pub fn to_str(self) -> Option<&'static str> {
        Some(match self {
            Rights::FD_DATASYNC => "Rights::FD_DATASYNC",
            Rights::FD_READ => "Rights::FD_READ",
            Rights::FD_SEEK => "Rights::FD_SEEK",
            Rights::FD_FDSTAT_SET_FLAGS => "Rights::FD_FDSTAT_SET_FLAGS",
            Rights::FD_SYNC => "Rights::FD_SYNC",
            Rights::FD_TELL => "Rights::FD_TELL",
            Rights::FD_WRITE => "Rights::FD_WRITE",
            Rights::FD_ADVISE => "Rights::FD_ADVISE",
            Rights::FD_ALLOCATE => "Rights::FD_ALLOCATE",
            Rights::PATH_CREATE_DIRECTORY => "Rights::PATH_CREATE_DIRECTORY",
            Rights::PATH_CREATE_FILE => "Rights::PATH_CREATE_FILE",
            Rights::PATH_LINK_SOURCE => "Rights::PATH_LINK_SOURCE",
            Rights::PATH_LINK_TARGET => "Rights::PATH_LINK_TARGET",
            Rights::PATH_OPEN => "Rights::PATH_OPEN",
            Rights::FD_READDIR => "Rights::FD_READDIR",
            Rights::PATH_READLINK => "Rights::PATH_READLINK",
            Rights::PATH_RENAME_SOURCE => "Rights::PATH_RENAME_SOURCE",
            Rights::PATH_RENAME_TARGET => "Rights::PATH_RENAME_TARGET",
            Rights::PATH_FILESTAT_GET => "Rights::PATH_FILESTAT_GET",
            Rights::PATH_FILESTAT_SET_SIZE => "Rights::PATH_FILESTAT_SET_SIZE",
            Rights::PATH_FILESTAT_SET_TIMES => "Rights::PATH_FILESTAT_SET_TIMES",
            Rights::FD_FILESTAT_GET => "Rights::FD_FILESTAT_GET",
            Rights::FD_FILESTAT_SET_SIZE => "Rights::FD_FILESTAT_SET_SIZE",
            Rights::FD_FILESTAT_SET_TIMES => "Rights::FD_FILESTAT_SET_TIMES",
            Rights::PATH_SYMLINK => "Rights::PATH_SYMLINK",
            Rights::PATH_REMOVE_DIRECTORY => "Rights::PATH_REMOVE_DIRECTORY",
            Rights::PATH_UNLINK_FILE => "Rights::PATH_UNLINK_FILE",
            Rights::POLL_FD_READWRITE => "Rights::POLL_FD_READWRITE",
            Rights::SOCK_SHUTDOWN => "Rights::SOCK_SHUTDOWN",
            _ => return None,
        })
    }

    /// Names of every right in the set, lowest bit first. Used in log records
    /// when a rights check fails.
    pub fn names(self) -> Vec<&'static str> {
        (0..u64::BITS)
            .filter_map(|i| Rights::from_bits(1 << i))
            .filter(|right| self.contains(*right))
            .filter_map(Rights::to_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_rights_cover_preview1_bits() {
        assert_eq!(Rights::all().bits(), 0x1FFF_FFFF);
        assert_eq!(Rights::read_only().bits(), 0x0020_6082);
    }

    #[test]
    fn names_lists_each_right_once() {
        let rights = Rights::FD_READ | Rights::PATH_OPEN;
        assert_eq!(rights.names(), vec!["Rights::FD_READ", "Rights::PATH_OPEN"]);
        assert_eq!((Rights::FD_READ | Rights::FD_WRITE).to_str(), None);
    }
}
