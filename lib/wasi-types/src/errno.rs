use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Error codes returned by functions.
///
/// Not all of these error codes are returned by the functions provided by this
/// API; some are used in higher-level library layers, and others are provided
/// merely for alignment with POSIX.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum Errno {
    /// No error occurred. System call completed successfully.
    #[error("no error occurred. System call completed successfully")]
    Success = 0,
    /// Argument list too long.
    #[error("argument list too long")]
    Toobig = 1,
    /// Permission denied.
    #[error("permission denied")]
    Access = 2,
    /// Address in use.
    #[error("address in use")]
    Addrinuse = 3,
    /// Address not available.
    #[error("address not available")]
    Addrnotavail = 4,
    /// Address family not supported.
    #[error("address family not supported")]
    Afnosupport = 5,
    /// Resource unavailable, or operation would block.
    #[error("resource unavailable, or operation would block")]
    Again = 6,
    /// Connection already in progress.
    #[error("connection already in progress")]
    Already = 7,
    /// Bad file descriptor.
    #[error("bad file descriptor")]
    Badf = 8,
    /// Bad message.
    #[error("bad message")]
    Badmsg = 9,
    /// Device or resource busy.
    #[error("device or resource busy")]
    Busy = 10,
    /// Operation canceled.
    #[error("operation canceled")]
    Canceled = 11,
    /// No child processes.
    #[error("no child processes")]
    Child = 12,
    /// Connection aborted.
    #[error("connection aborted")]
    Connaborted = 13,
    /// Connection refused.
    #[error("connection refused")]
    Connrefused = 14,
    /// Connection reset.
    #[error("connection reset")]
    Connreset = 15,
    /// Resource deadlock would occur.
    #[error("resource deadlock would occur")]
    Deadlk = 16,
    /// Destination address required.
    #[error("destination address required")]
    Destaddrreq = 17,
    /// Mathematics argument out of domain of function.
    #[error("mathematics argument out of domain of function")]
    Dom = 18,
    /// Reserved.
    #[error("reserved")]
    Dquot = 19,
    /// File exists.
    #[error("file exists")]
    Exist = 20,
    /// Bad address.
    #[error("bad address")]
    Fault = 21,
    /// File too large.
    #[error("file too large")]
    Fbig = 22,
    /// Host is unreachable.
    #[error("host is unreachable")]
    Hostunreach = 23,
    /// Identifier removed.
    #[error("identifier removed")]
    Idrm = 24,
    /// Illegal byte sequence.
    #[error("illegal byte sequence")]
    Ilseq = 25,
    /// Operation in progress.
    #[error("operation in progress")]
    Inprogress = 26,
    /// Interrupted function.
    #[error("interrupted function")]
    Intr = 27,
    /// Invalid argument.
    #[error("invalid argument")]
    Inval = 28,
    /// I/O error.
    #[error("i/O error")]
    Io = 29,
    /// Socket is connected.
    #[error("socket is connected")]
    Isconn = 30,
    /// Is a directory.
    #[error("is a directory")]
    Isdir = 31,
    /// Too many levels of symbolic links.
    #[error("too many levels of symbolic links")]
    Loop = 32,
    /// File descriptor value too large.
    #[error("file descriptor value too large")]
    Mfile = 33,
    /// Too many links.
    #[error("too many links")]
    Mlink = 34,
    /// Message too large.
    #[error("message too large")]
    Msgsize = 35,
    /// Reserved.
    #[error("reserved")]
    Multihop = 36,
    /// Filename too long.
    #[error("filename too long")]
    Nametoolong = 37,
    /// Network is down.
    #[error("network is down")]
    Netdown = 38,
    /// Connection aborted by network.
    #[error("connection aborted by network")]
    Netreset = 39,
    /// Network unreachable.
    #[error("network unreachable")]
    Netunreach = 40,
    /// Too many files open in system.
    #[error("too many files open in system")]
    Nfile = 41,
    /// No buffer space available.
    #[error("no buffer space available")]
    Nobufs = 42,
    /// No such device.
    #[error("no such device")]
    Nodev = 43,
    /// No such file or directory.
    #[error("no such file or directory")]
    Noent = 44,
    /// Executable file format error.
    #[error("executable file format error")]
    Noexec = 45,
    /// No locks available.
    #[error("no locks available")]
    Nolck = 46,
    /// Reserved.
    #[error("reserved")]
    Nolink = 47,
    /// Not enough space.
    #[error("not enough space")]
    Nomem = 48,
    /// No message of the desired type.
    #[error("no message of the desired type")]
    Nomsg = 49,
    /// Protocol not available.
    #[error("protocol not available")]
    Noprotoopt = 50,
    /// No space left on device.
    #[error("no space left on device")]
    Nospc = 51,
    /// Function not supported.
    #[error("function not supported")]
    Nosys = 52,
    /// The socket is not connected.
    #[error("the socket is not connected")]
    Notconn = 53,
    /// Not a directory or a symbolic link to a directory.
    #[error("not a directory or a symbolic link to a directory")]
    Notdir = 54,
    /// Directory not empty.
    #[error("directory not empty")]
    Notempty = 55,
    /// State not recoverable.
    #[error("state not recoverable")]
    Notrecoverable = 56,
    /// Not a socket.
    #[error("not a socket")]
    Notsock = 57,
    /// Not supported, or operation not supported on socket.
    #[error("not supported, or operation not supported on socket")]
    Notsup = 58,
    /// Inappropriate I/O control operation.
    #[error("inappropriate I/O control operation")]
    Notty = 59,
    /// No such device or address.
    #[error("no such device or address")]
    Nxio = 60,
    /// Value too large to be stored in data type.
    #[error("value too large to be stored in data type")]
    Overflow = 61,
    /// Previous owner died.
    #[error("previous owner died")]
    Ownerdead = 62,
    /// Operation not permitted.
    #[error("operation not permitted")]
    Perm = 63,
    /// Broken pipe.
    #[error("broken pipe")]
    Pipe = 64,
    /// Protocol error.
    #[error("protocol error")]
    Proto = 65,
    /// Protocol not supported.
    #[error("protocol not supported")]
    Protonosupport = 66,
    /// Protocol wrong type for socket.
    #[error("protocol wrong type for socket")]
    Prototype = 67,
    /// Result too large.
    #[error("result too large")]
    Range = 68,
    /// Read-only file system.
    #[error("read-only file system")]
    Rofs = 69,
    /// Invalid seek.
    #[error("invalid seek")]
    Spipe = 70,
    /// No such process.
    #[error("no such process")]
    Srch = 71,
    /// Reserved.
    #[error("reserved")]
    Stale = 72,
    /// Connection timed out.
    #[error("connection timed out")]
    Timedout = 73,
    /// Text file busy.
    #[error("text file busy")]
    Txtbsy = 74,
    /// Cross-device link.
    #[error("cross-device link")]
    Xdev = 75,
    /// Extension: Capabilities insufficient.
    #[error("extension: Capabilities insufficient")]
    Notcapable = 76,
}

impl Errno {
    /// The raw value handed back to the guest.
    pub fn raw(self) -> u16 {
        self.into()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Toobig => "TOOBIG",
            Self::Access => "ACCESS",
            Self::Addrinuse => "ADDRINUSE",
            Self::Addrnotavail => "ADDRNOTAVAIL",
            Self::Afnosupport => "AFNOSUPPORT",
            Self::Again => "AGAIN",
            Self::Already => "ALREADY",
            Self::Badf => "BADF",
            Self::Badmsg => "BADMSG",
            Self::Busy => "BUSY",
            Self::Canceled => "CANCELED",
            Self::Child => "CHILD",
            Self::Connaborted => "CONNABORTED",
            Self::Connrefused => "CONNREFUSED",
            Self::Connreset => "CONNRESET",
            Self::Deadlk => "DEADLK",
            Self::Destaddrreq => "DESTADDRREQ",
            Self::Dom => "DOM",
            Self::Dquot => "DQUOT",
            Self::Exist => "EXIST",
            Self::Fault => "FAULT",
            Self::Fbig => "FBIG",
            Self::Hostunreach => "HOSTUNREACH",
            Self::Idrm => "IDRM",
            Self::Ilseq => "ILSEQ",
            Self::Inprogress => "INPROGRESS",
            Self::Intr => "INTR",
            Self::Inval => "INVAL",
            Self::Io => "IO",
            Self::Isconn => "ISCONN",
            Self::Isdir => "ISDIR",
            Self::Loop => "LOOP",
            Self::Mfile => "MFILE",
            Self::Mlink => "MLINK",
            Self::Msgsize => "MSGSIZE",
            Self::Multihop => "MULTIHOP",
            Self::Nametoolong => "NAMETOOLONG",
            Self::Netdown => "NETDOWN",
            Self::Netreset => "NETRESET",
            Self::Netunreach => "NETUNREACH",
            Self::Nfile => "NFILE",
            Self::Nobufs => "NOBUFS",
            Self::Nodev => "NODEV",
            Self::Noent => "NOENT",
            Self::Noexec => "NOEXEC",
            Self::Nolck => "NOLCK",
            Self::Nolink => "NOLINK",
            Self::Nomem => "NOMEM",
            Self::Nomsg => "NOMSG",
            Self::Noprotoopt => "NOPROTOOPT",
            Self::Nospc => "NOSPC",
            Self::Nosys => "NOSYS",
            Self::Notconn => "NOTCONN",
            Self::Notdir => "NOTDIR",
            Self::Notempty => "NOTEMPTY",
            Self::Notrecoverable => "NOTRECOVERABLE",
            Self::Notsock => "NOTSOCK",
            Self::Notsup => "NOTSUP",
            Self::Notty => "NOTTY",
            Self::Nxio => "NXIO",
            Self::Overflow => "OVERFLOW",
            Self::Ownerdead => "OWNERDEAD",
            Self::Perm => "PERM",
            Self::Pipe => "PIPE",
            Self::Proto => "PROTO",
            Self::Protonosupport => "PROTONOSUPPORT",
            Self::Prototype => "PROTOTYPE",
            Self::Range => "RANGE",
            Self::Rofs => "ROFS",
            Self::Spipe => "SPIPE",
            Self::Srch => "SRCH",
            Self::Stale => "STALE",
            Self::Timedout => "TIMEDOUT",
            Self::Txtbsy => "TXTBSY",
            Self::Xdev => "XDEV",
            Self::Notcapable => "NOTCAPABLE",
        }
    }
}

impl From<Errno> for u32 {
    fn from(errno: Errno) -> u32 {
        errno.raw() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn errno_values_match_preview1() {
        assert_eq!(Errno::Success.raw(), 0);
        assert_eq!(Errno::Access.raw(), 2);
        assert_eq!(Errno::Badf.raw(), 8);
        assert_eq!(Errno::Exist.raw(), 20);
        assert_eq!(Errno::Inval.raw(), 28);
        assert_eq!(Errno::Io.raw(), 29);
        assert_eq!(Errno::Isdir.raw(), 31);
        assert_eq!(Errno::Nametoolong.raw(), 37);
        assert_eq!(Errno::Noent.raw(), 44);
        assert_eq!(Errno::Nosys.raw(), 52);
        assert_eq!(Errno::Notdir.raw(), 54);
        assert_eq!(Errno::Notempty.raw(), 55);
        assert_eq!(Errno::Notsup.raw(), 58);
        assert_eq!(Errno::Spipe.raw(), 70);
        assert_eq!(Errno::Xdev.raw(), 75);
        assert_eq!(Errno::Notcapable.raw(), 76);
    }

    #[test]
    fn errno_from_raw() {
        assert_eq!(Errno::try_from(44u16).ok(), Some(Errno::Noent));
        assert!(Errno::try_from(77u16).is_err());
        assert_eq!(Errno::Noent.name(), "NOENT");
        assert_eq!(Errno::Noent.to_string(), "no such file or directory");
    }
}
