//! Packed filesystem images and the per-instance tree built from them.

use std::io;
use thiserror::Error;

mod host_fs;
pub mod image;
pub mod pack;
mod tree;

pub use host_fs::{HostDir, HostDirEntry, HostFileType, HostMetadata, OpenOptionsConfig};
pub use image::{
    ImageBuilder, ImageError, MergePolicy, NodeId, NodeKind, PackedImage, PackedNode, PackedRoot,
    RootHandle, MAX_FILE_SIZE, guest_path_strip_prefix, normalize_guest_path,
};
pub use pack::{PackOptions, pack_dir, parse_dir_mapping, parse_map_dir};
pub use tree::{DirEntry, NodeStat, VirtualTree};

pub type Result<T> = std::result::Result<T, FsError>;

/// Error type for external users
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    /// A path component does not exist
    #[error("entity not found")]
    NoEntry,
    /// A path walked through something that is not a directory
    #[error("not a directory")]
    NotADirectory,
    /// The path cannot be walked, e.g. `..` above a packed root
    #[error("invalid path")]
    InvalidPath,
    /// The descriptor given was not usable
    #[error("invalid fd")]
    BadDescriptor,
    /// File exists
    #[error("file exists")]
    AlreadyExists,
    /// Expected a file but found not a file
    #[error("not a file")]
    NotAFile,
    /// Expected anything but a directory
    #[error("is a directory")]
    IsADirectory,
    /// Directory still has entries
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// The entry was packed read-only
    #[error("read-only entry")]
    ReadOnly,
    /// Caller was not allowed to perform this operation
    #[error("permission denied")]
    PermissionDenied,
    /// The path escapes the directory it is resolved against
    #[error("path escapes its capability")]
    NotCapable,
    /// The operation would move an entry between backings
    #[error("cross-device link")]
    CrossDevice,
    /// The file would grow past the largest size a file can have
    #[error("file too large")]
    FileTooLarge,
    /// The backing cannot perform the operation
    #[error("operation not supported")]
    Unsupported,
    /// Invalid internal data, if the argument data is invalid, use `InvalidInput`
    #[error("invalid internal data")]
    InvalidData,
    /// The provided data is invalid
    #[error("invalid input")]
    InvalidInput,
    /// Something failed when doing IO. These errors can generally not be handled.
    /// It may work if tried again.
    #[error("io error")]
    IOError,
    /// The operation was interrupted before it could finish
    #[error("operation interrupted")]
    Interrupted,
    /// Found EOF when EOF was not expected
    #[error("unexpected eof")]
    UnexpectedEof,
    /// Operation would block, this error lets the caller know that they can try again
    #[error("blocking operation. try again")]
    WouldBlock,
    /// A call to write returned 0
    #[error("write returned 0")]
    WriteZero,
    /// A host error with its raw OS error number, for errors the other
    /// variants cannot tell apart
    #[error("os error {0}")]
    Os(i32),
    /// Some other unhandled error. If you see this, it's probably a bug.
    #[error("unknown error found")]
    UnknownError,
}

impl From<io::Error> for FsError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists,
            io::ErrorKind::Interrupted => FsError::Interrupted,
            io::ErrorKind::InvalidInput => FsError::InvalidInput,
            io::ErrorKind::NotFound => FsError::NoEntry,
            io::ErrorKind::NotADirectory => FsError::NotADirectory,
            io::ErrorKind::IsADirectory => FsError::IsADirectory,
            io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty,
            io::ErrorKind::CrossesDevices => FsError::CrossDevice,
            io::ErrorKind::FileTooLarge => FsError::FileTooLarge,
            io::ErrorKind::WouldBlock => FsError::WouldBlock,
            // several host errors share the remaining kinds
            kind => match io_error.raw_os_error() {
                Some(code) => FsError::Os(code),
                None => match kind {
                    io::ErrorKind::InvalidData => FsError::InvalidData,
                    io::ErrorKind::ReadOnlyFilesystem => FsError::ReadOnly,
                    io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
                    io::ErrorKind::Unsupported => FsError::Unsupported,
                    io::ErrorKind::UnexpectedEof => FsError::UnexpectedEof,
                    io::ErrorKind::WriteZero => FsError::WriteZero,
                    io::ErrorKind::Other => FsError::IOError,
                    // if the following triggers, a new error type was added to this non-exhaustive enum
                    _ => FsError::UnknownError,
                },
            },
        }
    }
}
