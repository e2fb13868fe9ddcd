#![deny(unused_mut)]
#![allow(clippy::identity_op)]

//! WASI `preview1` types used by the wasi-vfs engine.
//!
//! Values and memory layouts follow `wasi_snapshot_preview1` exactly, since
//! they are handed to unmodified guest code.

mod directory;
mod errno;
mod file;
mod rights;

pub use directory::*;
pub use errno::*;
pub use file::*;
pub use rights::*;

/// A guest-visible file descriptor.
pub type Fd = u32;
pub type Filesize = u64;
pub type Filedelta = i64;
pub type Timestamp = u64;
pub type Inode = u64;
pub type Device = u64;
pub type Linkcount = u64;
