#![deny(unused_mut)]
#![doc(html_favicon_url = "https://wasmer.io/images/icons/favicon-32x32.png")]
#![doc(html_logo_url = "https://github.com/wasmerio.png?size=200")]

//! WASI preview1 filesystem engine for modules that carry a packed
//! filesystem image.
//!
//! A guest instance sees one path namespace. Part of it is the packed image,
//! reproducible and embedded at build time; the rest are host directories
//! mapped in at instantiation. Every call in [`syscalls`] routes through the
//! [`fs::WasiFs`] of the instance, which resolves paths across both kinds of
//! mounts.
//!
//! ```no_run
//! use wasi_vfs::{Session, WasiVfsBuilder, syscalls};
//! use wasi_vfs_types::{Fdflags, Lookupflags, Oflags, Rights};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let image: Vec<u8> = Vec::new();
//! let mut session = Session::instantiate(&WasiVfsBuilder::new().image(image))?;
//! let content = session.call(|vfs| {
//!     let fd = syscalls::path_open(
//!         vfs,
//!         3,
//!         Lookupflags::empty(),
//!         "hello.txt",
//!         Oflags::empty(),
//!         Rights::FD_READ,
//!         Rights::empty(),
//!         Fdflags::empty(),
//!     )?;
//!     let mut buf = [0u8; 64];
//!     let n = syscalls::fd_read(vfs, fd, &mut [&mut buf[..]])?;
//!     syscalls::fd_close(vfs, fd)?;
//!     Ok(buf[..n].to_vec())
//! })?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;
pub mod fs;
mod state;
pub mod syscalls;

pub use crate::fs::{Cursor, MountError, WasiFs};
pub use crate::state::{
    PACKING_ENV, Session, SessionError, SessionState, WasiVfs, WasiVfsBuilder,
    WasiVfsCreationError, fs_error_into_wasi_err, io_error_into_wasi_err,
};
pub use wasi_vfs_fs::{ImageError, MergePolicy, PackedImage};
