//! Macros to simplify some common WASI-specific tasks.

/// Like the `try!` macro or `?` syntax: returns the value if the computation
/// succeeded or returns the error value, mapped to an [`Errno`], otherwise.
///
/// The expression must produce a `Result<_, FsError>`.
///
/// [`Errno`]: wasi_vfs_types::Errno
macro_rules! wasi_try {
    ($expr:expr) => {{
        let res: Result<_, wasi_vfs_fs::FsError> = $expr;
        match res {
            Ok(val) => val,
            Err(err) => return Err($crate::state::fs_error_into_wasi_err(err)),
        }
    }};
    ($expr:expr; $e:expr) => {{
        let opt: Option<_> = $expr;
        match opt {
            Some(val) => val,
            None => return Err($e),
        }
    }};
}

/// Like [`wasi_try`] but for `std::io::Result`, which keeps the raw OS error
/// of host pass-through calls.
macro_rules! wasi_try_io {
    ($expr:expr) => {{
        let res: std::io::Result<_> = $expr;
        match res {
            Ok(val) => val,
            Err(err) => return Err($crate::state::io_error_into_wasi_err(err)),
        }
    }};
}
