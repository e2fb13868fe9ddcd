//! Packing host directories into an image.
//!
//! The packaging tool embeds the result into a module; this module only knows
//! how to turn a host tree into [`ImageBuilder`] entries and how to parse the
//! tool's `--dir` / `--mapdir` arguments.

use crate::image::{ImageBuilder, ImageError, MAX_FILE_SIZE, MergePolicy, RootHandle};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Setting this variable to `1` logs every packed file at `info` level.
pub const VERBOSE_ENV: &str = "WASI_VFS_VERBOSE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackOptions {
    pub policy: MergePolicy,
    pub verbose: bool,
}

impl PackOptions {
    pub fn from_env() -> Self {
        Self {
            verbose: std::env::var(VERBOSE_ENV).is_ok_and(|value| value == "1"),
            ..Default::default()
        }
    }

    pub fn policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Adds `host_dir` and everything below it as a root at `guest_path`.
///
/// Entries are added sorted by file name. Symlinks, special files and files
/// of `u32::MAX` bytes or more are skipped. A packed file is read-only when
/// the host file is.
pub fn pack_dir(
    builder: &mut ImageBuilder,
    host_dir: &Path,
    guest_path: &str,
    options: &PackOptions,
) -> Result<RootHandle, ImageError> {
    let metadata = fs::metadata(host_dir).map_err(|source| ImageError::Io {
        path: host_dir.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ImageError::NotADirectory(host_dir.display().to_string()));
    }

    let root = builder.add_root(guest_path, options.policy)?;
    info!(host_dir = %host_dir.display(), guest_path, "packing directory");

    let walker = WalkDir::new(host_dir)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);
    for entry in walker {
        let entry = entry.map_err(|err| ImageError::Io {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| host_dir.to_path_buf()),
            source: io::Error::from(err),
        })?;
        let relative = relative_guest_path(host_dir, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            builder.add_dir(root, &relative, options.policy)?;
        } else if file_type.is_file() {
            let io_error = |source: io::Error| ImageError::Io {
                path: entry.path().to_path_buf(),
                source,
            };
            let metadata = entry.metadata().map_err(|err| io_error(io::Error::from(err)))?;
            if metadata.len() >= MAX_FILE_SIZE {
                warn!(
                    path = %entry.path().display(),
                    len = metadata.len(),
                    "skipping file too large to pack"
                );
                continue;
            }
            let content = fs::read(entry.path()).map_err(io_error)?;
            let read_only = metadata.permissions().readonly();
            if options.verbose {
                info!(path = %relative, len = content.len(), read_only, "packing file");
            } else {
                debug!(path = %relative, len = content.len(), read_only, "packing file");
            }
            builder.add_file(root, &relative, content, read_only, options.policy)?;
        } else {
            debug!(path = %entry.path().display(), "skipping symlink or special file");
        }
    }
    Ok(root)
}

fn relative_guest_path(base: &Path, path: &Path) -> Result<String, ImageError> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| ImageError::InvalidGuestPath(path.display().to_string()))?;
    let mut components = Vec::new();
    for component in relative.components() {
        let name = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ImageError::InvalidGuestPath(path.display().to_string()))?;
        components.push(name);
    }
    Ok(components.join("/"))
}

fn split_mapping(mapping: &str) -> Result<(&str, &str), ImageError> {
    let parts = mapping.split("::").collect::<Vec<_>>();
    match parts.as_slice() {
        [left, right] if !left.is_empty() && !right.is_empty() => Ok((left, right)),
        [_, _] => Err(ImageError::InvalidMapping {
            mapping: mapping.to_string(),
            reason: "both sides must be non-empty",
        }),
        _ => Err(ImageError::InvalidMapping {
            mapping: mapping.to_string(),
            reason: "must contain exactly one double colon ('::')",
        }),
    }
}

/// Parses `HOST_DIR::GUEST_DIR`, as given to `--dir`.
pub fn parse_dir_mapping(mapping: &str) -> Result<(PathBuf, String), ImageError> {
    let (host, guest) = split_mapping(mapping)?;
    Ok((PathBuf::from(host), guest.to_string()))
}

/// Parses the deprecated `GUEST_DIR::HOST_DIR` form, as given to `--mapdir`.
pub fn parse_map_dir(mapping: &str) -> Result<(PathBuf, String), ImageError> {
    let (guest, host) = split_mapping(mapping)?;
    warn!("--mapdir GUEST_DIR::HOST_DIR is deprecated, use --dir HOST_DIR::GUEST_DIR instead");
    Ok((PathBuf::from(host), guest.to_string()))
}
