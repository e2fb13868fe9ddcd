//! Pass-through access to a host directory granted as a preopen.
//!
//! Every path handed to a [`HostDir`] is relative to its root. Paths are
//! normalized lexically and may not climb above the root.

use crate::{FsError, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptionsConfig {
    pub read: bool,
    pub write: bool,
    pub create_new: bool,
    pub create: bool,
    pub append: bool,
    pub truncate: bool,
}

impl OpenOptionsConfig {
    pub const fn read(&self) -> bool {
        self.read
    }

    pub const fn write(&self) -> bool {
        self.write
    }

    pub const fn create_new(&self) -> bool {
        self.create_new
    }

    pub const fn create(&self) -> bool {
        self.create
    }

    pub const fn append(&self) -> bool {
        self.append
    }

    pub const fn truncate(&self) -> bool {
        self.truncate
    }

    fn to_open_options(&self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        options
            .read(self.read)
            // `append` implies write access on every platform
            .write(self.write && !self.append)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFileType {
    Directory,
    RegularFile,
    Symlink,
    Other,
}

impl From<fs::FileType> for HostFileType {
    fn from(file_type: fs::FileType) -> Self {
        if file_type.is_dir() {
            HostFileType::Directory
        } else if file_type.is_file() {
            HostFileType::RegularFile
        } else if file_type.is_symlink() {
            HostFileType::Symlink
        } else {
            HostFileType::Other
        }
    }
}

/// Host metadata, with times in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostMetadata {
    pub dev: u64,
    pub ino: u64,
    pub file_type: HostFileType,
    pub nlink: u64,
    pub len: u64,
    pub accessed: u64,
    pub modified: u64,
    pub created: u64,
    pub read_only: bool,
}

fn nanos_since_epoch(time: io::Result<SystemTime>) -> u64 {
    time.and_then(|time| time.duration_since(UNIX_EPOCH).map_err(io::Error::other))
        .map_or(0, |time| time.as_nanos() as u64)
}

impl From<fs::Metadata> for HostMetadata {
    fn from(metadata: fs::Metadata) -> Self {
        let (dev, ino, nlink) = {
            #[cfg(unix)]
            {
                use std::os::unix::fs::MetadataExt;
                (metadata.dev(), metadata.ino(), metadata.nlink())
            }
            #[cfg(not(unix))]
            {
                (0, 0, 1)
            }
        };
        HostMetadata {
            dev,
            ino,
            file_type: metadata.file_type().into(),
            nlink,
            len: metadata.len(),
            accessed: nanos_since_epoch(metadata.accessed()),
            modified: nanos_since_epoch(metadata.modified()),
            created: nanos_since_epoch(metadata.created()),
            read_only: metadata.permissions().readonly(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDirEntry {
    pub name: String,
    pub ino: u64,
    pub file_type: HostFileType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDir {
    root: PathBuf,
}

impl HostDir {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(FsError::NoEntry);
        }
        let root = dunce::canonicalize(root)?;
        if !root.is_dir() {
            return Err(FsError::NotADirectory);
        }
        Ok(HostDir { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins a relative path onto the root.
    ///
    /// Fails with [`FsError::NotCapable`] for absolute paths and for paths
    /// whose `..` components climb above the root.
    pub fn prepare_path(&self, path: &Path) -> Result<PathBuf> {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Prefix(..) | Component::RootDir => return Err(FsError::NotCapable),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(FsError::NotCapable);
                    }
                }
                Component::Normal(name) => normalized.push(name),
            }
        }
        Ok(self.root.join(normalized))
    }

    pub fn open(&self, path: &Path, conf: &OpenOptionsConfig) -> Result<fs::File> {
        let path = self.prepare_path(path)?;
        trace!(path = %path.display(), ?conf, "opening host file");
        if path.is_dir() && (conf.write() || conf.append() || conf.truncate()) {
            return Err(FsError::IsADirectory);
        }
        conf.to_open_options().open(path).map_err(Into::into)
    }

    pub fn metadata(&self, path: &Path) -> Result<HostMetadata> {
        let path = self.prepare_path(path)?;
        fs::metadata(path).map(Into::into).map_err(Into::into)
    }

    pub fn symlink_metadata(&self, path: &Path) -> Result<HostMetadata> {
        let path = self.prepare_path(path)?;
        fs::symlink_metadata(path)
            .map(Into::into)
            .map_err(Into::into)
    }

    /// Entries of a directory, sorted by name. `.` and `..` are not included.
    pub fn read_dir(&self, path: &Path) -> Result<Vec<HostDirEntry>> {
        let path = self.prepare_path(path)?;
        let mut entries = fs::read_dir(path)?
            .map(|entry| {
                let entry = entry?;
                let metadata: HostMetadata = entry.metadata()?.into();
                Ok(HostDirEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    ino: metadata.ino,
                    file_type: entry.file_type()?.into(),
                })
            })
            .collect::<std::result::Result<Vec<HostDirEntry>, io::Error>>()?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub fn create_dir(&self, path: &Path) -> Result<()> {
        let path = self.prepare_path(path)?;
        if path == self.root {
            return Err(FsError::AlreadyExists);
        }
        fs::create_dir(path).map_err(Into::into)
    }

    pub fn remove_dir(&self, path: &Path) -> Result<()> {
        let path = self.prepare_path(path)?;
        if path == self.root {
            return Err(FsError::PermissionDenied);
        }
        if !path.is_dir() {
            return Err(if path.exists() {
                FsError::NotADirectory
            } else {
                FsError::NoEntry
            });
        }
        // https://github.com/rust-lang/rust/issues/86442
        // DirectoryNotEmpty is not implemented consistently
        if fs::read_dir(&path)?.next().is_some() {
            return Err(FsError::DirectoryNotEmpty);
        }
        fs::remove_dir(path).map_err(Into::into)
    }

    pub fn remove_file(&self, path: &Path) -> Result<()> {
        let path = self.prepare_path(path)?;
        if path.is_dir() {
            return Err(FsError::IsADirectory);
        }
        fs::remove_file(path).map_err(Into::into)
    }

    pub fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.prepare_path(from)?;
        let to = self.prepare_path(to)?;
        if from == self.root || to == self.root {
            return Err(FsError::PermissionDenied);
        }
        fs::rename(from, to).map_err(Into::into)
    }

    pub fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let path = self.prepare_path(path)?;
        fs::read_link(path).map_err(Into::into)
    }

    pub fn hard_link(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.prepare_path(from)?;
        let to = self.prepare_path(to)?;
        if from.is_dir() {
            return Err(FsError::PermissionDenied);
        }
        fs::hard_link(from, to).map_err(Into::into)
    }
}
