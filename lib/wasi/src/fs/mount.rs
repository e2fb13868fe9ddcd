//! Guest-visible mount points and the backing each one routes to.

use thiserror::Error;
use tracing::trace;
use wasi_vfs_fs::{HostDir, NodeId, guest_path_strip_prefix, normalize_guest_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountBacking {
    /// A root of the packed tree.
    Virtual(NodeId),
    /// A real host directory.
    Host(HostDir),
}

impl MountBacking {
    pub fn is_host(&self) -> bool {
        matches!(self, MountBacking::Host(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub guest_path: String,
    pub backing: MountBacking,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MountError {
    #[error("guest path `{0}` is already mounted")]
    DuplicateGuestPath(String),
    #[error("guest path `{0}` must be absolute and stay below `/`")]
    InvalidGuestPath(String),
}

/// Mount points in installation order.
#[derive(Debug, Default, Clone)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, guest_path: &str, backing: MountBacking) -> Result<(), MountError> {
        let guest_path = normalize_guest_path(guest_path)
            .map_err(|_| MountError::InvalidGuestPath(guest_path.to_string()))?;
        if self.get(&guest_path).is_some() {
            return Err(MountError::DuplicateGuestPath(guest_path));
        }
        trace!(%guest_path, host = backing.is_host(), "mounting");
        self.entries.push(MountEntry {
            guest_path,
            backing,
        });
        Ok(())
    }

    /// The entry mounted exactly at `guest_path`.
    pub fn get(&self, guest_path: &str) -> Option<&MountEntry> {
        let guest_path = normalize_guest_path(guest_path).ok()?;
        self.entries
            .iter()
            .find(|entry| entry.guest_path == guest_path)
    }

    pub fn contains(&self, guest_path: &str) -> bool {
        self.get(guest_path).is_some()
    }

    /// The entry whose guest path is the longest component-wise prefix of
    /// `path`, along with the remainder of `path` below it.
    pub fn route<'a>(&self, path: &'a str) -> Option<(&MountEntry, &'a str)> {
        self.entries
            .iter()
            .filter_map(|entry| {
                guest_path_strip_prefix(path, &entry.guest_path).map(|rest| (entry, rest))
            })
            .max_by_key(|(entry, _)| entry.guest_path.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
