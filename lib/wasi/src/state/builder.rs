//! Builder system for configuring a [`WasiVfs`] and creating it.

use super::WasiVfs;
use crate::fs::{MountError, WasiFs};
use bytes::Bytes;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, instrument};
use wasi_vfs_fs::{
    FsError, HostDir, ImageError, MergePolicy, PackOptions, PackedImage, VirtualTree,
    normalize_guest_path, pack::VERBOSE_ENV,
};

/// Set by the packaging tool while it runs a module to scan its preopens.
pub const PACKING_ENV: &str = "__WASI_VFS_PACKING";

/// Builder API for configuring a [`WasiVfs`].
///
/// Usage:
/// ```no_run
/// # use wasi_vfs::{WasiVfs, WasiVfsCreationError};
/// # fn main() -> Result<(), WasiVfsCreationError> {
/// # let image: Vec<u8> = Vec::new();
/// let vfs = WasiVfs::builder()
///     .image(image)
///     .map_dir("/mnt", "path/on/host/fs")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct WasiVfsBuilder {
    image: Option<Bytes>,
    /// Host directories, in the order they become preopens.
    preopens: Vec<PreopenedDir>,
    verbose: bool,
    packing: bool,
    policy: MergePolicy,
}

/// A host directory and the guest path it is exposed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreopenedDir {
    pub(crate) path: PathBuf,
    pub(crate) guest_path: String,
}

/// Error type returned when bad data is given to [`WasiVfsBuilder`].
#[derive(Error, Debug)]
pub enum WasiVfsCreationError {
    #[error("mapped dir alias has wrong format: `{0}`")]
    MappedDirAliasFormattingError(String),
    #[error("preopened directory not found: `{0}`")]
    PreopenedDirectoryNotFound(PathBuf),
    #[error("preopened directory error: `{path}`: {source}")]
    PreopenedDirectoryError {
        path: PathBuf,
        #[source]
        source: FsError,
    },
    #[error("embedded image is corrupt")]
    CorruptImage(#[source] ImageError),
    #[error(transparent)]
    Mount(#[from] MountError),
}

fn validate_mapped_dir_alias(alias: &str) -> Result<String, WasiVfsCreationError> {
    if alias.contains('\0') {
        return Err(WasiVfsCreationError::MappedDirAliasFormattingError(
            format!("Alias \"{alias}\" contains a nul byte"),
        ));
    }
    if alias.contains("::") {
        return Err(WasiVfsCreationError::MappedDirAliasFormattingError(
            format!("Alias \"{alias}\" contains `::`"),
        ));
    }
    if !alias.starts_with('/') {
        return Err(WasiVfsCreationError::MappedDirAliasFormattingError(
            format!("Alias \"{alias}\" is not absolute"),
        ));
    }
    normalize_guest_path(alias)
        .map_err(|_| WasiVfsCreationError::MappedDirAliasFormattingError(alias.to_string()))
}

impl WasiVfsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `WASI_VFS_VERBOSE` and `__WASI_VFS_PACKING` from the process
    /// environment.
    pub fn from_env() -> Self {
        Self::new()
            .verbose(std::env::var(VERBOSE_ENV).is_ok_and(|value| value == "1"))
            .packing(std::env::var_os(PACKING_ENV).is_some())
    }

    /// The image embedded into the module. Without one the packed tree is
    /// empty.
    pub fn image(mut self, image: impl Into<Bytes>) -> Self {
        self.set_image(image);
        self
    }

    pub fn set_image(&mut self, image: impl Into<Bytes>) {
        self.image = Some(image.into());
    }

    /// Preopen a directory
    ///
    /// The directory is exposed at its own path, made absolute: `logs`
    /// becomes `/logs`.
    pub fn preopen_dir<P>(mut self, po_dir: P) -> Result<Self, WasiVfsCreationError>
    where
        P: AsRef<Path>,
    {
        self.add_preopen_dir(po_dir)?;
        Ok(self)
    }

    pub fn add_preopen_dir<P>(&mut self, po_dir: P) -> Result<(), WasiVfsCreationError>
    where
        P: AsRef<Path>,
    {
        let path = po_dir.as_ref();
        let alias = format!("/{}", path.to_string_lossy().trim_start_matches('/'));
        self.add_map_dir(&alias, path)
    }

    /// Preopen a directory with a different name exposed to the WASI.
    pub fn map_dir<P>(mut self, alias: &str, po_dir: P) -> Result<Self, WasiVfsCreationError>
    where
        P: AsRef<Path>,
    {
        self.add_map_dir(alias, po_dir)?;
        Ok(self)
    }

    pub fn add_map_dir<P>(&mut self, alias: &str, po_dir: P) -> Result<(), WasiVfsCreationError>
    where
        P: AsRef<Path>,
    {
        let guest_path = validate_mapped_dir_alias(alias)?;
        let path = po_dir.as_ref();
        if !path.exists() {
            return Err(WasiVfsCreationError::PreopenedDirectoryNotFound(
                path.to_path_buf(),
            ));
        }
        self.preopens.push(PreopenedDir {
            path: path.to_path_buf(),
            guest_path,
        });
        Ok(())
    }

    /// Preopen directories with a different names exposed to the WASI.
    pub fn map_dirs<I, P>(mut self, mapped_dirs: I) -> Result<Self, WasiVfsCreationError>
    where
        I: IntoIterator<Item = (String, P)>,
        P: AsRef<Path>,
    {
        for (alias, dir) in mapped_dirs {
            self.add_map_dir(&alias, dir)?;
        }
        Ok(self)
    }

    /// Log every packed file at `info` level when packing.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run as the packaging tool does: the image is not mounted and only the
    /// host preopens are visible.
    pub fn packing(mut self, packing: bool) -> Self {
        self.packing = packing;
        self
    }

    /// How packing treats guest paths the image already holds.
    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Decodes the image and installs the preopens: host directories first,
    /// in the order they were added, then the packed roots.
    ///
    /// A packed root at the same guest path as a host directory is not
    /// mounted.
    #[instrument(level = "debug", skip_all, fields(packing = self.packing), err)]
    pub fn build(&self) -> Result<WasiVfs, WasiVfsCreationError> {
        let image = match &self.image {
            Some(bytes) => PackedImage::decode(bytes.clone())
                .map_err(WasiVfsCreationError::CorruptImage)?,
            None => PackedImage::empty(),
        };
        let tree = VirtualTree::new(Arc::new(image));
        let roots = tree.roots().to_vec();
        let mut fs = WasiFs::new(tree);

        for preopen in &self.preopens {
            let dir = HostDir::new(&preopen.path).map_err(|source| {
                WasiVfsCreationError::PreopenedDirectoryError {
                    path: preopen.path.clone(),
                    source,
                }
            })?;
            fs.preopen_host_dir(&preopen.guest_path, dir)?;
        }

        if !self.packing {
            for root in roots {
                if fs.mounts.contains(&root.guest_path) {
                    debug!(guest_path = %root.guest_path, "packed root is shadowed by a host directory");
                    continue;
                }
                fs.preopen_virtual_dir(&root.guest_path, root.node)?;
            }
        }

        Ok(WasiVfs {
            fs,
            packing: self.packing,
            pack_options: PackOptions::default()
                .policy(self.policy)
                .verbose(self.verbose),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use wasi_vfs_fs::ImageBuilder;

    fn image() -> Vec<u8> {
        let mut builder = ImageBuilder::new();
        let root = builder.add_root("/", MergePolicy::Reject).unwrap();
        builder
            .add_file(root, "hello.txt", b"hello".to_vec(), false, MergePolicy::Reject)
            .unwrap();
        builder.add_root("/mnt", MergePolicy::Reject).unwrap();
        builder.build().encode()
    }

    fn preopen_paths(vfs: &WasiVfs) -> Vec<(u32, String)> {
        vfs.fs
            .preopens()
            .map(|(fd, entry)| (fd, entry.guest_path.clone()))
            .collect()
    }

    #[test]
    fn mapped_dir_alias_is_validated() {
        let temp = TempDir::new().unwrap();
        for alias in ["relative", "/a::b", "/nul\0"] {
            assert!(matches!(
                WasiVfsBuilder::new().map_dir(alias, temp.path()),
                Err(WasiVfsCreationError::MappedDirAliasFormattingError(_))
            ), "{alias:?} should be rejected");
        }
        assert!(matches!(
            WasiVfsBuilder::new().map_dir("/mnt", temp.path().join("missing")),
            Err(WasiVfsCreationError::PreopenedDirectoryNotFound(_))
        ));
    }

    #[test]
    fn host_preopens_come_first_and_shadow_packed_roots() {
        let temp = TempDir::new().unwrap();
        let vfs = WasiVfsBuilder::new()
            .image(image())
            .map_dir("/mnt/", temp.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            preopen_paths(&vfs),
            vec![(3, "/mnt".to_string()), (4, "/".to_string())]
        );
        assert!(vfs.fs.mounts.get("/mnt").unwrap().backing.is_host());
    }

    #[test]
    fn packing_mode_hides_the_image() {
        let temp = TempDir::new().unwrap();
        let vfs = WasiVfsBuilder::new()
            .image(image())
            .packing(true)
            .map_dir("/data", temp.path())
            .unwrap()
            .build()
            .unwrap();
        assert!(vfs.is_packing());
        assert_eq!(preopen_paths(&vfs), vec![(3, "/data".to_string())]);
    }

    #[test]
    fn corrupt_image_fails_the_build() {
        let mut bytes = image();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            WasiVfsBuilder::new().image(bytes).build(),
            Err(WasiVfsCreationError::CorruptImage(ImageError::CorruptImage { .. }))
        ));
    }
}
