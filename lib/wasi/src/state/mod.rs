//! WASI VFS state, one per guest instance.
//!
//! A [`WasiVfs`] is created with a [`WasiVfsBuilder`] and owns everything a
//! guest instance can reach: the packed tree with its overlay, the mount
//! table and the descriptor table. The only thing shared between instances is
//! the immutable packed image.

mod builder;
mod session;
mod types;

pub use self::builder::*;
pub use self::session::*;
pub use self::types::*;

use crate::fs::WasiFs;
use tracing::{debug, instrument};
use wasi_vfs_fs::{ImageBuilder, ImageError, PackOptions, PackedImage, pack_dir};

#[derive(Debug)]
pub struct WasiVfs {
    pub fs: WasiFs,
    packing: bool,
    pack_options: PackOptions,
}

impl WasiVfs {
    pub fn builder() -> WasiVfsBuilder {
        WasiVfsBuilder::new()
    }

    /// Whether this instance runs under the packaging tool. The packed image
    /// is not mounted then and every call passes through to the host.
    pub fn is_packing(&self) -> bool {
        self.packing
    }

    /// Packs every host preopen into an image, on top of the image this
    /// instance was created with.
    ///
    /// Host preopens keep their guest paths. Whether a guest path that the
    /// image already holds is replaced or rejected is decided by the merge
    /// policy of the builder.
    #[instrument(level = "debug", skip_all, err)]
    pub fn pack(&self) -> Result<PackedImage, ImageError> {
        let mut builder = ImageBuilder::from_image(self.fs.tree.image());
        for entry in self.fs.mounts.iter() {
            if let crate::fs::MountBacking::Host(dir) = &entry.backing {
                debug!(guest_path = %entry.guest_path, host = %dir.root().display(), "packing preopen");
                pack_dir(&mut builder, dir.root(), &entry.guest_path, &self.pack_options)?;
            }
        }
        Ok(builder.build())
    }

    /// The packed image with every change made by this instance applied.
    pub fn export(&self) -> Result<PackedImage, ImageError> {
        self.fs.tree.export()
    }
}
