use super::{WasiVfs, WasiVfsBuilder, WasiVfsCreationError};
use thiserror::Error;
use tracing::{debug, trace};
use wasi_vfs_fs::{ImageError, PackedImage};
use wasi_vfs_types::Errno;

/// Lifecycle of the filesystem of one guest instance.
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    /// The tree is built and the preopens are installed.
    Instantiated(WasiVfs),
    /// The guest has made at least one call.
    Running(WasiVfs),
    /// Every descriptor is gone and the overlay is discarded.
    TornDown,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("embedded image is corrupt")]
    CorruptImage(#[source] ImageError),
    #[error("unable to create the filesystem")]
    Creation(#[source] WasiVfsCreationError),
    #[error("session is {0}")]
    InvalidState(&'static str),
    #[error("unable to export the filesystem")]
    Export(#[source] ImageError),
}

impl From<WasiVfsCreationError> for SessionError {
    fn from(err: WasiVfsCreationError) -> Self {
        match err {
            WasiVfsCreationError::CorruptImage(source) => SessionError::CorruptImage(source),
            other => SessionError::Creation(other),
        }
    }
}

/// The filesystem session of a guest instance.
///
/// Every syscall goes through [`Session::call`]. Calls made before the
/// session is instantiated or after it is torn down fail with
/// [`Errno::Badf`].
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a session ready to serve calls. A corrupt image aborts the
    /// instantiation.
    pub fn instantiate(builder: &WasiVfsBuilder) -> Result<Self, SessionError> {
        let vfs = builder.build()?;
        debug!(preopens = vfs.fs.preopens().count(), "instantiated session");
        Ok(Self {
            state: SessionState::Instantiated(vfs),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }

    /// Runs one call against the filesystem.
    pub fn call<T>(&mut self, f: impl FnOnce(&mut WasiVfs) -> Result<T, Errno>) -> Result<T, Errno> {
        if let SessionState::Instantiated(_) = self.state {
            if let SessionState::Instantiated(vfs) = std::mem::take(&mut self.state) {
                trace!("session is running");
                self.state = SessionState::Running(vfs);
            }
        }
        match &mut self.state {
            SessionState::Running(vfs) => f(vfs),
            _ => Err(Errno::Badf),
        }
    }

    /// Destroys the instance's filesystem, discarding the overlay.
    pub fn teardown(&mut self) {
        self.state = SessionState::TornDown;
    }

    /// Destroys the instance's filesystem and returns the image with every
    /// change made during the session applied.
    pub fn teardown_and_export(&mut self) -> Result<PackedImage, SessionError> {
        let image = match &self.state {
            SessionState::Instantiated(vfs) | SessionState::Running(vfs) => {
                vfs.export().map_err(SessionError::Export)?
            }
            SessionState::Uninitialized => {
                return Err(SessionError::InvalidState("not instantiated"));
            }
            SessionState::TornDown => return Err(SessionError::InvalidState("torn down")),
        };
        self.teardown();
        Ok(image)
    }
}
