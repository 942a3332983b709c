//! Errors ending a reset/flash session.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::settings::TargetIdentity;

/// Unrecoverable conditions of a session. All of them are handed back to the
/// caller in [`Outcome::Failed`](crate::Outcome::Failed); none is raised past
/// the session boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// The firmware file does not start with the UF2 magic words.
    #[error("`{path}` is not a valid UF2 file")]
    InvalidFirmwareHeader { path: PathBuf },

    /// The firmware file could not be opened or is shorter than its header.
    #[error("cannot access UF2 file `{path}`")]
    FirmwareUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No mounted-volume enumeration exists for this operating system.
    #[error("UF2 flashing is not supported on this platform")]
    UnsupportedPlatform,

    /// No bootloader volume showed up within the poll window.
    #[error("UF2 bootloader not found after {waited:?}")]
    BootloaderTimeout { waited: Duration },

    /// Copying the image onto the bootloader volume failed.
    #[error("UF2 flashing failed while writing `{target}`")]
    CopyFailed {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No matching device was attached and waiting was disabled.
    #[error("no compatible device found ({target})")]
    DeviceNotFound { target: TargetIdentity },
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;
