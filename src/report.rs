//! Progress notifications emitted by a session.
//!
//! The session never prints anything itself. It hands structured [`Status`]
//! values to a [`Reporter`] and leaves colors, emoji and spinners to it.

use std::path::Path;

use crate::{
    settings::TargetIdentity,
    utils::{DeviceHandle, FirmwareImage, ResetOutcome},
};

/// Milestones of a reset/flash session, in the order they can happen.
#[derive(Debug)]
pub enum Status<'a> {
    /// The firmware file carries the UF2 signature.
    ImageValidated(&'a FirmwareImage),
    /// The device was not attached on the first lookup; polling starts.
    WaitingForDevice(TargetIdentity),
    /// The reset interface was found, either right away or after waiting.
    DeviceFound {
        device: &'a DeviceHandle,
        after_waiting: bool,
    },
    /// The reset was requested. Informational only.
    ResetRequested(&'a ResetOutcome),
    /// Polling the mounted volumes for the bootloader starts.
    WaitingForBootloader,
    /// A volume carrying the bootloader marker was found.
    BootloaderFound(&'a Path),
    /// The image was written to the given file on the bootloader volume.
    Flashed(&'a Path),
}

/// Receives the [`Status`] notifications of a session.
pub trait Reporter {
    fn report(&self, status: Status<'_>);
}
