//! Helpers dealing with the serial interface, the firmware file and the
//! mounted volumes.

mod firmware;
mod polling;
mod ports;
mod volumes;

pub use firmware::{is_uf2, FileCopier, FirmwareCopier, FirmwareImage, UF2_MAGIC_START0, UF2_MAGIC_START1};
pub use polling::{poll, CancelToken, Clock, PollWindow, SystemClock, Waited};
pub use ports::{
    find_matching, DeviceHandle, DeviceLocator, ResetOutcome, ResetTrigger, SerialPortLocator,
    SerialReset,
};
pub use volumes::{manual_recovery_hint, platform_lister, wait_for_bootloader, MountTable, VolumeLister};

#[cfg(test)]
pub(crate) use polling::tests::FakeClock;
