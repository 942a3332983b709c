//! `uf2reset` resets a USB attached microcontroller into its UF2 bootloader
//! and, optionally, flashes a new firmware image onto it.
//!
//! The device exposes a serial interface identified by a USB vendor/product id
//! pair. Opening that interface at 1200 baud asks the firmware to reboot into
//! its bootloader, which then shows up as a removable mass-storage volume
//! carrying an `INFO_UF2.TXT` file. Copying a UF2 image onto that volume
//! completes the update.
//!
//! A run is a session implemented as a state machine, in terms of **states**
//! and **transitions** between them with the following characteristics:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * The settings are shared between **all** states.
//! * Transitions between states are triggered via typed **events** and follow
//!   defined semantics.
//! * Only explicitly defined transitions are permitted, as many errors as
//!   possible being detected at **compile-time**.
//! * Transitioning from one state to another consumes the original state.
//! * Data is transferred from one state to the next by attaching it to the
//!   transition event.
//!
//! The implementation of state transitions leverages `rust`'s `From` and `Into`
//! pattern: only transitions for which the `From` trait is implemented are
//! authorized.
//!
//! Everything the session talks to (serial ports, mounted volumes, the file
//! system, time and the presentation layer) sits behind a trait gathered in an
//! [`Environment`], so that sessions can run against fakes as well as against
//! the real [`System`].

mod error;
mod report;
mod session;
mod settings;
mod utils;

pub use error::{Error, Result};
pub use report::{Reporter, Status};
pub use session::{factory, Environment, Outcome, Session, System};
pub use settings::{
    parse_usb_id, Settings, SettingsBuilder, TargetIdentity, BOOTLOADER_MARKER, DEFAULT_PRODUCT_ID,
    DEFAULT_VENDOR_ID, RESET_BAUD_RATE,
};
pub use utils::{
    find_matching, is_uf2, manual_recovery_hint, platform_lister, poll, wait_for_bootloader,
    CancelToken, Clock, DeviceHandle, DeviceLocator, FileCopier, FirmwareCopier, FirmwareImage,
    MountTable, PollWindow, ResetOutcome, ResetTrigger, SerialPortLocator, SerialReset,
    SystemClock, VolumeLister, Waited, UF2_MAGIC_START0, UF2_MAGIC_START1,
};
