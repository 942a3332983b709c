//! Events for the session state machine.
//!
//! This module is private and restricted to the [`session`](crate::session)
//! scope. Each event carries the settings plus whatever the next state needs
//! from the previous one.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::path::PathBuf;

use crate::{
    error::Error,
    settings::Settings,
    utils::{DeviceHandle, FirmwareImage},
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

// ValidateImageEvent ==========================================================

/// Event fired from [`IdleState`](super::states::IdleState) when a firmware
/// path was given. Triggers the transition to `ValidatingImageState`.
#[derive(Debug)]
pub(crate) struct ValidateImageEvent {
    pub settings: Settings,
    pub path: PathBuf,
}

// SearchDeviceEvent ===========================================================

/// Event fired to start looking for the reset interface.
///
/// This event can happen under one of the following circumstances:
///
///  1. While at the `IdleState` when no firmware was given.
///  2. While at the `ValidatingImageState` after the image passed validation.
#[derive(Debug)]
pub(crate) struct SearchDeviceEvent {
    pub settings: Settings,
    /// The validated image, carried along until the flashing step.
    pub image: Option<FirmwareImage>,
}

// DeviceFoundEvent ============================================================

#[derive(Debug)]
pub(crate) struct DeviceFoundEvent {
    pub settings: Settings,
    pub image: Option<FirmwareImage>,
    pub device: DeviceHandle,
    /// `false` when the device was attached at the first lookup.
    pub after_waiting: bool,
}

// ResetEvent ==================================================================

#[derive(Debug)]
pub(crate) struct ResetEvent {
    pub settings: Settings,
    pub image: Option<FirmwareImage>,
    pub device: DeviceHandle,
}

// WaitBootloaderEvent =========================================================

/// Event fired after the reset request when there is an image to flash.
#[derive(Debug)]
pub(crate) struct WaitBootloaderEvent {
    pub settings: Settings,
    pub image: FirmwareImage,
}

// FlashEvent ==================================================================

#[derive(Debug)]
pub(crate) struct FlashEvent {
    pub settings: Settings,
    pub image: FirmwareImage,
    /// Root of the bootloader volume.
    pub volume: PathBuf,
}

// DoneEvent ===================================================================

/// Event fired when the session completed normally.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub settings: Settings,
}

// FailEvent ===================================================================

/// Event fired from any state on an unrecoverable condition.
#[derive(Debug)]
pub(crate) struct FailEvent {
    pub settings: Settings,
    pub error: Error,
}

// AbortEvent ==================================================================

/// Event fired when cancellation was requested from outside, observed at a
/// suspension point or between two states.
#[derive(Debug)]
pub(crate) struct AbortEvent {
    pub settings: Settings,
}

// Events enum ==================================================================

/// Events that can be triggered within the session state machine.
///
/// Each possible value holds an `event`, which in turn may hold additional data
/// for the state transition.
#[derive(Debug)]
pub(crate) enum Event {
    ValidateImage(ValidateImageEvent),
    SearchDevice(SearchDeviceEvent),
    DeviceFound(DeviceFoundEvent),
    Reset(ResetEvent),
    WaitBootloader(WaitBootloaderEvent),
    Flash(FlashEvent),
    Done(DoneEvent),
    Fail(FailEvent),
    Abort(AbortEvent),
}
