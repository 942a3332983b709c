//! States for the session state machine.
//!
//! This module is private and restricted to the [`session`](crate::session)
//! scope. The public interface of the session is provided by
//! [`session`](crate::session).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::path::PathBuf;

use log::{info, warn};

use super::{environment::Environment, events::*};
use crate::{
    error::Error,
    report::Status,
    settings::Settings,
    utils::{poll, wait_for_bootloader, DeviceHandle, FirmwareImage, PollWindow, ResetOutcome, Waited},
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state does its work against the `env`
    /// collaborators and, when finished, requests the transition to a new
    /// state by returning the appropriate `event`. The `event` is then consumed
    /// to create the new `state` using the corresponding `From` trait
    /// implementation.
    fn run(&mut self, settings: &Settings, env: &Environment<'_>) -> Event;
}

fn fail(settings: &Settings, error: Error) -> Event {
    Event::Fail(FailEvent {
        settings: settings.clone(),
        error,
    })
}

// Idle State ==================================================================

/// The initial state of the session.
///
///  * **`ValidateImageEvent` => `ValidatingImageState`** when a firmware path
///    was provided in the settings,
///  * **`SearchDeviceEvent` => `SearchingDeviceState`** otherwise.
#[derive(Debug)]
pub(crate) struct IdleState {}
impl Runnable for IdleState {
    fn run(&mut self, settings: &Settings, _env: &Environment<'_>) -> Event {
        info!("=> Idle");
        match &settings.firmware {
            Some(path) => Event::ValidateImage(ValidateImageEvent {
                settings: settings.clone(),
                path: path.clone(),
            }),
            None => Event::SearchDevice(SearchDeviceEvent {
                settings: settings.clone(),
                image: None,
            }),
        }
    }
}

// ValidatingImage State =======================================================

/// Checks the firmware header before anything touches the device. A bad or
/// unreadable image fails the session right here.
#[derive(Debug)]
pub(crate) struct ValidatingImageState {
    pub path: PathBuf,
}
impl Runnable for ValidatingImageState {
    fn run(&mut self, settings: &Settings, env: &Environment<'_>) -> Event {
        info!("=> ValidatingImage");
        let image = match FirmwareImage::open(&self.path) {
            Ok(image) => image,
            Err(e) => return fail(settings, e),
        };
        if !image.is_valid() {
            return fail(
                settings,
                Error::InvalidFirmwareHeader {
                    path: self.path.clone(),
                },
            );
        }

        env.reporter.report(Status::ImageValidated(&image));
        Event::SearchDevice(SearchDeviceEvent {
            settings: settings.clone(),
            image: Some(image),
        })
    }
}

// SearchingDevice State =======================================================

/// Looks for the reset interface. Unless waiting is disabled, keeps polling
/// with no deadline until the device shows up or the session is cancelled.
#[derive(Debug)]
pub(crate) struct SearchingDeviceState {
    pub image: Option<FirmwareImage>,
}
impl Runnable for SearchingDeviceState {
    fn run(&mut self, settings: &Settings, env: &Environment<'_>) -> Event {
        info!("=> SearchingDevice");
        let target = settings.target;
        let found = |device, after_waiting| {
            Event::DeviceFound(DeviceFoundEvent {
                settings: settings.clone(),
                image: self.image.clone(),
                device,
                after_waiting,
            })
        };

        if let Some(device) = env.locator.locate(&target) {
            return found(device, false);
        }
        if !settings.wait_for_device {
            return fail(settings, Error::DeviceNotFound { target });
        }

        env.reporter.report(Status::WaitingForDevice(target));
        match poll(env.clock, &env.cancel, settings.poll_interval, None, || {
            env.locator.locate(&target)
        }) {
            Waited::Found(device) => found(device, true),
            Waited::Cancelled => Event::Abort(AbortEvent {
                settings: settings.clone(),
            }),
            // No deadline was given
            Waited::NotFound => unreachable!("unbounded device wait gave up"),
        }
    }
}

// DeviceFound State ===========================================================

#[derive(Debug)]
pub(crate) struct DeviceFoundState {
    pub image: Option<FirmwareImage>,
    pub device: DeviceHandle,
    pub after_waiting: bool,
}
impl Runnable for DeviceFoundState {
    fn run(&mut self, settings: &Settings, env: &Environment<'_>) -> Event {
        info!("=> DeviceFound {}", self.device);
        env.reporter.report(Status::DeviceFound {
            device: &self.device,
            after_waiting: self.after_waiting,
        });
        Event::Reset(ResetEvent {
            settings: settings.clone(),
            image: self.image.clone(),
            device: self.device.clone(),
        })
    }
}

// Resetting State =============================================================

/// Requests the reset once. The outcome is reported but never stops the
/// session: a device that did not seem to reset may still show up as a
/// bootloader volume.
#[derive(Debug)]
pub(crate) struct ResettingState {
    pub image: Option<FirmwareImage>,
    pub device: DeviceHandle,
}
impl Runnable for ResettingState {
    fn run(&mut self, settings: &Settings, env: &Environment<'_>) -> Event {
        info!("=> Resetting");
        let outcome = env.reset.trigger(&self.device);
        match &outcome {
            ResetOutcome::ResetLikely(_) => info!("{} went away, reset in progress", self.device),
            ResetOutcome::ResetUncertain => warn!("{} opened normally, reset unlikely", self.device),
            ResetOutcome::OpenError(e) => warn!("could not open {}: {}", self.device, e),
        }
        env.reporter.report(Status::ResetRequested(&outcome));

        match self.image.take() {
            Some(image) => Event::WaitBootloader(WaitBootloaderEvent {
                settings: settings.clone(),
                image,
            }),
            None => Event::Done(DoneEvent {
                settings: settings.clone(),
            }),
        }
    }
}

// WaitingBootloader State =====================================================

/// Polls the mounted volumes for the bootloader marker within a bounded
/// window.
#[derive(Debug)]
pub(crate) struct WaitingBootloaderState {
    pub image: FirmwareImage,
}
impl Runnable for WaitingBootloaderState {
    fn run(&mut self, settings: &Settings, env: &Environment<'_>) -> Event {
        info!("=> WaitingBootloader");
        let lister = match env.volumes {
            Some(lister) => lister,
            None => return fail(settings, Error::UnsupportedPlatform),
        };

        env.reporter.report(Status::WaitingForBootloader);
        let window = PollWindow::starting_now(
            env.clock,
            settings.bootloader_timeout,
            settings.poll_interval,
        );
        match wait_for_bootloader(lister, &settings.marker_file, &window, env.clock, &env.cancel) {
            Waited::Found(volume) => Event::Flash(FlashEvent {
                settings: settings.clone(),
                image: self.image.clone(),
                volume,
            }),
            Waited::NotFound => fail(
                settings,
                Error::BootloaderTimeout {
                    waited: settings.bootloader_timeout,
                },
            ),
            Waited::Cancelled => Event::Abort(AbortEvent {
                settings: settings.clone(),
            }),
        }
    }
}

// Flashing State ==============================================================

/// Copies the image onto the bootloader volume, once.
#[derive(Debug)]
pub(crate) struct FlashingState {
    pub image: FirmwareImage,
    pub volume: PathBuf,
}
impl Runnable for FlashingState {
    fn run(&mut self, settings: &Settings, env: &Environment<'_>) -> Event {
        info!("=> Flashing {}", self.volume.display());
        env.reporter.report(Status::BootloaderFound(&self.volume));
        match env.copier.copy(&self.image, &self.volume) {
            Ok(written) => {
                env.reporter.report(Status::Flashed(&written));
                Event::Done(DoneEvent {
                    settings: settings.clone(),
                })
            }
            Err(e) => fail(settings, e),
        }
    }
}

// Terminal States =============================================================

/// The session completed normally.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {}

/// The session ended on an unrecoverable condition.
#[derive(Debug)]
pub(crate) struct FailedState {
    pub error: Error,
}

/// The session was cancelled from outside.
#[derive(Debug, Copy, Clone)]
pub(crate) struct AbortedState {}
