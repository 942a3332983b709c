//! The collaborators a session talks to.

use crate::{
    report::Reporter,
    settings::Settings,
    utils::{
        platform_lister, CancelToken, Clock, DeviceLocator, FileCopier, FirmwareCopier,
        ResetTrigger, SerialPortLocator, SerialReset, SystemClock, VolumeLister,
    },
};

/// Everything outside of the session state machine: device lookup, reset,
/// volume enumeration, copy, time and the reporting layer.
///
/// `volumes` is `None` on platforms without a mounted-volume enumeration.
pub struct Environment<'a> {
    pub locator: &'a dyn DeviceLocator,
    pub reset: &'a dyn ResetTrigger,
    pub volumes: Option<&'a dyn VolumeLister>,
    pub copier: &'a dyn FirmwareCopier,
    pub clock: &'a dyn Clock,
    pub reporter: &'a dyn Reporter,
    pub cancel: CancelToken,
}

/// The real collaborators of the running platform.
pub struct System {
    locator: SerialPortLocator,
    reset: SerialReset,
    volumes: Option<Box<dyn VolumeLister>>,
    copier: FileCopier,
    clock: SystemClock,
}
impl System {
    pub fn new(settings: &Settings) -> Self {
        System {
            locator: SerialPortLocator,
            reset: SerialReset::new(settings.reset_baud_rate),
            volumes: platform_lister(),
            copier: FileCopier,
            clock: SystemClock,
        }
    }

    pub fn environment<'a>(&'a self, reporter: &'a dyn Reporter, cancel: CancelToken) -> Environment<'a> {
        Environment {
            locator: &self.locator,
            reset: &self.reset,
            volumes: self.volumes.as_deref(),
            copier: &self.copier,
            clock: &self.clock,
            reporter,
            cancel,
        }
    }
}
