//! Serial interface lookup and the 1200 baud reset request.

use std::{fmt, time::Duration};

use log::{debug, info, trace};
use serialport::{available_ports, SerialPortInfo, SerialPortType};

use crate::settings::TargetIdentity;

//==============================================================================
// Public Interface
//==============================================================================

/// A serial interface matching the target identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// The port name, usually the device path (`/dev/ttyACM0`, `COM4`).
    pub path: String,
    pub target: TargetIdentity,
}
impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Point-in-time lookup of the device among the attached serial interfaces.
/// Callers poll by calling it again.
pub trait DeviceLocator {
    fn locate(&self, target: &TargetIdentity) -> Option<DeviceHandle>;
}

/// Looks the device up in the serial ports reported by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortLocator;
impl DeviceLocator for SerialPortLocator {
    fn locate(&self, target: &TargetIdentity) -> Option<DeviceHandle> {
        match available_ports() {
            Ok(ports) => find_matching(&ports, target),
            Err(ref e) => {
                info!("error: {}", e.to_string());
                None
            }
        }
    }
}

/// First port in `ports` whose USB vendor/product id equals `target`.
pub fn find_matching(ports: &[SerialPortInfo], target: &TargetIdentity) -> Option<DeviceHandle> {
    ports.iter().find_map(|p| match &p.port_type {
        SerialPortType::UsbPort(info) => {
            trace!("{} is {:04x}:{:04x}", p.port_name, info.vid, info.pid);
            if info.vid == target.vendor_id && info.pid == target.product_id {
                Some(DeviceHandle {
                    path: p.port_name.clone(),
                    target: *target,
                })
            } else {
                None
            }
        }
        // Only USB ports carry a vendor/product id
        _ => None,
    })
}

/// What opening the port at the reset baud rate tells about the device.
///
/// The bootloader drops the device off the bus as soon as it sees the reset
/// baud rate, so a *failed* open is the expected outcome of a successful
/// reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The open failed because the device went away: it is rebooting into
    /// its bootloader.
    ResetLikely(serialport::Error),
    /// The port opened normally; the device probably did not reset.
    ResetUncertain,
    /// The open was rejected for a reason unrelated to the device leaving the
    /// bus (bad path, unsupported setting, no access rights, port held by
    /// another process).
    OpenError(serialport::Error),
}
impl ResetOutcome {
    /// Classify the result of opening the port at the reset baud rate. The
    /// opened port, if any, is dropped right away.
    pub fn from_open<T>(result: serialport::Result<T>) -> Self {
        match result {
            Ok(_port) => ResetOutcome::ResetUncertain,
            Err(e) if is_refusal(e.kind()) => ResetOutcome::OpenError(e),
            Err(e) => ResetOutcome::ResetLikely(e),
        }
    }

    pub fn likely_reset(&self) -> bool {
        matches!(self, ResetOutcome::ResetLikely(_))
    }
}

/// Open failures saying the device is still there but cannot be opened by us.
fn is_refusal(kind: serialport::ErrorKind) -> bool {
    use serialport::ErrorKind;
    use std::io;

    matches!(
        kind,
        ErrorKind::InvalidInput
            | ErrorKind::Io(io::ErrorKind::PermissionDenied)
            | ErrorKind::Io(io::ErrorKind::ResourceBusy)
            | ErrorKind::Io(io::ErrorKind::AddrInUse)
    )
}

/// Asks a located device to reboot into its bootloader.
pub trait ResetTrigger {
    /// Never fails: every way the request can go is a [`ResetOutcome`].
    fn trigger(&self, device: &DeviceHandle) -> ResetOutcome;
}

/// Requests the reset by opening the serial port at a reserved baud rate.
#[derive(Debug, Clone, Copy)]
pub struct SerialReset {
    pub baud_rate: u32,
}
impl SerialReset {
    pub fn new(baud_rate: u32) -> Self {
        SerialReset { baud_rate }
    }
}
impl ResetTrigger for SerialReset {
    fn trigger(&self, device: &DeviceHandle) -> ResetOutcome {
        debug!("Opening {} at {} baud", device.path, self.baud_rate);
        let outcome = ResetOutcome::from_open(
            serialport::new(&device.path, self.baud_rate)
                .timeout(Duration::from_millis(100))
                .open(),
        );
        debug!("reset outcome: {:?}", outcome);
        outcome
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
