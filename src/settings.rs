//! Settings related to the target device, the firmware image and the timing
//! of the reset/flash session.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

/// Default USB vendor id of the reset interface.
pub const DEFAULT_VENDOR_ID: u16 = 0x2FE3;
/// Default USB product id of the reset interface.
pub const DEFAULT_PRODUCT_ID: u16 = 0x1337;
/// Opening the serial interface at this baud rate asks the firmware to reboot
/// into its bootloader.
pub const RESET_BAUD_RATE: u32 = 1200;
/// File present at the root of every volume exposed by a UF2 bootloader.
pub const BOOTLOADER_MARKER: &str = "INFO_UF2.TXT";

// =============================================================================
// Public Interface
// =============================================================================

/// USB vendor/product id pair identifying the device model to reset.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TargetIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}
impl TargetIdentity {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        TargetIdentity {
            vendor_id,
            product_id,
        }
    }
}
impl Default for TargetIdentity {
    fn default() -> Self {
        TargetIdentity::new(DEFAULT_VENDOR_ID, DEFAULT_PRODUCT_ID)
    }
}
impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Groups all settings of a reset/flash session and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The device model to look for among the attached serial interfaces.
    pub target: TargetIdentity,

    /// Path to the UF2 image to flash after the reset. When not set, the
    /// session stops right after triggering the reset.
    pub firmware: Option<PathBuf>,

    /// Keep polling for the device when it is not attached yet. When `false`,
    /// a single failed lookup ends the session with an error.
    pub wait_for_device: bool,

    /// Include the underlying I/O error when reporting a failed copy.
    pub verbose: bool,

    /// Baud rate used to signal the reset request.
    pub reset_baud_rate: u32,
    /// Pause between two polling attempts.
    pub poll_interval: Duration,
    /// How long to wait for the bootloader volume to show up after the reset.
    pub bootloader_timeout: Duration,
    /// Name of the file identifying a bootloader volume.
    pub marker_file: String,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use uf2reset::SettingsBuilder;
///
/// let settings = SettingsBuilder::new()
///     .vendor_id(0x2e8a)
///     .firmware("blinky.uf2")
///     .finalize();
/// assert_eq!(settings.target.vendor_id, 0x2e8a);
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no firmware.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                target: TargetIdentity::default(),
                firmware: None,
                wait_for_device: true,
                verbose: false,
                reset_baud_rate: RESET_BAUD_RATE,
                poll_interval: Duration::from_millis(500),
                bootloader_timeout: Duration::from_secs(5),
                marker_file: BOOTLOADER_MARKER.into(),
                _private_use_builder: (),
            },
        }
    }

    /// Set the USB vendor id of the device to reset
    pub fn vendor_id(mut self, vendor_id: u16) -> Self {
        self.settings.target.vendor_id = vendor_id;
        self
    }

    /// Set the USB product id of the device to reset
    pub fn product_id(mut self, product_id: u16) -> Self {
        self.settings.target.product_id = product_id;
        self
    }

    /// Set the path to the firmware image to flash after the reset
    pub fn firmware(mut self, firmware: impl AsRef<Path>) -> Self {
        self.settings.firmware = Some(firmware.as_ref().to_owned());
        self
    }

    /// Set whether to keep waiting for the device when it is not attached
    pub fn wait_for_device(mut self, wait: bool) -> Self {
        self.settings.wait_for_device = wait;
        self
    }

    /// Set whether errors are reported with their underlying cause
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.settings.verbose = verbose;
        self
    }

    /// Set the baud rate used to request the reset
    pub fn reset_baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.reset_baud_rate = baud_rate;
        self
    }

    /// Set the pause between two polling attempts
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval = interval;
        self
    }

    /// Set how long to wait for the bootloader volume
    pub fn bootloader_timeout(mut self, timeout: Duration) -> Self {
        self.settings.bootloader_timeout = timeout;
        self
    }

    /// Set the name of the file marking a bootloader volume
    pub fn marker_file<'a>(mut self, name: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.marker_file = name.into().into_owned();
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        SettingsBuilder::new()
    }
}

/// Parse a USB vendor or product id given either in decimal or with a `0x`,
/// `0o` or `0b` radix prefix.
pub fn parse_usb_id(value: &str) -> Result<u16, std::num::ParseIntError> {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();
    let (digits, radix) = if let Some(digits) = lower.strip_prefix("0x") {
        (digits, 16)
    } else if let Some(digits) = lower.strip_prefix("0o") {
        (digits, 8)
    } else if let Some(digits) = lower.strip_prefix("0b") {
        (digits, 2)
    } else {
        return value.parse::<u16>();
    };
    // from_str_radix takes a sign, but no sign may follow the radix prefix
    if digits.starts_with(&['+', '-'][..]) {
        return "".parse::<u16>();
    }
    u16::from_str_radix(digits, radix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            target: TargetIdentity::new(0x2FE3, 0x1337),
            firmware: None,
            wait_for_device: true,
            verbose: false,
            reset_baud_rate: 1200,
            poll_interval: Duration::from_millis(500),
            bootloader_timeout: Duration::from_secs(5),
            marker_file: "INFO_UF2.TXT".into(),
            _private_use_builder: (),
        }
    )
}

#[test]
fn target_identity() {
    let settings = SettingsBuilder::new()
        .vendor_id(0x2e8a)
        .product_id(0x000a)
        .finalize();
    assert_eq!(settings.target, TargetIdentity::new(0x2e8a, 0x000a));
    assert_eq!(settings.target.to_string(), "2e8a:000a");
}

#[test]
fn firmware() {
    let settings = SettingsBuilder::new().firmware("app.uf2").finalize();
    assert_eq!(settings.firmware.unwrap(), PathBuf::from("app.uf2"));
}

#[test]
fn no_wait_and_verbose() {
    let settings = SettingsBuilder::new()
        .wait_for_device(false)
        .verbose(true)
        .finalize();
    assert!(!settings.wait_for_device);
    assert!(settings.verbose);
}

#[test]
fn timing() {
    let settings = SettingsBuilder::new()
        .poll_interval(Duration::from_millis(100))
        .bootloader_timeout(Duration::from_secs(10))
        .finalize();
    assert_eq!(settings.poll_interval, Duration::from_millis(100));
    assert_eq!(settings.bootloader_timeout, Duration::from_secs(10));
}

#[test]
fn marker_file() {
    let settings = SettingsBuilder::new().marker_file("CURRENT.UF2").finalize();
    assert_eq!(settings.marker_file, "CURRENT.UF2");
}

#[test]
fn usb_id_radix_prefixes() {
    assert_eq!(parse_usb_id("0x2FE3"), Ok(0x2FE3));
    assert_eq!(parse_usb_id("0X2fe3"), Ok(0x2FE3));
    assert_eq!(parse_usb_id("4919"), Ok(0x1337));
    assert_eq!(parse_usb_id("0o17"), Ok(15));
    assert_eq!(parse_usb_id("0b101"), Ok(5));
}

#[test]
fn usb_id_rejects_garbage() {
    assert!(parse_usb_id("0x10000").is_err());
    assert!(parse_usb_id("vid").is_err());
    assert!(parse_usb_id("").is_err());
}

#[test]
fn usb_id_rejects_sign_after_prefix() {
    assert!(parse_usb_id("0x+1").is_err());
    assert!(parse_usb_id("0X+2FE3").is_err());
    assert!(parse_usb_id("0o+17").is_err());
    assert!(parse_usb_id("0b-1").is_err());
    assert_eq!(parse_usb_id("+4919"), Ok(4919));
}
