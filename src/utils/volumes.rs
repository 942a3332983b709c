//! Mounted volume enumeration and the wait for the bootloader volume.
//!
//! Each supported platform family has its own way of listing mounted storage.
//! They all sit behind [`VolumeLister`], picked once by [`platform_lister`],
//! so the wait itself is platform agnostic.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, trace};

use crate::utils::polling::{poll, CancelToken, Clock, PollWindow, Waited};

//==============================================================================
// Public Interface
//==============================================================================

/// Lists the volumes currently mounted on the system.
pub trait VolumeLister {
    fn mounted_volumes(&self) -> io::Result<Vec<PathBuf>>;
}

/// The volume enumeration of the running platform, or `None` when UF2
/// flashing is not supported on it.
pub fn platform_lister() -> Option<Box<dyn VolumeLister>> {
    #[cfg(target_os = "linux")]
    {
        Some(Box::new(MountTable::default()))
    }
    #[cfg(windows)]
    {
        Some(Box::new(windows_drives::RemovableDrives))
    }
    #[cfg(not(any(target_os = "linux", windows)))]
    {
        None
    }
}

/// Reads the mount points out of the live mount table.
#[derive(Debug, Clone)]
pub struct MountTable {
    pub path: PathBuf,
}
impl Default for MountTable {
    fn default() -> Self {
        MountTable {
            path: PathBuf::from("/proc/mounts"),
        }
    }
}
impl VolumeLister for MountTable {
    fn mounted_volumes(&self) -> io::Result<Vec<PathBuf>> {
        let table = fs::read_to_string(&self.path)?;
        Ok(parse_mount_table(&table))
    }
}

/// Poll `lister` until a volume holding `marker` shows up or `window` ends.
///
/// A failed enumeration counts as an attempt without result.
pub fn wait_for_bootloader(
    lister: &dyn VolumeLister,
    marker: &str,
    window: &PollWindow,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> Waited<PathBuf> {
    poll(clock, cancel, window.interval, Some(window.deadline), || {
        find_marked_volume(lister, marker)
    })
}

/// Hint printed when the bootloader volume did not show up, for the platforms
/// where a manual way out exists.
pub fn manual_recovery_hint(firmware: &Path) -> Option<String> {
    if cfg!(target_os = "linux") {
        Some(format!(
            "If you have auto-mounting disabled, don't mount manually.\n\
             Just write directly with:  sudo dd if={} of=/dev/sdX bs=1M conv=fsync",
            firmware.display()
        ))
    } else {
        None
    }
}

//==============================================================================
// Private stuff
//==============================================================================

fn find_marked_volume(lister: &dyn VolumeLister, marker: &str) -> Option<PathBuf> {
    match lister.mounted_volumes() {
        Ok(volumes) => {
            trace!("{} mounted volumes", volumes.len());
            // TODO: check the Board-ID in the marker file against the device
            volumes.into_iter().find(|v| v.join(marker).exists())
        }
        Err(ref e) => {
            debug!("volume enumeration failed: {}", e);
            None
        }
    }
}

/// Mount points are the second field of each line, with blanks and
/// backslashes octal escaped.
fn parse_mount_table(table: &str) -> Vec<PathBuf> {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(unescape_octal)
        .collect()
}

/// Mount points are raw bytes; an escaped non UTF-8 name must reach the file
/// system unchanged.
fn unescape_octal(field: &str) -> PathBuf {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escape = bytes.get(i + 1..i + 4).filter(|d| is_octal_escape(d));
        if let (b'\\', Some(digits)) = (bytes[i], escape) {
            out.push(digits.iter().fold(0u8, |acc, d| acc * 8 + (d - b'0')));
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    path_from_bytes(out)
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::{ffi::OsString, os::unix::ffi::OsStringExt};
    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

#[cfg(windows)]
mod windows_drives {
    use std::{io, path::PathBuf};

    use log::trace;
    use windows::{
        core::PCWSTR,
        Win32::Storage::FileSystem::{GetDriveTypeW, GetLogicalDriveStringsW},
    };

    use super::{split_drive_strings, VolumeLister};

    const DRIVE_REMOVABLE: u32 = 2;

    /// Logical drive letters backed by removable media.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RemovableDrives;
    impl VolumeLister for RemovableDrives {
        fn mounted_volumes(&self) -> io::Result<Vec<PathBuf>> {
            let mut buffer = vec![0u16; 256];
            loop {
                let len = unsafe { GetLogicalDriveStringsW(Some(buffer.as_mut_slice())) } as usize;
                if len == 0 {
                    return Err(io::Error::last_os_error());
                }
                if len <= buffer.len() {
                    buffer.truncate(len);
                    break;
                }
                // Too small, `len` is the required size
                buffer.resize(len + 1, 0);
            }

            let mut drives = Vec::new();
            for root in split_drive_strings(&buffer) {
                let mut wide = root.clone();
                wide.push(0);
                let kind = unsafe { GetDriveTypeW(PCWSTR(wide.as_ptr())) };
                let name = String::from_utf16_lossy(&root);
                trace!("{} drive type {}", name, kind);
                if kind == DRIVE_REMOVABLE {
                    drives.push(PathBuf::from(name));
                }
            }
            Ok(drives)
        }
    }
}

/// Split the nul separated list returned by `GetLogicalDriveStringsW`.
#[cfg(any(windows, test))]
fn split_drive_strings(buffer: &[u16]) -> Vec<Vec<u16>> {
    buffer
        .split(|&c| c == 0)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_vec())
        .collect()
}

//==============================================================================
// Unit Tests
//==============================================================================
