//! UF2 image header validation and the copy onto the bootloader volume.

use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use hexplay::HexViewBuilder;
use log::{debug, log_enabled, Level::Debug};

use crate::error::{Error, Result};

/// First magic word of every UF2 block.
pub const UF2_MAGIC_START0: u32 = 0x0A32_4655;
/// Second magic word of every UF2 block.
pub const UF2_MAGIC_START1: u32 = 0x9E5D_5157;

//==============================================================================
// Public Interface
//==============================================================================

/// A firmware file and the first 8 bytes read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    pub path: PathBuf,
    pub header: [u8; 8],
}
impl FirmwareImage {
    /// Read the first 8 bytes of `path`.
    ///
    /// Fails with [`Error::FirmwareUnreadable`] when the file cannot be opened
    /// or holds fewer than 8 bytes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unreadable = |source| Error::FirmwareUnreadable {
            path: path.to_owned(),
            source,
        };

        let mut header = [0u8; 8];
        File::open(path)
            .and_then(|mut file| file.read_exact(&mut header))
            .map_err(unreadable)?;

        if log_enabled!(Debug) {
            let view = HexViewBuilder::new(&header)
                .address_offset(0)
                .row_width(16)
                .finish();
            debug!("`{}` header:\n{}", path.display(), view);
        }

        Ok(FirmwareImage {
            path: path.to_owned(),
            header,
        })
    }

    /// The two little-endian header words.
    pub fn magic(&self) -> [u32; 2] {
        header_words(&self.header)
    }

    /// Whether the header carries the UF2 signature.
    pub fn is_valid(&self) -> bool {
        is_uf2(&self.header)
    }
}

/// Whether `header` holds the two UF2 magic words in little-endian order.
pub fn is_uf2(header: &[u8; 8]) -> bool {
    header_words(header) == [UF2_MAGIC_START0, UF2_MAGIC_START1]
}

/// Writes a validated image onto a mounted bootloader volume.
pub trait FirmwareCopier {
    /// Copy `image` into `volume`, returning the path of the written file.
    /// A failure is final; no retry is attempted.
    fn copy(&self, image: &FirmwareImage, volume: &Path) -> Result<PathBuf>;
}

/// Plain file copy, keeping the image file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileCopier;
impl FirmwareCopier for FileCopier {
    fn copy(&self, image: &FirmwareImage, volume: &Path) -> Result<PathBuf> {
        let name = image.path.file_name().ok_or_else(|| Error::CopyFailed {
            target: volume.to_owned(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "firmware path has no file name"),
        })?;
        let target = volume.join(name);

        match fs::copy(&image.path, &target) {
            Ok(bytes) => {
                debug!("{} bytes written to {}", bytes, target.display());
                Ok(target)
            }
            Err(source) => Err(Error::CopyFailed { target, source }),
        }
    }
}

//==============================================================================
// Private stuff
//==============================================================================

fn header_words(header: &[u8; 8]) -> [u32; 2] {
    [
        u32::from_le_bytes([header[0], header[1], header[2], header[3]]),
        u32::from_le_bytes([header[4], header[5], header[6], header[7]]),
    ]
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const UF2_HEADER: [u8; 8] = [0x55, 0x46, 0x32, 0x0A, 0x57, 0x51, 0x5D, 0x9E];

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn magic_words_in_little_endian_order_are_valid() {
        assert!(is_uf2(&UF2_HEADER));
    }

    #[test]
    fn any_other_header_is_invalid() {
        assert!(!is_uf2(&[0; 8]));

        // Big-endian words
        assert!(!is_uf2(&[0x0A, 0x32, 0x46, 0x55, 0x9E, 0x5D, 0x51, 0x57]));

        // Words swapped
        assert!(!is_uf2(&[0x57, 0x51, 0x5D, 0x9E, 0x55, 0x46, 0x32, 0x0A]));

        for i in 0..UF2_HEADER.len() {
            let mut header = UF2_HEADER;
            header[i] ^= 0x01;
            assert!(!is_uf2(&header), "bit flip at byte {} went unnoticed", i);
        }
    }

    #[test]
    fn open_reads_only_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = UF2_HEADER.to_vec();
        content.extend_from_slice(&[0xAA; 504]);
        let path = write_file(dir.path(), "app.uf2", &content);

        let image = FirmwareImage::open(&path).unwrap();
        assert_eq!(image.path, path);
        assert_eq!(image.header, UF2_HEADER);
        assert_eq!(image.magic(), [UF2_MAGIC_START0, UF2_MAGIC_START1]);
        assert!(image.is_valid());
    }

    #[test]
    fn image_validity_follows_the_header_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut swapped = UF2_HEADER;
        swapped.swap(0, 4);
        let big_endian = [0x0A, 0x32, 0x46, 0x55, 0x9E, 0x5D, 0x51, 0x57];
        let headers = [UF2_HEADER, swapped, big_endian, [0xFF; 8]];
        for (i, header) in headers.iter().enumerate() {
            let path = write_file(dir.path(), &format!("{}.uf2", i), header);
            let image = FirmwareImage::open(&path).unwrap();
            assert_eq!(image.is_valid(), is_uf2(header), "header {:02x?}", header);
        }
    }

    #[test]
    fn zeroed_header_is_not_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "zero.uf2", &[0; 512]);
        assert!(!FirmwareImage::open(&path).unwrap().is_valid());
    }

    #[test]
    fn short_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "short.uf2", &UF2_HEADER[..5]);
        match FirmwareImage::open(&path) {
            Err(Error::FirmwareUnreadable { path: p, source }) => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let result = FirmwareImage::open(dir.path().join("nope.uf2"));
        assert!(matches!(result, Err(Error::FirmwareUnreadable { .. })));
    }

    #[test]
    fn copy_keeps_the_file_name() {
        let src = tempfile::tempdir().unwrap();
        let volume = tempfile::tempdir().unwrap();
        let mut content = UF2_HEADER.to_vec();
        content.extend_from_slice(b"payload");
        let path = write_file(src.path(), "blinky.uf2", &content);
        let image = FirmwareImage::open(&path).unwrap();

        let written = FileCopier.copy(&image, volume.path()).unwrap();
        assert_eq!(written, volume.path().join("blinky.uf2"));
        assert_eq!(fs::read(&written).unwrap(), content);
    }

    #[test]
    fn copy_to_missing_volume_fails() {
        let src = tempfile::tempdir().unwrap();
        let path = write_file(src.path(), "blinky.uf2", &UF2_HEADER);
        let image = FirmwareImage::open(&path).unwrap();
        let volume = src.path().join("unmounted");

        match FileCopier.copy(&image, &volume) {
            Err(Error::CopyFailed { target, .. }) => {
                assert_eq!(target, volume.join("blinky.uf2"))
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
