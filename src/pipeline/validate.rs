//! Upload validation — runs before any network or disk I/O.
//!
//! Accepts JPEG and PNG only. The file extension is checked first (fast,
//! user-correctable feedback), then the magic bytes must agree with it:
//! a renamed file does not get past the server.

use thiserror::Error;

/// Hard cap on accepted image size (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no receipt image in the request")]
    Missing,
    #[error("only .jpg, .jpeg and .png images are accepted")]
    UnsupportedFormat,
    #[error("image exceeds the 5 MiB limit")]
    TooLarge,
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }
}

/// Validate an uploaded file name and its raw bytes.
///
/// Side-effect free. Size is checked before format so an oversized file is
/// always reported as too large regardless of its content.
pub fn validate_image(file_name: &str, bytes: &[u8]) -> Result<ImageKind, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::Missing);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::TooLarge);
    }

    let claimed = kind_from_extension(file_name).ok_or(ValidationError::UnsupportedFormat)?;
    let sniffed = kind_from_magic(bytes).ok_or(ValidationError::UnsupportedFormat)?;
    if claimed != sniffed {
        return Err(ValidationError::UnsupportedFormat);
    }
    Ok(sniffed)
}

fn kind_from_extension(file_name: &str) -> Option<ImageKind> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some(ImageKind::Jpeg),
        "png" => Some(ImageKind::Png),
        _ => None,
    }
}

/// Detect the image format from magic bytes.
fn kind_from_magic(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        Some(ImageKind::Jpeg)
    } else if bytes.len() >= 8
        && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
    {
        Some(ImageKind::Png)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn jpeg_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.resize(len.max(4), 0);
        bytes
    }

    pub fn png_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(len.max(8), 0);
        bytes
    }

    #[test]
    fn accepts_jpeg_and_png() {
        assert_eq!(
            validate_image("receipt.jpg", &jpeg_bytes(100)),
            Ok(ImageKind::Jpeg)
        );
        assert_eq!(
            validate_image("receipt.jpeg", &jpeg_bytes(100)),
            Ok(ImageKind::Jpeg)
        );
        assert_eq!(
            validate_image("receipt.png", &png_bytes(100)),
            Ok(ImageKind::Png)
        );
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(
            validate_image("RECEIPT.PNG", &png_bytes(100)),
            Ok(ImageKind::Png)
        );
    }

    #[test]
    fn rejects_unsupported_extensions() {
        for name in ["receipt.pdf", "receipt.gif", "receipt.webp", "receipt", "receipt.txt"] {
            assert_eq!(
                validate_image(name, &png_bytes(100)),
                Err(ValidationError::UnsupportedFormat),
                "{name} should be rejected",
            );
        }
    }

    #[test]
    fn rejects_spoofed_extension() {
        // PNG content named .jpg and vice versa.
        assert_eq!(
            validate_image("receipt.jpg", &png_bytes(100)),
            Err(ValidationError::UnsupportedFormat)
        );
        assert_eq!(
            validate_image("receipt.png", &jpeg_bytes(100)),
            Err(ValidationError::UnsupportedFormat)
        );
    }

    #[test]
    fn rejects_unrecognized_content() {
        assert_eq!(
            validate_image("receipt.png", b"plain text pretending"),
            Err(ValidationError::UnsupportedFormat)
        );
    }

    #[test]
    fn rejects_empty_file() {
        assert_eq!(validate_image("receipt.png", &[]), Err(ValidationError::Missing));
    }

    #[test]
    fn size_limit_boundary() {
        assert!(validate_image("receipt.png", &png_bytes(MAX_IMAGE_BYTES)).is_ok());
        assert_eq!(
            validate_image("receipt.png", &png_bytes(MAX_IMAGE_BYTES + 1)),
            Err(ValidationError::TooLarge)
        );
    }

    #[test]
    fn oversized_file_is_too_large_regardless_of_content() {
        let junk = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert_eq!(
            validate_image("receipt.xyz", &junk),
            Err(ValidationError::TooLarge)
        );
    }
}
