// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image format detection from magic bytes

use std::fmt;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Formats recognised by [`detect_format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Unknown,
}

impl ImageFormat {
    /// Short format tag, as used in `image/<tag>`
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Unknown => "unknown",
        }
    }

    pub fn mime_type(&self) -> String {
        format!("image/{}", self.as_str())
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the image format of a byte buffer
///
/// Buffers shorter than 12 bytes are always `Unknown`.
pub fn detect_format(data: &[u8]) -> ImageFormat {
    if data.len() < 12 {
        return ImageFormat::Unknown;
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageFormat::Jpeg
    } else if data.starts_with(&PNG_SIGNATURE) {
        ImageFormat::Png
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        ImageFormat::Gif
    } else if data.starts_with(b"BM") {
        ImageFormat::Bmp
    } else if data.starts_with(b"RIFF") && data[8..].starts_with(b"WEBP") {
        ImageFormat::Webp
    } else {
        ImageFormat::Unknown
    }
}
