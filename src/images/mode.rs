//! Pixel mode detection.
//!
//! Decoders expand palettes and low bit depths on load, so the stored
//! channel layout is read from the PNG `IHDR` chunk before decoding.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Channel layout of a stored raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelMode {
    /// 1-bit greyscale
    Bilevel,
    /// 8/16-bit greyscale
    Grey,
    /// Greyscale with alpha
    GreyAlpha,
    Rgb,
    Rgba,
    /// Indexed colour
    Palette,
}

impl PixelMode {
    /// Read the mode from PNG header bytes, `None` if `bytes` is not a PNG
    pub fn from_png_header(bytes: &[u8]) -> Option<Self> {
        // signature, IHDR length, "IHDR", width, height, bit depth, colour type
        if bytes.len() < 26 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
            return None;
        }
        let bit_depth = bytes[24];
        match bytes[25] {
            0 if bit_depth == 1 => Some(PixelMode::Bilevel),
            0 => Some(PixelMode::Grey),
            2 => Some(PixelMode::Rgb),
            3 => Some(PixelMode::Palette),
            4 => Some(PixelMode::GreyAlpha),
            6 => Some(PixelMode::Rgba),
            _ => None,
        }
    }

    /// Mode of an already decoded image
    pub fn from_decoded(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => PixelMode::Grey,
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => PixelMode::GreyAlpha,
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
                PixelMode::Rgb
            }
            _ => PixelMode::Rgba,
        }
    }

    /// Channels per pixel in the working buffer
    pub fn channels(self) -> usize {
        match self {
            PixelMode::Bilevel | PixelMode::Grey => 1,
            PixelMode::GreyAlpha => 2,
            PixelMode::Rgb | PixelMode::Palette => 3,
            PixelMode::Rgba => 4,
        }
    }

    /// Channels that take part in the RMS histogram (alpha excluded)
    pub fn color_bands(self) -> usize {
        match self {
            PixelMode::Bilevel | PixelMode::Grey | PixelMode::GreyAlpha => 1,
            PixelMode::Rgb | PixelMode::Rgba | PixelMode::Palette => 3,
        }
    }
}

impl fmt::Display for PixelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelMode::Bilevel => "1",
            PixelMode::Grey => "L",
            PixelMode::GreyAlpha => "LA",
            PixelMode::Rgb => "RGB",
            PixelMode::Rgba => "RGBA",
            PixelMode::Palette => "P",
        };
        f.write_str(name)
    }
}
