//! Icon format and dimension sniffing.
//!
//! FreeDesktop icon themes accept PNG, SVG and XPM images. This module
//! recognizes those formats from raw bytes and pulls the pixel dimensions
//! out of the file header without decoding the image:
//!
//! | Format | Detection | Dimensions |
//! |--------|-----------|------------|
//! | PNG | magic number at offset 0 | `IHDR` chunk (big-endian u32 pair) |
//! | XPM2 | `XPM2` at offset 2 | not extracted |
//! | XPM3 | `XPM ` at offset 3 | not extracted |
//! | SVG | `<svg ...>` tag | `width`/`height` attributes of the root tag |
//!
//! Dimensions are `None` when the file does not declare them or they cannot
//! be parsed. A declared zero is reported as `None` as well.

use crate::bundler::error::{Error, Result};
use regex::Regex;
use std::{fmt, sync::LazyLock};

const PNG_MAGIC: u32 = 0x8950_4e47;
const XPM2_MAGIC: u32 = 0x5850_4d32;
const XPM3_MAGIC: u32 = 0x5850_4d20;

static SVG_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<svg(?:\s[^>]*)?>").expect("static SVG tag pattern is valid")
});
static SVG_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\swidth\s*=\s*["']?(\d+)(?:px)?["']?"#).expect("static SVG width pattern is valid")
});
static SVG_HEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\sheight\s*=\s*["']?(\d+)(?:px)?["']?"#)
        .expect("static SVG height pattern is valid")
});

/// Image formats accepted by FreeDesktop icon themes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ImageFormat {
    /// Portable Network Graphics
    Png,
    /// Scalable Vector Graphics
    Svg,
    /// X PixMap, version 2
    Xpm2,
    /// X PixMap, version 3
    Xpm3,
}

impl ImageFormat {
    /// Conventional file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Xpm2 | ImageFormat::Xpm3 => "xpm",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Svg => "SVG",
            ImageFormat::Xpm2 => "XPM2",
            ImageFormat::Xpm3 => "XPM3",
        };
        f.write_str(name)
    }
}

/// Format and declared pixel size of an icon file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ImageMetadata {
    /// Detected file format.
    pub format: ImageFormat,
    /// Declared width in pixels, if any.
    pub width: Option<u32>,
    /// Declared height in pixels, if any.
    pub height: Option<u32>,
}

impl ImageMetadata {
    /// Icon-theme resolution key (`"{width}x{height}"`), when both axes are known.
    pub fn resolution_key(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        }
    }

    fn validate(self) -> Result<Self> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(Error::MalformedMetadata(format!("{self:?}")));
        }
        if matches!(self.format, ImageFormat::Xpm2 | ImageFormat::Xpm3)
            && (self.width.is_some() || self.height.is_some())
        {
            return Err(Error::MalformedMetadata(format!("{self:?}")));
        }
        Ok(self)
    }
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn non_zero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v != 0)
}

fn detect_format(bytes: &[u8]) -> Result<ImageFormat> {
    if read_u32_be(bytes, 0) == Some(PNG_MAGIC) {
        Ok(ImageFormat::Png)
    } else if read_u32_be(bytes, 2) == Some(XPM2_MAGIC) {
        Ok(ImageFormat::Xpm2)
    } else if read_u32_be(bytes, 3) == Some(XPM3_MAGIC) {
        Ok(ImageFormat::Xpm3)
    } else if SVG_TAG.is_match(&String::from_utf8_lossy(bytes)) {
        Ok(ImageFormat::Svg)
    } else {
        Err(Error::UnsupportedFormat)
    }
}

fn png_dimensions(bytes: &[u8]) -> (Option<u32>, Option<u32>) {
    let Some(tag) = bytes.windows(4).position(|w| w == b"IHDR") else {
        return (None, None);
    };
    (
        non_zero(read_u32_be(bytes, tag + 4)),
        non_zero(read_u32_be(bytes, tag + 8)),
    )
}

fn svg_dimensions(bytes: &[u8]) -> (Option<u32>, Option<u32>) {
    let text = String::from_utf8_lossy(bytes);
    let Some(tag) = SVG_TAG.find(&text) else {
        return (None, None);
    };
    let axis = |pattern: &Regex| {
        pattern
            .captures(tag.as_str())
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };
    (non_zero(axis(&SVG_WIDTH)), non_zero(axis(&SVG_HEIGHT)))
}

/// Sniff format and dimensions of an icon from its bytes.
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] when the bytes are none of PNG, XPM or SVG
/// - [`Error::MalformedMetadata`] if the produced record is inconsistent
pub fn sniff(bytes: &[u8]) -> Result<ImageMetadata> {
    let format = detect_format(bytes)?;
    let (width, height) = match format {
        ImageFormat::Png => png_dimensions(bytes),
        ImageFormat::Svg => svg_dimensions(bytes),
        // Dimension extraction for XPM is not implemented.
        ImageFormat::Xpm2 | ImageFormat::Xpm3 => (None, None),
    };
    ImageMetadata {
        format,
        width,
        height,
    }
    .validate()
}

#[cfg(test)]
pub(crate) fn minimal_png(width: u32, height: u32) -> Vec<u8> {
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    png.extend_from_slice(&13u32.to_be_bytes());
    png.extend_from_slice(b"IHDR");
    png.extend_from_slice(&width.to_be_bytes());
    png.extend_from_slice(&height.to_be_bytes());
    png.extend_from_slice(&[8, 6, 0, 0, 0]);
    png.extend_from_slice(&[0, 0, 0, 0]);
    png
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_dimensions_from_ihdr() {
        let meta = sniff(&minimal_png(256, 128)).unwrap();
        assert_eq!(meta.format, ImageFormat::Png);
        assert_eq!(meta.width, Some(256));
        assert_eq!(meta.height, Some(128));
        assert_eq!(meta.resolution_key().as_deref(), Some("256x128"));
    }

    #[test]
    fn test_png_zero_dimension_is_absent() {
        let meta = sniff(&minimal_png(0, 64)).unwrap();
        assert_eq!(meta.width, None);
        assert_eq!(meta.height, Some(64));
        assert_eq!(meta.resolution_key(), None);
    }

    #[test]
    fn test_truncated_png_has_no_dimensions() {
        let png = minimal_png(32, 32);
        let meta = sniff(&png[..18]).unwrap();
        assert_eq!(meta.format, ImageFormat::Png);
        assert_eq!(meta.width, None);
        assert_eq!(meta.height, None);
    }

    #[test]
    fn test_svg_dimensions_from_root_tag() {
        let svg = br#"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" width="48" height="32px" viewBox="0 0 48 32">
  <rect stroke-width="5" width="1" height="1"/>
</svg>"#;
        let meta = sniff(svg).unwrap();
        assert_eq!(meta.format, ImageFormat::Svg);
        assert_eq!(meta.width, Some(48));
        assert_eq!(meta.height, Some(32));
    }

    #[test]
    fn test_svg_without_dimensions() {
        let meta = sniff(br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"></svg>"#)
            .unwrap();
        assert_eq!(meta.format, ImageFormat::Svg);
        assert_eq!(meta.width, None);
        assert_eq!(meta.height, None);
    }

    #[test]
    fn test_svg_width_as_first_attribute() {
        let meta = sniff(br#"<svg width="16" height="16"></svg>"#).unwrap();
        assert_eq!(meta.resolution_key().as_deref(), Some("16x16"));
    }

    #[test]
    fn test_xpm_formats_recognized_without_dimensions() {
        let xpm2 = b"! XPM2\n16 16 2 1\n";
        let meta = sniff(xpm2).unwrap();
        assert_eq!(meta.format, ImageFormat::Xpm2);
        assert_eq!((meta.width, meta.height), (None, None));

        let xpm3 = b"/* XPM */\nstatic char *icon[] = {\n";
        let meta = sniff(xpm3).unwrap();
        assert_eq!(meta.format, ImageFormat::Xpm3);
        assert_eq!(meta.format.extension(), "xpm");
    }

    #[test]
    fn test_unknown_bytes_rejected() {
        assert!(matches!(sniff(b"GIF89a...."), Err(Error::UnsupportedFormat)));
        assert!(matches!(sniff(b""), Err(Error::UnsupportedFormat)));
    }
}
