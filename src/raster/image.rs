use std::io::Cursor;
use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, ImageDecoder as _, ImageReader, RgbaImage};

use crate::foundation::core::Size;
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::raster::orientation::Orientation;

/// Straight-alpha RGBA8 pixel buffer plus the orientation it was stored with.
///
/// Pixel-space geometry matches logical geometry only once the orientation is
/// [`Orientation::Identity`]; see [`crate::raster::orientation::normalize`].
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pixels: RgbaImage,
    orientation: Orientation,
}

impl Image {
    /// Wrap pixels that are already upright.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            orientation: Orientation::Identity,
        }
    }

    /// Wrap pixels stored with `orientation`.
    pub fn with_orientation(pixels: RgbaImage, orientation: Orientation) -> Self {
        Self {
            pixels,
            orientation,
        }
    }

    /// Convert any decoded image into RGBA8.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::new(image.into_rgba8())
    }

    /// Build from a packed RGBA8 buffer.
    pub fn from_raw(width: u32, height: u32, rgba: Vec<u8>) -> SemanticResult<Self> {
        let pixels = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            SemanticError::decode(format!(
                "rgba buffer does not match {width}x{height}x4 bytes"
            ))
        })?;
        Ok(Self::new(pixels))
    }

    /// Decode an encoded image (PNG, JPEG, ...) from memory, keeping its EXIF orientation.
    pub fn from_encoded(bytes: &[u8]) -> SemanticResult<Self> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| SemanticError::decode(format!("unrecognized image bytes: {e}")))?;
        decode_with_orientation(reader)
    }

    /// Decode an image file, keeping its EXIF orientation.
    pub fn open(path: &Path) -> SemanticResult<Self> {
        let reader = ImageReader::open(path)
            .with_context(|| format!("failed to open image '{}'", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("failed to sniff image format of '{}'", path.display()))?;
        decode_with_orientation(reader)
    }

    /// Encode to `path`; the format follows the file extension.
    pub fn save(&self, path: &Path) -> SemanticResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
        }
        self.pixels
            .save(path)
            .with_context(|| format!("failed to write image '{}'", path.display()))?;
        Ok(())
    }

    /// Width of the stored pixel buffer.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height of the stored pixel buffer.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)` of the stored pixel buffer.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Pixel extent as a floating-point size.
    pub fn extent(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    /// `true` when either axis is zero.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Stored orientation flag.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Borrow the pixel buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Take the pixel buffer, dropping the orientation flag.
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub(crate) fn into_parts(self) -> (RgbaImage, Orientation) {
        (self.pixels, self.orientation)
    }
}

fn decode_with_orientation<R>(reader: ImageReader<R>) -> SemanticResult<Image>
where
    R: std::io::BufRead + std::io::Seek,
{
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| SemanticError::decode(format!("failed to read image header: {e}")))?;
    let exif_orientation = decoder
        .orientation()
        .map_err(|e| SemanticError::decode(format!("failed to read orientation: {e}")))?;
    let decoded = DynamicImage::from_decoder(decoder)
        .map_err(|e| SemanticError::decode(format!("failed to decode image: {e}")))?;
    Ok(Image::with_orientation(
        decoded.into_rgba8(),
        Orientation::from_decoder(exif_orientation),
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/raster/image.rs"]
mod tests;
