use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage, imageops};

use crate::foundation::error::{SemanticError, SemanticResult};
use crate::foundation::math::unit_to_u8;
use crate::raster::RESAMPLE_FILTER;
use crate::raster::image::Image;

/// Per-pixel foreground weight, stored as 8-bit luma (`255` = fully foreground).
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    weights: GrayImage,
}

impl Mask {
    /// Wrap an 8-bit luma buffer.
    pub fn from_luma(weights: GrayImage) -> Self {
        Self { weights }
    }

    /// Uniform mask with every weight set to `weight` (clamped to `[0, 1]`).
    pub fn filled(width: u32, height: u32, weight: f32) -> Self {
        Self {
            weights: GrayImage::from_pixel(width, height, Luma([unit_to_u8(weight)])),
        }
    }

    /// Build from a weight function evaluated at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        Self {
            weights: GrayImage::from_fn(width, height, |x, y| Luma([unit_to_u8(f(x, y))])),
        }
    }

    /// Interpret an image as a mask through its luma channel.
    ///
    /// Detector outputs that arrive as RGB or replicated-channel images land here.
    pub fn from_image(image: &Image) -> Self {
        let gray = DynamicImage::ImageRgba8(image.pixels().clone()).into_luma8();
        Self { weights: gray }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.weights.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.weights.height()
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.weights.dimensions()
    }

    /// `true` when either axis is zero.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Weight at `(x, y)` in `[0, 1]`.
    pub fn weight_at(&self, x: u32, y: u32) -> f32 {
        f32::from(self.weights.get_pixel(x, y).0[0]) / 255.0
    }

    /// `true` when no pixel carries any foreground weight.
    pub fn is_blank(&self) -> bool {
        self.weights.as_raw().iter().all(|&w| w == 0)
    }

    /// Borrow the raw 8-bit weights.
    pub fn luma(&self) -> &GrayImage {
        &self.weights
    }

    /// Resample to exactly `width x height` with a deterministic bilinear filter.
    pub fn resized_to(&self, width: u32, height: u32) -> SemanticResult<Mask> {
        if width == 0 || height == 0 {
            return Err(SemanticError::validation(
                "mask target extent must be non-zero",
            ));
        }
        if self.is_empty() {
            return Err(SemanticError::composable_inputs_required(
                "mask has zero extent",
            ));
        }
        if self.dimensions() == (width, height) {
            return Ok(self.clone());
        }
        Ok(Self {
            weights: imageops::resize(&self.weights, width, height, RESAMPLE_FILTER),
        })
    }

    /// Render as an opaque grayscale image (weight replicated into RGB).
    pub fn to_image(&self) -> Image {
        let (w, h) = self.dimensions();
        let rgba = RgbaImage::from_fn(w, h, |x, y| {
            let v = self.weights.get_pixel(x, y).0[0];
            Rgba([v, v, v, 255])
        });
        Image::new(rgba)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/mask.rs"]
mod tests;
