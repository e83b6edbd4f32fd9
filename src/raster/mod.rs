//! Pixel buffers: images, soft masks, and orientation normalization.

/// RGBA image with an orientation flag.
pub mod image;
/// Single-channel soft masks.
pub mod mask;
/// Baking stored rotation into pixel data.
pub mod orientation;

use ::image::{RgbaImage, imageops::FilterType};

/// Deterministic bilinear resample used by every geometry-sensitive path.
pub(crate) const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

pub(crate) fn resample_rgba(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    ::image::imageops::resize(src, width, height, RESAMPLE_FILTER)
}
