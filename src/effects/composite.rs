use image::{GrayImage, RgbaImage, imageops};
use rayon::prelude::*;

use crate::effects::blur::gaussian_blur;
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::foundation::math::lerp_u8;
use crate::geometry::cover_source_crop;
use crate::raster::image::Image;
use crate::raster::mask::Mask;
use crate::raster::orientation::{normalize, normalized};
use crate::raster::resample_rgba;

/// Default inward crop applied to a blurred background before resampling it back.
pub const BLUR_INSET_FRACTION: f64 = 0.001;

/// One compositing call: consumed exactly once, never retained.
#[derive(Clone, Debug)]
pub struct CompositeRequest {
    /// Subject image; defines the output extent.
    pub foreground: Image,
    /// Image shown wherever the mask is below 1.
    pub background: Image,
    /// Foreground weight.
    pub mask: Mask,
}

impl CompositeRequest {
    /// Run [`composite`] on this request.
    pub fn run(self) -> SemanticResult<Image> {
        composite(self.foreground, &self.background, &self.mask)
    }
}

/// Blend `foreground` over a cover-scaled, center-cropped `background` through `mask`.
///
/// 1. both inputs are orientation-normalized;
/// 2. the background is scaled to cover the foreground and center-cropped to its extent;
/// 3. the mask is resampled to the foreground extent;
/// 4. `out = fg * m + bg * (1 - m)` per channel.
///
/// The output always has the foreground's extent. Zero-extent inputs fail with
/// "composable inputs required" and nothing is produced.
pub fn composite(foreground: Image, background: &Image, mask: &Mask) -> SemanticResult<Image> {
    let foreground = normalize(foreground);
    let background = normalized(background);
    ensure_composable(&foreground, "foreground")?;
    ensure_composable(&background, "background")?;
    if mask.is_empty() {
        return Err(SemanticError::composable_inputs_required(
            "mask has zero extent",
        ));
    }

    let (width, height) = foreground.dimensions();
    let aligned = aligned_background(&background, (width, height))?;
    let weights = mask.resized_to(width, height)?;
    let out = blend_by_mask(foreground.pixels(), &aligned, weights.luma())?;

    tracing::debug!(
        width,
        height,
        bg_width = background.width(),
        bg_height = background.height(),
        "composited foreground over background"
    );
    Ok(Image::new(out))
}

/// Background scaled to cover `target` and cropped to it, with its crop moved to the origin.
///
/// This is the exact background term [`composite`] blends with.
pub fn aligned_background(background: &Image, target: (u32, u32)) -> SemanticResult<RgbaImage> {
    let background = normalized(background);
    ensure_composable(&background, "background")?;
    if target.0 == 0 || target.1 == 0 {
        return Err(SemanticError::composable_inputs_required(
            "target has zero extent",
        ));
    }

    let (x, y, w, h) = cover_source_crop(target, background.dimensions());
    let window = imageops::crop_imm(background.pixels(), x, y, w, h).to_image();
    Ok(resample_rgba(&window, target.0, target.1))
}

/// Keep the subject sharp and replace everything behind it with a blurred copy of `image`.
///
/// The blurred copy is cropped inward by `inset_fraction` of each axis and resampled back to
/// full size, hiding the edge bleed of the blur kernel. `intensity` is the Gaussian sigma in
/// pixels; `<= 0` leaves the background unblurred.
pub fn blur_variant(
    image: Image,
    mask: &Mask,
    intensity: f32,
    inset_fraction: f64,
) -> SemanticResult<Image> {
    let image = normalize(image);
    ensure_composable(&image, "image")?;
    if mask.is_empty() {
        return Err(SemanticError::composable_inputs_required(
            "mask has zero extent",
        ));
    }
    if !(0.0..0.5).contains(&inset_fraction) {
        return Err(SemanticError::validation(
            "blur inset fraction must be in [0, 0.5)",
        ));
    }

    let (width, height) = image.dimensions();
    let blurred = gaussian_blur(image.pixels(), intensity)?;
    let inset_x = (f64::from(width) * inset_fraction).round() as u32;
    let inset_y = (f64::from(height) * inset_fraction).round() as u32;
    let background = if inset_x == 0 && inset_y == 0 {
        blurred
    } else {
        let inner = imageops::crop_imm(
            &blurred,
            inset_x,
            inset_y,
            width - 2 * inset_x,
            height - 2 * inset_y,
        )
        .to_image();
        resample_rgba(&inner, width, height)
    };

    let weights = mask.resized_to(width, height)?;
    let out = blend_by_mask(image.pixels(), &background, weights.luma())?;
    tracing::debug!(width, height, intensity, inset_x, inset_y, "blurred background");
    Ok(Image::new(out))
}

/// Per-pixel, per-channel `fg * m + bg * (1 - m)` over equal-sized buffers.
pub fn blend_by_mask(
    foreground: &RgbaImage,
    background: &RgbaImage,
    mask: &GrayImage,
) -> SemanticResult<RgbaImage> {
    let dims = foreground.dimensions();
    if background.dimensions() != dims || mask.dimensions() != dims {
        return Err(SemanticError::composite(format!(
            "blend expects equal extents: fg {:?}, bg {:?}, mask {:?}",
            dims,
            background.dimensions(),
            mask.dimensions()
        )));
    }
    let (width, height) = dims;
    if width == 0 || height == 0 {
        return Err(SemanticError::composable_inputs_required(
            "blend inputs have zero extent",
        ));
    }

    let stride = width as usize * 4;
    let mut out = vec![0u8; stride * height as usize];
    out.par_chunks_exact_mut(stride)
        .zip(foreground.as_raw().par_chunks_exact(stride))
        .zip(background.as_raw().par_chunks_exact(stride))
        .zip(mask.as_raw().par_chunks_exact(width as usize))
        .for_each(|(((dst, fg), bg), m)| {
            for (((d, f), b), &w) in dst
                .chunks_exact_mut(4)
                .zip(fg.chunks_exact(4))
                .zip(bg.chunks_exact(4))
                .zip(m.iter())
            {
                for c in 0..4 {
                    d[c] = lerp_u8(f[c], b[c], w);
                }
            }
        });

    RgbaImage::from_raw(width, height, out)
        .ok_or_else(|| SemanticError::composite("blend output size mismatch"))
}

fn ensure_composable(image: &Image, role: &str) -> SemanticResult<()> {
    if image.is_empty() {
        return Err(SemanticError::composable_inputs_required(format!(
            "{role} has zero extent"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
