use image::imageops;

use crate::detect::NormalizedBox;
use crate::foundation::core::Rect;
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::raster::image::Image;
use crate::raster::orientation::normalized;

/// Pixel-space rect for a normalized box on an image of `extent`.
pub fn denormalize(b: &NormalizedBox, extent: (u32, u32)) -> Rect {
    b.to_pixel_rect(extent)
}

/// Grow `rect` by `factor` around its center, then clamp each edge to `bounds` on its own.
///
/// Clamping is an intersection: an edge that overflows is pulled back to the bound and the
/// opposite edge keeps its expanded position.
pub fn expand_and_clamp(rect: Rect, factor: f64, bounds: (u32, u32)) -> Rect {
    let center = rect.center();
    let half_w = rect.width() * factor / 2.0;
    let half_h = rect.height() * factor / 2.0;
    Rect::new(
        (center.x - half_w).max(0.0),
        (center.y - half_h).max(0.0),
        (center.x + half_w).min(f64::from(bounds.0)),
        (center.y + half_h).min(f64::from(bounds.1)),
    )
}

/// Crop the region `b` (grown by `expansion`, `1.0` = unchanged) out of `image`.
///
/// The image is orientation-normalized first. Returns `Ok(None)` when the clamped region
/// covers no whole pixel.
pub fn crop_region(image: &Image, b: &NormalizedBox, expansion: f64) -> SemanticResult<Option<Image>> {
    if !(expansion.is_finite() && expansion > 0.0) {
        return Err(SemanticError::validation(
            "region expansion must be finite and > 0",
        ));
    }
    let image = normalized(image);
    if image.is_empty() {
        return Err(SemanticError::composable_inputs_required(
            "image has zero extent",
        ));
    }
    if !b.is_valid() {
        return Ok(None);
    }

    let extent = image.dimensions();
    let rect = expand_and_clamp(denormalize(b, extent), expansion, extent);
    let Some((x, y, w, h)) = pixel_bounds(rect, extent) else {
        return Ok(None);
    };
    let crop = imageops::crop_imm(image.pixels(), x, y, w, h).to_image();
    tracing::debug!(x, y, width = w, height = h, "cropped region");
    Ok(Some(Image::new(crop)))
}

/// Crop every box independently, preserving detector order.
///
/// Boxes that clamp to nothing are skipped.
pub fn extract_regions(
    image: &Image,
    boxes: &[NormalizedBox],
    expansion: f64,
) -> SemanticResult<Vec<Image>> {
    let mut out = Vec::with_capacity(boxes.len());
    for (index, b) in boxes.iter().enumerate() {
        match crop_region(image, b, expansion)? {
            Some(crop) => out.push(crop),
            None => tracing::warn!(index, "region clamps to an empty crop, skipped"),
        }
    }
    Ok(out)
}

/// Slack absorbing float noise from normalized coordinates before snapping to pixels.
const SNAP_EPSILON: f64 = 1e-6;

fn pixel_bounds(rect: Rect, extent: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    let x0 = (rect.x0 + SNAP_EPSILON).floor().clamp(0.0, f64::from(extent.0)) as u32;
    let y0 = (rect.y0 + SNAP_EPSILON).floor().clamp(0.0, f64::from(extent.1)) as u32;
    let x1 = (rect.x1 - SNAP_EPSILON).ceil().clamp(0.0, f64::from(extent.0)) as u32;
    let y1 = (rect.y1 - SNAP_EPSILON).ceil().clamp(0.0, f64::from(extent.1)) as u32;
    (x1 > x0 && y1 > y0).then(|| (x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
#[path = "../../tests/unit/extract/region.rs"]
mod tests;
