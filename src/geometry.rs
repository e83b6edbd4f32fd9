//! Pure geometry for aligning two differently sized images.
//!
//! All functions take logical (orientation-normalized) extents. Callers guarantee positive,
//! finite reference extents; no function here fails.

use crate::foundation::core::{Rect, Size, Vec2};

/// Single uniform factor that makes `reference` cover `subject` on both axes.
///
/// The larger of the width and height ratios wins (cover, not fit).
pub fn scale_to_cover(subject: Size, reference: Size) -> f64 {
    let width_scale = subject.width / reference.width;
    let height_scale = subject.height / reference.height;
    width_scale.max(height_scale)
}

/// Rectangle of `target` size centered inside a `scaled` extent anchored at the origin.
pub fn centered_crop_rect(scaled: Size, target: Size) -> Rect {
    let cx = scaled.width / 2.0;
    let cy = scaled.height / 2.0;
    Rect::new(
        cx - target.width / 2.0,
        cy - target.height / 2.0,
        cx + target.width / 2.0,
        cy + target.height / 2.0,
    )
}

/// Translation that moves the minimum corner of `rect` to `(0, 0)`.
pub fn align_to_origin(rect: Rect) -> Vec2 {
    Vec2::new(-rect.x0, -rect.y0)
}

/// Integer origin of a crop of `target` pixels centered in `scaled` pixels.
///
/// Follows [`centered_crop_rect`] and [`align_to_origin`]; fractional centers floor.
pub fn centered_crop_origin(scaled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let rect = centered_crop_rect(size_of(scaled), size_of(target));
    let shift = align_to_origin(rect);
    let max_x = scaled.0.saturating_sub(target.0);
    let max_y = scaled.1.saturating_sub(target.1);
    let x = (-shift.x).floor().max(0.0) as u32;
    let y = (-shift.y).floor().max(0.0) as u32;
    (x.min(max_x), y.min(max_y))
}

/// Source-space window `(x, y, w, h)` of `reference` that a cover crop to `subject` samples.
///
/// Cropping this window and resampling it to `subject` matches scaling the whole reference by
/// [`scale_to_cover`] and cropping afterwards, without the scaled intermediate.
pub fn cover_source_crop(subject: (u32, u32), reference: (u32, u32)) -> (u32, u32, u32, u32) {
    let scale = scale_to_cover(size_of(subject), size_of(reference));
    if !scale.is_finite() || scale <= 0.0 {
        return (0, 0, reference.0, reference.1);
    }
    let span = |want: u32, have: u32| {
        (f64::from(want) / scale)
            .round()
            .clamp(1.0, f64::from(have.max(1))) as u32
    };
    let window = (span(subject.0, reference.0), span(subject.1, reference.1));
    let (x, y) = centered_crop_origin(reference, window);
    (x, y, window.0, window.1)
}

pub(crate) fn size_of(dim: (u32, u32)) -> Size {
    Size::new(f64::from(dim.0), f64::from(dim.1))
}

#[cfg(test)]
#[path = "../tests/unit/geometry.rs"]
mod tests;
