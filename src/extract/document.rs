use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

use crate::detect::NormalizedQuad;
use crate::foundation::core::Point;
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::raster::image::Image;
use crate::raster::orientation::normalized;

/// Warp the quadrilateral `quad` of `image` into an upright rectangle.
///
/// The output width is the longer of the top and bottom edges, the height the longer of the
/// left and right edges. Degenerate quads (collinear corners, sub-pixel edges) yield `Ok(None)`.
pub fn rectify_document(image: &Image, quad: &NormalizedQuad) -> SemanticResult<Option<Image>> {
    let image = normalized(image);
    if image.is_empty() {
        return Err(SemanticError::composable_inputs_required(
            "image has zero extent",
        ));
    }
    let corners = quad.to_pixel_corners(image.dimensions());
    if corners.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return Ok(None);
    }
    let [tl, tr, br, bl] = corners;

    let width = edge(tl, tr).max(edge(bl, br)).round();
    let height = edge(tl, bl).max(edge(tr, br)).round();
    if width < 1.0 || height < 1.0 {
        return Ok(None);
    }
    let (width, height) = (width as u32, height as u32);

    let from = corners.map(|p| (p.x as f32, p.y as f32));
    let to = [
        (0.0, 0.0),
        (width as f32, 0.0),
        (width as f32, height as f32),
        (0.0, height as f32),
    ];
    let Some(projection) = Projection::from_control_points(from, to) else {
        tracing::warn!("document corners do not define a projection");
        return Ok(None);
    };

    let mut out = RgbaImage::new(width, height);
    warp_into(
        image.pixels(),
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
        &mut out,
    );
    tracing::debug!(width, height, "rectified document");
    Ok(Some(Image::new(out)))
}

fn edge(a: Point, b: Point) -> f64 {
    (b - a).hypot()
}

#[cfg(test)]
#[path = "../../tests/unit/extract/document.rs"]
mod tests;
