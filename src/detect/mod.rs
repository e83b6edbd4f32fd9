//! Region and mask providers.
//!
//! A [`Detector`] answers three questions about an orientation-normalized image: where the
//! subject is (dense mask), where instances of a [`RegionKind`] are (normalized boxes, in
//! detector order), and where a document quadrilateral is. Coordinates are normalized to
//! `[0, 1]` with a **top-left origin**; callers denormalize against the image extent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Point, Rect};
use crate::foundation::error::SemanticResult;
use crate::raster::image::Image;
use crate::raster::mask::Mask;

/// Key-colour segmentation.
pub mod chroma;
/// Replayed, pre-computed answers.
pub mod fixed;

pub use chroma::ChromaKeyDetector;
pub use fixed::FixedDetector;

/// Category of region a detector can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Human face.
    Face,
    /// Whole human body.
    Human,
    /// Animal (cat, dog, ...).
    Animal,
}

/// Axis-aligned box in normalized `[0, 1]` coordinates, top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width as a fraction of the image width.
    pub width: f64,
    /// Height as a fraction of the image height.
    pub height: f64,
}

impl NormalizedBox {
    /// Box from its top-left corner and size.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning the whole image.
    pub const fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// `true` when every field is finite and both sides are positive.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Scale into pixel space for an image of `extent`.
    pub fn to_pixel_rect(&self, extent: (u32, u32)) -> Rect {
        let (w, h) = (f64::from(extent.0), f64::from(extent.1));
        Rect::new(
            self.x * w,
            self.y * h,
            (self.x + self.width) * w,
            (self.y + self.height) * h,
        )
    }
}

/// Four normalized document corners, top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuad {
    /// Top-left corner.
    pub top_left: Point,
    /// Top-right corner.
    pub top_right: Point,
    /// Bottom-right corner.
    pub bottom_right: Point,
    /// Bottom-left corner.
    pub bottom_left: Point,
}

impl NormalizedQuad {
    /// Quad covering the box `b`.
    pub fn from_box(b: &NormalizedBox) -> Self {
        Self {
            top_left: Point::new(b.x, b.y),
            top_right: Point::new(b.x + b.width, b.y),
            bottom_right: Point::new(b.x + b.width, b.y + b.height),
            bottom_left: Point::new(b.x, b.y + b.height),
        }
    }

    /// Corners in clockwise order starting at top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Scale every corner into pixel space for an image of `extent`.
    pub fn to_pixel_corners(&self, extent: (u32, u32)) -> [Point; 4] {
        let (w, h) = (f64::from(extent.0), f64::from(extent.1));
        self.corners().map(|p| Point::new(p.x * w, p.y * h))
    }
}

/// Subject, region, and document detection over an orientation-normalized image.
///
/// Absence is not an error: `Ok(None)` / `Ok(vec![])` mean nothing was found.
pub trait Detector: Send + Sync {
    /// Dense foreground mask for the salient subject(s).
    fn segment_subject(&self, image: &Image) -> SemanticResult<Option<Mask>>;

    /// One box per recognized instance of `kind`, in detector order.
    fn detect_regions(&self, image: &Image, kind: RegionKind) -> SemanticResult<Vec<NormalizedBox>>;

    /// Corners of the most prominent rectangular document.
    fn detect_document(&self, image: &Image) -> SemanticResult<Option<NormalizedQuad>>;
}

/// Concrete provider chosen at construction.
#[derive(Clone, Debug)]
pub enum DetectorBackend {
    /// Pre-computed answers.
    Fixed(FixedDetector),
    /// Key-colour segmentation.
    ChromaKey(ChromaKeyDetector),
}

impl DetectorBackend {
    /// Share this backend behind a trait object.
    pub fn into_shared(self) -> Arc<dyn Detector> {
        match self {
            Self::Fixed(d) => Arc::new(d),
            Self::ChromaKey(d) => Arc::new(d),
        }
    }
}

impl Detector for DetectorBackend {
    fn segment_subject(&self, image: &Image) -> SemanticResult<Option<Mask>> {
        match self {
            Self::Fixed(d) => d.segment_subject(image),
            Self::ChromaKey(d) => d.segment_subject(image),
        }
    }

    fn detect_regions(&self, image: &Image, kind: RegionKind) -> SemanticResult<Vec<NormalizedBox>> {
        match self {
            Self::Fixed(d) => d.detect_regions(image, kind),
            Self::ChromaKey(d) => d.detect_regions(image, kind),
        }
    }

    fn detect_document(&self, image: &Image) -> SemanticResult<Option<NormalizedQuad>> {
        match self {
            Self::Fixed(d) => d.detect_document(image),
            Self::ChromaKey(d) => d.detect_document(image),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/detect/mod.rs"]
mod tests;
