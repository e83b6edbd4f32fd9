use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::detect::{Detector, NormalizedBox, NormalizedQuad, RegionKind};
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::raster::image::Image;
use crate::raster::mask::Mask;

/// Weight at or above which a pixel counts toward the subject's bounding box.
const SUBJECT_THRESHOLD: u8 = 128;

/// Non-ML segmentation that treats pixels close to a key colour as background.
///
/// Distance is Euclidean RGB distance scaled to `[0, 1]`. Pixels within `tolerance` of the key
/// are background, pixels beyond `tolerance + softness` are foreground, and the band between
/// ramps smoothly. Every region query reports the bounding box of the keyed subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaKeyDetector {
    /// Background colour, RGB.
    pub key: [u8; 3],
    /// Normalized distance treated as pure background.
    pub tolerance: f32,
    /// Width of the soft band past `tolerance`.
    pub softness: f32,
}

impl Default for ChromaKeyDetector {
    fn default() -> Self {
        Self {
            key: [0, 255, 0],
            tolerance: 0.25,
            softness: 0.1,
        }
    }
}

impl ChromaKeyDetector {
    /// Detector keyed on `key` with default tolerances.
    pub fn new(key: [u8; 3]) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Check tolerances are usable.
    pub fn validate(&self) -> SemanticResult<()> {
        if !(self.tolerance.is_finite() && (0.0..=1.0).contains(&self.tolerance)) {
            return Err(SemanticError::validation(
                "chroma key tolerance must be in [0, 1]",
            ));
        }
        if !(self.softness.is_finite() && self.softness >= 0.0) {
            return Err(SemanticError::validation(
                "chroma key softness must be finite and >= 0",
            ));
        }
        Ok(())
    }

    fn weight(&self, px: &Rgba<u8>) -> f32 {
        let d2: f32 = (0..3)
            .map(|c| {
                let d = f32::from(px.0[c]) - f32::from(self.key[c]);
                d * d
            })
            .sum();
        let dist = d2.sqrt() / (255.0 * 3f32.sqrt());
        if self.softness <= 0.0 {
            return if dist > self.tolerance { 1.0 } else { 0.0 };
        }
        smoothstep(self.tolerance, self.tolerance + self.softness, dist)
    }

    fn key_mask(&self, image: &Image) -> SemanticResult<Option<Mask>> {
        self.validate()?;
        if image.is_empty() {
            return Ok(None);
        }
        let px = image.pixels();
        let mask = Mask::from_fn(image.width(), image.height(), |x, y| {
            self.weight(px.get_pixel(x, y))
        });
        Ok((!mask.is_blank()).then_some(mask))
    }

    fn subject_box(&self, image: &Image) -> SemanticResult<Option<NormalizedBox>> {
        let Some(mask) = self.key_mask(image)? else {
            return Ok(None);
        };
        let (w, h) = mask.dimensions();
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in mask.luma().enumerate_pixels() {
            if p.0[0] < SUBJECT_THRESHOLD {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        Ok(bounds.map(|(x0, y0, x1, y1)| {
            let (w, h) = (f64::from(w), f64::from(h));
            NormalizedBox::new(
                f64::from(x0) / w,
                f64::from(y0) / h,
                f64::from(x1 - x0 + 1) / w,
                f64::from(y1 - y0 + 1) / h,
            )
        }))
    }
}

impl Detector for ChromaKeyDetector {
    fn segment_subject(&self, image: &Image) -> SemanticResult<Option<Mask>> {
        let mask = self.key_mask(image)?;
        if let Some(m) = &mask {
            tracing::debug!(width = m.width(), height = m.height(), "chroma key mask");
        }
        Ok(mask)
    }

    fn detect_regions(&self, image: &Image, _kind: RegionKind) -> SemanticResult<Vec<NormalizedBox>> {
        Ok(self.subject_box(image)?.into_iter().collect())
    }

    fn detect_document(&self, image: &Image) -> SemanticResult<Option<NormalizedQuad>> {
        Ok(self.subject_box(image)?.as_ref().map(NormalizedQuad::from_box))
    }
}

fn smoothstep(a: f32, b: f32, x: f32) -> f32 {
    let t = ((x - a) / (b - a)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
#[path = "../../tests/unit/detect/chroma.rs"]
mod tests;
