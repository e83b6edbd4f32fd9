use std::collections::BTreeMap;

use crate::detect::{Detector, NormalizedBox, NormalizedQuad, RegionKind};
use crate::foundation::error::SemanticResult;
use crate::raster::image::Image;
use crate::raster::mask::Mask;

/// Detector that replays pre-computed answers regardless of the input image.
///
/// Useful for results produced by an external model run, and for tests. The subject mask is
/// returned as stored; callers resample it to the image extent.
#[derive(Clone, Debug, Default)]
pub struct FixedDetector {
    subject: Option<Mask>,
    regions: BTreeMap<RegionKind, Vec<NormalizedBox>>,
    document: Option<NormalizedQuad>,
}

impl FixedDetector {
    /// Detector that finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `mask` as the subject.
    pub fn with_subject(mut self, mask: Mask) -> Self {
        self.subject = Some(mask);
        self
    }

    /// Report `boxes`, in order, for `kind`.
    pub fn with_regions(mut self, kind: RegionKind, boxes: Vec<NormalizedBox>) -> Self {
        self.regions.insert(kind, boxes);
        self
    }

    /// Report `quad` as the document.
    pub fn with_document(mut self, quad: NormalizedQuad) -> Self {
        self.document = Some(quad);
        self
    }
}

impl Detector for FixedDetector {
    fn segment_subject(&self, _image: &Image) -> SemanticResult<Option<Mask>> {
        Ok(self.subject.clone())
    }

    fn detect_regions(&self, _image: &Image, kind: RegionKind) -> SemanticResult<Vec<NormalizedBox>> {
        Ok(self.regions.get(&kind).cloned().unwrap_or_default())
    }

    fn detect_document(&self, _image: &Image) -> SemanticResult<Option<NormalizedQuad>> {
        Ok(self.document)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/detect/fixed.rs"]
mod tests;
