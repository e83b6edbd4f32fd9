//! Public operation surface.
//!
//! Still-image operations are best effort: failures are logged with `tracing::warn!` and surface
//! as `None` or an empty `Vec`. Video operations report through their completion exactly once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::EditorConfig;
use crate::detect::{Detector, DetectorBackend, RegionKind};
use crate::effects::composite::{aligned_background, blur_variant, composite};
use crate::extract::{crop_region, extract_regions, rectify_document};
use crate::foundation::error::SemanticResult;
use crate::media::{FfmpegSink, FfmpegSource, Frame, MediaSink, MediaSource};
use crate::pipeline::{TranscodeHandle, TranscodeOutput, stream_transform};
use crate::raster::image::Image;
use crate::raster::mask::Mask;
use crate::raster::orientation::normalized;

/// Editor bound to one detector and one configuration.
///
/// Holds no per-call state; every operation is reentrant.
#[derive(Clone)]
pub struct SemanticImage {
    detector: Arc<dyn Detector>,
    config: EditorConfig,
}

impl std::fmt::Debug for SemanticImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticImage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SemanticImage {
    /// Editor with the default configuration.
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self {
            detector,
            config: EditorConfig::default(),
        }
    }

    /// Editor with a validated configuration.
    pub fn with_config(detector: Arc<dyn Detector>, config: EditorConfig) -> SemanticResult<Self> {
        config.validate()?;
        Ok(Self { detector, config })
    }

    /// Editor over one of the built-in providers.
    pub fn from_backend(backend: DetectorBackend, config: EditorConfig) -> SemanticResult<Self> {
        Self::with_config(backend.into_shared(), config)
    }

    /// Active configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Decode encoded image bytes, `None` when they are not an image.
    pub fn decode(bytes: &[u8]) -> Option<Image> {
        best_effort("decode", Image::from_encoded(bytes).map(Some))
    }

    /// Foreground mask of the subject, at the image's upright extent.
    pub fn person_mask(&self, image: &Image) -> Option<Mask> {
        best_effort("person_mask", subject_mask(self.detector.as_ref(), image))
    }

    /// [`SemanticImage::person_mask`] rendered as an opaque grayscale image.
    pub fn person_mask_image(&self, image: &Image) -> Option<Image> {
        self.person_mask(image).map(|m| m.to_image())
    }

    /// Place the subject of `subject` over `background`.
    ///
    /// The result has the subject image's extent. `None` when no subject is found.
    pub fn swap_background(&self, subject: &Image, background: &Image) -> Option<Image> {
        best_effort(
            "swap_background",
            subject_mask(self.detector.as_ref(), subject).and_then(|mask| {
                mask.map(|m| composite(subject.clone(), background, &m))
                    .transpose()
            }),
        )
    }

    /// Keep the subject sharp over a Gaussian-blurred copy of the image (sigma `intensity`).
    pub fn blur_subject(&self, image: &Image, intensity: f32) -> Option<Image> {
        let inset = self.config.blur_inset_fraction;
        best_effort(
            "blur_subject",
            subject_mask(self.detector.as_ref(), image).and_then(|mask| {
                mask.map(|m| blur_variant(image.clone(), &m, intensity, inset))
                    .transpose()
            }),
        )
    }

    /// First detected face, grown by `face_expansion` and clamped to the image.
    pub fn extract_face(&self, image: &Image) -> Option<Image> {
        self.first_region(image, RegionKind::Face, self.config.face_expansion)
    }

    /// Every detected face, in detector order.
    ///
    /// Boxes that clamp to no whole pixel are skipped, so the result can be shorter than the
    /// detector's list and indices need not line up with it.
    pub fn extract_faces(&self, image: &Image) -> Vec<Image> {
        self.all_regions(image, RegionKind::Face, self.config.face_expansion)
    }

    /// First detected human body.
    pub fn extract_human_region(&self, image: &Image) -> Option<Image> {
        self.first_region(image, RegionKind::Human, 1.0)
    }

    /// Every detected human body, in detector order.
    ///
    /// Boxes that clamp to no whole pixel are skipped, so the result can be shorter than the
    /// detector's list and indices need not line up with it.
    pub fn extract_human_regions(&self, image: &Image) -> Vec<Image> {
        self.all_regions(image, RegionKind::Human, 1.0)
    }

    /// First detected animal.
    pub fn extract_animal_region(&self, image: &Image) -> Option<Image> {
        self.first_region(image, RegionKind::Animal, 1.0)
    }

    /// Every detected animal, in detector order.
    ///
    /// Boxes that clamp to no whole pixel are skipped, so the result can be shorter than the
    /// detector's list and indices need not line up with it.
    pub fn extract_animal_regions(&self, image: &Image) -> Vec<Image> {
        self.all_regions(image, RegionKind::Animal, 1.0)
    }

    /// Detected document, perspective-corrected into an upright rectangle.
    pub fn extract_document_region(&self, image: &Image) -> Option<Image> {
        let upright = normalized(image);
        best_effort(
            "extract_document_region",
            self.detector
                .detect_document(&upright)
                .and_then(|quad| quad.map(|q| rectify_document(&upright, &q)).transpose())
                .map(Option::flatten),
        )
    }

    fn first_region(&self, image: &Image, kind: RegionKind, expansion: f64) -> Option<Image> {
        let upright = normalized(image);
        let result = self
            .detector
            .detect_regions(&upright, kind)
            .and_then(|boxes| match boxes.first() {
                Some(b) => crop_region(&upright, b, expansion),
                None => Ok(None),
            });
        best_effort("extract_region", result)
    }

    fn all_regions(&self, image: &Image, kind: RegionKind, expansion: f64) -> Vec<Image> {
        let upright = normalized(image);
        let result = self
            .detector
            .detect_regions(&upright, kind)
            .and_then(|boxes| extract_regions(&upright, &boxes, expansion));
        best_effort("extract_regions", result.map(Some)).unwrap_or_default()
    }

    /// Replace the background of every frame of the video at `source` with `background`.
    ///
    /// Output is written into the configured output directory. Frames without a detected subject
    /// show only the background.
    pub fn swap_background_in_video(
        &self,
        source: &Path,
        background: &Image,
        completion: impl FnOnce(SemanticResult<TranscodeOutput>) + Send + 'static,
    ) -> TranscodeHandle {
        let destination = self.video_destination(source, "swapped");
        self.swap_background_in_media(
            FfmpegSource::new(source, self.config.audio.clone()),
            background,
            FfmpegSink::new(destination, self.config.encoder.clone()),
            completion,
        )
    }

    /// Apply `filter` to every frame of the video at `source`; `None` drops the frame.
    pub fn apply_filter_to_video<F>(
        &self,
        source: &Path,
        filter: F,
        completion: impl FnOnce(SemanticResult<TranscodeOutput>) + Send + 'static,
    ) -> TranscodeHandle
    where
        F: FnMut(Image) -> Option<Image> + Send + 'static,
    {
        let destination = self.video_destination(source, "filtered");
        Self::apply_filter_in_media(
            FfmpegSource::new(source, self.config.audio.clone()),
            filter,
            FfmpegSink::new(destination, self.config.encoder.clone()),
            completion,
        )
    }

    /// [`SemanticImage::swap_background_in_video`] over any source and sink.
    pub fn swap_background_in_media<S, K>(
        &self,
        source: S,
        background: &Image,
        sink: K,
        completion: impl FnOnce(SemanticResult<TranscodeOutput>) + Send + 'static,
    ) -> TranscodeHandle
    where
        S: MediaSource,
        K: MediaSink + 'static,
    {
        let detector = Arc::clone(&self.detector);
        let background = normalized(background).into_owned();
        let mut aligned: Option<Image> = None;
        let per_frame = move |frame: Frame| {
            let size = frame.image.dimensions();
            if aligned.as_ref().is_none_or(|a| a.dimensions() != size) {
                match aligned_background(&background, size) {
                    Ok(bg) => aligned = Some(Image::new(bg)),
                    Err(e) => {
                        tracing::warn!(error = %e, "background cannot cover frame");
                        return None;
                    }
                }
            }
            let bg = aligned.as_ref()?;
            let mask = match detector.segment_subject(&frame.image) {
                Ok(Some(m)) => m,
                Ok(None) => Mask::filled(size.0, size.1, 0.0),
                Err(e) => {
                    tracing::warn!(error = %e, "segmentation failed");
                    return None;
                }
            };
            match composite(frame.image, bg, &mask) {
                Ok(image) => Some(Frame::new(image, frame.pts)),
                Err(e) => {
                    tracing::warn!(error = %e, "frame composite failed");
                    None
                }
            }
        };
        stream_transform(source, per_frame, sink, completion)
    }

    /// [`SemanticImage::apply_filter_to_video`] over any source and sink.
    pub fn apply_filter_in_media<S, K, F>(
        source: S,
        mut filter: F,
        sink: K,
        completion: impl FnOnce(SemanticResult<TranscodeOutput>) + Send + 'static,
    ) -> TranscodeHandle
    where
        S: MediaSource,
        K: MediaSink + 'static,
        F: FnMut(Image) -> Option<Image> + Send + 'static,
    {
        let per_frame = move |frame: Frame| {
            let pts = frame.pts;
            filter(frame.image).map(|image| Frame::new(image, pts))
        };
        stream_transform(source, per_frame, sink, completion)
    }

    fn video_destination(&self, source: &Path, operation: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_owned());
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        self.config
            .output_dir()
            .join(format!("{stem}-{operation}-{stamp}-{seq}.mp4"))
    }
}

fn subject_mask(detector: &dyn Detector, image: &Image) -> SemanticResult<Option<Mask>> {
    let upright = normalized(image);
    let Some(mask) = detector.segment_subject(&upright)? else {
        return Ok(None);
    };
    if mask.is_blank() {
        return Ok(None);
    }
    mask.resized_to(upright.width(), upright.height()).map(Some)
}

fn best_effort<T>(operation: &str, result: SemanticResult<Option<T>>) -> Option<T> {
    match result {
        Ok(Some(v)) => Some(v),
        Ok(None) => {
            tracing::debug!(operation, "nothing detected");
            None
        }
        Err(e) => {
            tracing::warn!(operation, error = %e, "operation failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/editor.rs"]
mod tests;
