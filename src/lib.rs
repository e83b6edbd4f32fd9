#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Semantic image editing.
//!
//! - [`effects`]: mask-guided compositing and the blurred-background variant.
//! - [`extract`]: cropping detector regions and rectifying documents.
//! - [`raster`]: images, masks, and orientation normalization.
//! - [`pipeline`]: frame-streaming video transcodes with a video and an audio lane.
//! - [`editor`]: the public still-image and video operations over a [`detect::Detector`].

pub mod config;
pub mod detect;
pub mod editor;
pub mod effects;
pub mod extract;
pub mod foundation;
pub mod geometry;
pub mod media;
pub mod pipeline;
pub mod raster;

pub use config::{AudioConfig, EditorConfig, EncoderConfig};
pub use detect::{
    ChromaKeyDetector, Detector, DetectorBackend, FixedDetector, NormalizedBox, NormalizedQuad,
    RegionKind,
};
pub use editor::SemanticImage;
pub use effects::composite::{CompositeRequest, blur_variant, composite};
pub use foundation::core::{FrameRate, Lane, Timestamp};
pub use foundation::error::{SemanticError, SemanticResult};
pub use media::{
    AudioBlock, Frame, MediaOutput, MediaSink, MediaSource, OutputConfig, VideoSourceInfo,
};
pub use pipeline::{TranscodeHandle, TranscodeOutput, TranscodeReport, stream_transform};
pub use raster::image::Image;
pub use raster::mask::Mask;
pub use raster::orientation::{Orientation, normalize};
