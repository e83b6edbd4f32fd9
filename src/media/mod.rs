//! Container demux/mux contracts.
//!
//! A [`MediaSource`] opens into independent per-track readers and a [`MediaSink`] hands out
//! independent per-track writers, so the video and audio lanes of a transcode never share a
//! handle. Only the sink itself finalizes or aborts the output.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{FrameRate, Timestamp};
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::raster::image::Image;
use crate::raster::orientation::Orientation;

/// `ffmpeg`/`ffprobe` subprocess implementation.
pub mod ffmpeg;
/// In-memory implementation.
pub mod memory;

pub use ffmpeg::{FfmpegSink, FfmpegSource, is_ffmpeg_on_path, probe_video};
pub use memory::{MemorySink, MemorySource, Recording};

/// One decoded video frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Pixel data. Its orientation flag is identity once the pipeline has normalized it.
    pub image: Image,
    /// Presentation timestamp from the source.
    pub pts: Timestamp,
}

impl Frame {
    /// Frame carrying `image` at `pts`.
    pub fn new(image: Image, pts: Timestamp) -> Self {
        Self { image, pts }
    }
}

/// Interleaved `f32` PCM samples.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBlock {
    /// Presentation timestamp of the first sample.
    pub pts: Timestamp,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Interleaved samples, `frames * channels` long.
    pub samples: Vec<f32>,
}

impl AudioBlock {
    /// Sample frames (one sample per channel) in this block.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / usize::from(self.channels)
        }
    }
}

/// Sample layout of an audio track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// Track metadata of a source video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoSourceInfo {
    /// Natural (stored) frame width.
    pub width: u32,
    /// Natural (stored) frame height.
    pub height: u32,
    /// Clockwise display rotation stored as track metadata.
    pub rotation_degrees: i32,
    /// Nominal frame rate.
    pub frame_rate: FrameRate,
    /// Ticks per second of frame timestamps.
    pub timescale: u32,
    /// Audio track layout, if the source has one.
    pub audio: Option<AudioFormat>,
}

impl VideoSourceInfo {
    /// Stored rotation as an orientation flag.
    pub fn orientation(&self) -> Orientation {
        Orientation::from_rotation_degrees(self.rotation_degrees)
    }

    /// `true` for a 90 or 270 degree rotation.
    pub fn is_quarter_turn(&self) -> bool {
        self.orientation().swaps_axes()
    }

    /// Frame size after the stored rotation is applied.
    pub fn display_size(&self) -> (u32, u32) {
        if self.is_quarter_turn() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Sequential video frame reader.
pub trait VideoFrameReader: Send {
    /// Next frame in decode order, `None` once exhausted.
    fn next_frame(&mut self) -> SemanticResult<Option<Frame>>;
}

/// Sequential audio block reader.
pub trait AudioBlockReader: Send {
    /// Next block in decode order, `None` once exhausted.
    fn next_block(&mut self) -> SemanticResult<Option<AudioBlock>>;
}

/// Opened source: metadata plus one reader per track.
pub struct SourceTracks {
    /// Track metadata.
    pub info: VideoSourceInfo,
    /// Video track reader.
    pub video: Box<dyn VideoFrameReader>,
    /// Audio track reader, absent when the source has no audio.
    pub audio: Option<Box<dyn AudioBlockReader>>,
}

/// Something that can be opened for reading exactly once per job.
pub trait MediaSource: Send {
    /// Open the source. Failure here is a setup failure.
    fn open(&mut self) -> SemanticResult<SourceTracks>;
}

/// Output track configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Encoded frame width.
    pub width: u32,
    /// Encoded frame height.
    pub height: u32,
    /// Nominal frame rate.
    pub frame_rate: FrameRate,
    /// Ticks per second of written timestamps.
    pub timescale: u32,
    /// Rotation stored as track metadata; always 0 since rotation is baked into pixels.
    pub rotation_degrees: i32,
    /// Audio track layout, if audio is written.
    pub audio: Option<AudioFormat>,
}

impl OutputConfig {
    /// Reject zero extents and zero timescales.
    pub fn validate(&self) -> SemanticResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SemanticError::validation(
                "output width/height must be non-zero",
            ));
        }
        if self.timescale == 0 {
            return Err(SemanticError::validation("output timescale must be non-zero"));
        }
        if let Some(a) = self.audio
            && (a.sample_rate == 0 || a.channels == 0)
        {
            return Err(SemanticError::validation(
                "audio sample rate and channel count must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Video half of an output writer.
pub trait VideoTrackWriter: Send {
    /// Append one frame at `pts`. Timestamps must be strictly increasing.
    fn append_video(&mut self, image: &Image, pts: Timestamp) -> SemanticResult<()>;

    /// Mark the track complete. Further appends fail.
    ///
    /// `source_end` is the timestamp of the last frame read from the source. Frames dropped at
    /// the tail still occupy their time on the output track.
    fn finish_track(&mut self, source_end: Option<Timestamp>) -> SemanticResult<()>;
}

/// Audio half of an output writer.
pub trait AudioTrackWriter: Send {
    /// Append one block unmodified. Timestamps must be strictly increasing.
    fn append_audio(&mut self, block: &AudioBlock) -> SemanticResult<()>;

    /// Mark the track complete. Further appends fail.
    fn finish_track(&mut self) -> SemanticResult<()>;
}

/// Per-track writers handed out by [`MediaSink::begin`].
pub struct TrackWriters {
    /// Video track writer.
    pub video: Box<dyn VideoTrackWriter>,
    /// Audio track writer, present iff the config carries audio.
    pub audio: Option<Box<dyn AudioTrackWriter>>,
}

/// Finalized output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaOutput {
    /// A finished container file.
    File(PathBuf),
    /// Output kept in memory.
    Memory,
}

impl MediaOutput {
    /// Path of the finished file, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Memory => None,
        }
    }
}

/// Output destination.
///
/// `begin` is a setup step; `finish` and `abort` are called at most once, from the join point,
/// after both track writers have been dropped.
pub trait MediaSink: Send {
    /// Open the destination. Failure here is a setup failure.
    fn begin(&mut self, config: &OutputConfig) -> SemanticResult<TrackWriters>;

    /// Close the container and publish it.
    fn finish(&mut self) -> SemanticResult<MediaOutput>;

    /// Discard everything written so far. Nothing is left at the destination.
    fn abort(&mut self);
}

pub(crate) fn ensure_increasing(
    last: &mut Option<Timestamp>,
    pts: Timestamp,
    track: &str,
) -> SemanticResult<()> {
    if let Some(prev) = *last
        && pts.cmp_time(&prev).is_le()
    {
        return Err(SemanticError::media(format!(
            "{track} timestamps must increase: {}/{} after {}/{}",
            pts.value, pts.timescale, prev.value, prev.timescale
        )));
    }
    *last = Some(pts);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/media/mod.rs"]
mod tests;
