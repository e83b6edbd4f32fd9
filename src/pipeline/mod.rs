//! Frame streaming pipeline: a video lane and an audio lane joined by an AND-join.

/// Lane completion flags and the AND-join.
pub mod job;
/// Lane loops and job setup.
pub mod transcode;

pub use job::PipelineJob;
pub use transcode::{
    TranscodeHandle, TranscodeOutput, TranscodeReport, stream_transform, stream_transform_blocking,
};
