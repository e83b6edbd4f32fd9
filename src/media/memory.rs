use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::Timestamp;
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::media::{
    AudioBlock, AudioBlockReader, AudioTrackWriter, Frame, MediaOutput, MediaSink, MediaSource,
    OutputConfig, SourceTracks, TrackWriters, VideoFrameReader, VideoSourceInfo,
    VideoTrackWriter, ensure_increasing,
};
use crate::raster::image::Image;

/// Source backed by pre-decoded frames and blocks.
#[derive(Clone, Debug)]
pub struct MemorySource {
    info: VideoSourceInfo,
    frames: Vec<Frame>,
    audio: Option<Vec<AudioBlock>>,
    open_error: Option<String>,
    video_error_after: Option<usize>,
    opened: bool,
}

impl MemorySource {
    /// Video-only source. `info.audio` is cleared.
    pub fn new(mut info: VideoSourceInfo, frames: Vec<Frame>) -> Self {
        info.audio = None;
        Self {
            info,
            frames,
            audio: None,
            open_error: None,
            video_error_after: None,
            opened: false,
        }
    }

    /// Add an audio track made of `blocks`; `info.audio` follows the first block.
    pub fn with_audio(mut self, blocks: Vec<AudioBlock>) -> Self {
        self.info.audio = Some(crate::media::AudioFormat {
            sample_rate: blocks.first().map_or(48_000, |b| b.sample_rate),
            channels: blocks.first().map_or(2, |b| b.channels),
        });
        self.audio = Some(blocks);
        self
    }

    /// Make `open` fail with `msg`.
    pub fn failing_open(mut self, msg: impl Into<String>) -> Self {
        self.open_error = Some(msg.into());
        self
    }

    /// Make the video reader fail after yielding `n` frames.
    pub fn failing_video_after(mut self, n: usize) -> Self {
        self.video_error_after = Some(n);
        self
    }
}

impl MediaSource for MemorySource {
    fn open(&mut self) -> SemanticResult<SourceTracks> {
        if let Some(msg) = &self.open_error {
            return Err(SemanticError::media(format!("cannot open source: {msg}")));
        }
        if self.opened {
            return Err(SemanticError::media("memory source already opened"));
        }
        self.opened = true;

        let video = MemoryVideoReader {
            frames: std::mem::take(&mut self.frames).into(),
            yielded: 0,
            error_after: self.video_error_after,
        };
        let audio = self.audio.take().map(|blocks| {
            Box::new(MemoryAudioReader {
                blocks: blocks.into(),
            }) as Box<dyn AudioBlockReader>
        });
        Ok(SourceTracks {
            info: self.info.clone(),
            video: Box::new(video),
            audio,
        })
    }
}

struct MemoryVideoReader {
    frames: VecDeque<Frame>,
    yielded: usize,
    error_after: Option<usize>,
}

impl VideoFrameReader for MemoryVideoReader {
    fn next_frame(&mut self) -> SemanticResult<Option<Frame>> {
        if self.error_after.is_some_and(|n| self.yielded >= n) {
            return Err(SemanticError::media(format!(
                "video decode failed after {} frames",
                self.yielded
            )));
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.yielded += 1;
        }
        Ok(frame)
    }
}

struct MemoryAudioReader {
    blocks: VecDeque<AudioBlock>,
}

impl AudioBlockReader for MemoryAudioReader {
    fn next_block(&mut self) -> SemanticResult<Option<AudioBlock>> {
        Ok(self.blocks.pop_front())
    }
}

/// Everything a [`MemorySink`] has observed.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    /// Configuration passed to `begin`.
    pub config: Option<OutputConfig>,
    /// Written frames with their timestamps, in write order.
    pub video: Vec<(Timestamp, Image)>,
    /// Written audio blocks, in write order.
    pub audio: Vec<AudioBlock>,
    /// Video track marked complete.
    pub video_finished: bool,
    /// Last source timestamp reported when the video track completed.
    pub video_end: Option<Timestamp>,
    /// Audio track marked complete.
    pub audio_finished: bool,
    /// Number of `finish` calls.
    pub finish_calls: usize,
    /// Number of `abort` calls.
    pub abort_calls: usize,
}

/// Sink that records into shared memory for inspection.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    recording: Arc<Mutex<Recording>>,
    begin_error: Option<String>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `begin` fail with `msg`.
    pub fn failing_begin(mut self, msg: impl Into<String>) -> Self {
        self.begin_error = Some(msg.into());
        self
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Recording {
        lock(&self.recording).clone()
    }
}

impl MediaSink for MemorySink {
    fn begin(&mut self, config: &OutputConfig) -> SemanticResult<TrackWriters> {
        if let Some(msg) = &self.begin_error {
            return Err(SemanticError::media(format!(
                "cannot open destination: {msg}"
            )));
        }
        config.validate()?;
        lock(&self.recording).config = Some(config.clone());

        let video = MemoryVideoWriter {
            recording: Arc::clone(&self.recording),
            size: (config.width, config.height),
            last: None,
            done: false,
        };
        let audio = config.audio.map(|_| {
            Box::new(MemoryAudioWriter {
                recording: Arc::clone(&self.recording),
                last: None,
                done: false,
            }) as Box<dyn AudioTrackWriter>
        });
        Ok(TrackWriters {
            video: Box::new(video),
            audio,
        })
    }

    fn finish(&mut self) -> SemanticResult<MediaOutput> {
        let mut rec = lock(&self.recording);
        rec.finish_calls += 1;
        let audio_expected = rec.config.as_ref().is_some_and(|c| c.audio.is_some());
        if !rec.video_finished || (audio_expected && !rec.audio_finished) {
            return Err(SemanticError::media(
                "finish called before every track completed",
            ));
        }
        Ok(MediaOutput::Memory)
    }

    fn abort(&mut self) {
        lock(&self.recording).abort_calls += 1;
    }
}

struct MemoryVideoWriter {
    recording: Arc<Mutex<Recording>>,
    size: (u32, u32),
    last: Option<Timestamp>,
    done: bool,
}

impl VideoTrackWriter for MemoryVideoWriter {
    fn append_video(&mut self, image: &Image, pts: Timestamp) -> SemanticResult<()> {
        if self.done {
            return Err(SemanticError::media("video track already finished"));
        }
        if image.dimensions() != self.size {
            return Err(SemanticError::media(format!(
                "frame size mismatch: got {:?}, expected {:?}",
                image.dimensions(),
                self.size
            )));
        }
        ensure_increasing(&mut self.last, pts, "video")?;
        lock(&self.recording).video.push((pts, image.clone()));
        Ok(())
    }

    fn finish_track(&mut self, source_end: Option<Timestamp>) -> SemanticResult<()> {
        self.done = true;
        let mut rec = lock(&self.recording);
        rec.video_finished = true;
        rec.video_end = source_end;
        Ok(())
    }
}

struct MemoryAudioWriter {
    recording: Arc<Mutex<Recording>>,
    last: Option<Timestamp>,
    done: bool,
}

impl AudioTrackWriter for MemoryAudioWriter {
    fn append_audio(&mut self, block: &AudioBlock) -> SemanticResult<()> {
        if self.done {
            return Err(SemanticError::media("audio track already finished"));
        }
        ensure_increasing(&mut self.last, block.pts, "audio")?;
        lock(&self.recording).audio.push(block.clone());
        Ok(())
    }

    fn finish_track(&mut self) -> SemanticResult<()> {
        self.done = true;
        lock(&self.recording).audio_finished = true;
        Ok(())
    }
}

fn lock(recording: &Mutex<Recording>) -> MutexGuard<'_, Recording> {
    recording.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "../../tests/unit/media/memory.rs"]
mod tests;
