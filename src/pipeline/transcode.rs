use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread::JoinHandle;

use crate::foundation::core::Lane;
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::media::{
    AudioBlockReader, AudioTrackWriter, Frame, MediaOutput, MediaSink, MediaSource, OutputConfig,
    VideoFrameReader, VideoTrackWriter,
};
use crate::pipeline::job::PipelineJob;
use crate::raster::image::Image;
use crate::raster::orientation::{Orientation, normalize};

/// Counters collected while a transcode runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TranscodeReport {
    /// Frames pulled from the source.
    pub frames_read: u64,
    /// Frames handed to the sink.
    pub frames_written: u64,
    /// Frames the transform rejected or returned at the wrong size.
    pub frames_dropped: u64,
    /// Audio blocks passed through.
    pub audio_blocks: u64,
    /// Encoded frame size.
    pub output_size: (u32, u32),
    /// Source rotation was baked into pixels.
    pub rotated: bool,
}

/// Successful transcode result.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscodeOutput {
    /// Finalized output.
    pub output: MediaOutput,
    /// Counters.
    pub report: TranscodeReport,
}

/// Running transcode. Dropping it detaches the lanes; the completion still fires.
#[derive(Debug, Default)]
pub struct TranscodeHandle {
    threads: Vec<JoinHandle<()>>,
    job: Option<Arc<PipelineJob>>,
}

impl TranscodeHandle {
    /// Ask both lanes to stop. The job then finalizes as failed and the sink is aborted.
    pub fn cancel(&self) {
        if let Some(job) = &self.job {
            job.cancel();
        }
    }

    /// Block until both lanes have exited (and therefore the completion has run).
    pub fn wait(self) {
        for handle in self.threads {
            if handle.join().is_err() {
                tracing::error!("transcode lane thread panicked outside its guard");
            }
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    frames_read: AtomicU64,
    frames_written: AtomicU64,
    frames_dropped: AtomicU64,
    audio_blocks: AtomicU64,
}

impl Progress {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self, output_size: (u32, u32), rotated: bool) -> TranscodeReport {
        TranscodeReport {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            frames_written: self.frames_written.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            audio_blocks: self.audio_blocks.load(Ordering::Relaxed),
            output_size,
            rotated,
        }
    }
}

struct Finisher<K, C> {
    sink: K,
    completion: C,
}

/// State shared by both lanes. Only the join point touches the sink.
struct Join<K, C> {
    job: Arc<PipelineJob>,
    progress: Progress,
    finisher: Mutex<Option<Finisher<K, C>>>,
    output_size: (u32, u32),
    rotated: bool,
}

impl<K, C> Join<K, C>
where
    K: MediaSink,
    C: FnOnce(SemanticResult<TranscodeOutput>),
{
    fn conclude(&self, lane: Lane, outcome: SemanticResult<()>) {
        match &outcome {
            Ok(()) => tracing::debug!(%lane, "lane exhausted"),
            Err(e) => tracing::warn!(%lane, error = %e, "lane failed"),
        }
        let Some(job_outcome) = self.job.lane_finished(lane, outcome) else {
            return;
        };
        let Some(Finisher {
            mut sink,
            completion,
        }) = self
            .finisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        let report = self.progress.report(self.output_size, self.rotated);
        let result = match job_outcome {
            Ok(()) => sink
                .finish()
                .map(|output| TranscodeOutput { output, report }),
            Err(e) => {
                sink.abort();
                Err(e)
            }
        };
        match &result {
            Ok(out) => tracing::info!(
                frames_written = report.frames_written,
                frames_dropped = report.frames_dropped,
                audio_blocks = report.audio_blocks,
                output = ?out.output,
                "transcode finished"
            ),
            Err(e) => tracing::warn!(error = %e, "transcode failed"),
        }
        completion(result);
    }
}

/// Stream every frame of `source` through `per_frame` into `sink`, passing audio through.
///
/// - Setup (opening the source, then the sink) runs on the calling thread; a setup failure
///   reaches `completion` immediately and no lane is started.
/// - A quarter-turn source rotation is baked into every frame before `per_frame` sees it, and
///   the output is configured with swapped extent and no rotation.
/// - `per_frame` returning `None`, or a frame of the wrong size, drops that frame.
/// - Written frames keep their source timestamps, in source order.
/// - `completion` runs exactly once, on whichever lane completes the AND-join.
pub fn stream_transform<S, F, K, C>(
    mut source: S,
    per_frame: F,
    mut sink: K,
    completion: C,
) -> TranscodeHandle
where
    S: MediaSource,
    F: FnMut(Frame) -> Option<Frame> + Send + 'static,
    K: MediaSink + 'static,
    C: FnOnce(SemanticResult<TranscodeOutput>) + Send + 'static,
{
    let tracks = match source.open() {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "transcode setup failed: source");
            completion(Err(e));
            return TranscodeHandle::default();
        }
    };
    let info = tracks.info;

    let orientation = info.orientation();
    let rotated = match orientation {
        Orientation::Identity => false,
        Orientation::Unsupported(_) => {
            tracing::warn!(
                rotation = info.rotation_degrees,
                "unsupported source rotation, frames pass through unrotated"
            );
            false
        }
        _ => true,
    };
    let output_size = if rotated {
        info.display_size()
    } else {
        (info.width, info.height)
    };

    let audio = match (tracks.audio, info.audio) {
        (Some(reader), Some(format)) => Some((reader, format)),
        (Some(_), None) => {
            tracing::warn!("audio reader without a sample format, audio dropped");
            None
        }
        (None, _) => None,
    };
    let config = OutputConfig {
        width: output_size.0,
        height: output_size.1,
        frame_rate: info.frame_rate,
        timescale: info.timescale,
        rotation_degrees: 0,
        audio: audio.as_ref().map(|(_, f)| *f),
    };

    let writers = match sink.begin(&config) {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(error = %e, "transcode setup failed: destination");
            completion(Err(e));
            return TranscodeHandle::default();
        }
    };
    let audio_lane = match (audio, writers.audio) {
        (Some((reader, _)), Some(writer)) => Some((reader, writer)),
        (None, None) => None,
        _ => {
            sink.abort();
            completion(Err(SemanticError::pipeline(
                "sink audio writer does not match the requested audio track",
            )));
            return TranscodeHandle::default();
        }
    };

    tracing::info!(
        width = output_size.0,
        height = output_size.1,
        rotation = info.rotation_degrees,
        rotated,
        has_audio = audio_lane.is_some(),
        "transcode started"
    );

    let job = Arc::new(PipelineJob::new(audio_lane.is_some()));
    let join = Arc::new(Join {
        job: Arc::clone(&job),
        progress: Progress::default(),
        finisher: Mutex::new(Some(Finisher { sink, completion })),
        output_size,
        rotated,
    });

    let mut threads = Vec::with_capacity(2);
    let lane_orientation = if rotated {
        orientation
    } else {
        Orientation::Identity
    };
    let video_join = Arc::clone(&join);
    let video_reader = tracks.video;
    let video_writer = writers.video;
    let spawned = std::thread::Builder::new()
        .name("transcode-video".to_owned())
        .spawn(move || {
            let outcome = guard_lane(Lane::Video, || {
                run_video_lane(
                    video_reader,
                    video_writer,
                    per_frame,
                    lane_orientation,
                    output_size,
                    &video_join.job,
                    &video_join.progress,
                )
            });
            video_join.conclude(Lane::Video, outcome);
        });
    match spawned {
        Ok(h) => threads.push(h),
        Err(e) => {
            job.cancel();
            join.conclude(
                Lane::Video,
                Err(SemanticError::pipeline(format!("failed to spawn video lane: {e}"))),
            );
        }
    }

    if let Some((reader, writer)) = audio_lane {
        let audio_join = Arc::clone(&join);
        let spawned = std::thread::Builder::new()
            .name("transcode-audio".to_owned())
            .spawn(move || {
                let outcome = guard_lane(Lane::Audio, || {
                    run_audio_lane(reader, writer, &audio_join.job, &audio_join.progress)
                });
                audio_join.conclude(Lane::Audio, outcome);
            });
        match spawned {
            Ok(h) => threads.push(h),
            Err(e) => join.conclude(
                Lane::Audio,
                Err(SemanticError::pipeline(format!("failed to spawn audio lane: {e}"))),
            ),
        }
    }

    TranscodeHandle {
        threads,
        job: Some(job),
    }
}

/// [`stream_transform`] on the calling thread's behalf: returns once the job is finalized.
pub fn stream_transform_blocking<S, F, K>(
    source: S,
    per_frame: F,
    sink: K,
) -> SemanticResult<TranscodeOutput>
where
    S: MediaSource,
    F: FnMut(Frame) -> Option<Frame> + Send + 'static,
    K: MediaSink + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = stream_transform(source, per_frame, sink, move |result| {
        if tx.send(result).is_err() {
            tracing::debug!("transcode result receiver dropped");
        }
    });
    handle.wait();
    rx.recv()
        .map_err(|_| SemanticError::pipeline("transcode finished without reporting"))?
}

fn guard_lane(lane: Lane, run: impl FnOnce() -> SemanticResult<()>) -> SemanticResult<()> {
    catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|_| Err(SemanticError::pipeline(format!("{lane} lane panicked"))))
}

fn run_video_lane<F>(
    mut reader: Box<dyn VideoFrameReader>,
    mut writer: Box<dyn VideoTrackWriter>,
    mut per_frame: F,
    orientation: Orientation,
    output_size: (u32, u32),
    job: &PipelineJob,
    progress: &Progress,
) -> SemanticResult<()>
where
    F: FnMut(Frame) -> Option<Frame>,
{
    let mut last_read = None;
    loop {
        if job.is_cancelled() {
            return Err(SemanticError::pipeline("video lane cancelled"));
        }
        let Some(frame) = reader.next_frame()? else {
            break;
        };
        Progress::bump(&progress.frames_read);

        let pts = frame.pts;
        last_read = Some(pts);
        let image = normalize(Image::with_orientation(
            frame.image.into_pixels(),
            orientation,
        ));
        let Some(out) = per_frame(Frame::new(image, pts)) else {
            Progress::bump(&progress.frames_dropped);
            tracing::warn!(
                pts = pts.value,
                timescale = pts.timescale,
                "frame transform returned nothing, frame dropped"
            );
            continue;
        };
        let image = normalize(out.image);
        if image.dimensions() != output_size {
            Progress::bump(&progress.frames_dropped);
            tracing::warn!(
                pts = pts.value,
                width = image.width(),
                height = image.height(),
                "transformed frame has the wrong size, frame dropped"
            );
            continue;
        }
        writer.append_video(&image, pts)?;
        Progress::bump(&progress.frames_written);
    }
    writer.finish_track(last_read)
}

fn run_audio_lane(
    mut reader: Box<dyn AudioBlockReader>,
    mut writer: Box<dyn AudioTrackWriter>,
    job: &PipelineJob,
    progress: &Progress,
) -> SemanticResult<()> {
    loop {
        if job.is_cancelled() {
            return Err(SemanticError::pipeline("audio lane cancelled"));
        }
        let Some(block) = reader.next_block()? else {
            break;
        };
        writer.append_audio(&block)?;
        Progress::bump(&progress.audio_blocks);
    }
    writer.finish_track()
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/transcode.rs"]
mod tests;
