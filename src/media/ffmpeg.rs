use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Lines, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::config::{AudioConfig, EncoderConfig};
use crate::foundation::core::{FrameRate, Timestamp};
use crate::foundation::error::{SemanticError, SemanticResult};
use crate::media::{
    AudioBlock, AudioBlockReader, AudioFormat, AudioTrackWriter, Frame, MediaOutput, MediaSink,
    MediaSource, OutputConfig, SourceTracks, TrackWriters, VideoFrameReader, VideoSourceInfo,
    VideoTrackWriter, ensure_increasing,
};
use crate::raster::image::Image;

/// `true` when both `ffmpeg` and `ffprobe` run.
pub fn is_ffmpeg_on_path() -> bool {
    tool_runs("ffmpeg") && tool_runs("ffprobe")
}

fn tool_runs(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> SemanticResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Read track metadata with `ffprobe`.
pub fn probe_video(source_path: &Path) -> SemanticResult<VideoSourceInfo> {
    run_probe(source_path).map(|p| p.info)
}

fn run_probe(source_path: &Path) -> SemanticResult<Probe> {
    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(source_path)
        .output()
        .map_err(|e| SemanticError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(SemanticError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    let probe = parse_probe(&out.stdout)?;
    tracing::debug!(
        path = %source_path.display(),
        width = probe.info.width,
        height = probe.info.height,
        rotation = probe.info.rotation_degrees,
        has_audio = probe.info.audio.is_some(),
        "probed video"
    );
    Ok(probe)
}

#[derive(Debug)]
struct Probe {
    info: VideoSourceInfo,
    /// Numerator of the stream time base; timestamps are scaled by it.
    tick_num: i64,
}

fn parse_probe(json: &[u8]) -> SemanticResult<Probe> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        time_base: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u16>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
        #[serde(default)]
        side_data_list: Vec<serde_json::Value>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| SemanticError::media(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| SemanticError::media("no video stream found"))?;
    let width = video
        .width
        .ok_or_else(|| SemanticError::media("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| SemanticError::media("missing video height from ffprobe"))?;

    let (num, den) = [video.r_frame_rate.as_deref(), video.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(parse_ff_ratio)
        .find(|&(n, _)| n > 0)
        .ok_or_else(|| SemanticError::media("invalid video frame rate"))?;
    let frame_rate = FrameRate::new(num, den)?;
    let (tick_num, timescale) = video
        .time_base
        .as_deref()
        .and_then(parse_ff_ratio)
        .filter(|&(n, _)| n > 0)
        .unwrap_or((1, 90_000));

    // Older muxers store a `rotate` tag; newer ones a display matrix whose angle runs the other way.
    let rotation = video
        .tags
        .get("rotate")
        .and_then(|r| r.trim().parse::<i32>().ok())
        .or_else(|| {
            video
                .side_data_list
                .iter()
                .find_map(|sd| sd.get("rotation").and_then(serde_json::Value::as_f64))
                .map(|r| -(r.round() as i32))
        })
        .unwrap_or(0)
        .rem_euclid(360);

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioFormat {
            sample_rate: s
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(48_000),
            channels: s.channels.unwrap_or(2),
        });

    Ok(Probe {
        info: VideoSourceInfo {
            width,
            height,
            rotation_degrees: rotation,
            frame_rate,
            timescale,
            audio,
        },
        tick_num: i64::from(tick_num),
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.trim().parse::<u32>().ok()?;
    let b = parts.next()?.trim().parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

/// Spawned tool whose stderr is drained on a helper thread so it can never block on a full pipe.
struct ChildProcess {
    name: &'static str,
    child: Child,
    stderr: Option<JoinHandle<String>>,
    reaped: bool,
}

impl ChildProcess {
    fn spawn(name: &'static str, cmd: &mut Command) -> SemanticResult<Self> {
        let mut child = cmd.stderr(Stdio::piped()).spawn().map_err(|e| {
            SemanticError::media(format!(
                "failed to spawn {name} (is it installed and on PATH?): {e}"
            ))
        })?;
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                if pipe.read_to_string(&mut text).is_err() {
                    text.clear();
                }
                text
            })
        });
        Ok(Self {
            name,
            child,
            stderr,
            reaped: false,
        })
    }

    fn take_stdout(&mut self) -> SemanticResult<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or_else(|| SemanticError::media(format!("failed to open {} stdout", self.name)))
    }

    fn take_stdin(&mut self) -> SemanticResult<ChildStdin> {
        self.child
            .stdin
            .take()
            .ok_or_else(|| SemanticError::media(format!("failed to open {} stdin", self.name)))
    }

    fn wait(&mut self) -> SemanticResult<()> {
        let status = self.child.wait().map_err(|e| {
            SemanticError::media(format!("failed to wait for {}: {e}", self.name))
        })?;
        self.reaped = true;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(SemanticError::media(format!(
                "{} exited with status {status}: {}",
                self.name,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn kill(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            tracing::debug!(tool = self.name, error = %e, "kill failed");
        }
        if let Err(e) = self.child.wait() {
            tracing::debug!(tool = self.name, error = %e, "reap failed");
        }
        self.reaped = true;
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Source decoded by `ffmpeg` subprocesses.
///
/// Frames are decoded at their natural size (no auto-rotation) with timestamps read from an
/// `ffprobe` frame listing in lockstep; audio is resampled to the configured layout.
#[derive(Clone, Debug)]
pub struct FfmpegSource {
    path: PathBuf,
    audio: AudioConfig,
}

impl FfmpegSource {
    /// Source reading `path`, decoding audio per `audio`.
    pub fn new(path: impl Into<PathBuf>, audio: AudioConfig) -> Self {
        Self {
            path: path.into(),
            audio,
        }
    }
}

impl MediaSource for FfmpegSource {
    fn open(&mut self) -> SemanticResult<SourceTracks> {
        if !self.path.is_file() {
            return Err(SemanticError::media(format!(
                "source '{}' is not a readable file",
                self.path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(SemanticError::media(
                "ffmpeg and ffprobe are required for video sources, but were not found on PATH",
            ));
        }
        self.audio.validate()?;

        let mut probe = run_probe(&self.path)?;
        if probe.info.audio.is_some() {
            probe.info.audio = Some(AudioFormat {
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
            });
        }

        let video = FfmpegVideoReader::spawn(&self.path, &probe)?;
        let audio = match probe.info.audio {
            Some(format) => Some(Box::new(FfmpegAudioReader::spawn(
                &self.path,
                format,
                self.audio.block_frames,
            )?) as Box<dyn AudioBlockReader>),
            None => None,
        };
        tracing::info!(
            path = %self.path.display(),
            width = probe.info.width,
            height = probe.info.height,
            rotation = probe.info.rotation_degrees,
            has_audio = probe.info.audio.is_some(),
            "opened video source"
        );
        Ok(SourceTracks {
            info: probe.info,
            video: Box::new(video),
            audio,
        })
    }
}

struct TimestampStream {
    _process: ChildProcess,
    lines: Lines<BufReader<ChildStdout>>,
}

impl TimestampStream {
    fn spawn(path: &Path) -> SemanticResult<Self> {
        let mut cmd = Command::new("ffprobe");
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "frame=best_effort_timestamp",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped());
        let mut process = ChildProcess::spawn("ffprobe", &mut cmd)?;
        let stdout = process.take_stdout()?;
        Ok(Self {
            _process: process,
            lines: BufReader::new(stdout).lines(),
        })
    }

    /// Next listed timestamp in stream ticks; `None` when exhausted or unparseable.
    fn next_ticks(&mut self) -> Option<i64> {
        loop {
            let line = self.lines.next()?.ok()?;
            let value = line.trim().trim_end_matches(',');
            if value.is_empty() {
                continue;
            }
            return value.parse::<i64>().ok();
        }
    }
}

struct FfmpegVideoReader {
    process: ChildProcess,
    stdout: ChildStdout,
    timestamps: Option<TimestampStream>,
    width: u32,
    height: u32,
    frame_rate: FrameRate,
    timescale: u32,
    tick_num: i64,
    index: u64,
    last: Option<Timestamp>,
    done: bool,
}

impl FfmpegVideoReader {
    fn spawn(path: &Path, probe: &Probe) -> SemanticResult<Self> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(path)
            .args([
                "-map",
                "0:v:0",
                "-fps_mode",
                "passthrough",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped());
        let mut process = ChildProcess::spawn("ffmpeg", &mut cmd)?;
        let stdout = process.take_stdout()?;

        let timestamps = match TimestampStream::spawn(path) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, "frame timestamps unavailable, deriving from frame rate");
                None
            }
        };

        Ok(Self {
            process,
            stdout,
            timestamps,
            width: probe.info.width,
            height: probe.info.height,
            frame_rate: probe.info.frame_rate,
            timescale: probe.info.timescale,
            tick_num: probe.tick_num,
            index: 0,
            last: None,
            done: false,
        })
    }

    fn next_pts(&mut self) -> Timestamp {
        let listed = self
            .timestamps
            .as_mut()
            .and_then(TimestampStream::next_ticks)
            .map(|ticks| Timestamp {
                value: ticks.saturating_mul(self.tick_num),
                timescale: self.timescale,
            });
        let mut pts = listed.unwrap_or_else(|| {
            self.frame_rate
                .frame_timestamp(self.index, self.timescale)
        });
        if let Some(prev) = self.last
            && pts.cmp_time(&prev).is_le()
        {
            tracing::warn!(
                index = self.index,
                value = pts.value,
                previous = prev.value,
                "non-increasing source timestamp, nudged forward"
            );
            pts = Timestamp {
                value: prev.rescale(self.timescale).value + 1,
                timescale: self.timescale,
            };
        }
        self.last = Some(pts);
        self.index += 1;
        pts
    }
}

impl VideoFrameReader for FfmpegVideoReader {
    fn next_frame(&mut self) -> SemanticResult<Option<Frame>> {
        if self.done {
            return Ok(None);
        }
        let frame_len = self.width as usize * self.height as usize * 4;
        let mut buf = vec![0u8; frame_len];
        let n = read_full(&mut self.stdout, &mut buf)
            .map_err(|e| SemanticError::media(format!("failed to read decoded frame: {e}")))?;
        if n == 0 {
            self.done = true;
            self.timestamps = None;
            self.process.wait()?;
            tracing::debug!(frames = self.index, "video decode exhausted");
            return Ok(None);
        }
        if n < frame_len {
            return Err(SemanticError::media(format!(
                "truncated frame {}: got {n} of {frame_len} bytes",
                self.index
            )));
        }
        let pts = self.next_pts();
        let image = Image::from_raw(self.width, self.height, buf)?;
        Ok(Some(Frame::new(image, pts)))
    }
}

struct FfmpegAudioReader {
    process: ChildProcess,
    stdout: ChildStdout,
    format: AudioFormat,
    block_frames: usize,
    emitted_frames: i64,
    done: bool,
}

impl FfmpegAudioReader {
    fn spawn(path: &Path, format: AudioFormat, block_frames: usize) -> SemanticResult<Self> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-map",
                "0:a:0",
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                &format.channels.to_string(),
                "-ar",
                &format.sample_rate.to_string(),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped());
        let mut process = ChildProcess::spawn("ffmpeg", &mut cmd)?;
        let stdout = process.take_stdout()?;
        Ok(Self {
            process,
            stdout,
            format,
            block_frames: block_frames.max(1),
            emitted_frames: 0,
            done: false,
        })
    }
}

impl AudioBlockReader for FfmpegAudioReader {
    fn next_block(&mut self) -> SemanticResult<Option<AudioBlock>> {
        if self.done {
            return Ok(None);
        }
        let frame_bytes = usize::from(self.format.channels) * 4;
        let mut buf = vec![0u8; self.block_frames * frame_bytes];
        let n = read_full(&mut self.stdout, &mut buf)
            .map_err(|e| SemanticError::media(format!("failed to read decoded audio: {e}")))?;
        let whole = n - n % frame_bytes;
        if whole == 0 {
            self.done = true;
            self.process.wait()?;
            tracing::debug!(frames = self.emitted_frames, "audio decode exhausted");
            return Ok(None);
        }
        let samples: Vec<f32> = buf[..whole]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let pts = Timestamp {
            value: self.emitted_frames,
            timescale: self.format.sample_rate,
        };
        self.emitted_frames += (whole / frame_bytes) as i64;
        Ok(Some(AudioBlock {
            pts,
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
            samples,
        }))
    }
}

/// Sink encoding H.264 with `ffmpeg` and muxing AAC audio at `finish`.
///
/// Video is encoded into a hidden temporary file next to the destination and raw audio is
/// spooled beside it; the destination is created only when `finish` succeeds.
pub struct FfmpegSink {
    destination: PathBuf,
    encoder: EncoderConfig,
    active: Option<ActiveOutput>,
}

struct ActiveOutput {
    encoder: ChildProcess,
    video_tmp: PathBuf,
    audio_tmp: Option<(PathBuf, AudioFormat)>,
}

impl ActiveOutput {
    fn remove_temps(&self) {
        let audio = self.audio_tmp.as_ref().map(|(p, _)| p.as_path());
        for path in std::iter::once(self.video_tmp.as_path()).chain(audio) {
            if let Err(e) = fs::remove_file(path)
                && e.kind() != ErrorKind::NotFound
            {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

impl FfmpegSink {
    /// Sink publishing to `destination`.
    pub fn new(destination: impl Into<PathBuf>, encoder: EncoderConfig) -> Self {
        Self {
            destination: destination.into(),
            encoder,
            active: None,
        }
    }

    /// Final output path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    fn mux(&self, active: &ActiveOutput) -> SemanticResult<()> {
        let audio = active
            .audio_tmp
            .as_ref()
            .filter(|(p, _)| fs::metadata(p).map(|m| m.len() > 0).unwrap_or(false));
        let Some((audio_tmp, format)) = audio else {
            fs::rename(&active.video_tmp, &self.destination).with_context(|| {
                format!("failed to move encoded video to '{}'", self.destination.display())
            })?;
            return Ok(());
        };

        let out = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-nostdin", "-i"])
            .arg(&active.video_tmp)
            .args([
                "-f",
                "f32le",
                "-ar",
                &format.sample_rate.to_string(),
                "-ac",
                &format.channels.to_string(),
                "-i",
            ])
            .arg(audio_tmp)
            .args([
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
                "-b:a",
                &format!("{}k", self.encoder.audio_bitrate_k),
                "-movflags",
                "+faststart",
            ])
            .arg(&self.destination)
            .output()
            .map_err(|e| SemanticError::media(format!("failed to run ffmpeg mux: {e}")))?;
        if !out.status.success() {
            if let Err(e) = fs::remove_file(&self.destination)
                && e.kind() != ErrorKind::NotFound
            {
                tracing::warn!(error = %e, "failed to remove partial output");
            }
            return Err(SemanticError::media(format!(
                "ffmpeg mux exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl MediaSink for FfmpegSink {
    fn begin(&mut self, config: &OutputConfig) -> SemanticResult<TrackWriters> {
        config.validate()?;
        self.encoder.validate()?;
        if !config.width.is_multiple_of(2) || !config.height.is_multiple_of(2) {
            return Err(SemanticError::validation(format!(
                "output {}x{} must have even width/height (required for yuv420p)",
                config.width, config.height
            )));
        }
        if self.active.is_some() {
            return Err(SemanticError::media("ffmpeg sink already started"));
        }
        if !is_ffmpeg_on_path() {
            return Err(SemanticError::media(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }
        ensure_parent_dir(&self.destination)?;

        let video_tmp = partial_path(&self.destination, "video.mp4");
        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", config.width, config.height),
            "-r",
            &format!("{}/{}", config.frame_rate.num, config.frame_rate.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-preset",
            &self.encoder.preset,
            "-crf",
            &self.encoder.crf.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-f",
            "mp4",
        ])
        .arg(&video_tmp)
        .stdin(Stdio::piped())
        .stdout(Stdio::null());
        let mut encoder = ChildProcess::spawn("ffmpeg", &mut cmd)?;
        let stdin = encoder.take_stdin()?;

        let mut active = ActiveOutput {
            encoder,
            video_tmp,
            audio_tmp: None,
        };
        let audio = match config.audio {
            Some(format) => {
                let path = partial_path(&self.destination, "audio.f32");
                let file = File::create(&path);
                active.audio_tmp = Some((path.clone(), format));
                let file = match file {
                    Ok(f) => f,
                    Err(e) => {
                        active.encoder.kill();
                        active.remove_temps();
                        return Err(SemanticError::media(format!(
                            "failed to create audio spool '{}': {e}",
                            path.display()
                        )));
                    }
                };
                Some(Box::new(FfmpegAudioWriter {
                    file: Some(BufWriter::new(file)),
                    format,
                    last: None,
                }) as Box<dyn AudioTrackWriter>)
            }
            None => None,
        };
        self.active = Some(active);

        tracing::info!(
            path = %self.destination.display(),
            width = config.width,
            height = config.height,
            has_audio = config.audio.is_some(),
            "opened ffmpeg output"
        );
        Ok(TrackWriters {
            video: Box::new(FfmpegVideoWriter {
                stdin: Some(stdin),
                size: (config.width, config.height),
                last: None,
                timeline: SlotTimeline::new(config.frame_rate),
                held_frame: None,
            }),
            audio,
        })
    }

    fn finish(&mut self) -> SemanticResult<MediaOutput> {
        let Some(mut active) = self.active.take() else {
            return Err(SemanticError::media("ffmpeg sink was never started"));
        };
        let result = active.encoder.wait().and_then(|()| self.mux(&active));
        active.remove_temps();
        result?;
        tracing::info!(path = %self.destination.display(), "finalized output");
        Ok(MediaOutput::File(self.destination.clone()))
    }

    fn abort(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.encoder.kill();
            active.remove_temps();
            tracing::info!(path = %self.destination.display(), "aborted output");
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}

fn partial_path(destination: &Path, suffix: &str) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    destination.with_file_name(format!(".{name}.partial-{suffix}"))
}

/// Maps presentation timestamps onto the encoder's constant-rate frame slots.
///
/// The encoder stamps the n-th raw frame at `n / fps`, so each frame is repeated until the next
/// one's slot. Dropped frames then keep their time instead of pulling later frames forward.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SlotTimeline {
    fps: FrameRate,
    held: Option<u64>,
}

impl SlotTimeline {
    pub(crate) fn new(fps: FrameRate) -> Self {
        Self { fps, held: None }
    }

    pub(crate) fn slot_of(&self, pts: Timestamp) -> u64 {
        let slot = (pts.as_secs_f64() * self.fps.as_f64()).round();
        if slot.is_finite() && slot > 0.0 {
            slot as u64
        } else {
            0
        }
    }

    /// Copies of the held frame to emit before `pts` replaces it.
    ///
    /// The first frame is held from slot 0. A frame landing in the held slot replaces it.
    pub(crate) fn advance(&mut self, pts: Timestamp) -> u64 {
        let slot = self.slot_of(pts);
        match self.held {
            None => {
                self.held = Some(0);
                0
            }
            Some(held) if slot <= held => 0,
            Some(held) => {
                self.held = Some(slot);
                slot - held
            }
        }
    }

    /// Copies of the held frame that close the track through `source_end`.
    pub(crate) fn finish(&mut self, source_end: Option<Timestamp>) -> u64 {
        let Some(held) = self.held.take() else {
            return 0;
        };
        let end = source_end.map_or(held, |pts| self.slot_of(pts));
        (end + 1).saturating_sub(held).max(1)
    }
}

struct FfmpegVideoWriter {
    stdin: Option<ChildStdin>,
    size: (u32, u32),
    last: Option<Timestamp>,
    timeline: SlotTimeline,
    held_frame: Option<Vec<u8>>,
}

impl FfmpegVideoWriter {
    fn emit_held(&mut self, copies: u64) -> SemanticResult<()> {
        let (Some(stdin), Some(frame)) = (self.stdin.as_mut(), self.held_frame.as_ref()) else {
            return Ok(());
        };
        for _ in 0..copies {
            stdin.write_all(frame).map_err(|e| {
                SemanticError::media(format!("failed to write frame to ffmpeg stdin: {e}"))
            })?;
        }
        Ok(())
    }
}

impl VideoTrackWriter for FfmpegVideoWriter {
    fn append_video(&mut self, image: &Image, pts: Timestamp) -> SemanticResult<()> {
        if image.dimensions() != self.size {
            return Err(SemanticError::media(format!(
                "frame size mismatch: got {:?}, expected {:?}",
                image.dimensions(),
                self.size
            )));
        }
        if self.stdin.is_none() {
            return Err(SemanticError::media("video track already finished"));
        }
        ensure_increasing(&mut self.last, pts, "video")?;
        let copies = self.timeline.advance(pts);
        self.emit_held(copies)?;
        self.held_frame = Some(image.pixels().as_raw().clone());
        Ok(())
    }

    fn finish_track(&mut self, source_end: Option<Timestamp>) -> SemanticResult<()> {
        let copies = self.timeline.finish(source_end.or(self.last));
        let flushed = self.emit_held(copies);
        self.held_frame = None;
        drop(self.stdin.take());
        flushed
    }
}

struct FfmpegAudioWriter {
    file: Option<BufWriter<File>>,
    format: AudioFormat,
    last: Option<Timestamp>,
}

impl AudioTrackWriter for FfmpegAudioWriter {
    fn append_audio(&mut self, block: &AudioBlock) -> SemanticResult<()> {
        if block.sample_rate != self.format.sample_rate || block.channels != self.format.channels {
            return Err(SemanticError::media(format!(
                "audio layout mismatch: got {} Hz x{}, expected {} Hz x{}",
                block.sample_rate, block.channels, self.format.sample_rate, self.format.channels
            )));
        }
        ensure_increasing(&mut self.last, block.pts, "audio")?;
        let Some(file) = self.file.as_mut() else {
            return Err(SemanticError::media("audio track already finished"));
        };
        for s in &block.samples {
            file.write_all(&s.to_le_bytes())
                .context("failed to spool audio samples")?;
        }
        Ok(())
    }

    fn finish_track(&mut self) -> SemanticResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().context("failed to flush audio spool")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
