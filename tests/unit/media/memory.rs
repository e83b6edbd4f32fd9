use super::*;
use crate::foundation::core::FrameRate;
use crate::media::AudioFormat;
use image::RgbaImage;

fn info() -> VideoSourceInfo {
    VideoSourceInfo {
        width: 2,
        height: 2,
        rotation_degrees: 0,
        frame_rate: FrameRate::new(10, 1).unwrap(),
        timescale: 10,
        audio: None,
    }
}

fn frame(i: i64) -> Frame {
    Frame::new(Image::new(RgbaImage::new(2, 2)), Timestamp::new(i, 10).unwrap())
}

fn config(audio: bool) -> OutputConfig {
    OutputConfig {
        width: 2,
        height: 2,
        frame_rate: FrameRate::new(10, 1).unwrap(),
        timescale: 10,
        rotation_degrees: 0,
        audio: audio.then_some(AudioFormat {
            sample_rate: 8,
            channels: 1,
        }),
    }
}

#[test]
fn source_yields_frames_in_order_then_exhausts() {
    let mut src = MemorySource::new(info(), vec![frame(0), frame(1)]);
    let mut tracks = src.open().unwrap();
    assert!(tracks.audio.is_none());
    assert_eq!(tracks.video.next_frame().unwrap().unwrap().pts.value, 0);
    assert_eq!(tracks.video.next_frame().unwrap().unwrap().pts.value, 1);
    assert!(tracks.video.next_frame().unwrap().is_none());
    assert!(src.open().is_err());
}

#[test]
fn audio_track_sets_format() {
    let block = AudioBlock {
        pts: Timestamp::zero(8),
        sample_rate: 8,
        channels: 1,
        samples: vec![0.5; 4],
    };
    let mut src = MemorySource::new(info(), vec![]).with_audio(vec![block.clone()]);
    let mut tracks = src.open().unwrap();
    assert_eq!(
        tracks.info.audio,
        Some(AudioFormat {
            sample_rate: 8,
            channels: 1
        })
    );
    let audio = tracks.audio.as_mut().unwrap();
    assert_eq!(audio.next_block().unwrap(), Some(block));
    assert!(audio.next_block().unwrap().is_none());
}

#[test]
fn failing_source_and_reader() {
    assert!(MemorySource::new(info(), vec![]).failing_open("gone").open().is_err());

    let mut src = MemorySource::new(info(), vec![frame(0), frame(1)]).failing_video_after(1);
    let mut tracks = src.open().unwrap();
    assert!(tracks.video.next_frame().unwrap().is_some());
    assert!(tracks.video.next_frame().is_err());
}

#[test]
fn sink_records_and_rejects_out_of_order() {
    let mut sink = MemorySink::new();
    let mut writers = sink.begin(&config(false)).unwrap();
    assert!(writers.audio.is_none());
    let img = Image::new(RgbaImage::new(2, 2));
    writers.video.append_video(&img, Timestamp::new(1, 10).unwrap()).unwrap();
    assert!(writers.video.append_video(&img, Timestamp::new(1, 10).unwrap()).is_err());
    assert!(
        writers
            .video
            .append_video(&Image::new(RgbaImage::new(3, 2)), Timestamp::new(5, 10).unwrap())
            .is_err()
    );
    writers.video.finish_track(None).unwrap();
    assert!(writers.video.append_video(&img, Timestamp::new(9, 10).unwrap()).is_err());
    drop(writers);

    assert_eq!(sink.finish().unwrap(), MediaOutput::Memory);
    let rec = sink.snapshot();
    assert_eq!(rec.video.len(), 1);
    assert_eq!(rec.finish_calls, 1);
    assert_eq!(rec.abort_calls, 0);
}

#[test]
fn finish_requires_every_track() {
    let mut sink = MemorySink::new();
    let mut writers = sink.begin(&config(true)).unwrap();
    writers.video.finish_track(None).unwrap();
    drop(writers);
    assert!(sink.finish().is_err());
}

#[test]
fn failing_begin_reports_error() {
    let mut sink = MemorySink::new().failing_begin("read-only");
    assert!(sink.begin(&config(false)).is_err());
    assert!(sink.snapshot().config.is_none());
}
