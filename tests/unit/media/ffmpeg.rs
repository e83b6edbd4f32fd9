use super::*;
use std::io::Cursor;

const ROTATED_PROBE: &str = r#"{
  "streams": [
    {
      "codec_type": "video",
      "width": 1080,
      "height": 1920,
      "r_frame_rate": "30000/1001",
      "avg_frame_rate": "30000/1001",
      "time_base": "1/30000",
      "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]
    },
    {
      "codec_type": "audio",
      "sample_rate": "44100",
      "channels": 1,
      "time_base": "1/44100"
    }
  ]
}"#;

#[test]
fn probe_reads_display_matrix_rotation_and_audio() {
    let probe = parse_probe(ROTATED_PROBE.as_bytes()).unwrap();
    assert_eq!(probe.info.width, 1080);
    assert_eq!(probe.info.height, 1920);
    assert_eq!(probe.info.rotation_degrees, 90);
    assert_eq!(probe.info.frame_rate, FrameRate::new(30000, 1001).unwrap());
    assert_eq!(probe.info.timescale, 30000);
    assert_eq!(probe.tick_num, 1);
    assert_eq!(
        probe.info.audio,
        Some(AudioFormat {
            sample_rate: 44_100,
            channels: 1
        })
    );
    assert_eq!(probe.info.display_size(), (1920, 1080));
}

#[test]
fn probe_prefers_rotate_tag() {
    let json = r#"{"streams": [{"codec_type": "video", "width": 4, "height": 2,
        "r_frame_rate": "25/1", "time_base": "1/12800", "tags": {"rotate": "270"}}]}"#;
    let probe = parse_probe(json.as_bytes()).unwrap();
    assert_eq!(probe.info.rotation_degrees, 270);
    assert!(probe.info.audio.is_none());
}

#[test]
fn probe_falls_back_to_average_rate() {
    let json = r#"{"streams": [{"codec_type": "video", "width": 4, "height": 2,
        "r_frame_rate": "0/0", "avg_frame_rate": "24/1"}]}"#;
    let probe = parse_probe(json.as_bytes()).unwrap();
    assert_eq!(probe.info.frame_rate, FrameRate::new(24, 1).unwrap());
    assert_eq!(probe.info.timescale, 90_000);
}

#[test]
fn probe_without_video_is_an_error() {
    let json = r#"{"streams": [{"codec_type": "audio"}]}"#;
    assert!(parse_probe(json.as_bytes()).is_err());
    assert!(parse_probe(b"not json").is_err());
}

#[test]
fn ratio_parsing() {
    assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
    assert_eq!(parse_ff_ratio("1/0"), None);
    assert_eq!(parse_ff_ratio("abc"), None);
}

#[test]
fn read_full_stops_at_end_of_stream() {
    let mut src = Cursor::new(vec![1u8, 2, 3, 4, 5]);
    let mut buf = [0u8; 4];
    assert_eq!(read_full(&mut src, &mut buf).unwrap(), 4);
    assert_eq!(read_full(&mut src, &mut buf).unwrap(), 1);
    assert_eq!(read_full(&mut src, &mut buf).unwrap(), 0);
}

#[test]
fn partial_paths_are_hidden_siblings() {
    let p = partial_path(Path::new("/out/clip.mp4"), "video.mp4");
    assert_eq!(p, PathBuf::from("/out/.clip.mp4.partial-video.mp4"));
}

#[test]
fn sink_rejects_odd_dimensions_before_spawning() {
    let dir = std::env::temp_dir().join(format!("semantic-image-odd-{}", std::process::id()));
    let dest = dir.join("out.mp4");
    let mut sink = FfmpegSink::new(&dest, EncoderConfig::default());
    let cfg = OutputConfig {
        width: 1081,
        height: 1920,
        frame_rate: FrameRate::new(30, 1).unwrap(),
        timescale: 30,
        rotation_degrees: 0,
        audio: None,
    };
    let err = sink.begin(&cfg).err().unwrap();
    assert!(err.to_string().contains("even"));
    assert!(!dest.exists());
}

#[test]
fn finish_without_begin_fails() {
    let mut sink = FfmpegSink::new("unused.mp4", EncoderConfig::default());
    assert!(sink.finish().is_err());
    sink.abort();
}

fn at_90k(ticks: i64) -> Timestamp {
    Timestamp::new(ticks, 90_000).unwrap()
}

#[test]
fn dropped_frames_keep_their_slots() {
    let mut timeline = SlotTimeline::new(FrameRate::new(30, 1).unwrap());
    assert_eq!(timeline.advance(at_90k(0)), 0);
    // Frame 1 dropped: frame 0 covers slots 0 and 1.
    assert_eq!(timeline.advance(at_90k(6000)), 2);
    assert_eq!(timeline.advance(at_90k(9000)), 1);
    // Frames 4 and 5 dropped at the tail: frame 3 runs through slot 5.
    assert_eq!(timeline.finish(Some(at_90k(15000))), 3);
}

#[test]
fn frames_sharing_a_slot_replace_the_held_frame() {
    let mut timeline = SlotTimeline::new(FrameRate::new(30, 1).unwrap());
    assert_eq!(timeline.advance(at_90k(0)), 0);
    assert_eq!(timeline.advance(at_90k(1000)), 0);
    assert_eq!(timeline.advance(at_90k(3000)), 1);
    assert_eq!(timeline.finish(None), 1);
    assert_eq!(timeline.finish(None), 0);
}

#[test]
fn first_frame_is_held_from_time_zero() {
    let mut timeline = SlotTimeline::new(FrameRate::new(30, 1).unwrap());
    assert_eq!(timeline.advance(at_90k(9000)), 0);
    assert_eq!(timeline.advance(at_90k(12000)), 4);
    assert_eq!(timeline.finish(Some(at_90k(6000))), 1);
}

#[test]
fn fractional_rates_map_each_source_frame_to_one_slot() {
    let mut timeline = SlotTimeline::new(FrameRate::new(30000, 1001).unwrap());
    assert_eq!(timeline.advance(Timestamp::new(0, 30_000).unwrap()), 0);
    let copies: Vec<u64> = (1..100)
        .map(|k| timeline.advance(Timestamp::new(k * 1001, 30_000).unwrap()))
        .collect();
    assert!(copies.iter().all(|&n| n == 1));
    assert_eq!(timeline.slot_of(Timestamp::new(-5, 30_000).unwrap()), 0);
}
