use super::*;

fn info(rotation: i32) -> VideoSourceInfo {
    VideoSourceInfo {
        width: 1080,
        height: 1920,
        rotation_degrees: rotation,
        frame_rate: FrameRate::new(30, 1).unwrap(),
        timescale: 600,
        audio: None,
    }
}

#[test]
fn quarter_turns_swap_display_size() {
    assert_eq!(info(90).display_size(), (1920, 1080));
    assert_eq!(info(270).display_size(), (1920, 1080));
    assert_eq!(info(180).display_size(), (1080, 1920));
    assert_eq!(info(0).display_size(), (1080, 1920));
    assert!(info(-90).is_quarter_turn());
}

#[test]
fn audio_block_counts_frames() {
    let block = AudioBlock {
        pts: Timestamp::zero(48_000),
        sample_rate: 48_000,
        channels: 2,
        samples: vec![0.0; 10],
    };
    assert_eq!(block.frames(), 5);
}

#[test]
fn output_config_validation() {
    let mut cfg = OutputConfig {
        width: 4,
        height: 4,
        frame_rate: FrameRate::new(25, 1).unwrap(),
        timescale: 25,
        rotation_degrees: 0,
        audio: None,
    };
    cfg.validate().unwrap();
    cfg.audio = Some(AudioFormat {
        sample_rate: 0,
        channels: 2,
    });
    assert!(cfg.validate().is_err());
    cfg.audio = None;
    cfg.width = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn timestamps_must_strictly_increase() {
    let mut last = None;
    ensure_increasing(&mut last, Timestamp::new(1, 30).unwrap(), "video").unwrap();
    ensure_increasing(&mut last, Timestamp::new(100, 1000).unwrap(), "video").unwrap();
    assert!(ensure_increasing(&mut last, Timestamp::new(3, 30).unwrap(), "video").is_err());
    assert!(ensure_increasing(&mut last, Timestamp::new(2, 30).unwrap(), "video").is_err());
}

#[test]
fn media_output_path() {
    assert_eq!(
        MediaOutput::File(PathBuf::from("a.mp4")).path(),
        Some(std::path::Path::new("a.mp4"))
    );
    assert!(MediaOutput::Memory.path().is_none());
}
