use super::*;

#[test]
fn timestamp_rejects_zero_timescale() {
    assert!(Timestamp::new(1, 0).is_err());
    assert!(Timestamp::new(1, 600).is_ok());
}

#[test]
fn timestamp_rescale_rounds_to_nearest() {
    let t = Timestamp::new(1001, 30_000).unwrap();
    let r = t.rescale(90_000);
    assert_eq!(r.value, 3003);
    assert_eq!(r.timescale, 90_000);

    let t = Timestamp::new(1, 3).unwrap();
    assert_eq!(t.rescale(2).value, 1);
    let t = Timestamp::new(-1, 3).unwrap();
    assert_eq!(t.rescale(2).value, -1);
}

#[test]
fn cmp_time_ignores_timescale() {
    let a = Timestamp::new(1, 2).unwrap();
    let b = Timestamp::new(300, 600).unwrap();
    let c = Timestamp::new(301, 600).unwrap();
    assert_eq!(a.cmp_time(&b), Ordering::Equal);
    assert_eq!(a.cmp_time(&c), Ordering::Less);
    assert_ne!(a, b);
}

#[test]
fn frame_rate_timestamps_are_exact_for_ntsc() {
    let fps = FrameRate::new(30_000, 1001).unwrap();
    let t = fps.frame_timestamp(30, 30_000);
    assert_eq!(t.value, 30 * 1001);
    assert!((fps.as_f64() - 29.97).abs() < 0.01);
}

#[test]
fn frame_rate_validates() {
    assert!(FrameRate::new(0, 1).is_err());
    assert!(FrameRate::new(30, 0).is_err());
}

#[test]
fn lane_display_is_lowercase() {
    assert_eq!(Lane::Video.to_string(), "video");
    assert_eq!(Lane::Audio.to_string(), "audio");
}
