use super::*;

#[test]
fn box_scales_with_top_left_origin() {
    let b = NormalizedBox::new(0.25, 0.1, 0.5, 0.2);
    let r = b.to_pixel_rect((200, 100));
    assert_eq!(r, Rect::new(50.0, 10.0, 150.0, 30.0));
}

#[test]
fn box_validity() {
    assert!(NormalizedBox::full().is_valid());
    assert!(!NormalizedBox::new(0.0, 0.0, 0.0, 0.5).is_valid());
    assert!(!NormalizedBox::new(f64::NAN, 0.0, 0.5, 0.5).is_valid());
}

#[test]
fn quad_from_box_runs_clockwise() {
    let q = NormalizedQuad::from_box(&NormalizedBox::new(0.1, 0.2, 0.5, 0.5));
    let c = q.to_pixel_corners((10, 10));
    assert_eq!(c[0], Point::new(1.0, 2.0));
    assert_eq!(c[1], Point::new(6.0, 2.0));
    assert_eq!(c[2], Point::new(6.0, 7.0));
    assert_eq!(c[3], Point::new(1.0, 7.0));
}

#[test]
fn backend_dispatches_to_variant() {
    let img = Image::new(image::RgbaImage::new(4, 4));
    let fixed = DetectorBackend::Fixed(
        FixedDetector::new().with_regions(RegionKind::Animal, vec![NormalizedBox::full()]),
    );
    assert_eq!(fixed.detect_regions(&img, RegionKind::Animal).unwrap().len(), 1);
    assert!(fixed.detect_regions(&img, RegionKind::Face).unwrap().is_empty());

    let shared = fixed.into_shared();
    assert!(shared.segment_subject(&img).unwrap().is_none());
}

#[test]
fn region_kind_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&RegionKind::Face).unwrap(), "\"face\"");
}
