use super::*;

#[test]
fn empty_detector_finds_nothing() {
    let img = Image::new(image::RgbaImage::new(2, 2));
    let d = FixedDetector::new();
    assert!(d.segment_subject(&img).unwrap().is_none());
    assert!(d.detect_regions(&img, RegionKind::Human).unwrap().is_empty());
    assert!(d.detect_document(&img).unwrap().is_none());
}

#[test]
fn regions_replay_in_insertion_order() {
    let img = Image::new(image::RgbaImage::new(2, 2));
    let boxes = vec![
        NormalizedBox::new(0.7, 0.1, 0.1, 0.1),
        NormalizedBox::new(0.1, 0.1, 0.1, 0.1),
        NormalizedBox::new(0.4, 0.6, 0.1, 0.1),
    ];
    let d = FixedDetector::new().with_regions(RegionKind::Face, boxes.clone());
    assert_eq!(d.detect_regions(&img, RegionKind::Face).unwrap(), boxes);
}

#[test]
fn subject_and_document_are_returned() {
    let img = Image::new(image::RgbaImage::new(2, 2));
    let quad = NormalizedQuad::from_box(&NormalizedBox::full());
    let d = FixedDetector::new()
        .with_subject(Mask::filled(3, 3, 1.0))
        .with_document(quad);
    assert_eq!(d.segment_subject(&img).unwrap().unwrap().dimensions(), (3, 3));
    assert_eq!(d.detect_document(&img).unwrap(), Some(quad));
}
